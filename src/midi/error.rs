use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI initialization failed")]
    Init(#[from] midir::InitError),

    #[error("Error connecting to MIDI port {}", .0)]
    Connection(Arc<str>),

    #[error("MIDI port not connected")]
    NotConnected,

    #[error("Couldn't retrieve a MIDI port name")]
    PortInfoError(#[from] midir::PortInfoError),

    #[error("Invalid MIDI port name {}", .0)]
    PortNotFound(Arc<str>),

    #[error("Invalid pitch wheel value: {:02x?}", .0)]
    InvalidPitch(Box<[u8]>),

    #[error("Unsupported MIDI msg: {:02x?}", .0)]
    UnsupportedMsg(Box<[u8]>),

    #[error("Couldn't send MIDI message: {}", .0)]
    Send(#[from] midir::SendError),
}
