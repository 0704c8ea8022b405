//! The MIDI transport the device session relies on.
//!
//! A [`Transport`] opens named ports: an [`Output`] to which messages are
//! sent, and an [`Input`] which pushes every inbound message to a callback
//! running on a transport-owned thread.

use super::{Error, Msg};

pub type InputCallback = Box<dyn FnMut(Msg) + Send + 'static>;

pub trait Transport: Send + Sync + 'static {
    fn open_output(&self, port_name: &str) -> Result<Box<dyn Output>, Error>;

    /// Opens the input port `port_name`.
    ///
    /// `callback` is invoked for each supported message until the
    /// returned [`Input`] is closed or dropped.
    fn open_input(&self, port_name: &str, callback: InputCallback)
        -> Result<Box<dyn Input>, Error>;
}

pub trait Output: Send {
    fn send(&mut self, msg: &Msg) -> Result<(), Error>;
    fn close(self: Box<Self>);
}

pub trait Input {
    fn close(self: Box<Self>);
}
