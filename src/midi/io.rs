use std::sync::Arc;

use super::{port, transport::InputCallback, Error, Input, Msg, Output, Transport};

/// [`Transport`] backed by the system MIDI API through `midir`.
#[derive(Clone, Debug)]
pub struct Midir {
    client_name: Arc<str>,
}

impl Midir {
    pub fn new(client_name: impl Into<Arc<str>>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }
}

impl Transport for Midir {
    fn open_output(&self, port_name: &str) -> Result<Box<dyn Output>, Error> {
        let midi_output = midir::MidiOutput::new(&self.client_name)?;
        let port = port::find(&midi_output, port_name)?;

        let conn = midi_output
            .connect(&port, &format!("{} out", self.client_name))
            .map_err(|_| {
                let err = Error::Connection(port_name.into());
                log::error!("{err}");
                err
            })?;

        log::info!("Connected for Output to {}", port_name);

        Ok(Box::new(MidiOut {
            port_name: port_name.into(),
            conn,
        }))
    }

    fn open_input(
        &self,
        port_name: &str,
        mut callback: InputCallback,
    ) -> Result<Box<dyn Input>, Error> {
        let midi_input = midir::MidiInput::new(&self.client_name)?;
        let port = port::find(&midi_input, port_name)?;

        let conn = midi_input
            .connect(
                &port,
                &format!("{} in", self.client_name),
                move |_ts, buf, _| match Msg::try_from(buf) {
                    Ok(msg) => callback(msg),
                    Err(err) => log::trace!("Ignoring inbound: {err}"),
                },
                (),
            )
            .map_err(|_| {
                let err = Error::Connection(port_name.into());
                log::error!("{err}");
                err
            })?;

        log::info!("Connected for Input to {}", port_name);

        Ok(Box::new(MidiIn {
            port_name: port_name.into(),
            conn,
        }))
    }
}

struct MidiOut {
    port_name: Arc<str>,
    conn: midir::MidiOutputConnection,
}

impl Output for MidiOut {
    fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        self.conn.send(&msg.to_bytes())?;

        Ok(())
    }

    fn close(self: Box<Self>) {
        let _ = self.conn.close();
        log::debug!("Disconnected Output from {}", self.port_name);
    }
}

struct MidiIn {
    port_name: Arc<str>,
    conn: midir::MidiInputConnection<()>,
}

impl Input for MidiIn {
    fn close(self: Box<Self>) {
        let _ = self.conn.close();
        log::debug!("Disconnected Input from {}", self.port_name);
    }
}
