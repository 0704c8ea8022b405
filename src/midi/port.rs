use std::sync::Arc;

use super::Error;

/// Port names currently available on the system.
#[derive(Debug, Default)]
pub struct Ports {
    pub ins: Vec<Arc<str>>,
    pub outs: Vec<Arc<str>>,
}

impl Ports {
    /// Lists the MIDI ports, skipping those opened by `client_name`.
    pub fn list(client_name: &str) -> Result<Self, Error> {
        let midi_input = midir::MidiInput::new(&format!("{client_name} list In ports"))?;
        let midi_output = midir::MidiOutput::new(&format!("{client_name} list Out ports"))?;

        Ok(Self {
            ins: names(&midi_input, client_name)?,
            outs: names(&midi_output, client_name)?,
        })
    }

    /// Returns the first (input, output) pair whose names contain `keyword`.
    pub fn find_device(&self, keyword: &str) -> Option<(Arc<str>, Arc<str>)> {
        let input = self.ins.iter().find(|name| name.contains(keyword))?;
        let output = self.outs.iter().find(|name| name.contains(keyword))?;

        Some((input.clone(), output.clone()))
    }
}

fn names<IO: midir::MidiIO>(io: &IO, client_name: &str) -> Result<Vec<Arc<str>>, Error> {
    let mut list = Vec::new();
    for port in io.ports().iter() {
        let name = io.port_name(port)?;
        if !name.starts_with(client_name) {
            list.push(name.into());
        }
    }

    Ok(list)
}

/// Looks up `port_name` by exact name first, then by substring.
pub(super) fn find<IO: midir::MidiIO>(io: &IO, port_name: &str) -> Result<IO::Port, Error> {
    let mut candidate = None;
    for port in io.ports() {
        let name = match io.port_name(&port) {
            Ok(name) => name,
            Err(err) => {
                log::debug!("Skipping port: {err}");
                continue;
            }
        };

        if name == port_name {
            return Ok(port);
        }

        if candidate.is_none() && name.contains(port_name) {
            candidate = Some(port);
        }
    }

    candidate.ok_or_else(|| Error::PortNotFound(port_name.into()))
}
