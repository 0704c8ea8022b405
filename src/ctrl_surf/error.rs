use std::{sync::Arc, time::Duration};

use crate::midi;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Device {port} unavailable: {source}")]
    DeviceUnavailable {
        port: Arc<str>,
        #[source]
        source: midi::Error,
    },

    #[error("Unknown control {}", .0)]
    UnknownControl(String),

    #[error("Listener did not stop within {:?}", .0)]
    ShutdownTimeout(Duration),

    #[error("Device session closed")]
    Closed,

    #[error("Couldn't spawn the listener thread")]
    Spawn(#[from] std::io::Error),
}
