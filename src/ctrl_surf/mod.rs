pub mod control;
pub use control::{Control, Key, LedMode};

pub mod device;
pub use device::{Settings, XTouchMini};

pub mod error;
pub use error::Error;

pub mod event;
pub use event::{Event, EventSink};

pub mod protocol;

/// Firmware operating mode of the device.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Native,
    /// Mackie Control compatible mode.
    Makie,
}

impl Mode {
    pub fn is_makie(self) -> bool {
        matches!(self, Mode::Makie)
    }

    fn from_makie(makie: bool) -> Self {
        if makie {
            Mode::Makie
        } else {
            Mode::Native
        }
    }
}
