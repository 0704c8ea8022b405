//! Driver for the Behringer X-Touch Mini control surface.
//!
//! The device is driven in Makie (Mackie Control compatible) mode. Button,
//! encoder, slider & fader activity is reported as [`Event`]s to a
//! registered [`EventSink`], while the button LEDs and encoder rings are
//! controlled through [`XTouchMini`].

pub mod ctrl_surf;
pub use ctrl_surf::{Control, Error, Event, EventSink, Key, LedMode, Mode, Settings, XTouchMini};

pub mod midi;

/// Identifier used for e.g. the midi client & port names.
pub const APPLICATION_NAME: &str = "xtouch-mini";
