use std::{fmt, sync::Arc};

use super::Control;

pub mod state {
    pub const RELEASED: i16 = 0;
    pub const PRESSED: i16 = 1;
    pub const DECREMENT: i16 = 2;
    pub const INCREMENT: i16 = 3;
}

/// A device event, as delivered to the [`EventSink`].
///
/// `state` depends on the control:
///
/// - buttons: [`state::RELEASED`] or [`state::PRESSED`].
/// - encoders and unassigned controllers: [`state::DECREMENT`] or [`state::INCREMENT`].
/// - unassigned notes: same as buttons.
/// - sliders: the absolute position `0..=127`.
/// - faders: the signed pitch wheel value.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub key: Control,
    pub state: i16,
    /// Id of the device which emitted the event.
    pub deck: Arc<str>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: key {} state {}", self.deck, self.key, self.state)
    }
}

/// Receives the device events.
///
/// Invoked synchronously from the MIDI transport thread: implementations
/// must not block.
pub trait EventSink: Send + 'static {
    fn on_event(&mut self, event: Event);
}

impl<F> EventSink for F
where
    F: FnMut(Event) + Send + 'static,
{
    fn on_event(&mut self, event: Event) {
        self(event)
    }
}
