//! Translation between device messages and logical controls.
//!
//! Buttons are reported with the Makie note numbers in both modes. Notes and
//! controllers with no logical counterpart are reported as [`Control::Note`]
//! and [`Control::Controller`].

use super::{
    control::{self, controller, Control, Key, LedMode},
    event::state,
    Error, Mode,
};
use crate::midi::Msg;

mod velocity {
    pub const OFF: u8 = 0;
    pub const BLINK: u8 = 1;
    pub const ON: u8 = 127;
}

const ENCODER_DECREMENT_THRSD: u8 = 64;

/// Decodes an inbound message into a logical control and its state.
///
/// Returns `None` for the pitch wheel in native mode.
pub fn decode(mode: Mode, msg: &Msg) -> Option<(Control, i16)> {
    let decoded = match (*msg, mode) {
        (Msg::NoteOn { note, velocity, .. }, _) => {
            let state = match mode {
                Mode::Native => state::PRESSED,
                Mode::Makie if velocity == velocity::ON => state::PRESSED,
                Mode::Makie => state::RELEASED,
            };

            Some((note_control(note), state))
        }
        (Msg::NoteOff { note, .. }, _) => Some((note_control(note), state::RELEASED)),
        (Msg::ControlChange { control, value, .. }, _) => {
            let ctrl = control::from_raw_control(mode, control)
                .unwrap_or(Control::Controller(control));
            let state = match ctrl {
                Control::Slider(_) => value as i16,
                _ if value > ENCODER_DECREMENT_THRSD => state::DECREMENT,
                _ => state::INCREMENT,
            };

            Some((ctrl, state))
        }
        (Msg::PitchWheel { chan, pitch }, Mode::Makie) => {
            Some((Control::Fader(chan.into()), pitch))
        }
        (Msg::PitchWheel { .. }, Mode::Native) => None,
    };

    if decoded.is_none() {
        log::trace!("No control for {msg} in {mode:?} mode");
    }

    decoded
}

fn note_control(note: u8) -> Control {
    control::from_raw_note(note)
        .map(Control::Button)
        .unwrap_or(Control::Note(note))
}

/// Builds the message setting the LED of button `key`.
///
/// `blink` only applies when `on` is set.
pub fn encode_key(key: Key, on: bool, blink: bool) -> Result<Msg, Error> {
    let velocity = match (on, blink) {
        (false, _) => velocity::OFF,
        (true, false) => velocity::ON,
        (true, true) => velocity::BLINK,
    };

    let note = control::to_raw(Control::Button(key), Mode::Makie)?;

    Ok(Msg::note_on(note, velocity))
}

/// Builds the message displaying `value` on the ring of `encoder`.
///
/// `value` is clamped to `0..=11`. Returns `None` if `encoder` is out of `0..=7`.
pub fn encode_control(encoder: u8, value: i32, led_mode: LedMode) -> Option<Msg> {
    if encoder >= control::ENCODER_LEN {
        log::warn!("Invalid encoder {encoder}");
        return None;
    }

    let value = led_mode.index() * 16 + control::clamp_value(value);

    Some(Msg::control_change(controller::RING_FIRST + encoder, value))
}

/// Builds the message switching the device to Makie mode (`true`) or native mode.
pub fn encode_mode_switch(makie: bool) -> Msg {
    Msg::control_change(controller::MODE_SWITCH, makie as u8)
}
