use once_cell::sync::Lazy;
use std::{collections::BTreeMap, fmt, str::FromStr};

use super::{Error, Mode};

/// A button identifier: `0..=15` for the grid, `A` / `B` for the side buttons.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Key {
    Index(u8),
    A,
    B,
}

impl Key {
    pub const GRID_LEN: u8 = 16;

    /// All the buttons, grid first.
    pub fn all() -> impl Iterator<Item = Key> {
        BUTTON_NOTES.iter().map(|&(key, _)| key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(idx) => write!(f, "{idx}"),
            Key::A => f.write_str("A"),
            Key::B => f.write_str("B"),
        }
    }
}

impl TryFrom<u8> for Key {
    type Error = Error;

    fn try_from(idx: u8) -> Result<Self, Error> {
        if idx < Key::GRID_LEN {
            Ok(Key::Index(idx))
        } else {
            Err(Error::UnknownControl(idx.to_string()))
        }
    }
}

impl TryFrom<char> for Key {
    type Error = Error;

    fn try_from(name: char) -> Result<Self, Error> {
        match name {
            'A' | 'a' => Ok(Key::A),
            'B' | 'b' => Ok(Key::B),
            other => Err(Error::UnknownControl(other.to_string())),
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "A" | "a" => Ok(Key::A),
            "B" | "b" => Ok(Key::B),
            other => other
                .parse::<u8>()
                .map_err(|_| Error::UnknownControl(other.to_string()))
                .and_then(Key::try_from),
        }
    }
}

/// A physical control, independent of the device protocol mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Control {
    Button(Key),
    /// Rotary encoder `0..=7`.
    Encoder(u8),
    /// Side slider `Key::A` or `Key::B`.
    Slider(Key),
    /// Pitch wheel channel, only reported in Makie mode.
    Fader(u8),
    /// A note with no button assigned.
    Note(u8),
    /// A controller with no slider or encoder assigned.
    Controller(u8),
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Control::*;
        match self {
            Button(key) => write!(f, "{key}"),
            Encoder(idx) => write!(f, "Knob{}", idx + 1),
            Slider(key) => write!(f, "Slider{key}"),
            Fader(chan) => write!(f, "Fader{chan}"),
            Note(note) => write!(f, "Note{note}"),
            Controller(ctrl) => write!(f, "CC{ctrl}"),
        }
    }
}

pub const ENCODER_LEN: u8 = 8;

// Makie note numbers for the buttons.
static BUTTON_NOTES: [(Key, u8); 18] = [
    (Key::Index(0), 89),
    (Key::Index(1), 90),
    (Key::Index(2), 40),
    (Key::Index(3), 41),
    (Key::Index(4), 42),
    (Key::Index(5), 43),
    (Key::Index(6), 44),
    (Key::Index(7), 45),
    (Key::Index(8), 87),
    (Key::Index(9), 88),
    (Key::Index(10), 91),
    (Key::Index(11), 92),
    (Key::Index(12), 86),
    (Key::Index(13), 93),
    (Key::Index(14), 94),
    (Key::Index(15), 95),
    (Key::A, 84),
    (Key::B, 85),
];

static NOTE_TO_KEY: Lazy<BTreeMap<u8, Key>> =
    Lazy::new(|| BUTTON_NOTES.iter().map(|&(key, note)| (note, key)).collect());

pub mod controller {
    pub const SLIDER_A: u8 = 9;
    pub const SLIDER_B: u8 = 10;

    pub const NATIVE_ENCODER_FIRST: u8 = 1;
    pub const MAKIE_ENCODER_FIRST: u8 = 16;

    pub const RING_FIRST: u8 = 48;
    pub const MODE_SWITCH: u8 = 127;
}

fn encoder_first(mode: Mode) -> u8 {
    match mode {
        Mode::Native => controller::NATIVE_ENCODER_FIRST,
        Mode::Makie => controller::MAKIE_ENCODER_FIRST,
    }
}

/// Returns the raw note or controller number for `control`.
///
/// Buttons always use the Makie note numbers.
pub fn to_raw(control: Control, mode: Mode) -> Result<u8, Error> {
    use Control::*;
    match control {
        Button(key) => BUTTON_NOTES
            .iter()
            .find(|(k, _)| *k == key)
            .map(|&(_, note)| note)
            .ok_or_else(|| Error::UnknownControl(control.to_string())),
        Encoder(idx) if idx < ENCODER_LEN => Ok(encoder_first(mode) + idx),
        Slider(Key::A) => Ok(controller::SLIDER_A),
        Slider(Key::B) => Ok(controller::SLIDER_B),
        Note(raw) | Controller(raw) => Ok(raw),
        _ => Err(Error::UnknownControl(control.to_string())),
    }
}

pub fn from_raw_note(note: u8) -> Option<Key> {
    NOTE_TO_KEY.get(&note).copied()
}

/// Reverse lookup for the controllers sent by the sliders and encoders.
pub fn from_raw_control(mode: Mode, control: u8) -> Option<Control> {
    match control {
        controller::SLIDER_A => Some(Control::Slider(Key::A)),
        controller::SLIDER_B => Some(Control::Slider(Key::B)),
        other => {
            let idx = other.checked_sub(encoder_first(mode))?;
            (idx < ENCODER_LEN).then(|| Control::Encoder(idx))
        }
    }
}

/// The 16 grid buttons followed by the 8 encoders.
pub fn key_names() -> Vec<Control> {
    (0..Key::GRID_LEN)
        .map(|idx| Control::Button(Key::Index(idx)))
        .chain((0..ENCODER_LEN).map(Control::Encoder))
        .collect()
}

/// Display mode for the LED ring around an encoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LedMode {
    #[default]
    Single,
    Trim,
    Fan,
    Spread,
}

impl LedMode {
    pub const ALL: [LedMode; 4] = [LedMode::Single, LedMode::Trim, LedMode::Fan, LedMode::Spread];

    pub fn index(self) -> u8 {
        match self {
            LedMode::Single => 0,
            LedMode::Trim => 1,
            LedMode::Fan => 2,
            LedMode::Spread => 3,
        }
    }
}

pub const RING_LEN: u8 = 11;
pub const RING_VALUE_MAX: u8 = 11;
const RING_CENTER: u8 = 5;

/// Clamps an encoder ring value to `0..=11`.
pub fn clamp_value(value: i32) -> u8 {
    if value < 0 {
        log::warn!("Invalid ring value {value}, setting min");
        0
    } else if value > RING_VALUE_MAX as i32 {
        log::warn!("Invalid ring value {value}, setting max");
        RING_VALUE_MAX
    } else {
        value as u8
    }
}

/// The LEDs lit by the device for `mode` and `value`.
///
/// Bit 0 is the leftmost LED, bit 5 the centre one. Value 0 lights nothing.
pub fn ring_pattern(mode: LedMode, value: u8) -> u16 {
    let value = value.min(RING_VALUE_MAX);
    if value == 0 {
        return 0;
    }

    let pos = value - 1;
    let span = |from: u8, to: u8| -> u16 { (from..=to).fold(0, |mask, bit| mask | 1 << bit) };

    match mode {
        LedMode::Single => 1 << pos,
        LedMode::Trim => span(0, pos),
        LedMode::Fan => span(pos.min(RING_CENTER), pos.max(RING_CENTER)),
        LedMode::Spread => {
            let width = pos.min(RING_CENTER);
            span(RING_CENTER - width, RING_CENTER + width)
        }
    }
}
