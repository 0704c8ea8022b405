use std::fmt;

use super::{pitch, Channel, Error, Tag};

/// The subset of MIDI channel messages exchanged with the device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Msg {
    NoteOff {
        chan: Channel,
        note: u8,
        velocity: u8,
    },
    NoteOn {
        chan: Channel,
        note: u8,
        velocity: u8,
    },
    ControlChange {
        chan: Channel,
        control: u8,
        value: u8,
    },
    PitchWheel {
        chan: Channel,
        pitch: i16,
    },
}

impl Msg {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Msg::NoteOn {
            chan: Channel::default(),
            note: note & 0x7f,
            velocity: velocity & 0x7f,
        }
    }

    pub fn note_off(note: u8) -> Self {
        Msg::NoteOff {
            chan: Channel::default(),
            note: note & 0x7f,
            velocity: 0,
        }
    }

    pub fn control_change(control: u8, value: u8) -> Self {
        Msg::ControlChange {
            chan: Channel::default(),
            control: control & 0x7f,
            value: value & 0x7f,
        }
    }

    pub fn pitch_wheel(chan: Channel, pitch: i16) -> Self {
        Msg::PitchWheel { chan, pitch }
    }

    pub fn chan(&self) -> Channel {
        use Msg::*;
        match *self {
            NoteOff { chan, .. }
            | NoteOn { chan, .. }
            | ControlChange { chan, .. }
            | PitchWheel { chan, .. } => chan,
        }
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        use Msg::*;
        match *self {
            NoteOff {
                chan,
                note,
                velocity,
            } => [Tag::NOTE_OFF | chan, note, velocity],
            NoteOn {
                chan,
                note,
                velocity,
            } => [Tag::NOTE_ON | chan, note, velocity],
            ControlChange {
                chan,
                control,
                value,
            } => [Tag::CONTROL_CHANGE | chan, control, value],
            PitchWheel { chan, pitch } => {
                let [lsb, msb] = pitch::to_le(pitch);
                [Tag::PITCH_WHEEL | chan, lsb, msb]
            }
        }
    }
}

impl TryFrom<&[u8]> for Msg {
    type Error = Error;

    fn try_from(buf: &[u8]) -> Result<Self, Error> {
        let (&tag_chan, data) = buf
            .split_first()
            .ok_or_else(|| Error::UnsupportedMsg(buf.into()))?;
        let chan = Channel::from_tag_chan(tag_chan);

        let msg = match (Tag::from_tag_chan(tag_chan), data) {
            (Tag::NOTE_OFF, &[note, velocity]) => Msg::NoteOff {
                chan,
                note,
                velocity,
            },
            (Tag::NOTE_ON, &[note, velocity]) => Msg::NoteOn {
                chan,
                note,
                velocity,
            },
            (Tag::CONTROL_CHANGE, &[control, value]) => Msg::ControlChange {
                chan,
                control,
                value,
            },
            (Tag::PITCH_WHEEL, lsb_msb) if lsb_msb.len() == 2 => Msg::PitchWheel {
                chan,
                pitch: pitch::from_le(lsb_msb)?,
            },
            _ => return Err(Error::UnsupportedMsg(buf.into())),
        };

        Ok(msg)
    }
}

impl fmt::Display for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Msg::*;
        match *self {
            NoteOff {
                chan,
                note,
                velocity,
            } => write!(
                f,
                "note_off channel={} note={note} velocity={velocity}",
                u8::from(chan)
            ),
            NoteOn {
                chan,
                note,
                velocity,
            } => write!(
                f,
                "note_on channel={} note={note} velocity={velocity}",
                u8::from(chan)
            ),
            ControlChange {
                chan,
                control,
                value,
            } => write!(
                f,
                "control_change channel={} control={control} value={value}",
                u8::from(chan)
            ),
            PitchWheel { chan, pitch } => {
                write!(f, "pitchwheel channel={} pitch={pitch}", u8::from(chan))
            }
        }
    }
}
