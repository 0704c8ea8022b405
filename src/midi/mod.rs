mod error;
pub use error::Error;

mod io;
pub use io::Midir;

#[cfg(test)]
pub(crate) mod mock;

pub mod msg;
pub use msg::Msg;

pub mod port;

pub mod transport;
pub use transport::{Input, Output, Transport};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tag(u8);

impl Tag {
    pub const NOTE_OFF: Tag = Tag::from_tag_chan(0x80);
    pub const NOTE_ON: Tag = Tag::from_tag_chan(0x90);
    pub const CONTROL_CHANGE: Tag = Tag::from_tag_chan(0xb0);
    pub const PITCH_WHEEL: Tag = Tag::from_tag_chan(0xe0);

    pub const fn from_tag_chan(byte: u8) -> Self {
        Self(byte & 0xf0)
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag.0
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const fn from_tag_chan(byte: u8) -> Self {
        Self(byte & 0x0f)
    }

    pub const fn new(chan: u8) -> Self {
        Self(chan & 0x0f)
    }
}

impl From<Channel> for u8 {
    fn from(chan: Channel) -> u8 {
        chan.0
    }
}

impl std::ops::BitOr<Channel> for Tag {
    type Output = u8;

    fn bitor(self, chan: Channel) -> Self::Output {
        self.0 | chan.0
    }
}

/// Centered 14 bits values, as used by the pitch wheel.
pub mod pitch {
    use super::Error;

    pub const MIN: i16 = -8192;
    pub const MAX: i16 = 8191;
    const CENTER: i16 = 8192;

    #[inline]
    pub fn from_le(buf: &[u8]) -> Result<i16, Error> {
        match *buf {
            [lsb, msb] if lsb <= 0x7f && msb <= 0x7f => {
                Ok((lsb as i16 | ((msb as i16) << 7)) - CENTER)
            }
            _ => Err(Error::InvalidPitch(buf.into())),
        }
    }

    #[inline]
    pub fn to_le(pitch: i16) -> [u8; 2] {
        let raw = (pitch.clamp(MIN, MAX) + CENTER) as u16;

        [raw as u8 & 0x7f, (raw >> 7) as u8 & 0x7f]
    }

}
