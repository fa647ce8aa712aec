//! Pixel formats understood by the framebuffer.
//!
//! Only packed true-colour layouts are supported; there is no palette and no row padding.

use serde::{Deserialize, Serialize};

use crate::error::{FramebufferError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 16 bpp, `RRRRRGGGGGGBBBBB`.
    Rgb565,
    /// 24 bpp packed into 3 bytes per pixel (no 4-byte alignment).
    Rgb888,
    /// 32 bpp with the top byte reported as the transparency channel.
    Xrgb8888,
}

/// Bit position of a colour component within a pixel value.
///
/// A `length` of zero means the component is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub offset: u32,
    pub length: u32,
}

impl Channel {
    const NONE: Self = Self {
        offset: 0,
        length: 0,
    };

    const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    #[inline]
    pub fn is_present(self) -> bool {
        self.length != 0
    }

    /// Mask of the bits this channel occupies within a pixel value.
    pub fn mask(self) -> u32 {
        if self.length == 0 {
            return 0;
        }
        (((1u64 << self.length) - 1) as u32) << self.offset
    }

    /// Scales an 8-bit component down to this channel's width and shifts it into place.
    fn encode(self, component: u8) -> u32 {
        if self.length == 0 {
            return 0;
        }
        let scaled = u32::from(component) >> (8 - self.length.min(8));
        (scaled << self.offset) & self.mask()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    pub transp: Channel,
}

impl ChannelLayout {
    pub fn channels(&self) -> [Channel; 4] {
        [self.red, self.green, self.blue, self.transp]
    }
}

impl PixelFormat {
    pub fn from_bits_per_pixel(bits_per_pixel: u32) -> Result<Self> {
        match bits_per_pixel {
            16 => Ok(Self::Rgb565),
            24 => Ok(Self::Rgb888),
            32 => Ok(Self::Xrgb8888),
            _ => Err(FramebufferError::UnsupportedFormat { bits_per_pixel }),
        }
    }

    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Rgb565 => 16,
            Self::Rgb888 => 24,
            Self::Xrgb8888 => 32,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        self.bits_per_pixel() / 8
    }

    pub fn channel_layout(self) -> ChannelLayout {
        match self {
            Self::Rgb565 => ChannelLayout {
                red: Channel::new(11, 5),
                green: Channel::new(5, 6),
                blue: Channel::new(0, 5),
                transp: Channel::NONE,
            },
            Self::Rgb888 => ChannelLayout {
                red: Channel::new(16, 8),
                green: Channel::new(8, 8),
                blue: Channel::new(0, 8),
                transp: Channel::NONE,
            },
            Self::Xrgb8888 => ChannelLayout {
                red: Channel::new(16, 8),
                green: Channel::new(8, 8),
                blue: Channel::new(0, 8),
                transp: Channel::new(24, 8),
            },
        }
    }

    /// Encodes an 8-bit-per-component colour as a pixel value of this format.
    ///
    /// The transparency byte of [`PixelFormat::Xrgb8888`] is left zero.
    pub fn pack_rgb(self, r: u8, g: u8, b: u8) -> u32 {
        let layout = self.channel_layout();
        layout.red.encode(r) | layout.green.encode(g) | layout.blue.encode(b)
    }
}

/// Returns the number of bytes per pixel for `bits_per_pixel`, or rejects the depth.
pub fn validate(bits_per_pixel: u32) -> Result<u32> {
    PixelFormat::from_bits_per_pixel(bits_per_pixel).map(PixelFormat::bytes_per_pixel)
}

pub fn derive_layout(bits_per_pixel: u32) -> Result<ChannelLayout> {
    PixelFormat::from_bits_per_pixel(bits_per_pixel).map(PixelFormat::channel_layout)
}
