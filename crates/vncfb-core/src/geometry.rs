use crate::error::{FramebufferError, Result};
use crate::format::{ChannelLayout, PixelFormat};

/// Shape of an installed pixel buffer.
///
/// Rows are tightly packed: `stride == width * bytes_per_pixel`. A `Geometry` is immutable; a mode
/// set installs a new one together with a new buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: u32,
}

impl Geometry {
    /// Validates a requested mode.
    ///
    /// The depth is checked first, then the dimensions. A row that does not fit a `u32` stride is
    /// reported as [`FramebufferError::InvalidGeometry`].
    pub fn new(width: u32, height: u32, bits_per_pixel: u32) -> Result<Self> {
        let format = PixelFormat::from_bits_per_pixel(bits_per_pixel)?;
        if width == 0 || height == 0 {
            return Err(FramebufferError::InvalidGeometry { width, height });
        }
        let stride = width
            .checked_mul(format.bytes_per_pixel())
            .ok_or(FramebufferError::InvalidGeometry { width, height })?;

        Ok(Self {
            width,
            height,
            format,
            stride,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn bits_per_pixel(&self) -> u32 {
        self.format.bits_per_pixel()
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn buffer_size(&self) -> u64 {
        u64::from(self.stride) * u64::from(self.height)
    }

    pub fn channel_layout(&self) -> ChannelLayout {
        self.format.channel_layout()
    }

    /// Byte offset of pixel `(x, y)`, or `None` if it lies outside the buffer.
    pub fn offset_of(&self, x: u32, y: u32) -> Option<u64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(u64::from(y) * u64::from(self.stride) + u64::from(x) * u64::from(self.bytes_per_pixel()))
    }

    /// Pixel containing byte `offset`, or `None` past the last row.
    pub fn pixel_at(&self, offset: u64) -> Option<(u32, u32)> {
        let stride = u64::from(self.stride);
        let y = offset / stride;
        if y >= u64::from(self.height) {
            return None;
        }
        let x = (offset % stride) / u64::from(self.bytes_per_pixel());
        // Both quotients are bounded by `height` and `width` respectively.
        Some((x as u32, y as u32))
    }
}
