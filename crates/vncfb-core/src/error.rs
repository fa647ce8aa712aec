use thiserror::Error;

pub type Result<T> = std::result::Result<T, FramebufferError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramebufferError {
    #[error("unsupported pixel depth {bits_per_pixel} bpp (supported: 16, 24, 32)")]
    UnsupportedFormat { bits_per_pixel: u32 },

    #[error("invalid framebuffer geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("out of memory allocating {len} bytes of pixel memory")]
    AllocationFailed { len: u64 },

    #[error("framebuffer is not configured")]
    NotConfigured,

    /// A write notification referenced memory past the end of the installed buffer.
    ///
    /// This is expected when notifications race a mode set that shrank the buffer; callers drop it.
    #[error("write notification at offset 0x{offset:x} is outside the {buffer_size}-byte buffer")]
    OutOfRangeNotification { offset: u64, buffer_size: u64 },

    #[error("pixel access out of range: offset=0x{offset:x} len={len} size=0x{size:x}")]
    AccessOutOfRange { offset: u64, len: usize, size: u64 },

    #[error("image is {actual} bytes, expected {expected} for the target rectangle")]
    ImageSizeMismatch { expected: u64, actual: usize },
}
