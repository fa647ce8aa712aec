#![forbid(unsafe_code)]

//! Resizable, shareable pixel buffer with coarse dirty-rectangle tracking.
//!
//! A [`VncFramebuffer`] owns the installed buffer and the pending dirty region. A consumer maps the
//! buffer ([`Mapping`]) and writes pixels into it; writes are logged per page, translated into pixel
//! rectangles by a writeback pass ([`DeferredWriteback`] or [`VncFramebuffer::flush_written_pages`])
//! and merged into a single bounding box. A poller takes (reads and clears) that box through the
//! [`ControlSurface`] and forwards only the changed pixels downstream.

mod buffer;
mod config;
mod control;
mod device;
mod dirty;
mod error;
mod format;
mod geometry;
mod pages;
mod writeback;

mod sync {
    #[cfg(all(feature = "loom", test))]
    pub(crate) use loom::sync::{Mutex, MutexGuard};
    #[cfg(not(all(feature = "loom", test)))]
    pub(crate) use std::sync::{Mutex, MutexGuard};
}

pub use crate::buffer::{BufferManager, Mapping};
pub use crate::config::{
    ConfigError, FramebufferConfig, DEFAULT_BITS_PER_PIXEL, DEFAULT_HEIGHT, DEFAULT_NAME,
    DEFAULT_WIDTH, DEFAULT_WRITEBACK_DELAY, MAX_NAME_LEN,
};
pub use crate::control::{ControlReply, ControlRequest, ControlSurface, GeometryInfo};
pub use crate::device::VncFramebuffer;
pub use crate::dirty::{DirtyRect, DirtyRegion, DirtyTracker};
pub use crate::error::{FramebufferError, Result};
pub use crate::format::{derive_layout, validate, Channel, ChannelLayout, PixelFormat};
pub use crate::geometry::Geometry;
pub use crate::pages::{
    page_rect, translate_page_notifications, PageWriteSink, WriteNotificationSource, PAGE_SIZE,
};
pub use crate::writeback::DeferredWriteback;
