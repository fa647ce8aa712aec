use crate::buffer::{BufferManager, Mapping};
use crate::config::{FramebufferConfig, DEFAULT_BITS_PER_PIXEL};
use crate::dirty::{DirtyRect, DirtyRegion, DirtyTracker};
use crate::error::{FramebufferError, Result};
use crate::format::PixelFormat;
use crate::geometry::Geometry;
use crate::pages::{translate_page_notifications, PageWriteSink, WriteNotificationSource};

/// A memory-mappable framebuffer with coarse dirty-region tracking.
///
/// Instances are independent; share one between the writer and poller with an `Arc`.
#[derive(Debug)]
pub struct VncFramebuffer {
    name: String,
    buffers: BufferManager,
    dirty: DirtyTracker,
}

impl VncFramebuffer {
    /// Creates an instance with no buffer installed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffers: BufferManager::new(),
            dirty: DirtyTracker::new(),
        }
    }

    /// Creates an instance and installs the configured initial mode.
    ///
    /// An unsupported depth falls back to 32 bpp; any other mode error is returned.
    pub fn from_config(config: &FramebufferConfig) -> Result<Self> {
        let mut bits_per_pixel = config.bits_per_pixel;
        if PixelFormat::from_bits_per_pixel(bits_per_pixel).is_err() {
            tracing::warn!(
                "{}: bpp {bits_per_pixel} unsupported, forcing to {DEFAULT_BITS_PER_PIXEL}",
                config.name
            );
            bits_per_pixel = DEFAULT_BITS_PER_PIXEL;
        }

        let fb = Self::new(config.name.clone());
        let geometry = fb.configure(config.width, config.height, bits_per_pixel)?;
        tracing::info!(
            "{}: registered {}x{}@{}bpp vram={} bytes",
            fb.name,
            geometry.width(),
            geometry.height(),
            geometry.bits_per_pixel(),
            geometry.buffer_size()
        );
        Ok(fb)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Mode set. On failure the installed mode, buffer and mappings are left as they were.
    ///
    /// A pending dirty region is carried over and clipped to the new extent.
    pub fn configure(&self, width: u32, height: u32, bits_per_pixel: u32) -> Result<Geometry> {
        let result = self
            .buffers
            .configure_with(width, height, bits_per_pixel, |geometry| {
                self.dirty.set_bounds(geometry.width(), geometry.height());
            });

        match &result {
            Ok(geometry) => tracing::info!(
                "{}: mode set {}x{}@{}",
                self.name,
                geometry.width(),
                geometry.height(),
                geometry.bits_per_pixel()
            ),
            Err(FramebufferError::AllocationFailed { len }) => tracing::warn!(
                "{}: mode set {width}x{height}@{bits_per_pixel} failed: cannot allocate {len} bytes",
                self.name
            ),
            Err(err) => tracing::warn!(
                "{}: rejected mode {width}x{height}@{bits_per_pixel}: {err}",
                self.name
            ),
        }
        result
    }

    pub fn current_geometry(&self) -> Result<Geometry> {
        self.buffers.current_geometry()
    }

    pub fn map_for_shared_access(&self) -> Result<Mapping> {
        self.buffers.map_for_shared_access()
    }

    pub fn report_changed_pixel_rect(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
        self.dirty.report_changed_pixel_rect(x0, y0, x1, y1)
    }

    /// Atomically reads and clears the accumulated dirty region.
    pub fn take_dirty(&self) -> DirtyRegion {
        self.dirty.take()
    }

    /// Translates written pages against the installed geometry and merges the result.
    ///
    /// Mode sets are held off for the duration, so the pages are never interpreted against a
    /// geometry other than the one the tracker is bounded by. Returns the merged rectangle.
    pub fn deliver_pages(&self, pages: &[u64]) -> Option<DirtyRect> {
        if pages.is_empty() {
            return None;
        }
        self.buffers
            .with_current(|geometry| self.merge_pages(pages, geometry))
            .ok()
            .flatten()
    }

    /// Drains pages written through mappings of the installed buffer into the dirty region.
    ///
    /// Draining and translating happen under one hold of the installed buffer, so a concurrent
    /// mode set cannot pair the drained pages with the next geometry.
    pub fn flush_written_pages(&self) -> Option<DirtyRect> {
        self.buffers
            .drain_written_pages(|geometry, pages| {
                if !pages.is_empty() {
                    tracing::debug!(pages = pages.len(), "{}: writeback batch", self.name);
                }
                self.merge_pages(&pages, geometry)
            })
            .ok()
            .flatten()
    }

    fn merge_pages(&self, pages: &[u64], geometry: &Geometry) -> Option<DirtyRect> {
        translate_page_notifications(pages, geometry).filter(|rect| self.dirty.report(*rect))
    }
}

impl PageWriteSink for VncFramebuffer {
    fn deliver(&self, pages: &[u64]) {
        self.deliver_pages(pages);
    }
}

impl WriteNotificationSource for VncFramebuffer {
    fn take_written_pages(&self) -> Vec<u64> {
        self.buffers.take_written_pages()
    }
}
