//! Translation of page-granular write notifications into pixel rectangles.

use crate::dirty::DirtyRect;
use crate::error::{FramebufferError, Result};
use crate::geometry::Geometry;

/// Granularity of write notifications, in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// Pull side of write notification: something that knows which pages were written.
pub trait WriteNotificationSource: Send + Sync {
    /// Returns the byte offsets of pages written since the previous call.
    fn take_written_pages(&self) -> Vec<u64>;
}

/// Push side of write notification: something that accepts batches of written pages.
pub trait PageWriteSink: Send + Sync {
    fn deliver(&self, pages: &[u64]);
}

/// Pixel rectangle covered by the page starting at `offset`.
///
/// The page is aligned down to [`PAGE_SIZE`] and clipped to the end of the buffer. A page that
/// stays within one row covers only the columns it spans; a page crossing a row boundary covers
/// every column of the rows it touches.
pub fn page_rect(offset: u64, geometry: &Geometry) -> Result<DirtyRect> {
    let buffer_size = geometry.buffer_size();
    let start = offset & !(PAGE_SIZE - 1);
    if start >= buffer_size {
        return Err(FramebufferError::OutOfRangeNotification {
            offset,
            buffer_size,
        });
    }
    let last = start.saturating_add(PAGE_SIZE).min(buffer_size) - 1;

    let out_of_range = FramebufferError::OutOfRangeNotification {
        offset,
        buffer_size,
    };
    let (first_x, first_y) = geometry.pixel_at(start).ok_or(out_of_range.clone())?;
    let (last_x, last_y) = geometry.pixel_at(last).ok_or(out_of_range)?;

    if first_y == last_y {
        Ok(DirtyRect::new(first_x, first_y, last_x + 1, first_y + 1))
    } else {
        Ok(DirtyRect::new(0, first_y, geometry.width(), last_y + 1))
    }
}

/// Bounding rectangle of every page in `pages`, skipping pages past the end of the buffer.
///
/// Returns `None` when no page falls inside the buffer.
pub fn translate_page_notifications(pages: &[u64], geometry: &Geometry) -> Option<DirtyRect> {
    let mut bounds: Option<DirtyRect> = None;
    for &offset in pages {
        match page_rect(offset, geometry) {
            Ok(rect) => {
                bounds = Some(match bounds {
                    Some(b) => b.union(&rect),
                    None => rect,
                });
            }
            Err(err) => {
                // Stale notification racing a mode set that shrank the buffer.
                tracing::trace!("dropping write notification: {err}");
            }
        }
    }
    bounds
}
