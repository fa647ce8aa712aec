//! Pixel memory and its atomic replacement on mode sets.
//!
//! The installed buffer and its [`Geometry`] live together in one reference-counted [`Surface`], so
//! a reader can never pair a stride with the wrong allocation. A mode set allocates the new surface
//! outside the lock and only swaps the pointer under it; the previous surface is freed once the last
//! [`Mapping`] referencing it goes away.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dirty::DirtyRect;
use crate::error::{FramebufferError, Result};
use crate::geometry::Geometry;
use crate::pages::{WriteNotificationSource, PAGE_SIZE};

fn alloc_zeroed<T>(len: usize, zero: impl FnMut() -> T) -> Option<Box<[T]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize_with(len, zero);
    Some(buf.into_boxed_slice())
}

/// One installed buffer: geometry, pixel bytes and the pages written since the last drain.
pub(crate) struct Surface {
    geometry: Geometry,
    generation: u64,
    bytes: Box<[AtomicU8]>,
    /// One bit per [`PAGE_SIZE`] page of `bytes`.
    written_pages: Box<[AtomicU64]>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("geometry", &self.geometry)
            .field("generation", &self.generation)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl Surface {
    fn allocate(geometry: Geometry, generation: u64) -> Result<Self> {
        let len = geometry.buffer_size();
        let alloc_failed = FramebufferError::AllocationFailed { len };

        let byte_len = usize::try_from(len).map_err(|_| alloc_failed.clone())?;
        let bytes = alloc_zeroed(byte_len, || AtomicU8::new(0)).ok_or(alloc_failed.clone())?;

        let page_count = len.div_ceil(PAGE_SIZE);
        let word_count = usize::try_from(page_count.div_ceil(64)).map_err(|_| alloc_failed.clone())?;
        let written_pages = alloc_zeroed(word_count, || AtomicU64::new(0)).ok_or(alloc_failed)?;

        Ok(Self {
            geometry,
            generation,
            bytes,
            written_pages,
        })
    }

    #[inline]
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn range(&self, offset: u64, len: usize) -> Result<std::ops::Range<usize>> {
        let size = self.len();
        let out_of_range = FramebufferError::AccessOutOfRange { offset, len, size };
        let end = offset.checked_add(len as u64).ok_or(out_of_range.clone())?;
        if end > size {
            return Err(out_of_range);
        }
        // `end <= size`, and `size` came from a `usize` length.
        Ok(offset as usize..end as usize)
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        let range = self.range(offset, dst.len())?;
        for (slot, byte) in dst.iter_mut().zip(&self.bytes[range]) {
            *slot = byte.load(Ordering::Relaxed);
        }
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        let range = self.range(offset, src.len())?;
        for (byte, value) in self.bytes[range.clone()].iter().zip(src) {
            byte.store(*value, Ordering::Relaxed);
        }
        self.mark_written(range);
        Ok(())
    }

    fn mark_written(&self, range: std::ops::Range<usize>) {
        if range.is_empty() {
            return;
        }
        let page_size = PAGE_SIZE as usize;
        let first = range.start / page_size;
        let last = (range.end - 1) / page_size;
        for page in first..=last {
            self.written_pages[page / 64].fetch_or(1u64 << (page % 64), Ordering::Release);
        }
    }

    fn take_written_pages(&self) -> Vec<u64> {
        let mut pages = Vec::new();
        for (word_index, word) in self.written_pages.iter().enumerate() {
            let mut bits = word.swap(0, Ordering::Acquire);
            while bits != 0 {
                let bit = bits.trailing_zeros() as u64;
                bits &= bits - 1;
                pages.push((word_index as u64 * 64 + bit) * PAGE_SIZE);
            }
        }
        pages
    }
}

/// Owner of the installed pixel buffer.
#[derive(Debug)]
pub struct BufferManager {
    current: RwLock<Option<Arc<Surface>>>,
    /// Generation of the installed surface; `0` while unconfigured. Shared with every [`Mapping`].
    installed_generation: Arc<AtomicU64>,
    /// Serializes mode sets. Readers never take it.
    configure_lock: Mutex<()>,
}

impl Default for BufferManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferManager {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            installed_generation: Arc::new(AtomicU64::new(0)),
            configure_lock: Mutex::new(()),
        }
    }

    fn read_current(&self) -> RwLockReadGuard<'_, Option<Arc<Surface>>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_current(&self) -> RwLockWriteGuard<'_, Option<Arc<Surface>>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn configure(&self, width: u32, height: u32, bits_per_pixel: u32) -> Result<Geometry> {
        self.configure_with(width, height, bits_per_pixel, |_| {})
    }

    /// Allocates and installs a new zeroed buffer.
    ///
    /// `on_install` runs while the new surface is being installed, before any reader can observe
    /// it; it is used to move state that must change together with the geometry. On error nothing
    /// is installed and `on_install` is not called.
    pub fn configure_with(
        &self,
        width: u32,
        height: u32,
        bits_per_pixel: u32,
        on_install: impl FnOnce(&Geometry),
    ) -> Result<Geometry> {
        let _serialized = self
            .configure_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let geometry = Geometry::new(width, height, bits_per_pixel)?;
        let generation = self.installed_generation.load(Ordering::Acquire) + 1;
        let surface = Arc::new(Surface::allocate(geometry, generation)?);

        let previous = {
            let mut current = self.write_current();
            on_install(&geometry);
            self.installed_generation
                .store(generation, Ordering::Release);
            current.replace(surface)
        };
        // Freed here unless a mapping still holds it.
        drop(previous);

        Ok(geometry)
    }

    pub fn current_geometry(&self) -> Result<Geometry> {
        self.with_current(|geometry| *geometry)
    }

    /// Generation of the installed buffer; bumped by every successful mode set.
    pub fn generation(&self) -> u64 {
        self.installed_generation.load(Ordering::Acquire)
    }

    /// Runs `f` against the installed geometry while holding off mode sets.
    pub fn with_current<R>(&self, f: impl FnOnce(&Geometry) -> R) -> Result<R> {
        let current = self.read_current();
        let surface = current.as_ref().ok_or(FramebufferError::NotConfigured)?;
        Ok(f(&surface.geometry))
    }

    /// Drains the installed buffer's written pages and hands them to `f` together with the
    /// geometry they were written against. Mode sets are held off until `f` returns.
    pub fn drain_written_pages<R>(&self, f: impl FnOnce(&Geometry, Vec<u64>) -> R) -> Result<R> {
        let current = self.read_current();
        let surface = current.as_ref().ok_or(FramebufferError::NotConfigured)?;
        Ok(f(&surface.geometry, surface.take_written_pages()))
    }

    pub fn map_for_shared_access(&self) -> Result<Mapping> {
        let current = self.read_current();
        let surface = current.as_ref().ok_or(FramebufferError::NotConfigured)?;
        Ok(Mapping {
            surface: surface.clone(),
            installed_generation: self.installed_generation.clone(),
        })
    }
}

impl WriteNotificationSource for BufferManager {
    fn take_written_pages(&self) -> Vec<u64> {
        match self.read_current().as_ref() {
            Some(surface) => surface.take_written_pages(),
            None => Vec::new(),
        }
    }
}

/// Read/write view of one installed buffer.
///
/// The view keeps its buffer alive, so it stays memory-safe after a mode set; it just stops being
/// displayed. Check [`Mapping::is_stale`] and remap after a mode change. Writes are not
/// synchronized with other writers or with the poller; every write records the touched pages for
/// the writeback path.
#[derive(Debug, Clone)]
pub struct Mapping {
    surface: Arc<Surface>,
    installed_generation: Arc<AtomicU64>,
}

impl Mapping {
    pub fn geometry(&self) -> Geometry {
        self.surface.geometry
    }

    /// Number of mapped bytes; always `geometry().buffer_size()`.
    pub fn len(&self) -> u64 {
        self.surface.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surface.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.surface.generation
    }

    /// Whether a newer buffer has been installed since this mapping was created.
    pub fn is_stale(&self) -> bool {
        self.installed_generation.load(Ordering::Acquire) != self.surface.generation
    }

    pub fn read(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        self.surface.read(offset, dst)
    }

    pub fn write(&self, offset: u64, src: &[u8]) -> Result<()> {
        self.surface.write(offset, src)
    }

    fn pixel_offset(&self, x: u32, y: u32) -> Result<u64> {
        let geometry = self.geometry();
        geometry
            .offset_of(x, y)
            .ok_or(FramebufferError::AccessOutOfRange {
                offset: u64::from(y) * u64::from(geometry.stride())
                    + u64::from(x) * u64::from(geometry.bytes_per_pixel()),
                len: geometry.bytes_per_pixel() as usize,
                size: geometry.buffer_size(),
            })
    }

    /// Reads the little-endian pixel value at `(x, y)`.
    pub fn read_pixel(&self, x: u32, y: u32) -> Result<u32> {
        let offset = self.pixel_offset(x, y)?;
        let bpp = self.geometry().bytes_per_pixel() as usize;
        let mut raw = [0u8; 4];
        self.read(offset, &mut raw[..bpp])?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Stores `pixel` at `(x, y)`; bits above the pixel depth are discarded.
    pub fn write_pixel(&self, x: u32, y: u32, pixel: u32) -> Result<()> {
        let offset = self.pixel_offset(x, y)?;
        let bpp = self.geometry().bytes_per_pixel() as usize;
        self.write(offset, &pixel.to_le_bytes()[..bpp])
    }

    /// Fills `rect` (clipped to the buffer) with `pixel`. Returns the area actually filled.
    pub fn fill_rect(&self, rect: DirtyRect, pixel: u32) -> Result<Option<DirtyRect>> {
        let geometry = self.geometry();
        let Some(rect) = rect.clamp_to(geometry.width(), geometry.height()) else {
            return Ok(None);
        };

        let bpp = geometry.bytes_per_pixel() as usize;
        let encoded = pixel.to_le_bytes();
        let row: Vec<u8> = (0..rect.width() as usize)
            .flat_map(|_| encoded[..bpp].iter().copied())
            .collect();

        for y in rect.y0..rect.y1 {
            self.write(self.pixel_offset(rect.x0, y)?, &row)?;
        }
        Ok(Some(rect))
    }

    /// Moves the pixels of `src` so that its top-left corner lands on `(dst_x, dst_y)`.
    ///
    /// Source and destination may overlap. Both are clipped to the buffer. Returns the destination
    /// area actually written; only its pages are recorded as written.
    pub fn copy_area(&self, src: DirtyRect, dst_x: u32, dst_y: u32) -> Result<Option<DirtyRect>> {
        let geometry = self.geometry();
        let (width, height) = (geometry.width(), geometry.height());
        let Some(src) = src.clamp_to(width, height) else {
            return Ok(None);
        };
        let Some(dst) = DirtyRect::from_origin_size(dst_x, dst_y, src.width(), src.height())
            .clamp_to(width, height)
        else {
            return Ok(None);
        };

        let mut row = vec![0u8; dst.width() as usize * geometry.bytes_per_pixel() as usize];
        let mut copy_row = |dy: u32| -> Result<()> {
            self.read(self.pixel_offset(src.x0, src.y0 + dy)?, &mut row)?;
            self.write(self.pixel_offset(dst.x0, dst.y0 + dy)?, &row)
        };
        // Moving down walks bottom-up so overlapping source rows are read before being overwritten.
        if dst.y0 > src.y0 {
            for dy in (0..dst.height()).rev() {
                copy_row(dy)?;
            }
        } else {
            for dy in 0..dst.height() {
                copy_row(dy)?;
            }
        }
        Ok(Some(dst))
    }

    /// Writes `image`, packed rows of `rect.width()` pixels in the buffer's format, into `rect`.
    ///
    /// Parts of `rect` outside the buffer are skipped. Returns the area actually written.
    pub fn blit(&self, rect: DirtyRect, image: &[u8]) -> Result<Option<DirtyRect>> {
        let geometry = self.geometry();
        let bpp = geometry.bytes_per_pixel() as usize;
        let expected = rect.area() * bpp as u64;
        if image.len() as u64 != expected {
            return Err(FramebufferError::ImageSizeMismatch {
                expected,
                actual: image.len(),
            });
        }
        let Some(visible) = rect.clamp_to(geometry.width(), geometry.height()) else {
            return Ok(None);
        };

        let image_stride = rect.width() as usize * bpp;
        let skip = (visible.x0 - rect.x0) as usize * bpp;
        let row_len = visible.width() as usize * bpp;
        for y in visible.y0..visible.y1 {
            let start = (y - rect.y0) as usize * image_stride + skip;
            self.write(self.pixel_offset(visible.x0, y)?, &image[start..start + row_len])?;
        }
        Ok(Some(visible))
    }

    /// Packed copy of the pixels in `rect`, row by row, without stride padding.
    pub fn copy_rect(&self, rect: DirtyRect) -> Result<Vec<u8>> {
        let geometry = self.geometry();
        if rect.is_empty() {
            return Ok(Vec::new());
        }
        if rect.x1 > geometry.width() || rect.y1 > geometry.height() {
            return Err(FramebufferError::AccessOutOfRange {
                offset: u64::from(rect.y0) * u64::from(geometry.stride()),
                len: rect.area() as usize * geometry.bytes_per_pixel() as usize,
                size: geometry.buffer_size(),
            });
        }

        let row_len = rect.width() as usize * geometry.bytes_per_pixel() as usize;
        let mut out = vec![0u8; row_len * rect.height() as usize];
        for (row, y) in out.chunks_exact_mut(row_len).zip(rect.y0..rect.y1) {
            self.read(self.pixel_offset(rect.x0, y)?, row)?;
        }
        Ok(out)
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.surface
            .bytes
            .iter()
            .map(|byte| byte.load(Ordering::Relaxed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn unconfigured_manager_rejects_queries() {
        let manager = BufferManager::new();
        assert_eq!(manager.current_geometry(), Err(FramebufferError::NotConfigured));
        assert_eq!(
            manager.map_for_shared_access().unwrap_err(),
            FramebufferError::NotConfigured
        );
        assert!(manager.take_written_pages().is_empty());
        assert_eq!(manager.generation(), 0);
    }

    #[test]
    fn configure_allocates_a_zeroed_buffer_of_exact_size() {
        let manager = BufferManager::new();
        for (w, h, bpp) in [(1024, 768, 32), (641, 3, 24), (7, 5, 16)] {
            let geometry = manager.configure(w, h, bpp).unwrap();
            let mapping = manager.map_for_shared_access().unwrap();
            let expected = u64::from(w) * u64::from(bpp / 8) * u64::from(h);
            assert_eq!(geometry.buffer_size(), expected);
            assert_eq!(mapping.len(), expected);
            assert!(mapping.snapshot().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn failed_configure_keeps_previous_state() {
        let manager = BufferManager::new();
        let before = manager.configure(640, 480, 16).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();
        mapping.write(0, &[0xAB]).unwrap();

        assert_eq!(
            manager.configure(640, 480, 17),
            Err(FramebufferError::UnsupportedFormat { bits_per_pixel: 17 })
        );
        assert_eq!(
            manager.configure(0, 480, 16),
            Err(FramebufferError::InvalidGeometry {
                width: 0,
                height: 480
            })
        );

        assert_eq!(manager.current_geometry(), Ok(before));
        assert_eq!(manager.generation(), 1);
        assert!(!mapping.is_stale());
        let mut byte = [0u8];
        manager.map_for_shared_access().unwrap().read(0, &mut byte).unwrap();
        assert_eq!(byte, [0xAB]);
    }

    #[test]
    fn allocation_failure_is_reported_and_leaves_state_untouched() {
        let manager = BufferManager::new();
        let before = manager.configure(64, 64, 32).unwrap();

        // ~2^64 bytes: fails `try_reserve_exact` immediately without touching memory.
        let err = manager.configure(0x3FFF_FFFF, u32::MAX, 32).unwrap_err();
        assert!(matches!(err, FramebufferError::AllocationFailed { .. }), "{err:?}");
        assert_eq!(manager.current_geometry(), Ok(before));
    }

    #[test]
    fn on_install_is_skipped_on_failure() {
        let manager = BufferManager::new();
        let mut installed = None;
        manager
            .configure_with(8, 8, 24, |g| installed = Some(*g))
            .unwrap();
        assert_eq!(installed.map(|g| g.stride()), Some(24));

        let mut called = false;
        let _ = manager.configure_with(8, 8, 8, |_| called = true);
        assert!(!called);
    }

    #[test]
    fn stale_mapping_keeps_the_old_buffer_alive() {
        let manager = BufferManager::new();
        manager.configure(1024, 768, 32).unwrap();
        let old = manager.map_for_shared_access().unwrap();
        old.write_pixel(1023, 767, 0x00FF_00FF).unwrap();

        manager.configure(640, 480, 16).unwrap();
        assert!(old.is_stale());
        assert_eq!(old.geometry().width(), 1024);
        assert_eq!(old.read_pixel(1023, 767).unwrap(), 0x00FF_00FF);

        let new = manager.map_for_shared_access().unwrap();
        assert!(!new.is_stale());
        assert_eq!(new.len(), 640 * 2 * 480);
        assert_eq!(new.generation(), old.generation() + 1);
    }

    #[test]
    fn writes_are_recorded_per_page_and_drained_once() {
        let manager = BufferManager::new();
        manager.configure(1024, 768, 32).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();

        mapping.write(8192 + 10, &[1, 2, 3]).unwrap();
        // Straddles pages 3 and 4.
        mapping.write(4 * 4096 - 2, &[4, 5, 6, 7]).unwrap();
        mapping.write(8192, &[9]).unwrap();

        assert_eq!(manager.take_written_pages(), vec![8192, 3 * 4096, 4 * 4096]);
        assert!(manager.take_written_pages().is_empty());
    }

    #[test]
    fn drained_pages_come_with_the_geometry_they_were_written_against() {
        let manager = BufferManager::new();
        assert_eq!(
            manager.drain_written_pages(|_, pages| pages),
            Err(FramebufferError::NotConfigured)
        );

        manager.configure(1024, 8, 32).unwrap();
        manager.map_for_shared_access().unwrap().write_pixel(0, 7, 1).unwrap();
        let (geometry, pages) = manager
            .drain_written_pages(|geometry, pages| (*geometry, pages))
            .unwrap();
        assert_eq!((geometry.width(), geometry.height()), (1024, 8));
        assert_eq!(pages, vec![7 * 4096]);
        assert_eq!(manager.drain_written_pages(|_, pages| pages), Ok(Vec::new()));
    }

    #[test]
    fn copy_area_moves_overlapping_rows_within_one_line() {
        let manager = BufferManager::new();
        manager.configure(8, 1, 16).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();
        for x in 0..8 {
            mapping.write_pixel(x, 0, x + 1).unwrap();
        }

        // Shift right by two inside the same row, then clip at the right edge.
        let moved = mapping.copy_area(DirtyRect::new(0, 0, 8, 1), 2, 0).unwrap();
        assert_eq!(moved, Some(DirtyRect::new(2, 0, 8, 1)));
        let row: Vec<u32> = (0..8).map(|x| mapping.read_pixel(x, 0).unwrap()).collect();
        assert_eq!(row, vec![1, 2, 1, 2, 3, 4, 5, 6]);

        assert_eq!(mapping.copy_area(DirtyRect::new(0, 0, 1, 1), 8, 0).unwrap(), None);
    }

    #[test]
    fn blit_rejects_images_of_the_wrong_size() {
        let manager = BufferManager::new();
        manager.configure(4, 4, 24).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();

        assert_eq!(
            mapping.blit(DirtyRect::new(0, 0, 2, 2), &[0; 11]),
            Err(FramebufferError::ImageSizeMismatch {
                expected: 12,
                actual: 11
            })
        );
        assert!(manager.take_written_pages().is_empty());
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let manager = BufferManager::new();
        manager.configure(4, 4, 16).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();

        assert!(matches!(
            mapping.write(31, &[0, 0]),
            Err(FramebufferError::AccessOutOfRange { .. })
        ));
        assert!(matches!(
            mapping.read_pixel(4, 0),
            Err(FramebufferError::AccessOutOfRange { .. })
        ));
        assert!(matches!(
            mapping.read(u64::MAX, &mut [0u8; 2]),
            Err(FramebufferError::AccessOutOfRange { .. })
        ));
        assert!(manager.take_written_pages().is_empty());
    }

    #[test]
    fn pixels_use_the_packed_byte_width() {
        let manager = BufferManager::new();
        manager.configure(4, 2, 24).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();

        mapping.write_pixel(1, 1, 0xAA12_3456).unwrap();
        assert_eq!(mapping.read_pixel(1, 1).unwrap(), 0x12_3456);

        let mut raw = [0u8; 3];
        mapping.read(12 + 3, &mut raw).unwrap();
        assert_eq!(raw, [0x56, 0x34, 0x12]);
    }

    #[test]
    fn fill_rect_clips_and_copy_rect_reads_back_packed_rows() {
        let manager = BufferManager::new();
        manager.configure(8, 8, 16).unwrap();
        let mapping = manager.map_for_shared_access().unwrap();

        let filled = mapping
            .fill_rect(DirtyRect::new(6, 6, 20, 20), 0xF800)
            .unwrap();
        assert_eq!(filled, Some(DirtyRect::new(6, 6, 8, 8)));
        assert_eq!(mapping.fill_rect(DirtyRect::new(9, 9, 12, 12), 0).unwrap(), None);

        let bytes = mapping.copy_rect(DirtyRect::new(5, 6, 8, 7)).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0xF8, 0x00, 0xF8]);
        assert!(mapping.copy_rect(DirtyRect::new(0, 0, 9, 1)).is_err());
    }

    #[test]
    fn readers_never_observe_a_mismatched_geometry_and_buffer() {
        let manager = Arc::new(BufferManager::new());
        manager.configure(64, 64, 32).unwrap();

        let start = Arc::new(Barrier::new(2));
        let reader = {
            let manager = manager.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                for _ in 0..2_000 {
                    let mapping = manager.map_for_shared_access().unwrap();
                    let geometry = mapping.geometry();
                    assert_eq!(mapping.len(), geometry.buffer_size());
                    // Last pixel of the mapped geometry must always be addressable.
                    mapping
                        .read_pixel(geometry.width() - 1, geometry.height() - 1)
                        .unwrap();
                }
            })
        };

        start.wait();
        for i in 0..200u32 {
            let (w, h, bpp) = if i % 2 == 0 { (32, 16, 16) } else { (64, 64, 32) };
            manager.configure(w, h, bpp).unwrap();
        }
        reader.join().unwrap();
    }
}
