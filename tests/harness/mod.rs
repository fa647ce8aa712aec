#![allow(dead_code)]

use std::sync::{Arc, Once};

use vncfb_core::{DirtyRect, VncFramebuffer};

static TRACING: Once = Once::new();

/// Routes library logs through the test harness' captured output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn framebuffer(width: u32, height: u32, bits_per_pixel: u32) -> Arc<VncFramebuffer> {
    init_tracing();
    let fb = VncFramebuffer::new("test");
    fb.configure(width, height, bits_per_pixel)
        .expect("initial mode set");
    Arc::new(fb)
}

/// Bounding box of every rectangle in `rects`, or `None` if there are none.
pub fn bounding_box<'a>(rects: impl IntoIterator<Item = &'a DirtyRect>) -> Option<DirtyRect> {
    rects
        .into_iter()
        .copied()
        .reduce(|acc, rect| acc.union(&rect))
}
