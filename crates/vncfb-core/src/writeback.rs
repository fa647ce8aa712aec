//! Timer-driven delivery of written pages.
//!
//! Pixel writes only set bits in a page log. A background thread drains the log every
//! `delay` and hands the batch to a [`PageWriteSink`], so the per-write cost stays a single atomic OR
//! and dirty-rectangle merging happens at most once per interval.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::VncFramebuffer;
use crate::pages::{PageWriteSink, WriteNotificationSource};

/// Handle to a running writeback thread. Dropping it stops the thread after one final flush.
#[derive(Debug)]
pub struct DeferredWriteback {
    stop: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

fn flush(source: &dyn WriteNotificationSource, sink: &dyn PageWriteSink) {
    let pages = source.take_written_pages();
    if !pages.is_empty() {
        tracing::debug!(pages = pages.len(), "writeback batch");
        sink.deliver(&pages);
    }
}

impl DeferredWriteback {
    pub fn spawn(
        source: Arc<dyn WriteNotificationSource>,
        sink: Arc<dyn PageWriteSink>,
        delay: Duration,
    ) -> io::Result<Self> {
        Self::spawn_pass(delay, move || flush(source.as_ref(), sink.as_ref()))
    }

    /// Writeback loop that feeds a framebuffer's own page log back into its dirty tracker.
    ///
    /// Each pass drains and translates under one hold of the installed buffer
    /// ([`VncFramebuffer::flush_written_pages`]) instead of going through the split
    /// source/sink path.
    pub fn for_framebuffer(fb: &Arc<VncFramebuffer>, delay: Duration) -> io::Result<Self> {
        let fb = fb.clone();
        Self::spawn_pass(delay, move || {
            fb.flush_written_pages();
        })
    }

    /// Runs `pass` every `delay`, and once more on shutdown.
    fn spawn_pass(delay: Duration, mut pass: impl FnMut() + Send + 'static) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker = thread::Builder::new()
            .name("vncfb-writeback".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => pass(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        pass();
                        break;
                    }
                }
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Stops the thread and waits for its final flush.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("writeback thread panicked");
            }
        }
    }
}

impl Drop for DeferredWriteback {
    fn drop(&mut self) {
        self.shutdown();
    }
}
