#![forbid(unsafe_code)]

//! Drives a writer and a poller against one framebuffer and reports what the poller saw.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vncfb_core::{
    ControlSurface, DeferredWriteback, DirtyRect, FramebufferConfig, FramebufferError,
    GeometryInfo, Mapping, VncFramebuffer,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "vncfb-soak", version, about)]
struct Args {
    /// How long to run, in seconds.
    ///
    /// Environment variable: `VNCFB_SOAK_SECONDS`.
    #[arg(long, env = "VNCFB_SOAK_SECONDS", default_value_t = 5)]
    seconds: u64,

    /// Interval between dirty-region polls, in milliseconds.
    #[arg(long, env = "VNCFB_SOAK_POLL_MS", default_value_t = 16)]
    poll_ms: u64,

    /// Pause between writer strokes, in microseconds.
    #[arg(long, env = "VNCFB_SOAK_WRITE_US", default_value_t = 200)]
    write_us: u64,

    /// Optional mode to switch to halfway through, as `WIDTHxHEIGHT@BPP`.
    #[arg(long, env = "VNCFB_SOAK_SWITCH_MODE", value_parser = parse_mode)]
    switch_mode: Option<Mode>,

    /// Log filter (tracing-subscriber EnvFilter syntax).
    #[arg(long, env = "VNCFB_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mode {
    width: u32,
    height: u32,
    bits_per_pixel: u32,
}

fn parse_mode(raw: &str) -> Result<Mode, String> {
    let err = || format!("expected WIDTHxHEIGHT@BPP, got {raw:?}");
    let (size, bpp) = raw.split_once('@').ok_or_else(err)?;
    let (width, height) = size.split_once('x').ok_or_else(err)?;
    Ok(Mode {
        width: width.trim().parse().map_err(|_| err())?,
        height: height.trim().parse().map_err(|_| err())?,
        bits_per_pixel: bpp.trim().parse().map_err(|_| err())?,
    })
}

/// What happened to the requested mid-run mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ModeSwitch {
    NotRequested,
    Applied(GeometryInfo),
    Failed(FramebufferError),
}

impl std::fmt::Display for ModeSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRequested => f.write_str("none"),
            Self::Applied(info) => write!(
                f,
                "applied {}x{}@{}",
                info.width, info.height, info.bits_per_pixel
            ),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

fn switch_mode(fb: &VncFramebuffer, mode: Mode) -> ModeSwitch {
    match fb.set_geometry(mode.width, mode.height, mode.bits_per_pixel) {
        Ok(info) => ModeSwitch::Applied(info),
        Err(err) => {
            tracing::warn!(?mode, "mode switch failed, soak continues in the old mode: {err}");
            ModeSwitch::Failed(err)
        }
    }
}

#[derive(Debug, Default)]
struct PollStats {
    polls: u64,
    dirty_polls: u64,
    forwarded_bytes: u64,
}

fn run_writer(fb: &VncFramebuffer, done: &AtomicBool, pause: Duration) -> Result<u64> {
    let mut mapping: Mapping = fb.map_buffer()?;
    let mut strokes = 0u64;
    while !done.load(Ordering::Relaxed) {
        if mapping.is_stale() {
            mapping = fb.map_buffer()?;
            tracing::info!(generation = mapping.generation(), "writer remapped after mode set");
        }
        let geometry = mapping.geometry();
        let step = strokes as u32;
        let x = step.wrapping_mul(37) % geometry.width();
        let y = step.wrapping_mul(11) % geometry.height();
        let color = geometry
            .format()
            .pack_rgb(step as u8, (step >> 8) as u8, 0x80);
        mapping.fill_rect(DirtyRect::from_origin_size(x, y, 16, 8), color)?;
        strokes += 1;
        thread::sleep(pause);
    }
    Ok(strokes)
}

fn run_poller(fb: &VncFramebuffer, done: &AtomicBool, interval: Duration) -> Result<PollStats> {
    let mut stats = PollStats::default();
    while !done.load(Ordering::Relaxed) {
        thread::sleep(interval);
        stats.polls += 1;

        let dirty = fb.get_and_clear_dirty();
        if dirty == DirtyRect::EMPTY {
            continue;
        }
        stats.dirty_polls += 1;

        // The mode may have changed since the region was taken; only forward what still fits.
        let mapping = fb.map_buffer()?;
        let geometry = mapping.geometry();
        let Some(visible) = dirty.clamp_to(geometry.width(), geometry.height()) else {
            continue;
        };
        let bytes = mapping.copy_rect(visible)?;
        stats.forwarded_bytes += bytes.len() as u64;
        tracing::debug!(?visible, bytes = bytes.len(), "forwarded dirty region");
    }
    Ok(stats)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = FramebufferConfig::from_env().context("invalid framebuffer config")?;
    let fb = Arc::new(VncFramebuffer::from_config(&config)?);
    let writeback = DeferredWriteback::for_framebuffer(&fb, config.writeback_delay)
        .context("failed to start writeback thread")?;

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let fb = fb.clone();
        let done = done.clone();
        let pause = Duration::from_micros(args.write_us);
        thread::spawn(move || run_writer(&fb, &done, pause))
    };
    let poller = {
        let fb = fb.clone();
        let done = done.clone();
        let interval = Duration::from_millis(args.poll_ms);
        thread::spawn(move || run_poller(&fb, &done, interval))
    };

    let started = Instant::now();
    let total = Duration::from_secs(args.seconds);
    let mode_switch = match args.switch_mode {
        Some(mode) => {
            thread::sleep(total / 2);
            switch_mode(&fb, mode)
        }
        None => ModeSwitch::NotRequested,
    };
    thread::sleep(total.saturating_sub(started.elapsed()));
    done.store(true, Ordering::Relaxed);

    let strokes = writer
        .join()
        .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
    let stats = poller
        .join()
        .map_err(|_| anyhow::anyhow!("poller thread panicked"))??;
    writeback.stop();

    let geometry = fb.get_geometry()?;
    tracing::info!(
        strokes,
        polls = stats.polls,
        dirty_polls = stats.dirty_polls,
        forwarded_bytes = stats.forwarded_bytes,
        %mode_switch,
        "{}: soak finished at {}x{}@{}",
        fb.name(),
        geometry.width,
        geometry.height,
        geometry.bits_per_pixel
    );
    Ok(())
}
