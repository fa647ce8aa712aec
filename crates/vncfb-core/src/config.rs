use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_NAME: &str = "vncfb";
pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 768;
pub const DEFAULT_BITS_PER_PIXEL: u32 = 32;
/// Roughly one writeback pass per 30 Hz frame.
pub const DEFAULT_WRITEBACK_DELAY: Duration = Duration::from_millis(33);

/// Longest accepted device name, in bytes.
pub const MAX_NAME_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {0}")]
    InvalidEnv(&'static str),
}

/// Initial mode and writeback cadence of a framebuffer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferConfig {
    /// Identifier used in log lines.
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Interval between two drains of the written-page log.
    pub writeback_delay: Duration,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            bits_per_pixel: DEFAULT_BITS_PER_PIXEL,
            writeback_delay: DEFAULT_WRITEBACK_DELAY,
        }
    }
}

impl FramebufferConfig {
    /// Reads `VNCFB_NAME`, `VNCFB_WIDTH`, `VNCFB_HEIGHT`, `VNCFB_BPP` and
    /// `VNCFB_WRITEBACK_DELAY_MS`. Unset variables keep their defaults.
    ///
    /// The depth is not validated here; see [`crate::VncFramebuffer::from_config`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(mut lookup: impl FnMut(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let name = match lookup("VNCFB_NAME") {
            Some(raw) => {
                let name = raw.trim();
                if name.is_empty() || name.len() > MAX_NAME_LEN {
                    return Err(ConfigError::InvalidEnv("VNCFB_NAME"));
                }
                name.to_string()
            }
            None => defaults.name,
        };
        let width = parse_u32(&mut lookup, "VNCFB_WIDTH")?.unwrap_or(defaults.width);
        let height = parse_u32(&mut lookup, "VNCFB_HEIGHT")?.unwrap_or(defaults.height);
        let bits_per_pixel = parse_u32(&mut lookup, "VNCFB_BPP")?.unwrap_or(defaults.bits_per_pixel);
        let writeback_delay = match parse_u32(&mut lookup, "VNCFB_WRITEBACK_DELAY_MS")? {
            Some(0) => return Err(ConfigError::InvalidEnv("VNCFB_WRITEBACK_DELAY_MS")),
            Some(ms) => Duration::from_millis(u64::from(ms)),
            None => defaults.writeback_delay,
        };

        Ok(Self {
            name,
            width,
            height,
            bits_per_pixel,
            writeback_delay,
        })
    }
}

fn parse_u32(
    lookup: &mut impl FnMut(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u32>, ConfigError> {
    lookup(var)
        .map(|raw| raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnv(var)))
        .transpose()
}
