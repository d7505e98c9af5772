use anyhow::{Context, Result};
use common::{Rect, ViewSpec, WeaverError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::media::DecodeOptions;
use crate::pipeline::present::Pacing;
use crate::validate_enum;

/// Configuration file contents
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub render: RenderSettings,

    #[serde(default)]
    pub view: Vec<ViewEntry>,
}

/// General settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Embed into the desktop background instead of opening a window
    #[serde(default)]
    pub desktop: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            desktop: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Rendering and decoding settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderSettings {
    /// Sleep between frames, in milliseconds
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    #[serde(default = "default_true")]
    pub vsync: bool,

    /// Frames kept per video
    #[serde(default = "default_max_video_frames")]
    pub max_video_frames: usize,

    /// Decode workers, 0 = one per view
    #[serde(default)]
    pub decode_threads: usize,

    /// Background colour (hex RRGGBB)
    #[serde(default = "default_clear_color")]
    pub clear_color: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval_ms(),
            vsync: true,
            max_video_frames: default_max_video_frames(),
            decode_threads: 0,
            clear_color: default_clear_color(),
        }
    }
}

/// Shortest sleep between frames; the loop never spins without pausing.
pub const MIN_IDLE_INTERVAL_MS: u64 = 1;

fn default_idle_interval_ms() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_max_video_frames() -> usize {
    300
}
fn default_clear_color() -> String {
    "000000".to_string()
}
fn default_speed() -> i64 {
    1
}

/// One `[[view]]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewEntry {
    /// Media file or directory (`~` is expanded)
    pub path: String,

    #[serde(default = "default_speed")]
    pub speed: i64,

    #[serde(default)]
    pub x: i32,

    #[serde(default)]
    pub y: i32,

    pub width: u32,
    pub height: u32,
}

impl ViewEntry {
    pub fn to_spec(&self) -> ViewSpec {
        ViewSpec::new(
            expand_path(&self.path),
            Rect::new(self.x, self.y, self.width, self.height),
            self.speed,
        )
    }
}

/// Expand a leading `~` in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weaver");

        Ok(config_dir.join("config.toml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        validate_log_level(&self.general.log_level)?;

        if self.render.max_video_frames == 0 {
            return Err(WeaverError::Config("max_video_frames must be at least 1".into()).into());
        }

        parse_hex_color(&self.render.clear_color).ok_or_else(|| {
            WeaverError::Config(format!(
                "Invalid clear_color: {} (expected RRGGBB)",
                self.render.clear_color
            ))
        })?;

        for (index, view) in self.view.iter().enumerate() {
            if view.path.trim().is_empty() {
                return Err(WeaverError::Config(format!("view {}: empty path", index + 1)).into());
            }
        }

        Ok(())
    }
}

fn validate_log_level(level: &str) -> Result<()> {
    validate_enum!(level, "trace", "debug", "info", "warn", "error")
}

/// Parse a hex colour string (e.g. "#1E1E1E" or "1e1e1e") to RGB
pub fn parse_hex_color(color: &str) -> Option<[u8; 3]> {
    let color = color.trim().trim_start_matches('#');

    if color.len() != 6 || !color.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&color[0..2], 16).ok()?;
    let g = u8::from_str_radix(&color[2..4], 16).ok()?;
    let b = u8::from_str_radix(&color[4..6], 16).ok()?;

    Some([r, g, b])
}

/// Everything the renderer needs, after merging the command line over the
/// configuration file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub views: Vec<ViewSpec>,
    pub desktop: bool,
    pub vsync: bool,
    pub pacing: Pacing,
    pub decode: DecodeOptions,
    pub decode_threads: usize,
    pub clear_color: [u8; 3],
    pub log_level: String,
}

impl Settings {
    /// Merge command line options over a loaded configuration file.
    ///
    /// Views given on the command line replace the file's views entirely.
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self, WeaverError> {
        let views: Vec<ViewSpec> = if cli.views.is_empty() {
            config.view.iter().map(ViewEntry::to_spec).collect()
        } else {
            common::parse_view_args(&cli.views)?
                .into_iter()
                .map(|spec| ViewSpec {
                    path: expand_path(&spec.path.to_string_lossy()),
                    ..spec
                })
                .collect()
        };

        if views.is_empty() {
            return Err(WeaverError::Usage(
                "no views given: pass PATH SPEED X Y W H groups or add [[view]] tables to the config file"
                    .into(),
            ));
        }

        let log_level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| config.general.log_level.clone());
        validate_log_level(&log_level).map_err(|e| WeaverError::Usage(e.to_string()))?;

        let max_video_frames = cli
            .max_video_frames
            .unwrap_or(config.render.max_video_frames);
        if max_video_frames == 0 {
            return Err(WeaverError::Usage(
                "--max-video-frames must be at least 1".into(),
            ));
        }

        let clear_color = parse_hex_color(&config.render.clear_color).ok_or_else(|| {
            WeaverError::Config(format!("Invalid clear_color: {}", config.render.clear_color))
        })?;

        Ok(Self {
            views,
            desktop: cli.compositor || config.general.desktop,
            vsync: config.render.vsync && !cli.no_vsync,
            pacing: Pacing {
                idle_interval: Duration::from_millis(
                    cli.idle_ms
                        .unwrap_or(config.render.idle_interval_ms)
                        .max(MIN_IDLE_INTERVAL_MS),
                ),
            },
            decode: DecodeOptions { max_video_frames },
            decode_threads: cli.decode_threads.unwrap_or(config.render.decode_threads),
            clear_color,
            log_level,
        })
    }

    pub fn log_summary(&self) {
        log::info!("Settings:");
        log::info!(
            "  - Mode: {}",
            if self.desktop { "desktop background" } else { "window" }
        );
        log::info!(
            "  - Idle interval: {}ms, vsync: {}",
            self.pacing.idle_interval.as_millis(),
            if self.vsync { "on" } else { "off" }
        );
        log::info!(
            "  - Max video frames: {}, decode threads: {}",
            self.decode.max_video_frames,
            match self.decode_threads {
                0 => "one per view".to_string(),
                n => n.to_string(),
            }
        );
        log::info!("  - Views: {}", self.views.len());
        for (index, view) in self.views.iter().enumerate() {
            log::info!(
                "      {}: {} at {} (speed x{})",
                index,
                view.path.display(),
                view.rect,
                view.speed
            );
        }
    }
}
