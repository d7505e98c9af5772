use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weaver")]
#[command(about = "Composite images, GIFs and videos into one surface", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Draw on the desktop background layer instead of opening a window
    #[arg(long)]
    pub compositor: bool,

    /// Configuration file (default: $XDG_CONFIG_HOME/weaver/config.toml)
    #[arg(short, long, env = "WEAVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sleep between frames, in milliseconds
    #[arg(long)]
    pub idle_ms: Option<u64>,

    /// Present without waiting for vertical blank
    #[arg(long)]
    pub no_vsync: bool,

    /// Maximum frames decoded from each video
    #[arg(long)]
    pub max_video_frames: Option<usize>,

    /// Decode worker threads (0 = one per view)
    #[arg(long)]
    pub decode_threads: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Views, as repeated groups of PATH SPEED X Y W H
    #[arg(value_name = "PATH SPEED X Y W H", allow_negative_numbers = true)]
    pub views: Vec<String>,
}
