//! Command line interface of the harvester.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Finds URLs in text, resolves them and records what is behind each one.
#[derive(Debug, Parser)]
#[command(name = "harvester")]
#[command(about = "Harvest and classify the URLs found in free-form text", long_about = None)]
pub struct Cli {
    /// Text to harvest. Read from --input or stdin when empty.
    pub text: Vec<String>,

    /// Read the text to harvest from this file.
    #[arg(long, short, value_name = "FILE", conflicts_with = "text")]
    pub input: Option<PathBuf>,

    /// RON configuration file.
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write one Markdown document per harvested resource into this directory.
    #[arg(long, short, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory for downloaded non-HTML content.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Keep downloaded files after the run instead of deleting them.
    #[arg(long)]
    pub keep_downloads: bool,

    /// Report pages with an HTML redirect instead of their targets.
    #[arg(long)]
    pub no_follow: bool,

    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    pub log_level: LevelFilter,

    /// Also write the log to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}
