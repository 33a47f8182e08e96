use std::path::PathBuf;
use clap::Parser;
use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "ledmark")]
#[command(about = "Bookmark WLED controllers discovered over mDNS in Firefox")]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Remove the bookmarks previously added by this tool
    #[arg(long)]
    pub restore: bool,

    /// Discovery duration in seconds
    #[arg(long, allow_negative_numbers = true)]
    pub duration: Option<i64>,

    /// File the discovered services are written to
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to places.sqlite, skips profile discovery
    #[arg(long, value_name = "FILE")]
    pub profile_path: Option<PathBuf>,

    /// Bookmark folder to file devices under
    #[arg(long)]
    pub folder: Option<String>,

    /// Ledger of bookmarks added by this tool
    #[arg(long, value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Flags given on the command line win over the config file
    pub fn apply(&self, config: &mut Config) {
        if let Some(duration) = self.duration {
            config.discovery.duration_secs = duration;
        }
        if let Some(output) = &self.output {
            config.discovery.output = output.clone();
        }
        if let Some(folder) = &self.folder {
            config.bookmarks.folder_title = folder.clone();
        }
        if let Some(ledger) = &self.ledger {
            config.bookmarks.ledger_path = ledger.clone();
        }
    }
}
