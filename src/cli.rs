use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{CliOverrides, OutputFormat};
use crate::pipeline::Mode;

#[derive(Debug, Parser)]
#[command(name = "media-digest")]
#[command(about = "Turn video, audio, text or a YouTube link into bilingual summaries")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the processing service.
    #[arg(long)]
    pub api_base: Option<String>,

    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    #[arg(long)]
    pub parallel_branches: Option<bool>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args, PartialEq, Eq)]
pub struct DownloadArgs {
    /// Save the result texts (and audio, when configured) to the download directory.
    #[arg(long)]
    pub download: bool,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    Video {
        path: PathBuf,
        #[command(flatten)]
        download: DownloadArgs,
    },
    Audio {
        path: PathBuf,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Summarize pasted text, or a text file with `--file`.
    Text {
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        download: DownloadArgs,
    },
    Youtube {
        url: String,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Retrieve one artifact by reference.
    Fetch {
        reference: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Doctor {
        #[arg(long)]
        json: bool,
    },
    Status,
}

impl Cli {
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            api_base: self.api_base.clone(),
            mode: self.mode,
            parallel_branches: self.parallel_branches,
            output_format: self.format,
        }
    }
}
