// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::logging::{LogFormat, LogLevel};

/// lametag - ID3v2.3 tag and LAME tag frame tool
#[derive(Parser, Debug)]
#[command(name = "lametag")]
#[command(about = "Read and write ID3v2.3 tags and patch LAME tag frames in MP3 files", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format (stderr)
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Minimum log level (stderr)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read ID3v2.3 tags from MP3 file(s)
    Read {
        /// File paths or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Include attached picture bytes (base64) in the output
        #[arg(long)]
        include_picture: bool,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Replace the ID3v2 tag of a file
    Write {
        /// MP3 file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Tag JSON string
        #[arg(short, long, conflicts_with = "from_file", required_unless_present = "from_file")]
        metadata: Option<String>,

        /// Read tag JSON from a file
        #[arg(long)]
        from_file: Option<String>,

        /// Image file to attach as the front cover
        #[arg(long)]
        cover: Option<String>,

        /// Deflate frames whose content is at least this many bytes
        #[arg(long, value_name = "BYTES")]
        compress_over: Option<usize>,

        /// Apply unsynchronisation to the tag body
        #[arg(long)]
        unsync: bool,

        /// Zero padding after the last frame
        #[arg(long, value_name = "BYTES", default_value_t = 0)]
        padding: usize,
    },

    /// Overwrite the placeholder LAME tag frame with a finalized one
    Patch {
        /// MP3 file path
        #[arg(value_name = "FILE")]
        file: String,

        /// File holding the finalized tag frame bytes
        #[arg(long, value_name = "PATH")]
        frame: String,
    },

    /// Export the attached picture
    ExportCover {
        /// MP3 file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Output directory for the cover image
        #[arg(short, long)]
        output: String,
    },

    /// List the ID3v1 genre table
    Genres,
}
