// CLI module for lametag
//
// Command-line front end over the library: tag reading and writing, cover
// export and LAME tag frame patching.

pub mod commands;
pub mod config;
pub mod logging;
pub mod output;

pub use config::{Commands, Config, OutputFormat};
pub use output::OutputFormatter;

/// Exit code when a patch was refused because the placeholder did not verify
pub const EXIT_PATCH_ABORTED: i32 = 2;
