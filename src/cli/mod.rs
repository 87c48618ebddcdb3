pub mod commands;
pub mod output;

pub use commands::{CheckArgs, CliArgs, Commands, OutputFormatArg, ResolveArgs};
pub use output::{OutputFormat, OutputFormatter};
