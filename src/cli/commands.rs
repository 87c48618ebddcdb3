use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bazel classpath resolver for IDE project models
#[derive(Parser, Debug)]
#[command(
    name = "cpresolve",
    about = "Resolve the compile classpath of workspace modules from Bazel metadata",
    version,
    author,
    long_about = "cpresolve asks Bazel for the dependency metadata of a module's targets and \
                  turns it into a classpath: dependencies whose sources already live in another \
                  workspace module become module references, everything else is satisfied by \
                  prebuilt archives under the Bazel output roots."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Resolve the classpath of a module",
        long_about = "Resolves the classpath of one module declared in a workspace manifest.\n\n\
                      Examples:\n  \
                      cpresolve resolve app --workspace workspace.yaml\n  \
                      cpresolve resolve app --workspace workspace.yaml --format json"
    )]
    Resolve(ResolveArgs),

    #[command(
        about = "Check whether a module builds cleanly",
        long_about = "Runs a Bazel build of the module's targets and reports any problems.\n\n\
                      Examples:\n  \
                      cpresolve check app --workspace workspace.yaml"
    )]
    Check(CheckArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(value_name = "MODULE", help = "Module name as declared in the manifest")]
    pub module: String,

    #[arg(
        short = 'w',
        long,
        value_name = "FILE",
        default_value = "workspace.yaml",
        help = "Workspace manifest (YAML or JSON)"
    )]
    pub workspace: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "PATH", help = "Bazel binary to run")]
    pub bazel: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    #[arg(value_name = "MODULE", help = "Module name as declared in the manifest")]
    pub module: String,

    #[arg(
        short = 'w',
        long,
        value_name = "FILE",
        default_value = "workspace.yaml",
        help = "Workspace manifest (YAML or JSON)"
    )]
    pub workspace: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "PATH", help = "Bazel binary to run")]
    pub bazel: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
