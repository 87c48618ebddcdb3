use cpresolve::build_tool::BazelRunner;
use cpresolve::cli::commands::{CheckArgs, CliArgs, Commands, ResolveArgs};
use cpresolve::cli::output::OutputFormatter;
use cpresolve::config::ResolverConfig;
use cpresolve::fs::RealFileSystem;
use cpresolve::progress::LoggingHandler;
use cpresolve::util::logging::{init_logging, parse_level, LoggingConfig};
use cpresolve::workspace::{ModuleIndex, WorkspaceManifest};
use cpresolve::{ClasspathResolver, VERSION};

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("cpresolve v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Resolve(resolve_args) => handle_resolve(resolve_args).await,
        Commands::Check(check_args) => handle_check(check_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("CPRESOLVE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("CPRESOLVE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}

async fn handle_resolve(args: &ResolveArgs) -> i32 {
    info!(module = %args.module, "Resolving classpath");

    let Some(resolver) = build_resolver(&args.workspace, args.bazel.as_deref(), &args.module) else {
        return 1;
    };

    let classpath = resolver.resolve(&args.module).await;

    let formatter = OutputFormatter::new(args.format.into());
    let output = match formatter.format_classpath(&args.module, &classpath) {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return 1;
        }
    };

    if let Some(ref path) = args.output {
        if let Err(e) = std::fs::write(path, &output) {
            error!("Failed to write output to {}: {}", path.display(), e);
            return 1;
        }
        info!("Classpath written to {}", path.display());
    } else {
        println!("{}", output);
    }

    0
}

async fn handle_check(args: &CheckArgs) -> i32 {
    info!(module = %args.module, "Checking module");

    let Some(resolver) = build_resolver(&args.workspace, args.bazel.as_deref(), &args.module) else {
        return 1;
    };

    let report = resolver.check(&args.module).await;

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_check(&report) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return 1;
        }
    }

    if report.valid {
        0
    } else {
        1
    }
}

/// Loads the manifest and wires a resolver backed by the real Bazel binary
fn build_resolver(manifest_path: &Path, bazel: Option<&Path>, module: &str) -> Option<ClasspathResolver> {
    let manifest = match WorkspaceManifest::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{}", e);
            return None;
        }
    };

    let base_dir = manifest_dir(manifest_path);
    let workspace_root = manifest.resolved_root(&base_dir);
    let index = match manifest.into_index(&base_dir) {
        Ok(index) => index,
        Err(e) => {
            error!("{}", e);
            return None;
        }
    };

    if index.module(module).is_none() {
        error!(
            "Module {} is not declared in {}",
            module,
            manifest_path.display()
        );
        return None;
    }

    let mut config = ResolverConfig::default();
    if config.workspace_root.is_none() {
        config = config.with_workspace_root(workspace_root);
    }
    if let Some(bazel) = bazel {
        config = config.with_bazel_path(bazel);
    }
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your CPRESOLVE_* environment variables and command-line arguments.");
        return None;
    }
    debug!("{}", config);

    let runner = match BazelRunner::from_config(&config) {
        Ok(runner) => runner,
        Err(e) => {
            error!("{}", e);
            return None;
        }
    };

    Some(
        ClasspathResolver::new(
            Arc::new(runner),
            Arc::new(index),
            Arc::new(RealFileSystem::new()),
            &config,
        )
        .with_progress(Arc::new(LoggingHandler)),
    )
}

fn manifest_dir(manifest_path: &Path) -> PathBuf {
    let parent = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);

    match parent {
        Some(dir) => dir.canonicalize().unwrap_or(dir),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
