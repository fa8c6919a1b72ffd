use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use depscan::{
    cache::Cache,
    config::Config,
    detect,
    model::{SecurityFinding, Severity},
    output::{generate_json_string, print_report, OutputFormat},
    Engine, Manifest,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const CRITICAL_FINDING: u8 = 2;
    pub const HIGH_FINDING: u8 = 3;
    pub const MEDIUM_FINDING: u8 = 4;
    pub const LOW_FINDING: u8 = 5;
}

/// Directories never descended into when scanning a tree.
const SKIP_DIRS: &[&str] = &["node_modules", "target", ".git", "vendor"];

#[derive(Parser)]
#[command(name = "depscan")]
#[command(
    author,
    version,
    about = "Scan dependency manifests for malicious packages, typosquats and known vulnerabilities"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan manifest files or directories
    Scan {
        /// Manifest files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Skip vulnerability database lookups
        #[arg(long)]
        no_vuln_check: bool,

        /// Write output to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Clear cache before scanning
        #[arg(long)]
        clear_cache: bool,

        /// Exit with error if findings at or above this severity are found
        #[arg(long, value_enum)]
        fail_on: Option<FailLevel>,
    },

    /// Print the detected ecosystem of each file
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the cache
    ClearCache,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl From<FailLevel> for Severity {
    fn from(level: FailLevel) -> Self {
        match level {
            FailLevel::Critical => Severity::Critical,
            FailLevel::High => Severity::High,
            FailLevel::Medium => Severity::Medium,
            FailLevel::Low => Severity::Low,
        }
    }
}

/// Upper bound on waiting for blocking work (such as a stuck DNS lookup
/// left behind by the reachability probe) when the runtime shuts down.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    match block_on_with_shutdown(run()) {
        Ok(Ok(code)) => ExitCode::from(code),
        Ok(Err(e)) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

/// Runs `future` to completion on a fresh runtime, then shuts the runtime
/// down without waiting longer than [`RUNTIME_SHUTDOWN_TIMEOUT`].
fn block_on_with_shutdown<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    Ok(output)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Ok(Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable config file");
            Config::default()
        })),
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            paths,
            format,
            no_vuln_check,
            output,
            clear_cache,
            fail_on,
        } => {
            let cache = Cache::new().with_ttl_hours(config.cache_ttl_hours);
            if clear_cache {
                cache.clear()?;
            }

            let mut config = config;
            config.skip_vuln_check |= no_vuln_check;
            let format_str = format.unwrap_or_else(|| config.default_format.clone());

            run_scan(&paths, &config, cache, &format_str, output, fail_on).await
        }
        Commands::Detect { files } => {
            run_detect(&files);
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(cli.config.as_deref(), init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let removed = Cache::new().clear()?;
            println!("Cache cleared ({} entries removed).", removed);
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(
    paths: &[PathBuf],
    config: &Config,
    cache: Cache,
    format: &str,
    output_file: Option<PathBuf>,
    fail_on: Option<FailLevel>,
) -> Result<u8> {
    let format = OutputFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table && output_file.is_none();

    let manifests = collect_manifests(paths)?;
    if manifests.is_empty() {
        bail!("no supported manifest files found");
    }

    let engine = Engine::from_config(config, Some(Arc::new(cache)));

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Analyzing {} manifests...", manifests.len()));
        Some(pb)
    } else {
        None
    };

    let report = engine.analyze_manifests(&manifests).await;

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Found {} findings in {} packages",
            report.findings.len(),
            report.packages_scanned
        ));
    }

    if let Some(path) = output_file {
        std::fs::write(&path, generate_json_string(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if format == OutputFormat::Table {
            println!("Results written to: {}", path.display());
        }
    } else {
        print_report(&report, format)?;
    }

    Ok(determine_exit_code(&report.findings, fail_on))
}

/// Expands files and directories into the manifests they contain.
///
/// Explicit files are always included so content detection can run on
/// them; directory entries must have a recognised manifest file name.
fn collect_manifests(paths: &[PathBuf]) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for path in paths {
        if path.is_file() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            manifests.push(Manifest::new(path.display().to_string(), content));
            continue;
        }
        if !path.is_dir() {
            bail!("path not found: {}", path.display());
        }

        let walker = WalkDir::new(path).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !SKIP_DIRS.iter().any(|d| entry.file_name() == *d)
        });

        for entry in walker.flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.path().display().to_string();
            if detect(&name, None).is_none() {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(content) => {
                    debug!(path = %name, "found manifest");
                    manifests.push(Manifest::new(name, content));
                }
                Err(e) => warn!(path = %name, error = %e, "skipping unreadable manifest"),
            }
        }
    }

    Ok(manifests)
}

fn run_detect(files: &[PathBuf]) {
    for file in files {
        let content = std::fs::read_to_string(file).ok();
        let name = file.display().to_string();
        match detect(&name, content.as_deref()) {
            Some(ecosystem) => println!("{:<50} {}", name, ecosystem.display_name()),
            None => println!("{:<50} unknown", name),
        }
    }
}

/// Determine the exit code from the findings and the --fail-on setting.
///
/// The code reflects the most severe finding, provided it reaches the
/// requested level.
fn determine_exit_code(findings: &[SecurityFinding], fail_on: Option<FailLevel>) -> u8 {
    let Some(threshold) = fail_on.map(Severity::from) else {
        return exit_codes::SUCCESS;
    };

    match findings.iter().map(|f| f.severity).max() {
        Some(worst) if worst >= threshold => match worst {
            Severity::Critical => exit_codes::CRITICAL_FINDING,
            Severity::High => exit_codes::HIGH_FINDING,
            Severity::Medium => exit_codes::MEDIUM_FINDING,
            Severity::Low => exit_codes::LOW_FINDING,
        },
        _ => exit_codes::SUCCESS,
    }
}

fn handle_config(custom_path: Option<&Path>, init: bool, show_path: bool) -> Result<()> {
    let config_path = custom_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save_to(&config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'depscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
