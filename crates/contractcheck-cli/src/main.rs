//! contractcheck CLI - schema-driven negative contract tests for OpenAPI servers

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use contractcheck_core::report::EXIT_ERROR;
use contractcheck_core::{Config, Suite};
use contractcheck_runner::{CancellationSource, Engine, RunError};

#[derive(Parser)]
#[command(name = "contractcheck")]
#[command(about = "Schema-driven negative contract tests for OpenAPI servers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run contract tests against the configured server
    Run {
        /// Config file (default: .contractcheck.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only run these suites (repeatable)
        #[arg(short, long = "suite")]
        suites: Vec<Suite>,

        /// Directory for saved reports
        #[arg(long, default_value = storage::DEFAULT_REPORT_DIR)]
        report_dir: PathBuf,
    },

    /// Show planned cases without sending requests
    Plan {
        /// Config file (default: .contractcheck.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only plan these suites (repeatable)
        #[arg(short, long = "suite")]
        suites: Vec<Suite>,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the run report
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Logs go to stderr so stdout stays clean for `--output json`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>, suites: Vec<Suite>) -> Result<Config> {
    let mut cfg = match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::load_default().context("loading default config")?,
    };
    if !suites.is_empty() {
        cfg.suites = suites;
    }
    Ok(cfg)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building async runtime")
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Run {
            config,
            suites,
            report_dir,
        } => {
            let cfg = load_config(config.as_deref(), suites)?;
            let source = CancellationSource::new();
            let engine = Engine::from_config(cfg.clone())
                .with_context(|| format!("preparing run for {}", cfg.spec.display()))?
                .with_cancellation(source.token());

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  spec:     {}", cfg.spec.display());
                eprintln!("  base_url: {}", cfg.base_url);
                if !cfg.headers.is_empty() {
                    eprintln!("  headers:  {} configured", cfg.headers.len());
                }
                eprintln!("  suites:   {}", cfg.enabled_suites().len());
                eprintln!();
            }

            let start = Instant::now();
            let reporter = runtime()?.block_on(async {
                let canceller = source.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("interrupt received, cancelling run");
                        canceller.cancel();
                    }
                });

                let context = engine.context().await?;
                let plan = engine.plan(&context);
                if plan.cases.is_empty() && plan.checks.is_empty() {
                    return Ok::<_, RunError>(None);
                }
                Ok(Some(engine.execute(plan, &context).await))
            })?;
            let duration_secs = start.elapsed().as_secs_f64();

            // Safety check: nothing planned → tool error
            let Some(reporter) = reporter else {
                eprintln!("Error: No cases were planned. Check spec, allowed_methods and suites.");
                return Ok(EXIT_ERROR);
            };

            let exit_code = reporter.summarize().exit_code();
            if cli.output == OutputFormat::Terminal {
                println!("{}", reporter.render_terminal());
            }
            let report = reporter.into_report();
            if cli.output == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            let data = storage::ReportData {
                config: &cfg,
                report: &report,
                exit_code,
                duration_secs,
            };
            match storage::save_report(&data, &report_dir) {
                Ok(path) => {
                    if cli.output != OutputFormat::Silent {
                        eprintln!("Report saved: {}", path.display());
                    }
                }
                Err(e) => eprintln!("Warning: failed to save report: {e}"),
            }

            Ok(exit_code)
        }

        Commands::Plan { config, suites } => {
            let cfg = load_config(config.as_deref(), suites)?;
            let engine = Engine::from_config(cfg)?;
            // References are not fetched; `{{name}}` placeholders stay as written.
            let plan = engine.plan(&contractcheck_runner::TestContext::default());
            match cli.output {
                OutputFormat::Terminal => println!("{}", plan.to_terminal()),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Silent => {}
            }
            Ok(if plan.cases.is_empty() && plan.checks.is_empty() {
                EXIT_ERROR
            } else {
                0
            })
        }

        Commands::Init => {
            let config_path = ".contractcheck.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - spec: path to your OpenAPI document");
            println!("  - base_url: server to test");
            println!("  - headers: auth tokens, API keys");
            println!("  - references: values fetched before the run");
            Ok(0)
        }

        Commands::Schema => {
            println!("{}", contractcheck_core::schema::generate_schema());
            Ok(0)
        }
    }
}
