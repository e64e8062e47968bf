//! scriptfix: let a text-generation backend propose edits to a script and
//! apply them under git, one commit per edit.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use scriptfix::agents::editor::interpret_response;
use scriptfix::backend::BackendRegistry;
use scriptfix::exit_codes;
use scriptfix::io::apply::ApplyOptions;
use scriptfix::io::atomic::write_json;
use scriptfix::io::audit::{AuditSink, FileAuditLog, NullAudit};
use scriptfix::io::config::{DEFAULT_CONFIG_PATH, ScriptfixConfig, load_config, write_config};
use scriptfix::logging;
use scriptfix::run::{Agents, RunOptions, run_script};

#[derive(Parser)]
#[command(
    name = "scriptfix",
    version,
    about = "Apply model-proposed edits to a script, one git commit per edit"
)]
struct Cli {
    /// Log progress to stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a script, request edits, and apply them.
    Run {
        /// Script to analyze and edit.
        script: PathBuf,
        /// Backend name (see `scriptfix backends`).
        #[arg(long)]
        backend: Option<String>,
        /// API key, or a path to a file containing it.
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Commit message for each applied action.
        #[arg(short, long)]
        message: Option<String>,
        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Write the run report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Do not append sent prompts to the audit log.
        #[arg(long)]
        no_audit: bool,
    },
    /// Normalize and parse a saved editor response; print the result as JSON.
    Parse {
        response: PathBuf,
    },
    /// List registered backend names.
    Backends,
    /// Write a default config file.
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

/// `run` arguments that override config values.
struct RunOverrides {
    backend: Option<String>,
    api_key: Option<String>,
    message: Option<String>,
    timeout: Option<u64>,
    no_audit: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Run {
            script,
            backend,
            api_key,
            config,
            message,
            timeout,
            report,
            no_audit,
        } => {
            let overrides = RunOverrides {
                backend,
                api_key,
                message,
                timeout,
                no_audit,
            };
            cmd_run(&script, &config, overrides, report.as_deref())
        }
        Command::Parse { response } => cmd_parse(&response),
        Command::Backends => cmd_backends(),
        Command::InitConfig { config, force } => cmd_init_config(&config, force),
    }
}

fn cmd_run(
    script: &Path,
    config_path: &Path,
    overrides: RunOverrides,
    report_path: Option<&Path>,
) -> Result<i32> {
    let mut cfg = load_config(config_path)?;
    apply_overrides(&mut cfg, overrides);
    cfg.validate().context("invalid options")?;
    debug!(backend = %cfg.backend.name, timeout_secs = cfg.timeout_secs, "config resolved");

    let registry = BackendRegistry::with_defaults();
    let generator = registry.create(&cfg.backend.name, &cfg.backend.options())?;
    let agents = Agents::load(cfg.prompts.dir.as_deref())?;
    let mut audit: Box<dyn AuditSink> = if cfg.audit.enabled {
        Box::new(FileAuditLog::new(&cfg.audit.dir))
    } else {
        Box::new(NullAudit)
    };
    let options = RunOptions {
        timeout: cfg.timeout(),
        identity: cfg.git.identity(),
        apply: ApplyOptions {
            base_dir: std::env::current_dir().context("resolve working directory")?,
            commit_message: cfg.commit_message.clone(),
            reset_on_failure: cfg.reset_on_failure,
        },
    };

    let report = run_script(script, &agents, &*generator, &mut *audit, &options)?;
    println!("{}", report.summary_line());
    if let Some(path) = report_path {
        write_json(path, &report).with_context(|| format!("write report {}", path.display()))?;
    }
    Ok(if report.halted() {
        exit_codes::HALTED
    } else {
        exit_codes::OK
    })
}

fn apply_overrides(cfg: &mut ScriptfixConfig, overrides: RunOverrides) {
    if let Some(name) = overrides.backend {
        cfg.backend.name = name;
    }
    if overrides.api_key.is_some() {
        cfg.backend.api_key = overrides.api_key;
    }
    if let Some(message) = overrides.message {
        cfg.commit_message = message;
    }
    if let Some(secs) = overrides.timeout {
        cfg.timeout_secs = secs;
    }
    if overrides.no_audit {
        cfg.audit.enabled = false;
    }
}

fn cmd_parse(response: &Path) -> Result<i32> {
    let raw = fs::read_to_string(response)
        .with_context(|| format!("read response {}", response.display()))?;
    let report = interpret_response(&raw);
    let json = serde_json::to_string_pretty(&report).context("serialize parse report")?;
    println!("{json}");
    Ok(if report.is_malformed() {
        exit_codes::INVALID
    } else {
        exit_codes::OK
    })
}

fn cmd_backends() -> Result<i32> {
    for name in BackendRegistry::with_defaults().names() {
        println!("{name}");
    }
    Ok(exit_codes::OK)
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        eprintln!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::INVALID);
    }
    write_config(path, &ScriptfixConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}
