//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves configuration (flags over env)
//! - initializes logging
//! - loads the pinned model artifact
//! - dispatches to the non-interactive commands or the TUI

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ExplainArgs, PredictArgs, SessionArgs};
use crate::data::scoring::ScoringClient;
use crate::domain::{
    AppConfig, ReferenceSource, DEFAULT_MODEL_NAME, DEFAULT_MODEL_VERSION, DEFAULT_REGISTRY_URL,
    DEFAULT_SERVICE_URL,
};
use crate::error::AppError;
use crate::io::export::{write_explanation_json, write_importance_csv, ExplanationFile};
use crate::report;

pub mod session;

use session::Session;

/// Entry point for the `cscope` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // We want `cscope` and `cscope --reference data.csv` to behave like
    // `cscope tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Clients(args) => handle_clients(args),
        Command::Predict(args) => handle_predict(args),
        Command::Explain(args) => handle_explain(args),
    }
}

fn handle_clients(args: SessionArgs) -> Result<(), AppError> {
    init_tracing(false);
    let config = config_from_args(&args);
    let mut scoring = ScoringClient::new(&config)?;
    let clients = scoring.list_clients()?;
    print!("{}", report::format_client_list(&clients));
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    init_tracing(false);
    let config = config_from_args(&args.session);
    let mut scoring = ScoringClient::new(&config)?;
    let prediction = scoring.predict(args.client)?;
    print!("{}", report::format_prediction(args.client, &prediction));
    Ok(())
}

fn handle_explain(args: ExplainArgs) -> Result<(), AppError> {
    init_tracing(false);
    let mut config = config_from_args(&args.session);
    config.export_importance = args.export.clone();
    config.export_explanation = args.export_json.clone();
    config.debug_bundle = args.debug_bundle;

    let session = Session::start(config)?;

    let global = session.global_importance()?;
    print!("{}", report::format_global(&global, session.config.top_n));

    let local = match args.client {
        Some(client_id) => {
            let local = session.local_attribution(client_id)?;
            print!("{}", report::format_local(&local, session.config.top_n));
            Some(local)
        }
        None => None,
    };

    if let Some(path) = &session.config.export_importance {
        write_importance_csv(path, &global)?;
        println!("Wrote importance CSV: {}", path.display());
    }
    if let Some(path) = &session.config.export_explanation {
        let file = ExplanationFile::new(
            &session.model.name,
            &session.model.version,
            Some(global.clone()),
            local.clone(),
        );
        write_explanation_json(path, &file)?;
        println!("Wrote explanation JSON: {}", path.display());
    }
    if session.config.debug_bundle {
        let path =
            crate::debug::write_debug_bundle(&session.config, &session.model, None, Some(&global))?;
        println!("Wrote debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_tui(args: SessionArgs) -> Result<(), AppError> {
    init_tracing(true);
    let config = config_from_args(&args);
    let session = Session::start(config)?;
    crate::tui::run(session)
}

/// Resolve configuration: CLI flag over environment variable over default.
pub fn config_from_args(args: &SessionArgs) -> AppConfig {
    let reference = if let Some(path) = &args.reference {
        ReferenceSource::Csv(path.clone())
    } else if let Some(count) = args.synthetic_count {
        ReferenceSource::Synthetic {
            count,
            seed: args.seed,
        }
    } else if let Ok(path) = std::env::var("REFERENCE_MATRIX_CSV") {
        ReferenceSource::Csv(path.into())
    } else {
        ReferenceSource::None
    };

    AppConfig {
        service_url: env_or(&args.service_url, "SCORING_SERVICE_URL", DEFAULT_SERVICE_URL),
        registry_url: env_or(&args.registry_url, "MODEL_REGISTRY_URL", DEFAULT_REGISTRY_URL),
        model_name: env_or(&args.model_name, "SCORING_MODEL_NAME", DEFAULT_MODEL_NAME),
        model_version: env_or(
            &args.model_version,
            "SCORING_MODEL_VERSION",
            DEFAULT_MODEL_VERSION,
        ),
        reference,
        timeout: Duration::from_secs(args.timeout_secs.max(1)),
        cache_ttl: args.cache_ttl_secs.map(Duration::from_secs),
        cache_capacity: args.cache_capacity,
        top_n: args.top.max(1),
        background_rows: args.background_rows,
        sample_seed: args.seed,
        export_importance: None,
        export_explanation: None,
        debug_bundle: false,
    }
}

fn env_or(flag: &Option<String>, var: &str, default: &str) -> String {
    flag.clone()
        .or_else(|| std::env::var(var).ok())
        .unwrap_or_else(|| default.to_string())
}

/// Initialize tracing.
///
/// Non-interactive commands log to stderr under `RUST_LOG` control. The TUI
/// owns the terminal (alternate screen), so it logs only when
/// `SCORING_DASH_LOG` names a file.
fn init_tracing(interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if interactive {
        let Ok(path) = std::env::var("SCORING_DASH_LOG") else {
            return;
        };
        let Ok(file) = std::fs::File::create(&path) else {
            return;
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Rewrite argv so `cscope` defaults to `cscope tui`.
///
/// Rules:
/// - `cscope`                        -> `cscope tui`
/// - `cscope --reference X ...`      -> `cscope tui --reference X ...`
/// - `cscope --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "clients" | "predict" | "explain");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
