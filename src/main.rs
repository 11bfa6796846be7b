// src/main.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use fleet_reporter::commands;
use fleet_reporter::config::Config;
use fleet_reporter::session::SessionManager;
use fleet_reporter::utils;

/// Weekly driver-earnings reports from the supplier dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print command outcomes as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Supplier organization id (overrides FLEET_ORG_ID)
    #[arg(long, global = true)]
    org: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a saved session exists
    Status,
    /// Sign in to the dashboard and save the session to the encrypted vault
    Login,
    /// Check whether the saved session still works
    Check,
    /// Open the dashboard to pick the week, then extract and write the report
    Run {
        /// Output directory for the report
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Stop after this many table pages
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Render an existing workbook to a PDF saved beside it
    ExportPdf {
        /// Path to the .xlsx report
        report: PathBuf,
    },
    /// Reveal a generated file in the system file manager
    Reveal {
        /// Path to reveal
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Setup logging first (reads RUST_LOG)
    utils::logging::setup_logging();

    let args = Args::parse();
    let cfg = effective_config(&args);
    let manager = SessionManager::new();

    let ok = dispatch(&args, &cfg, &manager).await;

    // Browsers hold child processes; close them before the process ends.
    manager.shutdown().await;
    if !ok {
        std::process::exit(1);
    }
}

fn effective_config(args: &Args) -> Config {
    let mut cfg = Config::from_env();
    if let Some(org) = &args.org {
        cfg.org_id = org.clone();
    }
    if let Command::Run { out_dir, max_pages } = &args.command {
        if let Some(dir) = out_dir {
            cfg.out_dir = dir.clone();
        }
        match max_pages {
            Some(n) if *n > 0 => cfg.max_pages = *n,
            Some(n) => tracing::warn!("Ignoring --max-pages {}", n),
            None => {}
        }
    }
    cfg
}

async fn dispatch(args: &Args, cfg: &Config, manager: &SessionManager) -> bool {
    match &args.command {
        Command::Status => {
            let present = commands::has_session(cfg);
            if args.json {
                println!("{}", serde_json::json!({ "has_session": present }));
            } else if present {
                println!("Saved session present at {}", cfg.vault_path().display());
            } else {
                println!("No saved session.");
            }
            true
        }
        Command::Login => login_flow(args, cfg, manager).await,
        Command::Check => emit(args.json, &commands::quick_session_check(cfg, manager).await),
        Command::Run { .. } => run_flow(args, cfg, manager).await,
        Command::ExportPdf { report } => {
            emit(args.json, &commands::export_pdf(report, manager).await)
        }
        Command::Reveal { path } => emit(args.json, &commands::reveal_file(path)),
    }
}

/// Opens the login window, then keeps offering to save the session until
/// the user has actually signed in (or stdin runs out).
async fn login_flow(args: &Args, cfg: &Config, manager: &SessionManager) -> bool {
    let opened = commands::open_login_surface(cfg, manager).await;
    if !opened.ok {
        return emit(args.json, &opened);
    }
    if let Some(msg) = &opened.message {
        eprintln!("{}", msg);
    }
    loop {
        let interactive = pause("Press Enter here once the dashboard is visible...").await;
        let outcome = commands::persist_session(cfg, manager).await;
        let retry = interactive
            && !outcome.ok
            && outcome.message.as_deref() == Some(commands::NOT_SIGNED_IN_MSG);
        if !retry {
            return emit(args.json, &outcome);
        }
        eprintln!("Not signed in yet. Finish the flow in the browser window.");
    }
}

/// Restores the session into a visible window, lets the user pick the
/// week there, then hands the window to the extraction run.
async fn run_flow(args: &Args, cfg: &Config, manager: &SessionManager) -> bool {
    let setup = commands::begin_manual_range_setup(cfg, manager).await;
    if !setup.ok {
        return emit(args.json, &setup);
    }
    if let Some(msg) = &setup.message {
        eprintln!("{}", msg);
    }
    pause("Select the week in the browser window, then press Enter to extract...").await;
    emit(args.json, &commands::run_extraction(cfg, manager).await)
}

// Prompts go to stderr so JSON output on stdout stays parseable. Returns
// false when stdin is closed (scripted use), letting flows skip retries.
async fn pause(text: &str) -> bool {
    eprintln!("{}", text);
    let mut line = String::new();
    matches!(
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await,
        Ok(n) if n > 0
    )
}

/// Prints an outcome and reports whether it was a success, which becomes
/// the process exit status.
fn emit(as_json: bool, outcome: &impl serde::Serialize) -> bool {
    let val = match serde_json::to_value(outcome) {
        Ok(val) => val,
        Err(e) => {
            eprintln!("Could not encode the outcome: {}", e);
            return false;
        }
    };
    let ok = val.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if as_json {
        println!("{}", val);
        return ok;
    }
    if let Some(msg) = val.get("message").and_then(|v| v.as_str()) {
        println!("{}", msg);
    }
    if let Some(file) = val.get("file").and_then(|v| v.as_str()) {
        println!("File: {}", file);
    }
    if let (Some(records), Some(pages)) = (
        val.get("records_processed").and_then(|v| v.as_u64()),
        val.get("pages_processed").and_then(|v| v.as_u64()),
    ) {
        println!("Extracted {} drivers across {} pages", records, pages);
    }
    if ok && val.get("message").is_none() && val.get("file").is_none() {
        println!("Done.");
    }
    ok
}
