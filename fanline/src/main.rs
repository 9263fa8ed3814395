//! fanline CLI: fan out parallel worktrees and reconcile them back.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use fanline::context::RepoContext;
use fanline::exit_codes;
use fanline::fan_out::{InvalidCount, fan_out, parse_count};
use fanline::io::session_store::{SessionCorrupt, SessionNotFound};
use fanline::io::test_runner::CommandTestRunner;
use fanline::logging;
use fanline::reconcile::{MergeConflictError, run_gated_reconcile, run_plain_reconcile};
use fanline::report::{Rendered, render_fan_out, render_gated, render_plain, render_status};
use fanline::status::session_status;

#[derive(Parser, Debug)]
#[command(
    name = "fanline",
    version,
    about = "Fan work out to parallel git worktrees and reconcile it back"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create N workspaces branched from the baseline and record them in the session.
    #[command(name = "fan-out")]
    FanOut {
        /// Number of workspaces to create (positive integer).
        count: String,
        /// Baseline branch. Defaults to the current branch.
        baseline: Option<String>,
    },
    /// Fold tracked workspaces back into the baseline.
    Reconcile {
        /// Validate each workspace first and merge only the accepted ones.
        #[arg(long)]
        gated: bool,
    },
    /// Show which tracked workspaces still exist.
    Status,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match cli.command {
        Command::FanOut { count, baseline } => {
            let count = parse_count(&count)?;
            let ctx = RepoContext::discover(&cwd)?;
            let report = fan_out(&ctx, count, baseline.as_deref())?;
            print_rendered(render_fan_out(&report));
        }
        Command::Reconcile { gated: false } => {
            let ctx = RepoContext::discover(&cwd)?;
            let report = run_plain_reconcile(&ctx)?;
            print_rendered(render_plain(&report));
        }
        Command::Reconcile { gated: true } => {
            let ctx = RepoContext::discover(&cwd)?;
            let runner = CommandTestRunner::new(ctx.config.gate.test_command.clone())?;
            let report = run_gated_reconcile(&ctx, &runner)?;
            print_rendered(render_gated(&report));
        }
        Command::Status => {
            let ctx = RepoContext::discover(&cwd)?;
            let report = session_status(&ctx)?;
            print_rendered(render_status(&report));
        }
    }
    Ok(())
}

fn print_rendered(rendered: Rendered) {
    info!(lines = rendered.out.len(), warnings = rendered.warnings.len(), "report");
    rendered.print();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<InvalidCount>().is_some() {
        exit_codes::INVALID
    } else if err.downcast_ref::<SessionNotFound>().is_some() {
        exit_codes::NO_SESSION
    } else if err.downcast_ref::<SessionCorrupt>().is_some() {
        exit_codes::SESSION_CORRUPT
    } else if err.downcast_ref::<MergeConflictError>().is_some() {
        exit_codes::CONFLICT
    } else {
        exit_codes::INVALID
    }
}
