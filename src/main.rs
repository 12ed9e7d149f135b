use clap::Parser;
use log::*;
use std::{env, process::ExitCode};

use renovate_changesets::{
    Args, Orchestrator, Result, git::Git, shell::ProcessRunner,
};

/// Set by the Actions runner for every step.
const GITHUB_ACTIONS_ENV: &str = "GITHUB_ACTIONS";

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("renovate_changesets")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

async fn execute(args: &Args) -> Result<()> {
    let ctx = args.run_context()?;

    info!(
        "checking dependency changes for PR #{} against {}",
        ctx.pr_number, ctx.base_sha
    );

    let git = Git::new(Box::new(ProcessRunner::new(&ctx.repo_root)));
    let summary = Orchestrator::new(ctx, git).run().await?;

    info!(
        "done: {} written, {} removed, {} skipped, committed: {}",
        summary.written.len(),
        summary.removed.len(),
        summary.skipped.len(),
        summary.committed
    );

    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let args = Args::parse();

    initialize_logger(args.is_debug())?;

    if let Err(err) = execute(&args).await {
        error!("{err}");

        // Surfaces the failure as a workflow annotation.
        if env::var(GITHUB_ACTIONS_ENV).as_deref() == Ok("true") {
            println!("::error::{err}");
        }

        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
