use anyhow::Result;
use clap::Parser;
use git_autocommit::app::context::AppContext;
use git_autocommit::cli::{Cli, Commands};
use git_autocommit::core::git;
use git_autocommit::logging::init::{init_tracing, init_tracing_with_file};
use git_autocommit::run;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = match &cli.command {
        Commands::Start { path } => path.as_deref(),
    };
    let ctx = AppContext::resolve(path, cli.verbose)?;

    // Monitoring sessions also log to a file inside the repository's git dir
    match git::discover(&ctx.target) {
        Ok(layout) => init_tracing_with_file(&layout.git_dir, ctx.verbosity)?,
        Err(_) => init_tracing(ctx.verbosity)?,
    }

    run(&cli, &ctx)
}
