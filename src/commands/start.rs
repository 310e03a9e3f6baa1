use std::{path::Path, sync::Arc};

use anyhow::{Result, bail};
use console::style;

use super::Command;
use crate::{
    app::context::AppContext,
    config::AutocommitConfig,
    core::{
        git::{self, GitGateway, VersionControl},
        runtime::monitor::{MONITOR, StartOptions, start_foreground},
    },
};

pub struct StartCommand;

impl Command for StartCommand {
    fn run(&self, ctx: &AppContext) -> Result<()> {
        if !ctx.target.is_dir() {
            bail!("{} is not a directory", ctx.target.display());
        }

        let gateway = GitGateway::new(&ctx.target);
        if !gateway.is_initialized()? {
            print_init_instructions(&ctx.target);
            bail!("{} is not a Git repository", ctx.target.display());
        }

        let repo = git::discover(&ctx.target)?;
        let cfg = AutocommitConfig::load(&repo.workdir)?;
        let opts = StartOptions {
            target: ctx.target.clone(),
            repo,
            cfg,
        };
        start_foreground(&MONITOR, &opts, Arc::new(gateway))
    }
}

fn print_init_instructions(target: &Path) {
    eprintln!(
        "{}",
        style("Git repository not initialized. Please initialize it first with:").yellow()
    );
    eprintln!(
        "{}",
        style(format!(
            "cd \"{}\" && git init && git add . && git commit -m \"Initial commit\"",
            target.display()
        ))
        .blue()
    );
}
