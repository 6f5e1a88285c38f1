//! main.rs
//! Entry point for pdv

use pydata_preview::app::{EditorOpener, FilePanel, WatchHost, render_once, spawn_stdin_reader};
use pydata_preview::config::Config;
use pydata_preview::core::{DecodeMode, classify};
use pydata_preview::logging::{LogConfig, init_logging};
use pydata_preview::session::{Panel, SessionOptions};
use pydata_preview::utils::cli::{Cli, CliAction, RenderArgs, WatchArgs, handle_args};
use pydata_preview::utils::shorten_home_path;

use anyhow::{Context, Result, bail};
use clap::Parser;

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format.into())
        .with_ansi(io::stderr().is_terminal());
    if let Err(e) = init_logging(&log) {
        eprintln!("[pdv] logging disabled: {e}");
    }

    let action = handle_args(&cli);
    if let CliAction::Exit = action {
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load(),
    };

    match action {
        CliAction::Render(args) => run_render(&config, cli.workspace, args),
        CliAction::Watch(args) => run_watch(&config, cli.workspace, args),
        CliAction::Classify(files) => {
            run_classify(&files);
            Ok(())
        }
        CliAction::Exit => Ok(()),
    }
}

fn session_options(config: &Config, workspace: Option<PathBuf>, full: bool) -> SessionOptions {
    let mut decoder = config.decoder_settings(workspace);
    if full {
        decoder = decoder.with_mode(DecodeMode::Full);
    }
    SessionOptions {
        decoder,
        compose: config.compose_options(),
        show_file_info: config.render().show_file_info(),
    }
}

fn existing_file(path: &Path) -> Result<PathBuf> {
    let resolved =
        fs::canonicalize(path).with_context(|| format!("cannot open {}", path.display()))?;
    if !resolved.is_file() {
        bail!("{} is not a file", shorten_home_path(&resolved));
    }
    Ok(resolved)
}

fn run_render(config: &Config, workspace: Option<PathBuf>, args: RenderArgs) -> Result<()> {
    let file = existing_file(&args.file)?;
    let panel: Box<dyn Panel> = match &args.output {
        Some(out) => Box::new(FilePanel::to_file(out)),
        None => Box::new(FilePanel::stdout()),
    };
    let session = render_once(&file, panel, session_options(config, workspace, args.full));
    if session.document().is_none() {
        bail!("nothing was rendered for {}", shorten_home_path(&file));
    }
    Ok(())
}

fn run_watch(config: &Config, workspace: Option<PathBuf>, args: WatchArgs) -> Result<()> {
    let file = existing_file(&args.file)?;
    let mut host = WatchHost::new(
        session_options(config, workspace, args.full),
        config.decoder().workers(),
        Box::new(EditorOpener::new(config.editor().clone())),
    );
    host.open(&file, Box::new(FilePanel::to_file(&args.output)))
        .with_context(|| format!("watching {}", shorten_home_path(&file)))?;
    host.run(spawn_stdin_reader());
    Ok(())
}

fn run_classify(files: &[PathBuf]) {
    for file in files {
        let kind = classify(&file.to_string_lossy());
        println!("{}\t{}\t{}", kind.label(), kind.tag(), shorten_home_path(file));
    }
}
