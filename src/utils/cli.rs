//! Command-line argument parsing and help for pdv.
//!
//! Flags handled here never reach the pipeline: `--init`, `--init-full` and `--config-help`
//! print or write something and exit. Everything else becomes a [CliAction] for `main`.

use crate::config::Config;
use crate::logging::LogFormat;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};

use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pdv",
    version,
    about = "Preview numeric arrays, pickles and model checkpoints as HTML"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormatArg,

    /// Read configuration from this file instead of the default location.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root substituted for ${workspaceFolder} in the script option.
    #[arg(long, value_name = "DIR", global = true)]
    pub workspace: Option<PathBuf>,

    /// Generate a minimal default configuration.
    #[arg(long)]
    pub init: bool,

    /// Generate the full configuration with all options.
    #[arg(long = "init-full")]
    pub init_full: bool,

    /// Display all the configuration options.
    #[arg(long = "config-help")]
    pub config_help: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a file once and write the HTML document.
    Render(RenderArgs),
    /// Keep a preview document up to date while the file changes.
    Watch(WatchArgs),
    /// Print the format kind and tag of each file.
    Classify {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Parser)]
pub struct RenderArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output file (default: stdout).
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Dump everything instead of a bounded preview.
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct WatchArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output file rewritten on every update.
    #[arg(short, long, value_name = "OUT")]
    pub output: PathBuf,

    /// Dump everything instead of a bounded preview.
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Compact,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

pub enum CliAction {
    Render(RenderArgs),
    Watch(WatchArgs),
    Classify(Vec<PathBuf>),
    Exit,
}

pub fn handle_args(cli: &Cli) -> CliAction {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    if cli.init || cli.init_full {
        match Config::generate_default(&config_path, !cli.init_full) {
            Ok(()) => println!("Wrote {}", config_path.display()),
            Err(e) => eprintln!("Error: {}", e),
        }
        return CliAction::Exit;
    }

    if cli.config_help {
        print_config_help();
        return CliAction::Exit;
    }

    match &cli.command {
        Some(Command::Render(args)) => CliAction::Render(args.clone()),
        Some(Command::Watch(args)) => CliAction::Watch(args.clone()),
        Some(Command::Classify { files }) => CliAction::Classify(files.clone()),
        None => {
            let _ = Cli::command().print_help();
            CliAction::Exit
        }
    }
}

fn print_config_help() {
    let help_text = r##"
pdv - Full Configuration Guide (pdv.toml)

=========================
 Decoder
=========================
[decoder]
  interpreter                Interpreter running the script, "default" searches python3/python
  script                     Decoding script, "default" uses the bundled read_files.py
                             ${workspaceFolder} is replaced with --workspace (or removed)
  mode                       "preview" (bounded output) or "full"
  timeout_secs               Seconds before a decode counts as failed (0 = no timeout)
  workers                    Decode threads used by `pdv watch` (1-16) [default: 2]

=========================
 Render
=========================
[render]
  stylesheet                 Optional CSS href linked from the document head
  font_family                Font stack of the content block
  max_lines                  Lines kept from the decoder output (0 = unbounded) [default: 20000]
  max_line_chars             Characters kept per line (0 = unbounded) [default: 200000]
  show_file_info             Show name, kind, size and mtime above the content [default: true]

=========================
 Editor
=========================
[editor]
  cmd                        Command used to reopen a file as text (e.g., "nvim", "code")

ENVIRONMENT:
  PDV_CONFIG                 Override the default config path
  PDV_SCRIPT_DIR             Directory holding read_files.py
  RUST_LOG                   Override the log filter
"##;

    println!("{}", help_text);
}
