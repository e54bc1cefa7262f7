use clap::builder::styling::{AnsiColor, Effects};
use clap::builder::Styles;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "Lume")]
#[command(about = "CMS development server for static sites")]
#[command(long_about = "Lume: build, serve and reload a CMS for your static site")]
#[command(version)]
#[command(author)]
#[command(styles = get_styles())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the CMS server and restart it when its config changes
    Cms {
        /// Project root containing the CMS config
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Site config file, relative to the root
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a worker that reads commands from stdin and reports on stdout
    Worker {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn get_styles() -> Styles {
    Styles::styled()
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Red.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
}
