use std::path::PathBuf;

mod demand;
mod init;
mod list;
mod settings;
mod status;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use demand::{Approve, Convert, Reject};
use kara::{
    DocumentId,
    storage::{Directory, Loaded},
};
use list::List;
use settings::Settings;
use status::Status;

/// Parse a document id given on the command line.
fn parse_id(s: &str) -> Result<DocumentId, String> {
    s.trim().parse().map_err(|e| format!("{e}"))
}

/// Load every collection of the data directory at `root`.
fn load(root: PathBuf) -> anyhow::Result<Directory<Loaded>> {
    let display = root.display().to_string();
    Directory::new(root)
        .load_all()
        .with_context(|| format!("failed to load data directory {display}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the data directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Show demand counts and conversion blockers (default)
    Status(Status),

    /// Initialize a new data directory
    Init,

    /// List records with filters, sorting and pagination
    List(List),

    /// Approve a pending demand
    Approve(Approve),

    /// Reject a pending or approved demand
    Reject(Reject),

    /// Convert an approved demand into a contract
    ///
    /// The contract is created under the active settings of the demand's
    /// caisse type.
    Convert(Convert),

    /// Show or publish product settings
    Settings(Settings),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => init::run(&root)?,
            Self::List(command) => command.run(root)?,
            Self::Approve(command) => command.run(root)?,
            Self::Reject(command) => command.run(root)?,
            Self::Convert(command) => command.run(root)?,
            Self::Settings(command) => command.run(root)?,
        }
        Ok(())
    }
}
