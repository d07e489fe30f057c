use std::future::Future;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use cofi_tracing::LogFormat;
use tokio::runtime::Runtime;

mod deploy;
mod show;

#[derive(Debug, Parser)]
#[cfg_attr(test, derive(PartialEq))]
#[command(name = "cofi-deploy", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    #[command(flatten)]
    logging: LoggingArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.commands {
            Commands::Completions(args) => args.execute(),
            Commands::Deploy(args) => {
                self.logging.init()?;
                execute_async(args.execute())?
            }
            Commands::Show(args) => {
                self.logging.init()?;
                args.execute()
            }
        }
    }
}

#[derive(Debug, Subcommand)]
#[cfg_attr(test, derive(PartialEq))]
pub enum Commands {
    #[command(about = "Declare and deploy the contracts of a deployment plan")]
    Deploy(Box<deploy::DeployArgs>),

    #[command(about = "Print the latest deployment manifest of a network")]
    Show(show::ShowArgs),

    #[command(about = "Generate shell completion file for specified shell")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
#[cfg_attr(test, derive(PartialEq))]
#[command(next_help_heading = "Logging options")]
pub struct LoggingArgs {
    #[arg(long = "log.format", value_name = "FORMAT", global = true)]
    #[arg(default_value_t = LogFormat::Full)]
    format: LogFormat,

    /// Log filter directives, eg. `executor=trace,info`. Ignored if `RUST_LOG` is set.
    #[arg(long = "log.filter", value_name = "FILTER", global = true)]
    filter: Option<String>,
}

impl LoggingArgs {
    fn init(&self) -> Result<()> {
        cofi_tracing::init(self.format, self.filter.as_deref())
            .context("Failed to initialize logging")
    }
}

#[derive(Debug, Args)]
#[cfg_attr(test, derive(PartialEq))]
pub struct CompletionsArgs {
    pub shell: Shell,
}

impl CompletionsArgs {
    fn execute(self) -> Result<()> {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(self.shell, &mut command, name, &mut std::io::stdout());
        Ok(())
    }
}

pub fn execute_async<F: Future>(future: F) -> Result<F::Output> {
    Ok(build_tokio_runtime().context("Failed to build tokio runtime")?.block_on(future))
}

fn build_tokio_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}
