//! Command dispatch: bridges CLI args to the core utilities and output formatting.

pub mod auth;
pub mod config_cmd;
pub mod hotspot;
pub mod queue;
pub mod socket;
pub mod util;

use clap::CommandFactory;

use crate::cli::{Cli, Command, CompletionsArgs, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Hotspot(args) => hotspot::handle(args, global).await,
        Command::Queue(args) => queue::handle(args, global).await,
        Command::Socket(args) => socket::handle(args, global).await,
        Command::Auth(args) => auth::handle(args, global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            completions(&args);
            Ok(())
        }
    }
}

fn completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "zealnet", &mut std::io::stdout());
}
