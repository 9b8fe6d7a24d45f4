pub mod check;
pub mod span;

use chanspan::config::Config;
use clap::Command;
use color_eyre::eyre::Result;

/// Register all application commands
pub fn register_commands(app: Command) -> Command {
    app.subcommand(span::register_command(Command::new("span")))
        .subcommand(check::register_command(Command::new("check")))
}

/// Handle all application commands
pub async fn handle_commands(matches: clap::ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("span", span_matches)) => span::handle_command(span_matches, config).await,
        Some(("check", check_matches)) => check::handle_command(check_matches, config).await,
        _ => {
            println!("Please specify a subcommand. Use --help for more information.");
            Ok(())
        },
    }
}
