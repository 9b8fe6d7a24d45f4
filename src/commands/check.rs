use chanspan::config::Config;
use chanspan::store::PgMessageStore;
use clap::{ArgMatches, Command};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

/// Register the check command
pub fn register_command(cmd: Command) -> Command {
    cmd.about("Verify that the message store is reachable")
}

pub async fn handle_command(_matches: &ArgMatches, config: &Config) -> Result<()> {
    let store = PgMessageStore::new(&config.database);
    let info = store.connection_info();

    match store.check_connection().await {
        Ok(()) => {
            info!("Message store check passed");
            println!("{}: ok", info);
            Ok(())
        },
        Err(e) => {
            println!("{}: unreachable", info);
            Err(eyre!("Message store check failed: {}", e))
        },
    }
}
