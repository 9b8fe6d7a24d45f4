use chanspan::config::Config;
use chanspan::span::DurationCalculator;
use chanspan::store::PgMessageStore;
use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::eyre::{Result, eyre};

/// Register the span command
pub fn register_command(cmd: Command) -> Command {
    cmd.about("Compute how long channels have been active")
        .arg(
            Arg::new("channel_id")
                .help("Channel identifiers")
                .required(true)
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print one JSON object per channel")
                .action(ArgAction::SetTrue),
        )
}

/// Compute spans one channel at a time. A failing channel is reported and the
/// rest still run.
pub async fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let json = matches.get_flag("json");
    let channel_ids: Vec<&String> =
        matches.get_many::<String>("channel_id").map(|ids| ids.collect()).unwrap_or_default();

    let store = PgMessageStore::new(&config.database);
    store.log_connection_info();
    let calculator = DurationCalculator::new(store, config.database.timeout());

    let mut failed = 0;
    for channel_id in &channel_ids {
        match calculator.compute_span(channel_id).await {
            Ok(span) if json => println!("{}", serde_json::to_string(&span)?),
            Ok(span) => println!("{}: {}", span.channel_id, span.formatted()),
            Err(e) => {
                eprintln!("{}: {} ({})", channel_id, e, e.kind());
                failed += 1;
            },
        }
    }

    if failed > 0 {
        return Err(eyre!("{} of {} channels failed", failed, channel_ids.len()));
    }
    Ok(())
}
