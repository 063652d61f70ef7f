use anyhow::Result;
use clap::Parser;

use expo_console::cli::commands::act::ActCommand;
use expo_console::cli::commands::incidents::IncidentsCommand;
use expo_console::cli::commands::list::ListCommand;
use expo_console::cli::commands::proof::ProofCommand;
use expo_console::cli::commands::sessions::SessionsCommand;
use expo_console::cli::commands::show::ShowCommand;
use expo_console::cli::commands::watch::WatchCommand;
use expo_console::cli::commands::{show_how_to_use, Command};
use expo_console::cli::{Cli, Commands};
use expo_console::{config, init_config, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(&config()?.observability)?;
    init_config()?;

    let role = cli.role;
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        match cli.command {
            // No subcommand: explain how to get started
            None => show_how_to_use().await,
            Some(Commands::Show { event_id }) => ShowCommand::new(event_id).with_role(role).execute().await,
            Some(Commands::List { state }) => ListCommand::new().with_state(state).with_role(role).execute().await,
            Some(Commands::Watch { event_id, monitor }) => {
                WatchCommand::new(event_id)
                    .with_monitor(monitor)
                    .with_role(role)
                    .execute()
                    .await
            }
            Some(Commands::Act {
                event_id,
                action,
                reason,
                yes,
            }) => {
                ActCommand::new(event_id, action)
                    .with_reason(reason)
                    .with_auto_confirm(yes)
                    .with_role(role)
                    .execute()
                    .await
            }
            Some(Commands::SubmitProof { event_id, file }) => {
                ProofCommand::new(event_id, file).with_role(role).execute().await
            }
            Some(Commands::Sessions { event_id, start, end }) => {
                SessionsCommand::new(event_id)
                    .with_start(start)
                    .with_end(end)
                    .with_role(role)
                    .execute()
                    .await
            }
            Some(Commands::Incidents { event_id, advance }) => {
                IncidentsCommand::new(event_id)
                    .with_advance(advance)
                    .with_role(role)
                    .execute()
                    .await
            }
        }
    });

    shutdown_telemetry();
    result
}
