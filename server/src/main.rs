use clap::Parser;
use log::info;
use server::external::LoggingCollaborators;
use server::lobby_manager::LobbyManager;
use server::match_manager::MatchManager;
use server::session::SessionRegistry;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Main-method of the application.
/// Parses command-line arguments, wires the orchestrators together and
/// runs until interrupted. The session transport attaches to the
/// constructed managers; until then the binary only reports liveness.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Seconds between registry status log lines
        #[clap(short, long, default_value = "60")]
        status_interval: u64,
    }

    let args = Args::parse();

    // One instance of each service per process, handed around by Arc
    // rather than hidden behind globals.
    let collaborators = Arc::new(LoggingCollaborators);
    let sessions = Arc::new(SessionRegistry::new());
    let matches = Arc::new(MatchManager::new(
        Arc::clone(&sessions),
        collaborators.clone(),
    ));
    let lobbies = Arc::new(LobbyManager::new(
        Arc::clone(&sessions),
        Arc::clone(&matches),
        collaborators.clone(),
        collaborators,
    ));

    info!("Server started");

    // Periodic operator heartbeat
    let status_handle = {
        let lobbies = Arc::clone(&lobbies);
        tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(args.status_interval.max(1)));
            loop {
                timer.tick().await;
                let open = lobbies.get_public_lobbies().await.len();
                info!("Status: {} open public lobbies", open);
            }
        })
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = status_handle => {
            if let Err(e) = result {
                eprintln!("Status task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
