//! RTS Dedicated Server

use std::process::ExitCode;

use rts_core::types::TypeRegistry;
use rts_net::Acceptor;
use rts_server::game::GameServer;
use rts_server::lobby::LobbyHost;
use rts_server::scenario::Scenario;
use rts_server::{read_file, ServerConfig, ServerError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> Result<(), ServerError> {
    let mut args = std::env::args().skip(1);
    let registry = TypeRegistry::from_ron_str(&read_file(&args.next().ok_or(ServerError::Usage)?)?)?;
    let config = match args.next() {
        Some(path) => ServerConfig::from_ron_str(&read_file(&path)?)?,
        None => ServerConfig::default(),
    };
    let scenario = match args.next() {
        Some(path) => Scenario::from_ron_str(&read_file(&path)?)?,
        None => Scenario::default(),
    };

    tracing::info!("Starting RTS Dedicated Server");
    let acceptor = Acceptor::bind(config.bind_addr()).await?;
    tracing::info!("Listening on {}", acceptor.local_addr()?);

    let lobby = LobbyHost::new(config.max_players);
    let Some(session) = lobby.run(acceptor).await? else {
        return Ok(());
    };

    let simulation = scenario.build(registry, config.sim.clone(), &session.players())?;
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let simulation = GameServer::new(simulation, session).run(shutdown).await;
    tracing::info!(
        tick = simulation.get_tick(),
        hash = simulation.state_hash(),
        "game over"
    );
    Ok(())
}
