use clap::Parser;
use log::{error, info, warn};
use node::config::NodeConfig;
use node::entity::{PlayMode, Robot};
use node::game::GameState;
use node::network::{spawn_peer_receiver, spawn_sender, UdpBroadcaster};
use node::node::Node;
use node::storage::FileStorage;
use node::utils::random_identifier;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Main-method of the application.
/// Parses command-line arguments, registers the local robot, then runs the node loop.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// IP address to bind the peer socket to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Port used to talk with the other robots
        #[clap(short, long, default_value = "9090")]
        port: u16,
        /// Address of another robot, may be repeated
        #[clap(long = "peer")]
        peers: Vec<SocketAddr>,
        /// Directory where this robot remembers its color and last driver
        #[clap(long)]
        storage_dir: Option<String>,
        /// Stable identifier of this robot, random if not given
        #[clap(long)]
        robot_id: Option<String>,
        /// Life of every robot at the start of a round
        #[clap(long, default_value_t = shared::DEFAULT_MAX_LIFE)]
        max_life: u32,
        /// Grace period before a round lacking players is terminated
        #[clap(long, default_value_t = shared::DEFAULT_ABANDONED_GAME_TIMEOUT_MS)]
        abandon_timeout_ms: u64,
        /// Single robot test drive, no peers
        #[clap(long)]
        standalone: bool,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = Args::parse();

    let config = NodeConfig {
        abandoned_game_timeout_ms: args.abandon_timeout_ms,
        max_life: args.max_life,
        play_mode: if args.standalone {
            PlayMode::Standalone
        } else {
            PlayMode::Multiplayer
        },
        ..NodeConfig::default()
    };

    // Register this node's own robot
    let mut game = GameState::from_config(&config);
    let robot_id = args.robot_id.unwrap_or_else(random_identifier);
    game.add_robot(Robot::new_local(&robot_id))?;
    info!("Local robot {} ({:?})", robot_id, config.play_mode);

    // Peer transport
    let address = format!("{}:{}", args.host, args.port);
    let socket = Arc::new(UdpSocket::bind(&address).await?);
    info!("Listening for peers on {}", address);

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let mut node = Node::new(config, game, outbound_tx);
    if let Some(dir) = args.storage_dir {
        node = node.with_storage(Arc::new(FileStorage::new(dir)));
        if let Err(e) = node.restore().await {
            warn!("Could not restore local robot data: {}", e);
        }
    }

    let handle = node.handle();
    let broadcaster = Arc::new(UdpBroadcaster::new(Arc::clone(&socket), args.peers));
    spawn_sender(broadcaster, outbound_rx);
    spawn_peer_receiver(socket, handle.events());

    // Let the other robots know about us
    handle.announce_local_robot().await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                error!("Node loop failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
