//! Peer networking: outbound broadcast queue and UDP transport between robots

use crate::error::NetworkError;
use crate::node::{NodeEvent, Origin};
use log::{debug, error, warn};
use shared::PeerCommand;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Largest payload a UDP datagram can carry over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Anything able to deliver a command to the rest of the arena
///
/// Players are reached through the web layer; `include_robots` asks for
/// the other robot nodes to receive the command as well.
pub trait Broadcaster: Send + Sync {
    fn broadcast_command(&self, command: &PeerCommand, include_robots: bool) -> Result<(), NetworkError>;
}

/// Messages sent from the node loop to the sender task
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub command: PeerCommand,
    pub include_robots: bool,
}

/// Spawns task that drains the outbound queue
///
/// Failed broadcasts are logged and dropped, nobody waits on them.
pub fn spawn_sender(
    broadcaster: Arc<dyn Broadcaster>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(e) = broadcaster.broadcast_command(&message.command, message.include_robots) {
                error!(
                    "Error while broadcasting '{}' to other robots and players: {}",
                    message.command.kind(),
                    e
                );
            }
        }
        debug!("Outbound queue closed");
    })
}

/// Sends commands to the other robot nodes over UDP
pub struct UdpBroadcaster {
    socket: Arc<UdpSocket>,
    peers: Vec<SocketAddr>,
}

impl UdpBroadcaster {
    pub fn new(socket: Arc<UdpSocket>, peers: Vec<SocketAddr>) -> Self {
        Self { socket, peers }
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }
}

impl Broadcaster for UdpBroadcaster {
    fn broadcast_command(&self, command: &PeerCommand, include_robots: bool) -> Result<(), NetworkError> {
        if !include_robots || self.peers.is_empty() {
            return Ok(());
        }
        let data = command.encode()?;

        let mut failed = None;
        for addr in &self.peers {
            // UDP sends only fail when the socket buffer is full
            if let Err(e) = self.socket.try_send_to(&data, *addr) {
                warn!("Failed to send '{}' to {}: {}", command.kind(), addr, e);
                failed = Some(*addr);
            }
        }
        match failed {
            Some(addr) => Err(NetworkError::Unreachable {
                addr: addr.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Spawns task that continuously listens for commands from other robots
pub fn spawn_peer_receiver(socket: Arc<UdpSocket>, events: mpsc::UnboundedSender<NodeEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => {
                    if let Ok(command) = PeerCommand::decode(&buffer[0..len]) {
                        let event = NodeEvent::Command {
                            command,
                            origin: Origin::Peer(addr.ip()),
                        };
                        if let Err(e) = events.send(event) {
                            error!("Failed to send command to node loop: {}", e);
                            break;
                        }
                    } else {
                        warn!("Failed to deserialize command from {}", addr);
                    }
                }
                Err(e) => {
                    error!("Error receiving command: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    })
}
