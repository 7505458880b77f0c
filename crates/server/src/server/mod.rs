//! WebSocket server: accepts connections and routes their frames into the game.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::packets::ClientMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod client;
pub mod game;
pub mod ticker;

pub use client::{Client, Clients, ConnectionId};
pub use game::GameState;

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    serve(listener, config).await
}

/// Drive the game and accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let movement = Duration::from_millis(config.movement.interval_ms);
    let food = Duration::from_millis(config.food.interval_ms);
    let bomb = Duration::from_millis(config.bomb.interval_ms);

    let game_state = Arc::new(RwLock::new(GameState::new(config)));
    ticker::spawn_tickers(&game_state, movement, food, bomb);

    loop {
        let (stream, addr) = listener.accept().await?;
        let game_state = Arc::clone(&game_state);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, game_state).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let (outbox, mut frames) = mpsc::unbounded_channel::<String>();

    let joined = {
        let mut state = game_state.write().await;
        state.add_client(addr, outbox)
    };
    let client_id = match joined {
        Ok(id) => id,
        Err(e) => {
            let _ = write.send(Message::Close(None)).await;
            return Err(e);
        }
    };

    // Ends once the client is removed and its outbox is dropped.
    let writer = tokio::spawn(async move {
        while let Some(text) = frames.recv().await {
            if let Err(e) = write.send(Message::text(text)).await {
                debug!("Failed to send to {}: {}", addr, e);
                break;
            }
        }
        let _ = write.close().await;
    });

    let mut result = Ok(());
    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Dropping non UTF-8 frame from {}", addr);
                    continue;
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", addr);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                error!("WebSocket error from {}: {}", addr, e);
                break;
            }
        };

        if let Err(e) = dispatch(&game_state, client_id, addr, &text).await {
            result = Err(e);
            break;
        }
    }

    game_state.write().await.remove_client(client_id);
    let _ = writer.await;
    result
}

/// Apply one client frame to the game.
async fn dispatch(
    game_state: &RwLock<GameState>,
    client_id: ConnectionId,
    addr: SocketAddr,
    text: &str,
) -> anyhow::Result<()> {
    let msg = match ClientMessage::parse(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Packet error from {}: {}", addr, e);
            return Ok(());
        }
    };

    match msg {
        ClientMessage::Init => game_state.read().await.handle_init(client_id),
        ClientMessage::ChangeDirection(direction) => {
            game_state.write().await.change_direction(client_id, direction)
        }
    }
}
