use crate::room::{ConnectionId, RelayCommand};
use crate::signaling::SignalingService;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let connection = ConnectionId::new();
    info!("New WebSocket connection: {}", connection);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_connection(connection, tx);
    if service
        .relay_tx
        .send(RelayCommand::Connected { connection })
        .await
        .is_err()
    {
        error!("Relay is not running, dropping {}", connection);
        service.remove_connection(&connection);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        let cmd = RelayCommand::Inbound {
                            connection,
                            text: text.to_string(),
                        };
                        if let Err(e) = service.relay_tx.send(cmd).await {
                            error!("Relay died: {}", e);
                            break;
                        }
                    }
                    Message::Binary(_) => {
                        warn!("Ignoring binary frame from {}", connection);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_connection(&connection);
    // sent whichever half ended first; the relay ignores unknown connections
    let _ = service
        .relay_tx
        .send(RelayCommand::Disconnected { connection })
        .await;
    info!("WebSocket disconnected: {}", connection);
}
