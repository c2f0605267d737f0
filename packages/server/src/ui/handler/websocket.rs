//! WebSocket connection handlers.
//!
//! Each accepted socket is split into two tasks:
//!
//! - receive loop: reads frames, decodes them into commands and hands them to the Hub
//! - send loop: drains the connection's outbound queue into the socket and sends
//!   heartbeat pings
//!
//! When either task ends the other one is stopped and the connection is
//! unregistered from the Hub.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message as Frame, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::{Sink, SinkExt},
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::{Instant, interval_at, timeout};

use crate::{
    config::PumpConfig,
    domain::{Command, ConnectionId, DecodeError, RoomName},
    infrastructure::dto::conversion::{decode_command, encode_message},
    ui::state::AppState,
    usecase::{Hub, OutboundReceiver},
};

/// Upper bound on messages coalesced into one flush
const MAX_BATCH: usize = 64;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Home room; the public room when omitted
    pub room: Option<String>,
}

#[derive(Debug, Error)]
enum WriteError {
    #[error("write timed out")]
    Timeout,

    #[error(transparent)]
    Socket(#[from] axum::Error),
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let home_room = match query.room.filter(|name| !name.is_empty()) {
        Some(name) => RoomName::new(name.clone()).map_err(|e| {
            tracing::warn!("Rejecting connection to room '{}': {}", name, e);
            StatusCode::BAD_REQUEST
        })?,
        None => state.hub.config().public_room.clone(),
    };

    let hub = state.hub.clone();
    let pump = state.pump;
    Ok(ws
        .max_message_size(pump.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, hub, pump, home_room)))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>, pump: PumpConfig, home_room: RoomName) {
    let (id, outbound) = hub.connect(home_room).await;
    let (sender, receiver) = socket.split();

    let mut send_task = tokio::spawn(send_loop(sender, outbound, id, pump));
    let mut recv_task = tokio::spawn(receive_loop(receiver, hub.clone(), id, pump.read_timeout));

    tokio::select! {
        _ = &mut recv_task => {
            // Unregistering closes the queue; the send loop then says goodbye and exits.
            hub.unregister(&id).await;
            if timeout(pump.write_timeout, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
        _ = &mut send_task => {
            recv_task.abort();
            hub.unregister(&id).await;
        }
    }

    tracing::info!("Connection {} closed", id);
}

async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    hub: Arc<Hub>,
    id: ConnectionId,
    read_timeout: Duration,
) {
    loop {
        let frame = match timeout(read_timeout, receiver.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                tracing::debug!("WebSocket error on {}: {}", id, e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::info!(
                    "Connection {} idle for {:?}, dropping it",
                    id,
                    read_timeout
                );
                break;
            }
        };

        match frame {
            Frame::Text(text) => handle_frame(&hub, &id, text.as_str()).await,
            Frame::Binary(_) => {
                let _ = hub
                    .reply_error(&id, DecodeError::BinaryFrame.to_string())
                    .await;
            }
            Frame::Ping(_) | Frame::Pong(_) => tracing::trace!("Heartbeat from {}", id),
            Frame::Close(_) => {
                tracing::info!("Connection {} requested close", id);
                break;
            }
        }
    }
}

/// Decode one inbound text frame and dispatch it to the Hub.
///
/// Malformed frames are answered with an `error` message; the connection stays open.
pub async fn handle_frame(hub: &Hub, id: &ConnectionId, text: &str) {
    let command = match decode_command(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!("Undecodable frame from {}: {}", id, e);
            if let Err(e) = hub.reply_error(id, e.to_string()).await {
                tracing::debug!("Could not answer {}: {}", id, e);
            }
            return;
        }
    };

    match command {
        Command::Authenticate { token } => {
            if let Err(e) = hub.authenticate(id, &token).await {
                tracing::debug!("authenticate from {} failed: {}", id, e);
            }
        }
        Command::Join { room } => {
            if let Err(e) = hub.register(id, room).await {
                tracing::debug!("join from {} failed: {}", id, e);
            }
        }
        Command::Chat { room, content } => {
            if let Err(e) = hub.broadcast(id, room, content).await {
                tracing::debug!("chat from {} rejected: {}", id, e);
            }
        }
        Command::Empty => tracing::trace!("Ignoring empty message from {}", id),
    }
}

async fn send_loop(
    mut sender: SplitSink<WebSocket, Frame>,
    mut outbound: OutboundReceiver,
    id: ConnectionId,
    pump: PumpConfig,
) {
    let mut heartbeat = interval_at(
        Instant::now() + pump.heartbeat_interval,
        pump.heartbeat_interval,
    );

    loop {
        tokio::select! {
            item = outbound.recv() => {
                let Some(first) = item else {
                    // Queue closed: the connection was unregistered or evicted
                    let _ = send_frame(&mut sender, Frame::Close(None), pump.write_timeout).await;
                    break;
                };
                let result = timeout(
                    pump.write_timeout,
                    write_batch(&mut sender, &mut outbound, first),
                )
                .await
                .unwrap_or(Err(WriteError::Timeout));
                if let Err(e) = result {
                    tracing::debug!("Write to {} failed: {}", id, e);
                    break;
                }
            }
            _ = heartbeat.tick() => {
                let ping = send_frame(&mut sender, Frame::Ping(Bytes::new()), pump.write_timeout);
                if let Err(e) = ping.await {
                    tracing::debug!("Heartbeat to {} failed: {}", id, e);
                    break;
                }
            }
        }
    }
}

/// Write `first` and whatever else is already queued, then flush once.
async fn write_batch<S>(
    sender: &mut S,
    outbound: &mut OutboundReceiver,
    first: crate::domain::Message,
) -> Result<usize, WriteError>
where
    S: Sink<Frame, Error = axum::Error> + Unpin,
{
    let mut written = 0;
    let mut next = Some(first);

    while let Some(message) = next {
        match encode_message(message) {
            Ok(text) => {
                sender.feed(Frame::Text(text.into())).await?;
                written += 1;
            }
            Err(e) => tracing::error!("Failed to encode outbound message: {}", e),
        }
        next = if written < MAX_BATCH {
            outbound.try_recv().ok()
        } else {
            None
        };
    }

    sender.flush().await?;
    Ok(written)
}

async fn send_frame<S>(
    sender: &mut S,
    frame: Frame,
    write_timeout: Duration,
) -> Result<(), WriteError>
where
    S: Sink<Frame, Error = axum::Error> + Unpin,
{
    timeout(write_timeout, sender.send(frame))
        .await
        .map_err(|_| WriteError::Timeout)??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::HubConfig,
        domain::{Identity, Message, MessageKind, Timestamp},
        infrastructure::{auth::StaticTokenAuthGate, history::InMemoryHistoryStore},
    };

    /// Sink that records fed frames and counts flushes
    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Frame>,
        flushes: usize,
    }

    impl Sink<Frame> for RecordingSink {
        type Error = axum::Error;

        fn poll_ready(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
            self.get_mut().frames.push(item);
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            self.get_mut().flushes += 1;
            Poll::Ready(Ok(()))
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    fn queue_notices(count: usize) -> OutboundReceiver {
        let (sender, receiver) = mpsc::channel(count.max(1));
        for i in 0..count {
            sender
                .try_send(Message::system(format!("n{}", i), Timestamp::new(0)))
                .unwrap();
        }
        receiver
    }

    #[tokio::test]
    async fn test_write_batch_coalesces_queued_messages_into_one_flush() {
        // テスト項目: キューに溜まったメッセージは 1 回の flush でまとめて書き込まれる
        // given (前提条件):
        let mut outbound = queue_notices(3);
        let first = outbound.recv().await.unwrap();
        let mut sink = RecordingSink::default();

        // when (操作):
        let written = write_batch(&mut sink, &mut outbound, first).await.unwrap();

        // then (期待する結果):
        assert_eq!(written, 3);
        assert_eq!(sink.frames.len(), 3);
        assert_eq!(sink.flushes, 1);
        assert!(sink.frames.iter().all(|frame| matches!(frame, Frame::Text(_))));
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_write_batch_stops_at_batch_limit() {
        // テスト項目: 1 回の書き込みは MAX_BATCH 件までで、残りはキューに残る
        // given (前提条件):
        let mut outbound = queue_notices(MAX_BATCH + 6);
        let first = outbound.recv().await.unwrap();
        let mut sink = RecordingSink::default();

        // when (操作):
        let written = write_batch(&mut sink, &mut outbound, first).await.unwrap();

        // then (期待する結果):
        assert_eq!(written, MAX_BATCH);
        assert_eq!(sink.flushes, 1);
        assert_eq!(outbound.len(), 6);
    }

    fn create_hub() -> Hub {
        let gate = StaticTokenAuthGate::default()
            .with_token("12345", Identity::new("alice".to_string()).unwrap());
        Hub::new(
            HubConfig::default(),
            Arc::new(gate),
            Arc::new(InMemoryHistoryStore::default()),
        )
    }

    fn drain(receiver: &mut OutboundReceiver) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn room(name: &str) -> RoomName {
        RoomName::new(name.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_reply() {
        // テスト項目: JSON でないフレームには error が返り、接続は維持される
        // given (前提条件):
        let hub = create_hub();
        let (id, mut receiver) = hub.connect(room("public")).await;
        drain(&mut receiver);

        // when (操作):
        handle_frame(&hub, &id, "hello there").await;

        // then (期待する結果):
        let replies = drain(&mut receiver);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].kind, MessageKind::Error);
        assert!(replies[0].content.starts_with("Invalid JSON format."));
        assert!(hub.is_connected(&id).await);
    }

    #[tokio::test]
    async fn test_authenticate_frame_binds_identity() {
        // テスト項目: authenticate フレームで Identity が束縛され auth-result が返る
        // given (前提条件):
        let hub = create_hub();
        let (id, mut receiver) = hub.connect(room("public")).await;
        drain(&mut receiver);

        // when (操作):
        handle_frame(&hub, &id, r#"{"type":"authenticate","content":"12345"}"#).await;

        // then (期待する結果):
        let replies = drain(&mut receiver);
        assert_eq!(replies[0].kind, MessageKind::AuthResult);
        assert_eq!(
            hub.identity_of(&id).await,
            Some(Identity::new("alice".to_string()).unwrap())
        );
    }

    #[tokio::test]
    async fn test_join_frame_adds_room() {
        // テスト項目: join フレームで追加のルームに参加する
        // given (前提条件):
        let hub = create_hub();
        let (id, mut receiver) = hub.connect(room("public")).await;
        drain(&mut receiver);

        // when (操作):
        handle_frame(&hub, &id, r#"{"type":"join","room":"general"}"#).await;

        // then (期待する結果):
        let replies = drain(&mut receiver);
        assert_eq!(replies[0].content, "Welcome to room: general");
        assert_eq!(hub.rooms_of(&id).await, vec![room("general"), room("public")]);
    }

    #[tokio::test]
    async fn test_chat_frame_reaches_other_members() {
        // テスト項目: chat フレームが同じルームの他メンバーに配信される
        // given (前提条件):
        let hub = create_hub();
        let (a, mut rx_a) = hub.connect(room("public")).await;
        let (_b, mut rx_b) = hub.connect(room("public")).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        // when (操作):
        handle_frame(&hub, &a, r#"{"type":"chat","content":"hello"}"#).await;

        // then (期待する結果):
        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, MessageKind::Chat);
        assert_eq!(received[0].content, "hello");
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn test_empty_chat_frame_is_ignored() {
        // テスト項目: 本文が空の chat フレームは何も起こさない
        // given (前提条件):
        let hub = create_hub();
        let (a, mut rx_a) = hub.connect(room("public")).await;
        let (_b, mut rx_b) = hub.connect(room("public")).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        // when (操作):
        handle_frame(&hub, &a, r#"{"type":"chat","content":""}"#).await;

        // then (期待する結果):
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }
}
