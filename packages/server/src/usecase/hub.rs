//! UseCase: Hub（接続とルームの登録簿、メッセージのファンアウト）
//!
//! Hub は接続ごとの送信キュー（`mpsc::Sender`）を唯一保持する所有者です。
//! 全ての状態変更は 1 つの `Mutex<HubState>` の内側で行われるため、
//! 登録・解除・ブロードキャストは互いに直列化されます。
//!
//! - 送信キューへの投入は `try_send` のみ（ネットワーク I/O を待たない）
//! - キューが満杯 / 閉じている接続はその場で退去させる
//! - ハンドルを捨てると送信キューが閉じ、送信ループが終了する
//! - 履歴ストアへの追記と再送もロックの内側で待つ（ストアの遅延は Hub 全体の遅延になる）

use std::{collections::HashMap, sync::Arc};

use hiroba_shared::time::{Clock, SystemClock};
use tokio::sync::{Mutex, MutexGuard, mpsc};

use crate::config::{EchoPolicy, HubConfig};
use crate::domain::membership::JoinOutcome;
use crate::domain::{
    AuthGate, ConnectionId, DeliveryError, HistoryEntry, HistoryStore, Identity, Membership,
    Message, MessageContent, PermissionError, RoomName, Timestamp,
};

use super::error::{AuthenticateError, JoinError, SendMessageError};

/// Receiving half of a connection's outbound queue, drained by its send loop
pub type OutboundReceiver = mpsc::Receiver<Message>;

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of members the message was enqueued for
    pub delivered: usize,
    /// Guests skipped in a private room
    pub skipped: usize,
    /// Members evicted because their queue was full or closed
    pub evicted: Vec<ConnectionId>,
}

/// Point-in-time view of one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub name: RoomName,
    pub public: bool,
    pub members: Vec<(ConnectionId, Option<Identity>)>,
}

struct ConnectionHandle {
    outbound: mpsc::Sender<Message>,
    identity: Option<Identity>,
    /// Target of chat messages that name no room
    home_room: RoomName,
}

#[derive(Default)]
struct HubState {
    membership: Membership,
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl HubState {
    fn enqueue(&self, id: &ConnectionId, message: Message) -> Result<(), DeliveryError> {
        let handle = self
            .connections
            .get(id)
            .ok_or(DeliveryError::Closed(*id))?;
        handle.outbound.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull(*id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(*id),
        })
    }

    /// Enqueue for one connection, evicting it if the queue does not accept the message.
    fn deliver(&mut self, id: &ConnectionId, message: Message) -> Result<(), DeliveryError> {
        let result = self.enqueue(id, message);
        if let Err(e) = &result {
            tracing::warn!("Evicting connection {}: {}", id, e);
            self.evict(id);
        }
        result
    }

    /// Drop the handle (closing the queue) and remove the connection from every room.
    fn evict(&mut self, id: &ConnectionId) -> bool {
        let removed = self.connections.remove(id).is_some();
        let left = self.membership.remove_connection(id);
        for room in &left {
            if !self.membership.room_exists(room) {
                tracing::debug!("Room '{}' removed (no members left)", room);
            }
        }
        removed
    }
}

/// 接続・ルーム・履歴をまとめて管理する Hub
pub struct Hub {
    config: HubConfig,
    state: Mutex<HubState>,
    auth_gate: Arc<dyn AuthGate>,
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
}

impl Hub {
    /// 新しい Hub を作成
    pub fn new(
        config: HubConfig,
        auth_gate: Arc<dyn AuthGate>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self::with_clock(config, auth_gate, history, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: HubConfig,
        auth_gate: Arc<dyn AuthGate>,
        history: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            state: Mutex::new(HubState::default()),
            auth_gate,
            history,
            clock,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 新しい接続を登録し、ホームルームに参加させる
    ///
    /// 返り値の Receiver は接続の送信ループが所有します。参加の応答
    /// （`join` メッセージと履歴の再送）は既にキューに積まれています。
    pub async fn connect(&self, home_room: RoomName) -> (ConnectionId, OutboundReceiver) {
        let id = ConnectionId::generate();
        let (outbound, receiver) = mpsc::channel(self.config.queue_capacity);

        let mut state = self.state.lock().await;
        state.connections.insert(
            id,
            ConnectionHandle {
                outbound,
                identity: None,
                home_room: home_room.clone(),
            },
        );
        tracing::info!("Connection {} registered (home room '{}')", id, home_room);

        if let Err(e) = self.join_locked(&mut state, &id, home_room).await {
            tracing::warn!("Connection {} could not join its home room: {}", id, e);
        }
        (id, receiver)
    }

    /// 接続をルームに参加させる
    ///
    /// 参加の応答を送り、公開ルームまたは認証済みの接続には直近の履歴を再送します。
    pub async fn register(
        &self,
        id: &ConnectionId,
        room: RoomName,
    ) -> Result<JoinOutcome, JoinError> {
        let mut state = self.state.lock().await;
        self.join_locked(&mut state, id, room).await
    }

    async fn join_locked(
        &self,
        state: &mut MutexGuard<'_, HubState>,
        id: &ConnectionId,
        room: RoomName,
    ) -> Result<JoinOutcome, JoinError> {
        let authenticated = state
            .connections
            .get(id)
            .ok_or(JoinError::UnknownConnection(*id))?
            .identity
            .is_some();

        let outcome = state.membership.join(*id, room.clone());
        match outcome {
            JoinOutcome::CreatedRoom => {
                tracing::info!("Room '{}' created by {}", room, id);
            }
            JoinOutcome::Joined => tracing::info!("Connection {} joined '{}'", id, room),
            JoinOutcome::AlreadyMember => {
                tracing::debug!("Connection {} is already in '{}'", id, room);
            }
        }

        state.deliver(id, Message::join_ack(room.clone(), self.now()))?;
        if self.config.is_public(&room) || authenticated {
            self.replay_locked(state, id, &room).await?;
        }
        Ok(outcome)
    }

    /// Enqueue the newest history of `room` for `id`, oldest first.
    ///
    /// The replay never asks for more entries than the queue has free slots,
    /// so a small queue truncates the replay instead of evicting the joiner.
    /// A failing store only costs the replay; the join itself stands.
    async fn replay_locked(
        &self,
        state: &mut MutexGuard<'_, HubState>,
        id: &ConnectionId,
        room: &RoomName,
    ) -> Result<(), DeliveryError> {
        let free = state
            .connections
            .get(id)
            .map_or(0, |handle| handle.outbound.capacity());
        let limit = self.config.history_limit.min(free);
        if limit == 0 {
            return Ok(());
        }
        let entries = match self.history.recent(room, limit).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Skipping history replay of '{}' for {}: {}", room, id, e);
                return Ok(());
            }
        };

        tracing::debug!("Replaying {} entries of '{}' to {}", entries.len(), room, id);
        for entry in entries {
            state.deliver(id, Message::from(entry))?;
        }
        Ok(())
    }

    /// 接続を全てのルームから外し、送信キューを閉じる
    ///
    /// 冪等です。既に退去済みの接続に対しては `false` を返します。
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.evict(id);
        if removed {
            tracing::info!("Connection {} unregistered", id);
        }
        removed
    }

    /// トークンを検証し、接続に Identity を束縛する
    ///
    /// 成功時は `auth-result` を送り、所属中の全ルームの履歴を再送します。
    /// 失敗時は `error` を送ります。Identity の束縛は一度きりです。
    ///
    /// 再送中は Hub のロックを保持したまま `HistoryStore::recent` を待ちます。
    /// 再送とブロードキャストを直列化するためで、遅いストアは全ルームの
    /// 送信を同じ時間だけ止めます。
    pub async fn authenticate(
        &self,
        id: &ConnectionId,
        token: &str,
    ) -> Result<Identity, AuthenticateError> {
        let verified = self.auth_gate.verify(token);

        let mut state = self.state.lock().await;
        let now = self.now();
        let handle = state
            .connections
            .get_mut(id)
            .ok_or(AuthenticateError::UnknownConnection(*id))?;

        if handle.identity.is_some() {
            let error = AuthenticateError::AlreadyAuthenticated;
            state.deliver(id, Message::error(error.to_string(), now))?;
            return Err(error);
        }

        let identity = match verified {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Authentication failed for {}: {}", id, e);
                let error = AuthenticateError::Rejected(e);
                state.deliver(id, Message::error(error.to_string(), now))?;
                return Err(error);
            }
        };

        handle.identity = Some(identity.clone());
        tracing::info!("Connection {} authenticated as '{}'", id, identity);

        state.deliver(id, Message::auth_success(identity.clone(), now))?;
        for room in state.membership.rooms_of(id) {
            self.replay_locked(&mut state, id, &room).await?;
        }
        Ok(identity)
    }

    /// ルームのメンバーにチャットメッセージを配信する
    ///
    /// `room` が `None` の場合は送信者のホームルーム宛てになります。
    /// 非公開ルームへの送信には認証とメンバーシップが必要で、拒否した場合は
    /// 送信者に `error` を返し、履歴には何も残しません。
    pub async fn broadcast(
        &self,
        sender: &ConnectionId,
        room: Option<RoomName>,
        content: MessageContent,
    ) -> Result<BroadcastReport, SendMessageError> {
        let now = self.now();
        let mut state = self.state.lock().await;
        let handle = state
            .connections
            .get(sender)
            .ok_or(SendMessageError::UnknownConnection(*sender))?;
        let room = room.unwrap_or_else(|| handle.home_room.clone());
        let identity = handle.identity.clone();

        if let Err(permission) = self.check_send_permission(&state, sender, &identity, &room) {
            tracing::debug!("Rejected message from {} to '{}': {}", sender, room, permission);
            let _ = state.deliver(sender, Message::error(permission.to_string(), now));
            return Err(permission.into());
        }

        // Append and fan-out share the lock with join replay, so every member sees
        // each message exactly once and in history order. Store failures do not
        // block delivery.
        let message = Message::chat(identity.clone(), room.clone(), &content, now);
        let entry = HistoryEntry::new(room.clone(), identity, content, now);
        if let Err(e) = self.history.append(entry).await {
            tracing::warn!("Failed to record history of '{}': {}", room, e);
        }

        let report = self.fan_out(&mut state, sender, &room, message);
        drop(state);

        tracing::debug!(
            "Message from {} to '{}': delivered={}, skipped={}, evicted={}",
            sender,
            room,
            report.delivered,
            report.skipped,
            report.evicted.len()
        );
        Ok(report)
    }

    fn check_send_permission(
        &self,
        state: &HubState,
        sender: &ConnectionId,
        identity: &Option<Identity>,
        room: &RoomName,
    ) -> Result<(), PermissionError> {
        if !self.config.is_public(room) && identity.is_none() {
            return Err(PermissionError::AuthRequired { room: room.clone() });
        }
        if !state.membership.is_member(sender, room) {
            return Err(PermissionError::NotAMember { room: room.clone() });
        }
        Ok(())
    }

    fn fan_out(
        &self,
        state: &mut HubState,
        sender: &ConnectionId,
        room: &RoomName,
        message: Message,
    ) -> BroadcastReport {
        let public = self.config.is_public(room);
        let mut report = BroadcastReport::default();

        for member in state.membership.members(room) {
            if member == *sender && self.config.echo_policy == EchoPolicy::ExcludeSender {
                continue;
            }
            let Some(handle) = state.connections.get(&member) else {
                continue;
            };
            if !public && handle.identity.is_none() {
                report.skipped += 1;
                continue;
            }

            match state.enqueue(&member, message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Evicting connection {}: {}", member, e);
                    report.evicted.push(member);
                }
            }
        }

        for id in &report.evicted {
            state.evict(id);
        }
        report
    }

    /// Send a `system` notice to every connection and then close them all.
    ///
    /// Returns the number of connections closed.
    pub async fn shutdown(&self, notice: &str) -> usize {
        let mut state = self.state.lock().await;
        let message = Message::system(notice, self.now());
        let ids: Vec<ConnectionId> = state.connections.keys().copied().collect();

        for id in &ids {
            if let Err(e) = state.enqueue(id, message.clone()) {
                tracing::debug!("No shutdown notice for {}: {}", id, e);
            }
            state.evict(id);
        }
        tracing::info!("Closed {} connection(s)", ids.len());
        ids.len()
    }

    /// 1 つの接続にだけメッセージを送る（エラー応答など）
    pub async fn reply(&self, id: &ConnectionId, message: Message) -> Result<(), DeliveryError> {
        let mut state = self.state.lock().await;
        state.deliver(id, message)
    }

    /// Reply with an `error` message carrying `content`.
    pub async fn reply_error(
        &self,
        id: &ConnectionId,
        content: impl Into<String>,
    ) -> Result<(), DeliveryError> {
        self.reply(id, Message::error(content, self.now())).await
    }

    pub async fn identity_of(&self, id: &ConnectionId) -> Option<Identity> {
        let state = self.state.lock().await;
        state.connections.get(id).and_then(|h| h.identity.clone())
    }

    pub async fn is_connected(&self, id: &ConnectionId) -> bool {
        self.state.lock().await.connections.contains_key(id)
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    pub async fn rooms_of(&self, id: &ConnectionId) -> Vec<RoomName> {
        self.state.lock().await.membership.rooms_of(id)
    }

    /// Existing rooms with their member counts, sorted by name
    pub async fn room_summaries(&self) -> Vec<(RoomName, usize)> {
        self.state.lock().await.membership.room_summaries()
    }

    pub async fn room_snapshot(&self, room: &RoomName) -> Option<RoomSnapshot> {
        let state = self.state.lock().await;
        if !state.membership.room_exists(room) {
            return None;
        }

        let members = state
            .membership
            .members(room)
            .into_iter()
            .map(|id| {
                let identity = state.connections.get(&id).and_then(|h| h.identity.clone());
                (id, identity)
            })
            .collect();
        Some(RoomSnapshot {
            name: room.clone(),
            public: self.config.is_public(room),
            members,
        })
    }
}
