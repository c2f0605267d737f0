//! Room membership index.
//!
//! Membership is a many-to-many relation between connections and rooms. It is
//! recorded in two maps that are always updated together, so a connection is
//! listed under room `R` if and only if `R` is listed under that connection.
//!
//! Rooms exist only while they have members: the first `join` creates a room
//! and removing its last member deletes it.

use std::collections::{BTreeSet, HashMap};

use super::value_object::{ConnectionId, RoomName};

/// Result of [`Membership::join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The room did not exist and was created by this join.
    CreatedRoom,
    Joined,
    AlreadyMember,
}

/// Bidirectional room/connection index
#[derive(Debug, Default)]
pub struct Membership {
    rooms: HashMap<RoomName, BTreeSet<ConnectionId>>,
    connections: HashMap<ConnectionId, BTreeSet<RoomName>>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to `room`, creating the room on first use.
    pub fn join(&mut self, connection: ConnectionId, room: RoomName) -> JoinOutcome {
        let created = !self.rooms.contains_key(&room);
        let inserted = self
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(connection);
        self.connections.entry(connection).or_default().insert(room);

        match (created, inserted) {
            (true, _) => JoinOutcome::CreatedRoom,
            (false, true) => JoinOutcome::Joined,
            (false, false) => JoinOutcome::AlreadyMember,
        }
    }

    /// Remove `connection` from every room it belongs to.
    ///
    /// Returns the rooms it left, in name order. Idempotent.
    pub fn remove_connection(&mut self, connection: &ConnectionId) -> Vec<RoomName> {
        let Some(rooms) = self.connections.remove(connection) else {
            return Vec::new();
        };

        for room in &rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(connection);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }

        rooms.into_iter().collect()
    }

    pub fn is_member(&self, connection: &ConnectionId, room: &RoomName) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(connection))
    }

    /// Members of `room`, in a stable order. Empty if the room does not exist.
    pub fn members(&self, room: &RoomName) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rooms `connection` belongs to, in name order.
    pub fn rooms_of(&self, connection: &ConnectionId) -> Vec<RoomName> {
        self.connections
            .get(connection)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_exists(&self, room: &RoomName) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn member_count(&self, room: &RoomName) -> usize {
        self.rooms.get(room).map_or(0, BTreeSet::len)
    }

    /// All rooms with their member counts, sorted by name.
    pub fn room_summaries(&self) -> Vec<(RoomName, usize)> {
        let mut summaries: Vec<(RoomName, usize)> = self
            .rooms
            .iter()
            .map(|(name, members)| (name.clone(), members.len()))
            .collect();
        summaries.sort_by(|a, b| a.0.cmp(&b.0));
        summaries
    }
}
