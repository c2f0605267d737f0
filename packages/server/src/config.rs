//! Runtime configuration.

use std::time::Duration;

use crate::domain::{RoomName, ValueObjectError};

/// Whether the sender of a chat message receives its own broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoPolicy {
    #[default]
    ExcludeSender,
    IncludeSender,
}

/// Hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Room readable and writable by guests
    pub public_room: RoomName,
    /// Number of history entries replayed on join / authenticate
    pub history_limit: usize,
    /// Capacity of each connection's outbound queue
    pub queue_capacity: usize,
    pub echo_policy: EchoPolicy,
}

impl HubConfig {
    pub fn with_public_room(mut self, name: impl Into<String>) -> Result<Self, ValueObjectError> {
        self.public_room = RoomName::new(name.into())?;
        Ok(self)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// A capacity of zero is raised to one; bounded queues need room for one item.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_echo_policy(mut self, policy: EchoPolicy) -> Self {
        self.echo_policy = policy;
        self
    }

    pub fn is_public(&self, room: &RoomName) -> bool {
        &self.public_room == room
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            public_room: RoomName::default(),
            history_limit: 20,
            queue_capacity: 256,
            echo_policy: EchoPolicy::default(),
        }
    }
}

/// Per-connection pump configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    /// Interval between liveness probes (WebSocket ping)
    pub heartbeat_interval: Duration,
    /// The connection is dropped when nothing is read for this long
    pub read_timeout: Duration,
    /// Deadline for one outbound write (including coalesced items)
    pub write_timeout: Duration,
    /// Largest accepted inbound frame, in bytes
    pub max_frame_bytes: usize,
}

impl PumpConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            max_frame_bytes: 64 * 1024,
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
