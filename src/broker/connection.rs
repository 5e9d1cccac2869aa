//! Broker connection state, tracked by both the API and the worker.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Observable status of the outbound Kafka connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BrokerStatus {
    /// Startup has not finished connecting yet
    Disconnected = 0,
    /// Publishes are accepted
    Connected = 1,
    /// Shutdown began; never goes back to `Connected`
    Closed = 2,
}

impl BrokerStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BrokerStatus::Connected,
            2 => BrokerStatus::Closed,
            _ => BrokerStatus::Disconnected,
        }
    }
}

impl fmt::Display for BrokerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerStatus::Disconnected => write!(f, "disconnected"),
            BrokerStatus::Connected => write!(f, "connected"),
            BrokerStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Connection state shared between the startup sequence and request handlers.
///
/// Handlers only read. Writes come from the startup sequence
/// (`mark_connected`) and shutdown (`mark_closed`).
///
/// # Memory Ordering
///
/// `SeqCst` throughout, since the value gates control flow in handlers.
pub struct ConnectionState {
    status: AtomicU8,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(BrokerStatus::Disconnected as u8),
        }
    }

    pub fn status(&self) -> BrokerStatus {
        BrokerStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.status() == BrokerStatus::Connected
    }

    /// Record a successful connection. Returns `false` if shutdown already began.
    pub fn mark_connected(&self) -> bool {
        self.status
            .compare_exchange(
                BrokerStatus::Disconnected as u8,
                BrokerStatus::Connected as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Enter the terminal state.
    pub fn mark_closed(&self) {
        self.status.store(BrokerStatus::Closed as u8, Ordering::SeqCst);
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_initial() {
        let state = ConnectionState::new();

        assert_eq!(state.status(), BrokerStatus::Disconnected);
        assert!(!state.is_connected());
    }

    #[test]
    fn test_connection_state_connect() {
        let state = ConnectionState::new();

        assert!(state.mark_connected());
        assert!(state.is_connected());
        // Second transition is a no-op
        assert!(!state.mark_connected());
        assert!(state.is_connected());
    }

    #[test]
    fn test_closed_is_terminal() {
        let state = ConnectionState::new();
        state.mark_connected();
        state.mark_closed();

        assert_eq!(state.status(), BrokerStatus::Closed);
        assert!(!state.mark_connected());
        assert!(!state.is_connected());
    }

    #[test]
    fn test_close_before_connect_wins() {
        let state = ConnectionState::new();
        state.mark_closed();

        assert!(!state.mark_connected());
        assert_eq!(state.status(), BrokerStatus::Closed);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(BrokerStatus::Connected.to_string(), "connected");
        assert_eq!(BrokerStatus::Disconnected.to_string(), "disconnected");
    }
}
