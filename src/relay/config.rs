//! Relay hub configuration

/// Default number of frames queued per connection before frames are dropped
pub const DEFAULT_PEER_QUEUE_CAPACITY: usize = 256;

/// Relay hub configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Capacity of each connection's outbound queue
    ///
    /// A peer whose queue is full has new frames dropped for it until it
    /// catches up.
    pub peer_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            peer_queue_capacity: DEFAULT_PEER_QUEUE_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Set the per-connection outbound queue capacity (at least 1)
    pub fn peer_queue_capacity(mut self, capacity: usize) -> Self {
        self.peer_queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.peer_queue_capacity, DEFAULT_PEER_QUEUE_CAPACITY);
    }

    #[test]
    fn test_builder_queue_capacity() {
        assert_eq!(RelayConfig::default().peer_queue_capacity(8).peer_queue_capacity, 8);
        assert_eq!(RelayConfig::default().peer_queue_capacity(0).peer_queue_capacity, 1);
    }
}
