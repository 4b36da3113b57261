use std::time::Duration;

use thiserror::Error;

use crate::codec::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_PAYLOAD};
use crate::protocol::UpgradeDetection;

const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
const DEFAULT_MAX_FRAME_SIZE: usize = 512;
const MIN_FRAME_SIZE: usize = 16;

const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-connection settings shared by every session a server spawns.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    read_buffer_size: usize,
    max_header_bytes: usize,
    header_timeout: Option<Duration>,
    max_frame_size: usize,
    max_incoming_payload: usize,
    write_timeout: Option<Duration>,
    upgrade_detection: UpgradeDetection,
}

/// A [`SessionConfig`] value that no session can work with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max frame size {0} is below the minimum of 16")]
    FrameSizeTooSmall(usize),

    #[error("read buffer size must not be zero")]
    ZeroReadBuffer,

    #[error("max header bytes must not be zero")]
    ZeroHeaderLimit,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            header_timeout: Some(DEFAULT_HEADER_TIMEOUT),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_incoming_payload: DEFAULT_MAX_PAYLOAD,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            upgrade_detection: UpgradeDetection::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of each socket read. Must not be zero.
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_max_header_bytes(mut self, max: usize) -> Self {
        self.max_header_bytes = max;
        self
    }

    /// Time allowed for the whole request header to arrive; `None` waits forever.
    #[must_use]
    pub fn with_header_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.header_timeout = timeout;
        self
    }

    /// Maximum size of one outbound frame on the wire, header included. Larger payloads
    /// are fragmented.
    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Largest payload accepted in one client frame.
    #[must_use]
    pub fn with_max_incoming_payload(mut self, max: usize) -> Self {
        self.max_incoming_payload = max;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_upgrade_detection(mut self, detection: UpgradeDetection) -> Self {
        self.upgrade_detection = detection;
        self
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    pub fn header_timeout(&self) -> Option<Duration> {
        self.header_timeout
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn max_incoming_payload(&self) -> usize {
        self.max_incoming_payload
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    pub fn upgrade_detection(&self) -> UpgradeDetection {
        self.upgrade_detection
    }

    /// Checks the values the setters accept unchecked.
    ///
    /// Sessions call this when they are created, so an invalid config fails there
    /// instead of misbehaving later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_size < MIN_FRAME_SIZE {
            return Err(ConfigError::FrameSizeTooSmall(self.max_frame_size));
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::ZeroReadBuffer);
        }
        if self.max_header_bytes == 0 {
            return Err(ConfigError::ZeroHeaderLimit);
        }
        Ok(())
    }
}
