//! Assemble frames out of a stream that delivers one byte at a time.
use crate::protocol::{self, error::FrameCheckError, ParsedFrame};
use bytes::BytesMut;
use std::time::{Duration, Instant};

/// Maximum gap between two bytes of the same frame.
pub const INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(50);

/// Result of feeding a single byte.
#[derive(Debug, PartialEq)]
pub enum Feed {
    /// More bytes are needed.
    Building,
    /// A frame passed validation. The window has been cleared.
    Ready(ParsedFrame),
    /// A complete candidate frame was dropped. The window has been cleared.
    Rejected { error: FrameCheckError, raw: BytesMut },
}

/// Sliding receive buffer with inter byte timeout recovery.
#[derive(Debug)]
pub struct ByteWindow {
    buffer: BytesMut,
    last_received: Option<Instant>,
    timeout: Duration,
    max_len: Option<usize>,
}

impl Default for ByteWindow {
    fn default() -> Self {
        ByteWindow::new(INTER_BYTE_TIMEOUT)
    }
}

impl ByteWindow {
    pub fn new(timeout: Duration) -> ByteWindow {
        ByteWindow {
            // Large enough for the longest frame
            buffer: BytesMut::with_capacity(protocol::MAX_FRAME_LEN),
            last_received: None,
            timeout,
            max_len: None,
        }
    }

    /// Drop a partial frame once it has grown to `max_len` bytes.
    ///
    /// Without a limit, bytes in front of a start marker are only discarded by the timeout. The
    /// limit is never lower than the longest possible frame.
    pub fn with_max_len(mut self, max_len: Option<usize>) -> ByteWindow {
        self.max_len = max_len.map(|len| len.max(protocol::MAX_FRAME_LEN));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard the partial frame if the line has been quiet for longer than the timeout.
    ///
    /// Returns the number of discarded bytes.
    pub fn expire(&mut self, now: Instant) -> usize {
        match self.last_received {
            Some(last) if now.saturating_duration_since(last) > self.timeout => {
                self.last_received = None;
                let stale = self.buffer.len();
                self.buffer.clear();
                stale
            }
            _ => 0,
        }
    }

    /// Append a byte received at `now` and check whether a frame is complete.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Feed {
        let stale = self.expire(now);
        if stale > 0 {
            tracing::debug!(bytes = stale, "discarded partial frame after timeout");
        }

        self.last_received = Some(now);
        self.buffer.extend_from_slice(&[byte]);

        match protocol::try_validate(&self.buffer) {
            Ok(frame) => {
                self.buffer.clear();
                Feed::Ready(frame)
            }
            Err(FrameCheckError::Incomplete) => {
                if let Some(max_len) = self.max_len {
                    if self.buffer.len() >= max_len {
                        tracing::debug!(bytes = self.buffer.len(), "discarded oversized partial frame");
                        self.buffer.clear();
                    }
                }
                Feed::Building
            }
            Err(error) => Feed::Rejected {
                error,
                raw: self.buffer.split(),
            },
        }
    }
}
