//! IO devices to read frames from.
use crate::dispatch::{dispatch, Dispatch, Role};
use crate::output::TelemetrySink;
use crate::window::{ByteWindow, Feed, INTER_BYTE_TIMEOUT};
use std::io;
use std::time::{Duration, Instant};

/// Source of single bytes, polled once per scheduling tick.
pub trait ByteSource {
    /// Return the next byte if one is available, without blocking.
    fn poll_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Diagnostics context handed to a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Identifies the listener in log events.
    pub component: String,
}

impl Context {
    pub fn new(component: impl Into<String>) -> Context {
        Context {
            component: component.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub inter_byte_timeout: Duration,
    /// Drop a partial frame once it reaches this many bytes. `None` waits for the timeout.
    pub max_buffer: Option<usize>,
    pub context: Context,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            inter_byte_timeout: INTER_BYTE_TIMEOUT,
            max_buffer: None,
            context: Context::new("omnik"),
        }
    }
}

/// Counters of what happened on the line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListenerStats {
    pub frames: usize,
    pub checksum_errors: usize,
    pub size_mismatches: usize,
    pub unknown_messages: usize,
    pub timeouts: usize,
}

/// Outcome of a single tick.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// No byte was available.
    Idle,
    /// A byte was appended to the partial frame.
    Building,
    /// A frame was consumed.
    Frame(Dispatch),
    /// A frame was dropped because of a checksum mismatch.
    Dropped,
}

/// Upper case hex with a `:` between bytes.
pub fn to_hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(1)
        .map(hex::encode_upper)
        .collect::<Vec<_>>()
        .join(":")
}

/// Listener on IO device
///
/// Assembles frames from the bytes of the port and publishes their decoded fields.
pub struct FramedListener<P> {
    port: P,
    window: ByteWindow,
    role: Role,
    context: Context,
    stats: ListenerStats,
}

impl<P> FramedListener<P> {
    pub fn new(port: P, role: Role, config: ListenerConfig) -> FramedListener<P> {
        FramedListener {
            port,
            window: ByteWindow::new(config.inter_byte_timeout).with_max_len(config.max_buffer),
            role,
            context: config.context,
            stats: ListenerStats::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Drop the partial frame if the line has been quiet for too long.
    pub fn expire(&mut self, now: Instant) {
        let stale = self.window.expire(now);
        if stale > 0 {
            self.stats.timeouts += 1;
            tracing::debug!(
                component = %self.context.component,
                bytes = stale,
                "discarded partial frame after timeout"
            );
        }
    }

    /// Feed one byte received at `now` and publish the fields of a completed frame.
    pub fn receive(&mut self, byte: u8, now: Instant, sink: &mut dyn TelemetrySink) -> Step {
        self.expire(now);

        let span = tracing::debug_span!("frame", component = %self.context.component, role = %self.role);
        let _enter = span.enter();

        match self.window.feed(byte, now) {
            Feed::Building => Step::Building,
            Feed::Rejected { error, raw } => {
                self.stats.checksum_errors += 1;
                tracing::warn!("{}", error);
                tracing::info!("Received bytes: {}", to_hex_dump(&raw));
                Step::Dropped
            }
            Feed::Ready(frame) => {
                let result = dispatch(self.role, &frame);
                match &result {
                    Dispatch::Decoded(_) | Dispatch::NoData => self.stats.frames += 1,
                    Dispatch::Unknown(_) => self.stats.unknown_messages += 1,
                    Dispatch::Rejected { .. } => self.stats.size_mismatches += 1,
                }
                for field in result.fields() {
                    tracing::trace!(key = %frame.key(), "{}", field);
                    sink.publish(field);
                }
                Step::Frame(result)
            }
        }
    }
}

impl<P: ByteSource> FramedListener<P> {
    /// One scheduling tick: expire stale data and process at most one byte.
    pub fn step(&mut self, now: Instant, sink: &mut dyn TelemetrySink) -> anyhow::Result<Step> {
        match self.port.poll_byte()? {
            Some(byte) => Ok(self.receive(byte, now, sink)),
            None => {
                self.expire(now);
                Ok(Step::Idle)
            }
        }
    }
}

/// Serial devices such as USB
pub mod serial {
    use super::{error::DeviceError, ByteSource, FramedListener};
    use crate::output::TelemetrySink;
    use serialport::SerialPort;
    use std::io::{self, Read};
    use std::time::{Duration, Instant};
    use tokio::io::AsyncReadExt;

    /// Time to sleep when the blocking port has nothing to read.
    const POLL_INTERVAL: Duration = Duration::from_millis(5);

    impl ByteSource for Box<dyn SerialPort> {
        fn poll_byte(&mut self) -> io::Result<Option<u8>> {
            if self.bytes_to_read()? == 0 {
                return Ok(None);
            }
            let mut byte = [0u8; 1];
            match self.read(&mut byte) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(byte[0])),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
                Err(e) => Err(e),
            }
        }
    }

    impl FramedListener<Box<dyn SerialPort>> {
        /// Poll the port forever.
        pub fn run(&mut self, sink: &mut dyn TelemetrySink) -> anyhow::Result<()> {
            loop {
                if let super::Step::Idle = self.step(Instant::now(), sink)? {
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    impl FramedListener<tokio_serial::SerialStream> {
        /// Read one byte at a time until the stream closes.
        ///
        /// A stalled line still expires the partial frame once the inter byte timeout passed.
        pub async fn run(&mut self, sink: &mut (dyn TelemetrySink + Send)) -> anyhow::Result<()> {
            // wake up a little after the partial frame would expire
            let timeout = self.window.timeout() + Duration::from_millis(1);
            loop {
                match tokio::time::timeout(timeout, self.port.read_u8()).await {
                    Ok(Ok(byte)) => {
                        self.receive(byte, Instant::now(), sink);
                    }
                    Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        // stream closed. If buffer empty, normal close.
                        if self.window.is_empty() {
                            return Ok(());
                        } else {
                            return Err(DeviceError::ConnectionLost)?;
                        }
                    }
                    Ok(Err(e)) => return Err(e)?,
                    Err(_elapsed) => self.expire(Instant::now()),
                }
            }
        }
    }
}

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, PartialEq)]
    pub enum DeviceError {
        #[error("Connection lost to device")]
        ConnectionLost,
    }
}
