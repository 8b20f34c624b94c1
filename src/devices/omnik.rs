//! Omnik inverters and wifi dataloggers on a serial line.
use crate::device::{FramedListener, ListenerConfig, ListenerStats};
use crate::dispatch::Role;
use crate::output::TelemetrySink;
use async_trait::async_trait;
use serialport::SerialPort;
use std::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::Device;

/// Baud rate of the device. Omnik devices talk 9600 Bd, 8N1
pub const BAUD_RATE: u32 = 9600;

/// Read timeout of the blocking port. Reads only happen when bytes are pending.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Device read through the tokio serial stream.
pub struct Omnik {
    reader: FramedListener<SerialStream>,
}

impl Omnik {
    pub fn new<'a>(
        path: impl Into<std::borrow::Cow<'a, str>>,
        baud_rate: u32,
        role: Role,
        config: ListenerConfig,
    ) -> anyhow::Result<Self> {
        let mut port = tokio_serial::new(path, baud_rate).open_native_async()?;

        #[cfg(unix)]
        port.set_exclusive(false)?;

        Ok(Omnik {
            reader: FramedListener::new(port, role, config),
        })
    }
}

#[async_trait]
impl Device for Omnik {
    async fn listen(&mut self, sink: &mut (dyn TelemetrySink + Send)) -> anyhow::Result<()> {
        self.reader.run(sink).await
    }

    fn stats(&self) -> &ListenerStats {
        self.reader.stats()
    }
}

/// Device polled through a blocking serial port, one byte per tick.
pub struct Blocking {
    reader: FramedListener<Box<dyn SerialPort>>,
}

impl Blocking {
    pub fn new<'a>(
        path: impl Into<std::borrow::Cow<'a, str>>,
        baud_rate: u32,
        role: Role,
        config: ListenerConfig,
    ) -> anyhow::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;

        Ok(Blocking {
            reader: FramedListener::new(port, role, config),
        })
    }
}

#[async_trait]
impl Device for Blocking {
    async fn listen(&mut self, sink: &mut (dyn TelemetrySink + Send)) -> anyhow::Result<()> {
        tokio::task::block_in_place(|| self.reader.run(sink))
    }

    fn stats(&self) -> &ListenerStats {
        self.reader.stats()
    }
}
