//! Read from IO devices.

use async_trait::async_trait;

pub use omnik::{Blocking, Omnik};

use crate::device::ListenerStats;
use crate::output::TelemetrySink;

pub mod omnik;

#[async_trait]
pub trait Device {
    /// Receive frames and publish their fields until the device goes away.
    async fn listen(&mut self, sink: &mut (dyn TelemetrySink + Send)) -> anyhow::Result<()>;

    fn stats(&self) -> &ListenerStats;
}
