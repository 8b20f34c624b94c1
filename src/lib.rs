extern crate anyhow;

// Rexport main API
pub use device::{ByteSource, Context, FramedListener, ListenerConfig, Step};
pub use dispatch::{dispatch, Dispatch, Role};
pub use message::{DecodedField, FieldValue, Unit};
pub use output::{LastValues, TelemetrySink};
pub use protocol::{MessageKey, ParsedFrame};
pub use window::{ByteWindow, Feed};

pub mod device;
pub mod devices;
pub mod dispatch;
pub mod message;
pub mod output;
pub mod protocol;
pub mod reader;
pub mod window;

/// Rexports all error types
pub mod error {
    pub use crate::device::error::*;
    pub use crate::message::error::*;
    pub use crate::protocol::error::*;
    pub use crate::reader::error::*;
}
