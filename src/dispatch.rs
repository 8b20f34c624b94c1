//! Select the decode routine for a message key.
//!
//! Each device role owns its own table of keys. The same numeric key may exist for both roles
//! with a different meaning, so a table is bound once when the listener is created.
use crate::message::{error::DecodeError, inverter, logger, DecodedField, Layout};
use crate::protocol::{MessageKey, ParsedFrame};
use std::fmt;

/// The kind of device on the other end of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Inverter,
    Logger,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Inverter => write!(f, "inverter"),
            Role::Logger => write!(f, "logger"),
        }
    }
}

/// How a recognised key is handled.
#[derive(Debug, Clone, Copy)]
pub enum Routine {
    Decode(&'static Layout),
    /// Known message that carries nothing of interest.
    NoData,
}

const fn key(control: u8, function: u8) -> MessageKey {
    MessageKey::new(control, function)
}

static INVERTER_ROUTINES: &[(MessageKey, Routine)] = &[
    (key(0x10, 0x80), Routine::Decode(&inverter::SERIAL_NUMBER)),
    (key(0x10, 0x81), Routine::Decode(&inverter::STATUS_10_81)),
    (key(0x10, 0x84), Routine::Decode(&inverter::STATUS_10_84)),
    (key(0x11, 0x83), Routine::Decode(&inverter::DEVICE_INFO)),
    (key(0x11, 0x90), Routine::Decode(&inverter::MEASUREMENTS)),
    (key(0x11, 0xC3), Routine::Decode(&inverter::ALARMS)),
    (key(0x12, 0xC0), Routine::Decode(&inverter::STATUS_12_C0)),
    (key(0x12, 0xC1), Routine::Decode(&inverter::STATUS_12_C1)),
    (key(0xFF, 0xFF), Routine::NoData),
];

static LOGGER_ROUTINES: &[(MessageKey, Routine)] = &[
    (key(0x10, 0x01), Routine::Decode(&logger::CONNECTION)),
    (key(0x12, 0x40), Routine::Decode(&logger::SERIAL_NUMBER)),
    (key(0x12, 0x41), Routine::Decode(&logger::IP_ADDRESS)),
    (key(0x10, 0x00), Routine::NoData),
    (key(0x10, 0x04), Routine::NoData),
    (key(0x11, 0x03), Routine::NoData),
    (key(0x11, 0x10), Routine::NoData),
    (key(0x11, 0x43), Routine::NoData),
];

impl Role {
    fn routines(&self) -> &'static [(MessageKey, Routine)] {
        match self {
            Role::Inverter => INVERTER_ROUTINES,
            Role::Logger => LOGGER_ROUTINES,
        }
    }

    /// Look up the routine for a key, `None` if this role does not know it.
    pub fn routine(&self, key: MessageKey) -> Option<Routine> {
        self.routines()
            .iter()
            .find(|(known, _)| *known == key)
            .map(|(_, routine)| *routine)
    }
}

/// What became of a validated frame.
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    Decoded(Vec<DecodedField>),
    NoData,
    Unknown(MessageKey),
    /// The payload was rejected. `fallback` holds what is published anyway.
    Rejected {
        key: MessageKey,
        error: DecodeError,
        fallback: Option<DecodedField>,
    },
}

impl Dispatch {
    /// Fields that go to the sink.
    pub fn fields(&self) -> &[DecodedField] {
        match self {
            Dispatch::Decoded(fields) => fields.as_slice(),
            Dispatch::Rejected {
                fallback: Some(field),
                ..
            } => std::slice::from_ref(field),
            _ => &[],
        }
    }
}

/// Route a validated frame to the decode routine of `role`.
pub fn dispatch(role: Role, frame: &ParsedFrame) -> Dispatch {
    let key = frame.key();
    match role.routine(key) {
        None => {
            tracing::warn!(
                control_code = %format!("{:#04x}", key.control),
                function_code = %format!("{:#04x}", key.function),
                "Unknown combination"
            );
            Dispatch::Unknown(key)
        }
        Some(Routine::NoData) => Dispatch::NoData,
        Some(Routine::Decode(layout)) => match layout.decode(frame.payload()) {
            Ok(fields) => Dispatch::Decoded(fields),
            Err(error) => {
                tracing::error!(%key, layout = layout.name, "{}", error);
                let fallback = match &error {
                    DecodeError::SizeMismatch { actual, .. } => {
                        layout.size_mismatch_fallback(*actual)
                    }
                    DecodeError::Field(_) => None,
                };
                Dispatch::Rejected {
                    key,
                    error,
                    fallback,
                }
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::{encode, try_validate};

    fn frame(control: u8, function: u8, payload: &[u8]) -> ParsedFrame {
        try_validate(&encode(0, 0, MessageKey::new(control, function), payload).unwrap()).unwrap()
    }

    #[test]
    fn test_roles_have_disjoint_tables() {
        for (key, _) in INVERTER_ROUTINES {
            assert!(Role::Logger.routine(*key).is_none(), "{key} in both tables");
        }
        for (key, _) in LOGGER_ROUTINES {
            assert!(Role::Inverter.routine(*key).is_none(), "{key} in both tables");
        }
    }

    #[test]
    fn test_unknown_key_is_reported() {
        let frame = frame(0x12, 0x40, &[0; 16]);
        assert_eq!(
            dispatch(Role::Inverter, &frame),
            Dispatch::Unknown(MessageKey::new(0x12, 0x40))
        );
        assert!(matches!(dispatch(Role::Logger, &frame), Dispatch::Decoded(_)));
    }

    #[test]
    fn test_no_data_accepts_any_payload() {
        assert_eq!(dispatch(Role::Logger, &frame(0x11, 0x10, &[1, 2, 3])), Dispatch::NoData);
        assert_eq!(dispatch(Role::Inverter, &frame(0xFF, 0xFF, &[])), Dispatch::NoData);
        assert!(Dispatch::NoData.fields().is_empty());
    }

    #[test]
    fn test_size_mismatch_publishes_nothing() {
        let result = dispatch(Role::Inverter, &frame(0x10, 0x81, &[0x06, 0x06]));
        assert!(matches!(
            result,
            Dispatch::Rejected {
                key: MessageKey {
                    control: 0x10,
                    function: 0x81
                },
                error: DecodeError::SizeMismatch {
                    expected: 1,
                    actual: 2
                },
                fallback: None,
            }
        ));
        assert!(result.fields().is_empty());
    }

    #[test]
    fn test_legacy_alarm_count_on_size_mismatch() {
        let result = dispatch(Role::Inverter, &frame(0x11, 0xC3, &[0, 0, 0]));
        let fields = result.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "nr_of_alarms");
        assert_eq!(fields[0].as_f64(), Some(3.0));
    }
}
