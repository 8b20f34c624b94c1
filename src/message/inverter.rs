//! Messages sent by the inverter itself.
use super::{
    to_hex, to_run_state, to_version, DecodedField, Layout, CENTI_HERTZ, COUNT, DECA_WATT_HOUR,
    DECI_AMPERE, DECI_CELSIUS, DECI_VOLT, HECTO_WATT_HOUR, HOUR, MILLI_AMPERE, MILLI_DEGREE, WATT,
};
use crate::reader::{error::FieldError, to_text, FieldReader};

type Fields = Vec<DecodedField>;

/// 0x10/0x80: serial number.
pub static SERIAL_NUMBER: Layout = Layout::new("serial number", 16, |r, out| {
    out.push(DecodedField::text("serial_device_number", r.text(16)?));
    Ok(())
});

/// 0x10/0x81: acknowledge.
pub static STATUS_10_81: Layout = Layout::new("status 0x10/0x81", 1, |r, out| {
    out.push(DecodedField::text("status_10_81", to_hex(r.u8()?)));
    Ok(())
});

/// 0x10/0x84: acknowledge.
pub static STATUS_10_84: Layout = Layout::new("status 0x10/0x84", 1, |r, out| {
    out.push(DecodedField::text("status_10_84", to_hex(r.u8()?)));
    Ok(())
});

/// 0x11/0x83: device information.
pub static DEVICE_INFO: Layout = Layout::new("device info", 77, device_info);

/// 0x11/0x90: live measurements.
pub static MEASUREMENTS: Layout = Layout::new("measurements", 106, measurements);

/// 0x11/0xC3: alarms.
pub static ALARMS: Layout = Layout::new("alarms", 1, |r, out| {
    out.push(DecodedField::number("nr_of_alarms", r.u8()? as f64, COUNT));
    Ok(())
})
.with_legacy_size_fallback(legacy_alarm_count);

/// 0x12/0xC0: acknowledge.
pub static STATUS_12_C0: Layout = Layout::new("status 0x12/0xC0", 1, |r, out| {
    out.push(DecodedField::text("status_12_c0", to_hex(r.u8()?)));
    Ok(())
});

/// 0x12/0xC1: acknowledge.
pub static STATUS_12_C1: Layout = Layout::new("status 0x12/0xC1", 1, |r, out| {
    out.push(DecodedField::text("status_12_c1", to_hex(r.u8()?)));
    Ok(())
});

/// Older firmware answers the alarm request with a payload of a different length. Its length is
/// published as the alarm count. Do not add this to other messages.
fn legacy_alarm_count(actual_len: usize) -> DecodedField {
    DecodedField::number("nr_of_alarms", actual_len as f64, COUNT)
}

fn device_info(r: &mut FieldReader, out: &mut Fields) -> Result<(), FieldError> {
    out.push(DecodedField::text("nr_of_phases", r.u8()?.to_string()));
    out.push(DecodedField::text("rated_power", r.text(6)?));
    out.push(DecodedField::text("country", r.text(2)?));
    out.push(DecodedField::text("firmware_version_main", to_version(r.u24()?)));
    out.push(DecodedField::text("firmware_version_slave", to_version(r.u32()?)));
    out.push(DecodedField::text("inverter_model", r.text(12)?));
    out.push(DecodedField::text("brand", r.text(16)?));
    out.push(DecodedField::text("serial_device_number", r.text(16)?));
    out.push(DecodedField::text("message_11_83_bytes_60_77", r.text(17)?));
    Ok(())
}

fn measurements(r: &mut FieldReader, out: &mut Fields) -> Result<(), FieldError> {
    out.push(DecodedField::number("temperature", r.i16()? as f64, DECI_CELSIUS));

    for name in ["pv1_voltage", "pv2_voltage", "pv3_voltage"] {
        out.push(DecodedField::number(name, r.u16()? as f64, DECI_VOLT));
    }
    for name in [
        "pv1_current",
        "pv2_current",
        "pv3_current",
        "r_current",
        "s_current",
        "t_current",
    ] {
        out.push(DecodedField::number(name, r.u16()? as f64, DECI_AMPERE));
    }
    for name in ["r_voltage", "s_voltage", "t_voltage"] {
        out.push(DecodedField::number(name, r.u16()? as f64, DECI_VOLT));
    }
    for (frequency, power) in [
        ("r_frequency", "r_power"),
        ("s_frequency", "s_power"),
        ("t_frequency", "t_power"),
    ] {
        out.push(DecodedField::number(frequency, r.u16()? as f64, CENTI_HERTZ));
        out.push(DecodedField::number(power, r.u16()? as f64, WATT));
    }

    out.push(DecodedField::number("energy_today", r.u16()? as f64, DECA_WATT_HOUR));
    out.push(DecodedField::number("energy_total", r.u32()? as f64, HECTO_WATT_HOUR));
    out.push(DecodedField::number("hours_total", r.u32()? as f64, HOUR));
    out.push(DecodedField::text("run_state", to_run_state(r.u16()?)));

    out.push(DecodedField::number("grid_voltage_fault_value", r.u16()? as f64, DECI_VOLT));
    out.push(DecodedField::number("grid_frequency_fault_value", r.u16()? as f64, CENTI_HERTZ));
    out.push(DecodedField::number("grid_impedance_fault_value", r.u16()? as f64, MILLI_DEGREE));
    out.push(DecodedField::number("temperature_fault", r.u16()? as f64, DECI_CELSIUS));
    out.push(DecodedField::number("pv_voltage_fault", r.u16()? as f64, DECI_VOLT));
    out.push(DecodedField::number("gfci_current_fault", r.u16()? as f64, MILLI_AMPERE));
    out.push(DecodedField::text("error_message_binary_index", r.bits32()?));

    // Newer firmware leaves these empty and sends the version in 0x11/0x83 instead.
    for name in ["firmware_version_main", "firmware_version_slave"] {
        let raw = r.bytes(20)?;
        let version = to_text(&raw);
        if raw[0] != 0 && !version.is_empty() {
            out.push(DecodedField::text(name, version));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::error::DecodeError;
    use bytes::Bytes;

    fn find<'a>(fields: &'a [DecodedField], name: &str) -> &'a DecodedField {
        fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no field {name}"))
    }

    fn measurement_payload() -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&250i16.to_be_bytes()); // temperature
        for v in [2301u16, 2302, 0] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        for v in [52u16, 51, 0, 101, 0, 0] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        for v in [2305u16, 0, 0] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        for v in [5001u16, 2345, 0, 0, 0, 0] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        p.extend_from_slice(&1234u16.to_be_bytes()); // energy today
        p.extend_from_slice(&98765u32.to_be_bytes()); // energy total
        p.extend_from_slice(&4321u32.to_be_bytes()); // hours total
        p.extend_from_slice(&1u16.to_be_bytes()); // run state
        for v in [2400u16, 5020, 1500, 700, 3600, 25] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        p.extend_from_slice(&0x8000_0001u32.to_be_bytes());
        let mut main = b"V5.10".to_vec();
        main.resize(20, 0);
        p.extend_from_slice(&main);
        p.extend_from_slice(&[0; 20]);
        p
    }

    #[test]
    fn test_measurement_payload_is_106_bytes() {
        assert_eq!(measurement_payload().len(), MEASUREMENTS.expected_len);
    }

    #[test]
    fn test_measurements_are_scaled() {
        let fields = MEASUREMENTS.decode(&Bytes::from(measurement_payload())).unwrap();

        assert_eq!(find(&fields, "temperature").as_f64(), Some(25.0));
        assert_eq!(find(&fields, "pv1_voltage").as_f64(), Some(230.1));
        assert_eq!(find(&fields, "pv2_current").as_f64(), Some(5.1));
        assert_eq!(find(&fields, "r_current").as_f64(), Some(10.1));
        assert_eq!(find(&fields, "r_voltage").as_f64(), Some(230.5));
        assert_eq!(find(&fields, "r_frequency").as_f64(), Some(50.01));
        assert_eq!(find(&fields, "r_power").as_f64(), Some(2.345));
        assert_eq!(find(&fields, "energy_today").as_f64(), Some(12.34));
        assert_eq!(find(&fields, "energy_total").as_f64(), Some(9876.5));
        assert_eq!(find(&fields, "hours_total").as_f64(), Some(4321.0));
        assert_eq!(find(&fields, "run_state").as_text(), Some("Online"));
        assert_eq!(find(&fields, "grid_voltage_fault_value").as_f64(), Some(240.0));
        assert_eq!(find(&fields, "grid_frequency_fault_value").as_f64(), Some(50.2));
        assert_eq!(find(&fields, "grid_impedance_fault_value").as_f64(), Some(1.5));
        assert_eq!(find(&fields, "temperature_fault").as_f64(), Some(70.0));
        assert_eq!(find(&fields, "pv_voltage_fault").as_f64(), Some(360.0));
        assert_eq!(find(&fields, "gfci_current_fault").as_f64(), Some(0.025));
        assert_eq!(
            find(&fields, "error_message_binary_index").as_text(),
            Some("10000000000000000000000000000001")
        );
        assert_eq!(find(&fields, "firmware_version_main").as_text(), Some("V5.10"));
    }

    #[test]
    fn test_measurements_skip_empty_firmware_text() {
        let fields = MEASUREMENTS.decode(&Bytes::from(measurement_payload())).unwrap();
        assert!(!fields.iter().any(|f| f.name == "firmware_version_slave"));
        assert_eq!(fields.len(), 31);
    }

    #[test]
    fn test_measurements_skip_firmware_text_with_leading_nul() {
        let mut payload = measurement_payload();
        let mut main = b"\0V5.10".to_vec();
        main.resize(20, b' ');
        payload[66..86].copy_from_slice(&main);
        let fields = MEASUREMENTS.decode(&Bytes::from(payload)).unwrap();
        assert!(!fields.iter().any(|f| f.name == "firmware_version_main"));
        assert_eq!(fields.len(), 30);
    }

    #[test]
    fn test_negative_temperature() {
        let mut payload = measurement_payload();
        payload[..2].copy_from_slice(&(-55i16).to_be_bytes());
        let fields = MEASUREMENTS.decode(&Bytes::from(payload)).unwrap();
        assert_eq!(find(&fields, "temperature").as_f64(), Some(-5.5));
    }

    #[test]
    fn test_measurements_decode_is_repeatable() {
        let payload = Bytes::from(measurement_payload());
        assert_eq!(MEASUREMENTS.decode(&payload), MEASUREMENTS.decode(&payload));
    }

    #[test]
    fn test_measurements_size_mismatch_emits_nothing() {
        let mut payload = measurement_payload();
        payload.push(0);
        assert_eq!(
            MEASUREMENTS.decode(&Bytes::from(payload)),
            Err(DecodeError::SizeMismatch {
                expected: 106,
                actual: 107
            })
        );
        assert_eq!(MEASUREMENTS.size_mismatch_fallback(107), None);
    }

    #[test]
    fn test_device_info() {
        let mut p = vec![3u8];
        p.extend_from_slice(b"  4000");
        p.extend_from_slice(b"NL");
        p.extend_from_slice(&[0x13, 0x12, 0xD1]); // 1250001
        p.extend_from_slice(&12345678u32.to_be_bytes());
        p.extend_from_slice(b"Omniksol-4k\0");
        p.extend_from_slice(b"Omnik\0\0\0\0\0\0\0\0\0\0\0");
        p.extend_from_slice(b"NLDN402013123456");
        p.extend_from_slice(&[0; 17]);
        assert_eq!(p.len(), 77);

        let fields = DEVICE_INFO.decode(&Bytes::from(p)).unwrap();
        assert_eq!(find(&fields, "nr_of_phases").as_text(), Some("3"));
        assert_eq!(find(&fields, "rated_power").as_text(), Some("4000"));
        assert_eq!(find(&fields, "country").as_text(), Some("NL"));
        assert_eq!(find(&fields, "firmware_version_main").as_text(), Some("V1.25Build1"));
        assert_eq!(
            find(&fields, "firmware_version_slave").as_text(),
            Some("V12.34Build5678")
        );
        assert_eq!(find(&fields, "inverter_model").as_text(), Some("Omniksol-4k"));
        assert_eq!(find(&fields, "brand").as_text(), Some("Omnik"));
        assert_eq!(
            find(&fields, "serial_device_number").as_text(),
            Some("NLDN402013123456")
        );
        assert_eq!(find(&fields, "message_11_83_bytes_60_77").as_text(), Some(""));
    }

    #[test]
    fn test_status_acknowledge() {
        let fields = STATUS_10_81.decode(&Bytes::from_static(&[0x06])).unwrap();
        assert_eq!(fields, vec![DecodedField::text("status_10_81", "06")]);
        let fields = STATUS_12_C1.decode(&Bytes::from_static(&[0x15])).unwrap();
        assert_eq!(fields, vec![DecodedField::text("status_12_c1", "15")]);
    }

    #[test]
    fn test_alarm_count_and_legacy_fallback() {
        let fields = ALARMS.decode(&Bytes::from_static(&[0x02])).unwrap();
        assert_eq!(fields[0].as_f64(), Some(2.0));

        let wrong = Bytes::from_static(&[0x02, 0x00]);
        assert_eq!(
            ALARMS.decode(&wrong),
            Err(DecodeError::SizeMismatch {
                expected: 1,
                actual: 2
            })
        );
        let fallback = ALARMS.size_mismatch_fallback(wrong.len()).unwrap();
        assert_eq!(fallback.name, "nr_of_alarms");
        assert_eq!(fallback.as_f64(), Some(2.0));
    }

    #[test]
    fn test_serial_number_is_trimmed() {
        let fields = SERIAL_NUMBER
            .decode(&Bytes::from_static(b" NLDN40201312\0\0\0"))
            .unwrap();
        assert_eq!(
            fields,
            vec![DecodedField::text("serial_device_number", "NLDN40201312")]
        );
    }
}
