//! Messages sent by the wifi datalogger.
use super::{DecodedField, Layout};

/// 0x10/0x01: inverter serial number and connection number.
pub static CONNECTION: Layout = Layout::new("connection", 17, |r, out| {
    let serial_number = r.text(16)?;
    tracing::info!(%serial_number, "inverter serial number");
    out.push(DecodedField::text("connection_number", r.u8()?.to_string()));
    Ok(())
});

/// 0x12/0x40: logger serial number.
pub static SERIAL_NUMBER: Layout = Layout::new("serial number", 16, |r, out| {
    out.push(DecodedField::text("serial_device_number", r.text(16)?));
    Ok(())
});

/// 0x12/0x41: logger ip address.
pub static IP_ADDRESS: Layout = Layout::new("ip address", 16, |r, out| {
    out.push(DecodedField::text("ip_address", r.text(16)?));
    Ok(())
});
