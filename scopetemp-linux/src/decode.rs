//! Conversions between host values and the request fields.

use scopetemp_protocol::{FanCommand, GuideBits, Record};

/// Extended resolution temperature in degrees Celsius.
///
/// Starts from the register with its half-degree bit dropped, then interpolates with the
/// counter registers:
/// `t = truncated - 0.25 + (count_per_c - count_remain) / count_per_c`.
///
/// Returns `None` when `count_per_c` is zero, which a real sensor never reports but an
/// unread channel does.
pub fn celsius(record: &Record) -> Option<f64> {
    if record.count_per_c == 0 {
        return None;
    }
    let per_c = f64::from(record.count_per_c);
    let remain = f64::from(record.count_remain);
    Some(record.truncated().to_num::<f64>() - 0.25 + (per_c - remain) / per_c)
}

/// `wValue` of a `SET_GUIDE_OUTPUTS` request. Opposite directions may both be set.
pub fn guide_value(north: bool, south: bool, west: bool, east: bool) -> u16 {
    GuideBits::from_directions(north, south, west, east).into_bits() as u16
}

/// `(wValue, wIndex)` of a `SET_FAN_OUTPUTS` request.
///
/// Duty cycles travel in `wValue` and `wIndex`; switched fans are bits 0 and 1 of `wValue`.
pub fn fan_fields(command: FanCommand) -> (u16, u16) {
    match command {
        FanCommand::Duty { fan1, fan2 } => (fan1, fan2),
        FanCommand::Switched { fan1, fan2 } => (u16::from(fan1) | u16::from(fan2) << 1, 0),
    }
}
