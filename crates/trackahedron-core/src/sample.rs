//! Raw sample decoding
//!
//! The sensor streams one notification per reading. A well-formed payload is
//! 6 bytes: three big-endian signed 16-bit integers (x, y, z) at full scale
//! ±32767, which map to ±1000 physical units.

use crate::vector::Vector;

/// Length of a well-formed sample payload in bytes
pub const SAMPLE_LEN: usize = 6;

/// Physical value corresponding to a full-scale raw reading
pub const SAMPLE_FULL_SCALE: f64 = 1000.0;

/// Largest positive raw reading
const RAW_FULL_SCALE: f64 = i16::MAX as f64;

/// Decode a raw sample payload.
///
/// Returns `None` unless `buf` is exactly [`SAMPLE_LEN`] bytes long. The
/// result lies in `[-1000.03, 1000]` per axis since `i16::MIN` is one step
/// beyond the symmetric full scale.
#[must_use]
pub fn decode_sample(buf: &[u8]) -> Option<Vector> {
    let bytes: &[u8; SAMPLE_LEN] = buf.try_into().ok()?;

    Some(Vector::new(
        axis_from_be(bytes[0], bytes[1]),
        axis_from_be(bytes[2], bytes[3]),
        axis_from_be(bytes[4], bytes[5]),
    ))
}

/// Encode a vector of physical units back into a sample payload.
///
/// Components are rounded to the nearest raw step and saturate at the i16
/// range. Used to build captures for replay and tests.
#[must_use]
pub fn encode_sample(v: Vector) -> [u8; SAMPLE_LEN] {
    let [x0, x1] = axis_to_be(v.x);
    let [y0, y1] = axis_to_be(v.y);
    let [z0, z1] = axis_to_be(v.z);
    [x0, x1, y0, y1, z0, z1]
}

#[inline]
fn axis_from_be(hi: u8, lo: u8) -> f64 {
    f64::from(i16::from_be_bytes([hi, lo])) / RAW_FULL_SCALE * SAMPLE_FULL_SCALE
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn axis_to_be(value: f64) -> [u8; 2] {
    let raw = libm::round(value / SAMPLE_FULL_SCALE * RAW_FULL_SCALE)
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    raw.to_be_bytes()
}
