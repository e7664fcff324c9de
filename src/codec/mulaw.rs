//! Companded sample expansion for the device's 8-bit audio codec.
//!
//! The firmware streams one logarithmically-compressed byte per sample.  The
//! expansion here is **bit-exact with the device companion app**, which adds
//! the bias *after* shifting the mantissa:
//!
//! ```text
//! magnitude = (mantissa << (exponent + 3)) + 132
//! ```
//!
//! The textbook G.711 decoder instead computes
//! `(((mantissa << 3) + 132) << exponent) - 132`.  The two agree only for
//! exponent 0.  Downstream transcription was tuned against the first form, so
//! it is kept as-is; see the `diverges_from_g711_table` test.

/// Fixed bias added to every expanded magnitude.
pub const MULAW_BIAS: i32 = 132;

/// Expand one companded byte into a signed 16-bit linear sample.
///
/// Total over all 256 inputs.  The largest magnitude produced is
/// `(15 << 10) + 132 = 15 492`, so the result always fits in `i16`.
pub fn expand_sample(byte: u8) -> i16 {
    let v = !byte;
    let negative = v & 0x80 != 0;
    let exponent = u32::from((v & 0x70) >> 4);
    let mantissa = i32::from(v & 0x0F);

    let magnitude = (mantissa << (exponent + 3)) + MULAW_BIAS;
    let sample = if negative { -magnitude } else { magnitude };
    sample as i16
}

/// Expand every byte of one raw notification, preserving arrival order.
///
/// There is no cross-byte state: each byte is one sample.
pub fn decode_frame(raw: &[u8]) -> Vec<i16> {
    raw.iter().copied().map(expand_sample).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
