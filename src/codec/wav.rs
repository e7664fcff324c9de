//! RIFF/WAVE framing for mono 16-bit PCM at the device rate, via `hound`.
//!
//! Resulting layout (all integers little-endian):
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | `"RIFF"`                                |
//! | 4      | 4    | `36 + data_len`                         |
//! | 8      | 4    | `"WAVE"`                                |
//! | 12     | 4    | `"fmt "`                                |
//! | 16     | 4    | `16` (fmt chunk size)                   |
//! | 20     | 2    | `1` (PCM)                               |
//! | 22     | 2    | `1` (mono)                              |
//! | 24     | 4    | `8000` (sample rate)                    |
//! | 28     | 4    | `16000` (byte rate)                     |
//! | 32     | 2    | `2` (block align)                       |
//! | 34     | 2    | `16` (bits per sample)                  |
//! | 36     | 4    | `"data"`                                |
//! | 40     | 4    | `data_len = 2 × sample_count`           |

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Size of the container header in bytes.
pub const WAV_HEADER_LEN: usize = 44;
/// Sample rate of the device audio stream (Hz).
pub const WAV_SAMPLE_RATE: u32 = 8_000;
/// Bytes per sample frame (mono, 16-bit).
pub const WAV_BLOCK_ALIGN: u16 = 2;

const SPEC: WavSpec = WavSpec {
    channels: 1,
    sample_rate: WAV_SAMPLE_RATE,
    bits_per_sample: 16,
    sample_format: SampleFormat::Int,
};

/// Frame `samples` into an in-memory WAV container.
///
/// Mono 16-bit PCM gets the plain 16-byte `fmt ` chunk, so the output length
/// is always `44 + 2 × samples.len()`.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::with_capacity(
        WAV_HEADER_LEN + samples.len() * usize::from(WAV_BLOCK_ALIGN),
    ));
    {
        let mut writer = WavWriter::new(&mut cursor, SPEC)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
