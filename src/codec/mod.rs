//! Stateless audio transforms used by the device audio path.
//!
//! * [`expand_sample`]: one companded (μ-law style) byte → one 16-bit PCM sample.
//! * [`encode_wav`]: mono 16-bit PCM → a 44-byte-header RIFF/WAVE container.
//!
//! Neither keeps hidden state.  Sample expansion is total; framing only
//! fails if `hound` reports an I/O error on its in-memory buffer.
//!
//! ```rust
//! use device_stream::codec::{decode_frame, encode_wav, WAV_HEADER_LEN};
//!
//! let pcm = decode_frame(&[0xFF, 0x7F]);
//! assert_eq!(pcm, vec![132, -132]);
//!
//! let wav = encode_wav(&pcm).unwrap();
//! assert_eq!(wav.len(), WAV_HEADER_LEN + 4);
//! ```

pub mod mulaw;
pub mod wav;

pub use mulaw::{decode_frame, expand_sample, MULAW_BIAS};
pub use wav::{encode_wav, WAV_BLOCK_ALIGN, WAV_HEADER_LEN, WAV_SAMPLE_RATE};
