//! # WAV Container Encoding
//!
//! Wraps finished PCM samples in the canonical 44-byte RIFF/WAVE header so
//! browsers and audio players can play the result directly.
//!
//! ## Header Layout (all integers little-endian):
//! ```text
//! offset  size  field
//!      0     4  "RIFF"
//!      4     4  file size - 8  (= data length + 36)
//!      8     4  "WAVE"
//!     12     4  "fmt "
//!     16     4  16 (fmt chunk size)
//!     20     2  1 (PCM)
//!     22     2  channels
//!     24     4  sample rate
//!     28     4  byte rate
//!     32     2  block align
//!     34     2  bits per sample
//!     36     4  "data"
//!     40     4  data length
//! ```

use crate::audio::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use byteorder::{ByteOrder, LittleEndian};

/// Size of the canonical PCM WAV header in bytes.
pub const HEADER_LEN: usize = 44;

/// Format tag for uncompressed linear PCM.
const FORMAT_PCM: u16 = 1;

/// Format parameters written into the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }
}

impl WavSpec {
    /// Mono 16-bit PCM at the given sample rate.
    pub fn mono16(sample_rate: u32) -> Self {
        Self { sample_rate, ..Self::default() }
    }

    /// Bytes per sample frame (all channels).
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }
}

/// Build the 44-byte header for a payload of `data_len` bytes.
///
/// Payloads larger than the 32-bit size fields can express are clamped to
/// `u32::MAX`, which players treat as "read until end of stream".
pub fn header(data_len: usize, spec: &WavSpec) -> [u8; HEADER_LEN] {
    let data_size = u32::try_from(data_len).unwrap_or(u32::MAX);
    let mut header = [0u8; HEADER_LEN];

    header[0..4].copy_from_slice(b"RIFF");
    LittleEndian::write_u32(&mut header[4..8], data_size.saturating_add(36));
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    LittleEndian::write_u32(&mut header[16..20], 16);
    LittleEndian::write_u16(&mut header[20..22], FORMAT_PCM);
    LittleEndian::write_u16(&mut header[22..24], spec.channels);
    LittleEndian::write_u32(&mut header[24..28], spec.sample_rate);
    LittleEndian::write_u32(&mut header[28..32], spec.byte_rate());
    LittleEndian::write_u16(&mut header[32..34], spec.block_align());
    LittleEndian::write_u16(&mut header[34..36], spec.bits_per_sample);

    header[36..40].copy_from_slice(b"data");
    LittleEndian::write_u32(&mut header[40..44], data_size);

    header
}

/// Produce a complete WAV file: header followed by the payload.
///
/// Accepts any payload length, including zero.
pub fn encode(pcm: &[u8], spec: &WavSpec) -> Vec<u8> {
    let mut wav = Vec::with_capacity(HEADER_LEN + pcm.len());
    wav.extend_from_slice(&header(pcm.len(), spec));
    wav.extend_from_slice(pcm);
    wav
}

/// Return the PCM payload of a RIFF/WAVE file, or the input itself when it
/// is not one.
///
/// ## Why this exists:
/// Depending on the API surface, LINEAR16 responses arrive either as bare
/// samples or already wrapped in a WAV header. The pipeline must only ever see
/// samples, otherwise the header bytes would be treated as audio.
///
/// Chunks are walked in order until `data` is found; a truncated `data` chunk
/// yields whatever bytes are present.
pub fn pcm_payload(bytes: &[u8]) -> &[u8] {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return bytes;
    }

    let mut pos = 12;
    while let Some(chunk_header) = bytes.get(pos..pos + 8) {
        let size = LittleEndian::read_u32(&chunk_header[4..8]) as usize;
        let body_start = pos + 8;

        if &chunk_header[0..4] == b"data" {
            let body_end = body_start.saturating_add(size).min(bytes.len());
            return &bytes[body_start..body_end];
        }

        // Chunks are padded to an even length
        pos = body_start.saturating_add(size).saturating_add(size & 1);
    }

    bytes
}
