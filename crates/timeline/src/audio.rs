//! In-memory narration track.
//!
//! The track is raw mono PCM addressed by byte offset. Offsets are derived
//! from timeline milliseconds as `sample_size * sample_rate * ms / 1000`,
//! aligned down to a whole sample.

use std::io;
use std::path::Path;

use inkcast_common::clock::TimeMs;
use inkcast_session_model::AudioFormat;

#[derive(Debug, Clone, Default)]
pub struct AudioTrack {
    format: AudioFormat,
    data: Vec<u8>,

    /// Byte offset the next captured chunk is written at.
    write_pos: usize,
}

impl AudioTrack {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            data: Vec::new(),
            write_pos: 0,
        }
    }

    /// Wrap PCM bytes read from disk.
    pub fn from_bytes(format: AudioFormat, data: Vec<u8>) -> Self {
        let write_pos = data.len();
        Self {
            format,
            data,
            write_pos,
        }
    }

    pub fn load(path: &Path, format: AudioFormat) -> io::Result<Self> {
        Ok(Self::from_bytes(format, std::fs::read(path)?))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, &self.data)
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte offset of timeline time `ms`, aligned to a whole sample.
    pub fn byte_offset(&self, ms: TimeMs) -> usize {
        let sample_size = self.format.sample_size.max(1) as u64;
        let raw = self.format.bytes_per_second() * ms.max(0) as u64 / 1000;
        (raw - raw % sample_size) as usize
    }

    /// Length of the track in milliseconds.
    pub fn duration_ms(&self) -> TimeMs {
        let per_second = self.format.bytes_per_second();
        if per_second == 0 {
            return 0;
        }
        (self.data.len() as u64 * 1000 / per_second) as TimeMs
    }

    /// Position the capture write head at timeline time `ms`.
    pub fn begin_capture(&mut self, ms: TimeMs) {
        self.write_pos = self.byte_offset(ms);
    }

    /// Write a captured chunk at the write head and advance it.
    pub fn append(&mut self, bytes: &[u8]) {
        self.overwrite(self.write_pos, bytes);
        self.write_pos += bytes.len();
    }

    /// Copy of the bytes covering `[from, to)`.
    pub fn copy_range(&self, from: TimeMs, to: TimeMs) -> Vec<u8> {
        let (start, end) = self.clamped(from, to);
        self.data[start..end].to_vec()
    }

    /// Silence `[from, to)`. The track keeps its length.
    pub fn erase_range(&mut self, from: TimeMs, to: TimeMs) {
        let (start, end) = self.clamped(from, to);
        self.data[start..end].fill(0);
        tracing::trace!(from, to, bytes = end - start, "Erased audio");
    }

    /// Write `bytes` at `ms`, extending the track if needed.
    pub fn paste_at(&mut self, ms: TimeMs, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let at = self.byte_offset(ms);
        self.overwrite(at, bytes);
    }

    fn overwrite(&mut self, at: usize, bytes: &[u8]) {
        let end = at + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[at..end].copy_from_slice(bytes);
    }

    fn clamped(&self, from: TimeMs, to: TimeMs) -> (usize, usize) {
        let end = self.byte_offset(to).min(self.data.len());
        let start = self.byte_offset(from).min(end);
        (start, end)
    }

    pub fn sample_count(&self) -> usize {
        self.data.len() / self.format.sample_size.max(1) as usize
    }

    /// Sample `index` scaled to `[-1.0, 1.0]`.
    ///
    /// One-byte samples are unsigned; wider samples are little-endian
    /// signed, using their two most significant bytes.
    pub fn sample(&self, index: usize) -> Option<f32> {
        let size = self.format.sample_size.max(1) as usize;
        let bytes = self.data.get(index * size..(index + 1) * size)?;
        Some(match bytes {
            [b] => (*b as f32 - 128.0) / 128.0,
            [.., lo, hi] => i16::from_le_bytes([*lo, *hi]) as f32 / 32768.0,
            [] => 0.0,
        })
    }

    /// Timeline time of sample `index`.
    pub fn sample_time(&self, index: usize) -> TimeMs {
        if self.format.sample_rate == 0 {
            return 0;
        }
        (index as u64 * 1000 / self.format.sample_rate as u64) as TimeMs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> AudioTrack {
        AudioTrack::new(AudioFormat {
            sample_rate: 40_000,
            sample_size: 2,
        })
    }

    #[test]
    fn test_byte_offset() {
        let t = track();
        assert_eq!(t.byte_offset(0), 0);
        assert_eq!(t.byte_offset(1000), 80_000);
        assert_eq!(t.byte_offset(25), 2_000);
        assert_eq!(t.byte_offset(-5), 0);
    }

    #[test]
    fn test_byte_offset_aligns_to_samples() {
        let t = AudioTrack::new(AudioFormat {
            sample_rate: 44_100,
            sample_size: 2,
        });
        assert_eq!(t.byte_offset(1), 88);
        assert_eq!(t.byte_offset(3), 264);
        let odd = AudioTrack::new(AudioFormat {
            sample_rate: 1_001,
            sample_size: 2,
        });
        // 2002 * 1500 / 1000 = 3003 bytes, rounded down to 3002.
        assert_eq!(odd.byte_offset(1500), 3002);
    }

    #[test]
    fn test_append_and_duration() {
        let mut t = track();
        t.append(&vec![1; 8_000]);
        assert_eq!(t.duration_ms(), 100);
        t.append(&vec![1; 8_000]);
        assert_eq!(t.duration_ms(), 200);
    }

    #[test]
    fn test_capture_resumes_at_cursor() {
        let mut t = track();
        t.begin_capture(50);
        t.append(&[7, 7]);
        assert_eq!(t.bytes().len(), 4_002);
        assert!(t.bytes()[..4_000].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_erase_copy_paste() {
        let mut t = track();
        t.append(&vec![5; 16_000]);
        let chunk = t.copy_range(50, 100);
        assert_eq!(chunk.len(), 4_000);

        t.erase_range(50, 100);
        assert_eq!(t.bytes().len(), 16_000);
        assert!(t.bytes()[4_000..8_000].iter().all(|b| *b == 0));
        assert_eq!(t.bytes()[3_999], 5);

        t.paste_at(190, &chunk);
        assert_eq!(t.duration_ms(), 240);
        assert_eq!(t.bytes()[15_200], 5);
    }

    #[test]
    fn test_sample_decoding() {
        let mut t = track();
        t.append(&i16::MIN.to_le_bytes());
        t.append(&16_384i16.to_le_bytes());
        assert_eq!(t.sample_count(), 2);
        assert_eq!(t.sample(0), Some(-1.0));
        assert_eq!(t.sample(1), Some(0.5));
        assert_eq!(t.sample(2), None);
    }
}
