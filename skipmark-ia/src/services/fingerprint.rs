//! Audio fingerprinting
//!
//! Decodes the leading minutes of an episode's audio track and reduces it
//! to a sequence of energy-contour hashes: one `u32` per hop, where bit
//! `b` records whether hop `i+b+1` is louder than hop `i+b`. Identical
//! audio produces identical hash runs, which is all the season comparator
//! needs to locate a shared intro.

use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Seconds of audio covered by one hop
pub const HOP_SECONDS: f64 = 0.125;

/// Hops folded into a single hash (one hash spans ~4s of audio)
pub const HASH_SPAN: usize = 33;

/// Hash value reserved for silent regions; never matched by the comparator
pub const SILENT_HASH: u32 = 0;

const SILENCE_FLOOR: f32 = 1e-6;

/// Fingerprinting errors
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("No audio track in {0}")]
    NoAudioTrack(String),

    #[error("Audio too short for fingerprinting")]
    AudioTooShort,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio fingerprinter
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    /// Fingerprint at most this many leading seconds (intros live early)
    max_duration_seconds: usize,
}

impl Fingerprinter {
    /// Create a fingerprinter covering the default search window
    pub fn new() -> Self {
        Self {
            max_duration_seconds: 900,
        }
    }

    /// Override the fingerprinted window length
    pub fn with_max_duration(mut self, seconds: usize) -> Self {
        self.max_duration_seconds = seconds;
        self
    }

    /// Fingerprint the audio track of a media file
    pub fn fingerprint_file(&self, media_path: &Path) -> Result<Vec<u32>, FingerprintError> {
        let (samples, sample_rate) = self.decode_audio(media_path)?;
        self.fingerprint_samples(&samples, sample_rate)
    }

    /// Fingerprint mono PCM samples
    ///
    /// Exposed separately so fixtures can exercise the hash pipeline
    /// without container files.
    pub fn fingerprint_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<u32>, FingerprintError> {
        let hop_len = (sample_rate as f64 * HOP_SECONDS) as usize;
        if hop_len == 0 || samples.len() < hop_len * (HASH_SPAN + 1) {
            return Err(FingerprintError::AudioTooShort);
        }

        // Mean-square energy per hop
        let energies: Vec<f32> = samples
            .chunks_exact(hop_len)
            .map(|hop| hop.iter().map(|s| s * s).sum::<f32>() / hop_len as f32)
            .collect();

        let mut hashes = Vec::with_capacity(energies.len().saturating_sub(HASH_SPAN));
        for i in 0..energies.len() - HASH_SPAN {
            let window = &energies[i..i + HASH_SPAN + 1];

            if window.iter().all(|&e| e < SILENCE_FLOOR) {
                hashes.push(SILENT_HASH);
                continue;
            }

            let mut hash = 0u32;
            for b in 0..32 {
                if window[b + 1] > window[b] {
                    hash |= 1 << b;
                }
            }
            // Keep real hashes distinguishable from the silence sentinel
            if hash == SILENT_HASH {
                hash = 1;
            }
            hashes.push(hash);
        }

        Ok(hashes)
    }

    /// Decode the leading window of the default audio track to mono PCM
    fn decode_audio(&self, media_path: &Path) -> Result<(Vec<f32>, u32), FingerprintError> {
        let file = File::open(media_path)?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = media_path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| FingerprintError::Decode(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                FingerprintError::NoAudioTrack(media_path.display().to_string())
            })?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| FingerprintError::Decode("unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| FingerprintError::Decode(e.to_string()))?;

        let max_samples = sample_rate as usize * self.max_duration_seconds;
        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                // End of stream surfaces as an I/O error in symphonia
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(FingerprintError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buffer =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);

                    let channels = spec.channels.count().max(1);
                    for frame in buffer.samples().chunks_exact(channels) {
                        samples.push(frame.iter().sum::<f32>() / channels as f32);
                    }

                    if samples.len() >= max_samples {
                        samples.truncate(max_samples);
                        break;
                    }
                }
                // Skip undecodable packets, keep the stream going
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(FingerprintError::Decode(e.to_string())),
            }
        }

        if samples.is_empty() {
            return Err(FingerprintError::AudioTooShort);
        }

        Ok((samples, sample_rate))
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-audio with a varying energy contour
    fn noisy_samples(seconds: usize, sample_rate: u32, seed: u32) -> Vec<f32> {
        let mut state = seed.max(1);
        (0..seconds * sample_rate as usize)
            .map(|i| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                let noise = (state >> 16) as f32 / 65536.0 - 0.5;
                let envelope = ((i as f32 / sample_rate as f32) * 0.7).sin().abs() + 0.1;
                noise * envelope
            })
            .collect()
    }

    #[test]
    fn test_identical_audio_identical_hashes() {
        let fp = Fingerprinter::new();
        let samples = noisy_samples(30, 8000, 7);

        let a = fp.fingerprint_samples(&samples, 8000).unwrap();
        let b = fp.fingerprint_samples(&samples, 8000).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_different_audio_differs() {
        let fp = Fingerprinter::new();
        let a = fp
            .fingerprint_samples(&noisy_samples(30, 8000, 7), 8000)
            .unwrap();
        let b = fp
            .fingerprint_samples(&noisy_samples(30, 8000, 99), 8000)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_prefix_shares_hash_run() {
        let fp = Fingerprinter::new();
        let intro = noisy_samples(20, 8000, 42);

        let mut ep1 = intro.clone();
        ep1.extend(noisy_samples(20, 8000, 5));
        let mut ep2 = intro.clone();
        ep2.extend(noisy_samples(20, 8000, 6));

        let h1 = fp.fingerprint_samples(&ep1, 8000).unwrap();
        let h2 = fp.fingerprint_samples(&ep2, 8000).unwrap();

        // Hashes spanning only the shared 20s prefix are identical
        let prefix_hashes = (20.0 / HOP_SECONDS) as usize - HASH_SPAN;
        assert_eq!(h1[..prefix_hashes], h2[..prefix_hashes]);
    }

    #[test]
    fn test_silence_maps_to_sentinel() {
        let fp = Fingerprinter::new();
        let silence = vec![0.0f32; 8000 * 10];

        let hashes = fp.fingerprint_samples(&silence, 8000).unwrap();
        assert!(hashes.iter().all(|&h| h == SILENT_HASH));
    }

    #[test]
    fn test_too_short_audio_rejected() {
        let fp = Fingerprinter::new();
        let result = fp.fingerprint_samples(&[0.1f32; 800], 8000);
        assert!(matches!(result, Err(FingerprintError::AudioTooShort)));
    }
}
