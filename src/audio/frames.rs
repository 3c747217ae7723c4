//! Typed view over drained audio data.

use crate::types::SUBFRAME_SIZE;

/// One beam-formed audio sub-frame as seen by consumers.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Beam angle in radians.
    pub beam_angle: f32,
    /// Device confidence in the beam angle, 0.0 to 1.0.
    pub beam_confidence: f32,
    /// Raw audio samples.
    pub samples: Vec<f32>,
}

/// Slice a drained accumulator into typed frames.
///
/// `count` is the value returned by the drain; `samples` and `meta` are
/// the full destination buffers it filled.
pub fn decode_audio_frames(count: usize, samples: &[f32], meta: &[f32]) -> Vec<AudioFrame> {
    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * SUBFRAME_SIZE;
        frames.push(AudioFrame {
            beam_angle: meta[i * 2],
            beam_confidence: meta[i * 2 + 1],
            samples: samples[start..start + SUBFRAME_SIZE].to_vec(),
        });
    }
    frames
}

/// Merge frames into one by concatenating samples and averaging the beam
/// metadata. Returns `None` for an empty input.
pub fn merge_audio_frames(frames: &[AudioFrame]) -> Option<AudioFrame> {
    if frames.is_empty() {
        return None;
    }
    let mut samples = Vec::with_capacity(frames.len() * SUBFRAME_SIZE);
    let mut angle_sum = 0.0f32;
    let mut conf_sum = 0.0f32;
    for frame in frames {
        samples.extend_from_slice(&frame.samples);
        angle_sum += frame.beam_angle;
        conf_sum += frame.beam_confidence;
    }
    let n = frames.len() as f32;
    Some(AudioFrame {
        beam_angle: angle_sum / n,
        beam_confidence: conf_sum / n,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AUDIO_BUFFER_LEN, AUDIO_META_LEN};

    #[test]
    fn test_decode_slices_by_subframe() {
        let mut samples = vec![0f32; AUDIO_BUFFER_LEN];
        let mut meta = vec![0f32; AUDIO_META_LEN];
        samples[0] = 1.0;
        samples[SUBFRAME_SIZE] = 2.0;
        meta[0] = 0.25;
        meta[1] = 1.0;
        meta[2] = -0.25;
        meta[3] = 0.0;

        let frames = decode_audio_frames(2, &samples, &meta);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].samples.len(), SUBFRAME_SIZE);
        assert_eq!(frames[0].beam_angle, 0.25);
        assert_eq!(frames[0].samples[0], 1.0);
        assert_eq!(frames[1].beam_angle, -0.25);
        assert_eq!(frames[1].samples[0], 2.0);
    }

    #[test]
    fn test_merge_concatenates_and_averages() {
        let frames = vec![
            AudioFrame {
                beam_angle: 0.2,
                beam_confidence: 1.0,
                samples: vec![1.0; SUBFRAME_SIZE],
            },
            AudioFrame {
                beam_angle: 0.4,
                beam_confidence: 0.0,
                samples: vec![2.0; SUBFRAME_SIZE],
            },
        ];
        let merged = merge_audio_frames(&frames).unwrap();
        assert_eq!(merged.samples.len(), SUBFRAME_SIZE * 2);
        assert!((merged.beam_angle - 0.3).abs() < 1e-6);
        assert!((merged.beam_confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_merge_empty_is_none() {
        assert!(merge_audio_frames(&[]).is_none());
    }
}
