//! Resamples an arbitrary-rate mono PCM16 stream to 16 kHz and slices it
//! into fixed 20 ms / 640-byte frames for the ASR client.

use rubato::{FftFixedIn, Resampler};

use classbridge_core::Frame;

use crate::error::AsrError;

const TARGET_RATE: u32 = Frame::SAMPLE_RATE_HZ;
const FRAME_BYTES: usize = Frame::FRAME_BYTES;
const FRAME_SAMPLES: usize = FRAME_BYTES / 2;

/// Below this many samples, FFT resampling has too few bins to be useful;
/// linear interpolation is used instead.
const MIN_SAMPLES_FOR_FFT: usize = 64;

pub struct AudioFramer {
    device_rate: u32,
    resampler: Option<FftFixedIn<f32>>,
    /// Accumulated 16 kHz samples not yet emitted as a full frame.
    pending: Vec<i16>,
    seq: u64,
    t_ms: u64,
}

impl AudioFramer {
    pub fn new(device_sample_rate: u32) -> Result<Self, AsrError> {
        if device_sample_rate == 0 {
            return Err(AsrError::AudioInit);
        }
        let resampler = if device_sample_rate == TARGET_RATE {
            None
        } else {
            FftFixedIn::<f32>::new(device_sample_rate as usize, TARGET_RATE as usize, 1024, 2, 1).ok()
        };
        Ok(Self {
            device_rate: device_sample_rate,
            resampler,
            pending: Vec::new(),
            seq: 0,
            t_ms: 0,
        })
    }

    /// Feeds mono PCM16 samples at the device rate; returns every full
    /// 640-byte frame that became available. Silence gaps pass through
    /// unchanged (the framer never drops or fails on silent input).
    pub fn push_pcm16(&mut self, samples: &[i16]) -> Vec<Frame> {
        let resampled = self.resample_to_target(samples);
        self.pending.extend_from_slice(&resampled);

        let mut frames = Vec::new();
        while self.pending.len() >= FRAME_SAMPLES {
            let chunk: Vec<i16> = self.pending.drain(..FRAME_SAMPLES).collect();
            frames.push(self.make_frame(&chunk));
        }
        frames
    }

    /// Flushes any partial trailing frame, e.g. on stop(). Returns `None`
    /// if there is nothing pending.
    pub fn flush(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let mut chunk: Vec<i16> = self.pending.drain(..).collect();
        chunk.resize(FRAME_SAMPLES, 0);
        Some(self.make_frame(&chunk))
    }

    fn make_frame(&mut self, samples: &[i16]) -> Frame {
        let mut bytes = Vec::with_capacity(FRAME_BYTES);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        let frame = Frame::new(bytes, self.seq, self.t_ms);
        self.seq += 1;
        self.t_ms += Frame::FRAME_MS as u64;
        frame
    }

    fn resample_to_target(&mut self, samples: &[i16]) -> Vec<i16> {
        if self.device_rate == TARGET_RATE {
            return samples.to_vec();
        }
        let floats: Vec<f32> = samples.iter().map(|s| *s as f32 / 32768.0).collect();

        let resampled = if floats.len() < MIN_SAMPLES_FOR_FFT {
            resample_linear(&floats, self.device_rate, TARGET_RATE)
        } else if let Some(resampler) = self.resampler.as_mut() {
            match resampler.process(&[floats.clone()], None) {
                Ok(mut out) => out.remove(0),
                Err(_) => resample_linear(&floats, self.device_rate, TARGET_RATE),
            }
        } else {
            resample_linear(&floats, self.device_rate, TARGET_RATE)
        };

        resampled
            .into_iter()
            .map(|f| (f.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect()
    }
}

fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if input.is_empty() || from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = ((input.len() as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = input.get(idx).copied().unwrap_or(0.0);
        let b = input.get(idx + 1).copied().unwrap_or(a);
        output.push(a + (b - a) * frac);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_device_rate_fails_init() {
        assert!(AudioFramer::new(0).is_err());
    }

    #[test]
    fn native_rate_passes_through_without_resampling() {
        let mut framer = AudioFramer::new(16_000).unwrap();
        let samples = vec![0i16; FRAME_SAMPLES * 2];
        let frames = framer.push_pcm16(&samples);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].bytes.len(), FRAME_BYTES);
        assert_eq!(frames[0].seq, 0);
        assert_eq!(frames[1].seq, 1);
    }

    #[test]
    fn partial_tail_is_flushed_on_stop() {
        let mut framer = AudioFramer::new(16_000).unwrap();
        let samples = vec![1i16; 10];
        assert!(framer.push_pcm16(&samples).is_empty());
        let flushed = framer.flush().unwrap();
        assert_eq!(flushed.bytes.len(), FRAME_BYTES);
        assert!(framer.flush().is_none());
    }

    #[test]
    fn downsampling_48k_produces_fewer_samples() {
        let mut framer = AudioFramer::new(48_000).unwrap();
        let samples: Vec<i16> = (0..4800).map(|i| ((i % 100) * 100) as i16).collect();
        let frames = framer.push_pcm16(&samples);
        // 4800 samples @ 48kHz = 100ms -> ~1600 samples @ 16kHz -> 5 full frames.
        assert!(frames.len() >= 3);
    }
}
