//! Канонический 16-битный PCM WAV.

pub const HEADER_LEN: usize = 44;
pub const BITS_PER_SAMPLE: u16 = 16;

/// float -> i16: сначала clamp в [-1, 1], отрицательные умножаются на 0x8000, остальные на 0x7FFF.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Каналы -> кадры (L R L R ...). Короткий канал дополняется тишиной.
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * channels.len());
    for i in 0..frames {
        for channel in channels {
            out.push(channel.get(i).copied().unwrap_or(0.0));
        }
    }
    out
}

pub fn write_header(out: &mut Vec<u8>, channels: u16, sample_rate: u32, data_len: u32) {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
}

/// Собирает WAV из float-каналов.
pub fn encode_wav(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
    let samples = interleave(channels);
    let data_len = (samples.len() * 2) as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + samples.len() * 2);
    write_header(&mut out, channels.len() as u16, sample_rate, data_len);
    for sample in samples {
        out.extend_from_slice(&quantize(sample).to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    #[test]
    fn header_fields_are_canonical() {
        let wav = encode_wav(&[vec![0.0; 100], vec![0.0; 100]], 44_100);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u32_at(&wav, 28), 44_100 * 2 * 2);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40) as usize + HEADER_LEN, wav.len());
    }

    #[test]
    fn quantize_uses_asymmetric_scale() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(3.5), 32767);
        assert_eq!(quantize(-7.0), -32768);
        assert_eq!(quantize(0.5), 16383);
    }

    #[test]
    fn interleave_orders_frames() {
        let out = interleave(&[vec![1.0, 2.0], vec![-1.0, -2.0]]);
        assert_eq!(out, vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn hound_reads_encoded_output() {
        let wav = encode_wav(&[vec![0.25, -0.25, 0.5]], 16_000);
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![8191, -8192, 16383]);
    }

    proptest! {
        #[test]
        fn quantized_samples_stay_in_range(s in -1.0f32..=1.0f32) {
            let q = quantize(s) as i32;
            prop_assert!((-32768..=32767).contains(&q));
            prop_assert_eq!(q.signum(), if q == 0 { 0 } else { s.signum() as i32 });
        }

        #[test]
        fn out_of_range_samples_clamp(s in 1.0f32..1.0e6f32) {
            prop_assert_eq!(quantize(s), 32767);
            prop_assert_eq!(quantize(-s), -32768);
        }

        #[test]
        fn data_length_matches_blob(frames in 0usize..2000, channels in 1usize..3) {
            let wav = encode_wav(&vec![vec![0.1; frames]; channels], 8000);
            prop_assert_eq!(u32_at(&wav, 40) as usize + HEADER_LEN, wav.len());
            prop_assert_eq!(wav.len(), HEADER_LEN + frames * channels * 2);
        }
    }
}
