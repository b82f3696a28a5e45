use super::{AudioBuffer, CaptureError};

pub const WAV_MIME: &str = "audio/wav";

/// Encodes the buffer as a 16-bit PCM RIFF/WAVE file.
pub fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>, CaptureError> {
    if audio.is_empty() {
        return Err(CaptureError::Encoding("no samples captured".to_string()));
    }
    if audio.sample_rate == 0 || audio.channels == 0 {
        return Err(CaptureError::Encoding(format!(
            "invalid format: {} Hz, {} channels",
            audio.sample_rate, audio.channels
        )));
    }

    let (data_size, riff_size) = chunk_sizes(audio.samples.len())?;
    let mut wav = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&audio.channels.to_le_bytes());
    wav.extend_from_slice(&audio.sample_rate.to_le_bytes());
    let byte_rate = audio.sample_rate * audio.channels as u32 * 2;
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&(audio.channels * 2).to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    for &sample in &audio.samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    Ok(wav)
}

/// `data` chunk and RIFF sizes for `samples` 16-bit samples. Both must fit the header's u32.
fn chunk_sizes(samples: usize) -> Result<(u32, u32), CaptureError> {
    let too_long = || CaptureError::Encoding(format!("{} samples exceed the WAV size limit", samples));
    let data_size = samples
        .checked_mul(2)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .ok_or_else(too_long)?;
    let riff_size = data_size.checked_add(36).ok_or_else(too_long)?;
    Ok((data_size, riff_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut audio = AudioBuffer::new(16_000, 1);
        audio.append(&[1, -1, 256]);
        let wav = encode_wav(&audio).unwrap();

        assert_eq!(wav.len(), 44 + 6);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 42);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 6);
        assert_eq!(&wav[44..46], &1i16.to_le_bytes());
    }

    #[test]
    fn test_chunk_sizes_reject_oversized_recordings() {
        assert_eq!(chunk_sizes(3).unwrap(), (6, 42));

        let largest = ((u32::MAX - 36) / 2) as usize;
        assert_eq!(chunk_sizes(largest).unwrap().1, u32::MAX - 1);
        assert!(matches!(
            chunk_sizes(largest + 1),
            Err(CaptureError::Encoding(_))
        ));
        assert!(matches!(
            chunk_sizes(u32::MAX as usize),
            Err(CaptureError::Encoding(_))
        ));
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let audio = AudioBuffer::new(16_000, 1);
        assert!(matches!(encode_wav(&audio), Err(CaptureError::Encoding(_))));
    }
}
