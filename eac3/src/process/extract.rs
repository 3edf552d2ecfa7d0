use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, error};

use crate::structs::header::{PREFIX_BYTES, SYNC_WORD, legacy_frame_words};
use crate::utils::crc::Crc16;
use crate::utils::errors::ExtractError;

const SYNC_BYTES: [u8; 2] = SYNC_WORD.to_be_bytes();

/// Extracts frames from a continuous bitstream.
///
/// Scans for the sync word, derives the frame length from the frame prefix
/// and checks the frame CRC before handing the frame out.
///
/// # Example
///
/// ```rust,no_run
/// use eac3::process::extract::Extractor;
///
/// let mut extractor = Extractor::default();
/// extractor.push_bytes(&std::fs::read("stream.ec3")?);
///
/// for frame in extractor {
///     match frame {
///         Ok(frame) => println!("Extracted frame with {} bytes", frame.as_ref().len()),
///         Err(err) => eprintln!("{err}"),
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Extractor {
    buffer: VecDeque<u8>,
    io_counter: usize,
    crc: Crc16,
    crc_failures: usize,
    frames_processed: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            buffer: VecDeque::with_capacity(64 * 1024),
            io_counter: 0,
            crc: Crc16::default(),
            crc_failures: 0,
            frames_processed: 0,
        }
    }
}

impl Extractor {
    /// Adds raw bitstream data to the internal buffer.
    ///
    /// Every push allows the iterator to report one more
    /// [`ExtractError::InsufficientData`] before it stops yielding.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
        self.io_counter += 1;
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    pub fn crc_failures(&self) -> usize {
        self.crc_failures
    }

    /// Drops everything in front of the next sync word.
    ///
    /// Returns `false` when no sync word is buffered; a trailing first sync
    /// byte is kept for the next push.
    fn seek_sync(&mut self) -> bool {
        let found = (1..self.buffer.len())
            .find(|&i| self.buffer[i - 1] == SYNC_BYTES[0] && self.buffer[i] == SYNC_BYTES[1]);

        match found {
            Some(i) => {
                self.consume_front(i - 1);
                true
            }
            None => {
                let keep = usize::from(self.buffer.back() == Some(&SYNC_BYTES[0]));
                self.consume_front(self.buffer.len() - keep);
                false
            }
        }
    }

    /// Frame length in bytes for the frame starting at the buffer front.
    fn frame_len(&self) -> Option<usize> {
        let byte = |i: usize| self.buffer.get(i).copied();
        let decoder_id = byte(5)? >> 3;

        let len = if decoder_id > 10 {
            ((((byte(2)? & 0x07) as usize) << 8 | byte(3)? as usize) + 1) * 2
        } else {
            let code = byte(4)?;
            legacy_frame_words(code >> 6, code & 0x3F)? as usize * 2
        };

        (len >= PREFIX_BYTES).then_some(len)
    }

    fn consume_front(&mut self, cnt: usize) {
        self.buffer.drain(..cnt);
    }

    fn iter_insufficient(&mut self) -> Option<Result<Frame, ExtractError>> {
        self.io_counter = self.io_counter.saturating_sub(1);
        Some(Err(ExtractError::InsufficientData))
    }
}

impl Iterator for Extractor {
    type Item = Result<Frame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.io_counter == 0 {
            return None;
        }

        if !self.seek_sync() || self.buffer.len() < PREFIX_BYTES {
            return self.iter_insufficient();
        }

        let Some(frame_len) = self.frame_len() else {
            debug!("Invalid frame size at sync word, resyncing");
            self.consume_front(1);
            return Some(Err(ExtractError::InvalidFrameSize));
        };

        if self.buffer.len() < frame_len {
            return self.iter_insufficient();
        }

        let data = self.buffer.range(..frame_len).copied().collect::<Vec<_>>();

        if self.crc.frame_residue(&data) != 0 {
            let err = ExtractError::CrcMismatch(frame_len);
            error!("{err}");

            self.crc_failures += 1;
            self.consume_front(SYNC_BYTES.len());
            return Some(Err(err));
        }

        self.consume_front(frame_len);
        self.frames_processed += 1;

        Some(Ok(Frame { data: data.into() }))
    }
}

/// A single frame extracted from a bitstream, sync word included.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<[u8]>,
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Frame {
    pub fn decoder_id(&self) -> u8 {
        self.data.get(5).map_or(0, |byte| byte >> 3)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::structs::header::{ALTERNATE_DECODER_ID, FrameHeader, HeaderBody, StreamType};
    use crate::structs::legacy::LegacyBody;

    /// Builds a frame with a valid CRC in its last two bytes.
    fn with_crc(header: &FrameHeader) -> Result<Vec<u8>> {
        let mut frame = header.write()?;
        frame.resize(header.frame_bytes() - 2, 0x5C);

        let crc = Crc16::default();
        let check = crc.update(crc.init, &frame[2..]);
        frame.extend_from_slice(&check.to_be_bytes());

        Ok(frame)
    }

    fn enhanced_frame(words: u16) -> Result<Vec<u8>> {
        with_crc(&FrameHeader {
            words_per_syncframe: words,
            ..Default::default()
        })
    }

    fn count(extractor: &mut Extractor) -> (usize, bool) {
        let mut frames = 0;
        let mut end_with_insufficient_data = false;
        for result in extractor {
            match result {
                Ok(_) => frames += 1,
                Err(ExtractError::InsufficientData) => end_with_insufficient_data = true,
                Err(_) => continue,
            }
        }

        (frames, end_with_insufficient_data)
    }

    #[test]
    fn skips_garbage_between_frames() -> Result<()> {
        let mut data = vec![0xFF; 37];
        data.extend(enhanced_frame(40)?);
        data.extend([0xFF, 0x0B, 0xFF, 0x77]);
        data.extend(enhanced_frame(64)?);
        data.extend(enhanced_frame(40)?);
        data.extend([0xFF; 4]);

        let mut extractor = Extractor::default();
        extractor.push_bytes(&data);

        assert_eq!(count(&mut extractor), (3, true));
        assert_eq!(extractor.frames_processed(), 3);
        assert_eq!(extractor.crc_failures(), 0);

        Ok(())
    }

    #[test]
    fn waits_for_split_frames() -> Result<()> {
        let data = enhanced_frame(64)?;
        let mut extractor = Extractor::default();

        extractor.push_bytes(&data[..1]);
        assert!(matches!(
            extractor.next(),
            Some(Err(ExtractError::InsufficientData))
        ));
        assert!(extractor.next().is_none());

        extractor.push_bytes(&data[1..50]);
        assert!(matches!(
            extractor.next(),
            Some(Err(ExtractError::InsufficientData))
        ));

        extractor.push_bytes(&data[50..]);
        let frame = extractor.next().unwrap()?;
        assert_eq!(frame.as_ref(), data.as_slice());
        assert_eq!(frame.decoder_id(), 16);

        Ok(())
    }

    #[test]
    fn crc_failure_resyncs() -> Result<()> {
        let mut bad = enhanced_frame(48)?;
        bad[20] ^= 0x01;

        let mut data = bad;
        data.extend(enhanced_frame(48)?);

        let mut extractor = Extractor::default();
        extractor.push_bytes(&data);

        assert!(matches!(
            extractor.next(),
            Some(Err(ExtractError::CrcMismatch(96)))
        ));
        assert_eq!(count(&mut extractor), (1, true));
        assert_eq!(extractor.crc_failures(), 1);

        Ok(())
    }

    #[test]
    fn invalid_size_resyncs() -> Result<()> {
        // E-AC-3 decoder id with frmsiz = 1: a four byte frame
        let mut data = vec![0x0B, 0x77, 0x00, 0x01, 0x00, 16 << 3];
        data.extend(enhanced_frame(40)?);

        let mut extractor = Extractor::default();
        extractor.push_bytes(&data);

        assert!(matches!(
            extractor.next(),
            Some(Err(ExtractError::InvalidFrameSize))
        ));
        assert_eq!(count(&mut extractor), (1, true));

        Ok(())
    }

    #[test]
    fn legacy_framed_length_from_size_code() -> Result<()> {
        let header = FrameHeader {
            stream_type: StreamType::Repackaged,
            words_per_syncframe: 140,
            sample_rate_code: 1,
            channel_mode: 2,
            decoder_id: ALTERNATE_DECODER_ID,
            body: HeaderBody::Legacy(LegacyBody {
                frame_size_code: 9,
                surround_mode: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut extractor = Extractor::default();
        extractor.push_bytes(&with_crc(&header)?);

        let frame = extractor.next().unwrap()?;
        assert_eq!(frame.as_ref().len(), 280);
        assert_eq!(frame.decoder_id(), ALTERNATE_DECODER_ID);
        assert_eq!(FrameHeader::from_bytes(frame.as_ref())?, header);

        Ok(())
    }
}
