use std::collections::BTreeMap;

use anyhow::Result;
use log::trace;

use crate::process::extract::Frame;
use crate::structs::header::FrameHeader;
use crate::utils::bitstream_io::{BitCursor, BlockRead};

/// A decoded header together with a cursor over the complete frame.
///
/// The cursor sits on the first bit after the header, where audio block
/// data starts.
#[derive(Debug)]
pub struct ParsedFrame {
    pub header: FrameHeader,
    pub reader: BitCursor,
}

/// Parses frame headers out of a byte source.
///
/// Keeps per-stream counters and the most recent header for display; these
/// never influence how the next frame is decoded.
#[derive(Debug, Default)]
pub struct Parser {
    state: ParserState,
}

impl Parser {
    /// Decodes one frame header, consuming exactly one frame from `source`.
    pub fn parse<S: BlockRead>(&mut self, source: &mut S) -> Result<ParsedFrame> {
        let (header, reader) = FrameHeader::read(&self.state, source)?;

        trace!(
            "Parsed {} frame, substream {}, {} bytes",
            header.stream_type,
            header.substream_id,
            header.frame_bytes()
        );

        self.state.frame_count += 1;
        *self
            .state
            .streams
            .entry((header.stream_type.code(), header.substream_id))
            .or_default() += 1;
        self.state.last_header = Some(header.clone());

        Ok(ParsedFrame { header, reader })
    }

    /// Decodes the header of an extracted frame.
    pub fn parse_frame(&mut self, frame: &Frame) -> Result<ParsedFrame> {
        let mut source = frame.as_ref();
        self.parse(&mut source)
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    pub fn frame_count(&self) -> usize {
        self.state.frame_count
    }

    /// Frames seen per `(stream type code, substream id)` pair.
    pub fn stream_counts(&self) -> &BTreeMap<(u8, u8), usize> {
        &self.state.streams
    }

    pub fn last_header(&self) -> Option<&FrameHeader> {
        self.state.last_header.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct ParserState {
    pub fail_level: log::Level,
    pub frame_count: usize,
    pub streams: BTreeMap<(u8, u8), usize>,
    pub last_header: Option<FrameHeader>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            frame_count: 0,
            streams: BTreeMap::new(),
            last_header: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::header::{EnhancedBody, HeaderBody, StreamType};

    fn frame(stream_type: StreamType, substream_id: u8) -> Result<Vec<u8>> {
        let header = FrameHeader {
            stream_type,
            substream_id,
            words_per_syncframe: 32,
            channel_mode: 7,
            lfe: true,
            body: HeaderBody::Enhanced(EnhancedBody {
                dialog_normalization: 20,
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut bytes = header.write()?;
        bytes.resize(header.frame_bytes(), 0xA5);
        Ok(bytes)
    }

    #[test]
    fn parses_consecutive_frames() -> Result<()> {
        let mut data = frame(StreamType::Independent, 0)?;
        data.extend(frame(StreamType::Dependent, 0)?);
        data.extend(frame(StreamType::Independent, 0)?);

        let mut parser = Parser::default();
        let mut source = data.as_slice();

        let first = parser.parse(&mut source)?;
        assert_eq!(first.header.channel_count(), 6);
        assert_eq!(first.reader.len_bytes(), 64);
        assert_eq!(first.reader.available(), 64 * 8 - first.reader.position());

        let second = parser.parse(&mut source)?;
        assert_eq!(second.header.stream_type, StreamType::Dependent);

        parser.parse(&mut source)?;
        assert!(source.is_empty());
        assert!(parser.parse(&mut source).is_err());

        assert_eq!(parser.frame_count(), 3);
        assert_eq!(parser.stream_counts()[&(0, 0)], 2);
        assert_eq!(parser.stream_counts()[&(1, 0)], 1);
        assert_eq!(
            parser.last_header().map(|header| header.stream_type),
            Some(StreamType::Independent)
        );

        Ok(())
    }

    #[test]
    fn failed_parse_keeps_counters() -> Result<()> {
        let mut data = frame(StreamType::Independent, 2)?;
        data[0] = 0;

        let mut parser = Parser::default();
        parser.set_fail_level(log::Level::Warn);
        assert!(parser.parse(&mut data.as_slice()).is_err());
        assert_eq!(parser.frame_count(), 0);
        assert!(parser.last_header().is_none());

        Ok(())
    }
}
