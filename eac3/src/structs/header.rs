//! Frame header: sync, framing fields and the conditional body.
//!
//! Decoding reads a six byte prefix, works out the frame length from it and
//! then pulls the rest of the frame into the same [`BitCursor`]. Encoding runs
//! the same body field lists through a [`BitCursorWriter`].

use std::fmt::Display;

use anyhow::{Result, anyhow, bail};
use log::{debug, trace};

use crate::process::parse::ParserState;
use crate::structs::channel::ReferenceChannel;
use crate::structs::info::InformationalMetadata;
use crate::structs::legacy::LegacyBody;
use crate::structs::mixing::MixingMetadata;
use crate::utils::bitstream_io::{BitCursor, BitCursorWriter, BitSyntax, BlockRead};
use crate::utils::errors::HeaderError;

pub const SYNC_WORD: u16 = 0x0B77;

/// Bytes needed to reach the end of the decoder id.
pub const PREFIX_BYTES: usize = 6;

pub const ALTERNATE_DECODER_ID: u8 = 6;

pub const SAMPLE_RATES: [u32; 3] = [48000, 44100, 32000];

pub const BLOCKS_PER_FRAME: [u8; 4] = [1, 2, 3, 6];

pub const SAMPLES_PER_BLOCK: usize = 256;

/// Words per frame at 48 kHz, indexed by `frame_size_code >> 1`.
const LEGACY_FRAME_WORDS: [u16; 19] = [
    64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 640, 768, 896, 1024, 1152, 1280,
];

/// Words per frame for a legacy frame size code.
///
/// 44.1 kHz frames scale by 1393/1280 and use the low code bit as padding;
/// 32 kHz frames are half again as long as at 48 kHz.
pub fn legacy_frame_words(sample_rate_code: u8, frame_size_code: u8) -> Option<u16> {
    let words = *LEGACY_FRAME_WORDS.get((frame_size_code >> 1) as usize)? as u32;

    let words = match sample_rate_code {
        0 => words,
        1 => words * 1393 / 1280 + (frame_size_code & 1) as u32,
        2 => words * 3 / 2,
        _ => return None,
    };

    Some(words as u16)
}

#[rustfmt::skip]
const CHANNEL_MODES: [&[ReferenceChannel]; 8] = {
    use ReferenceChannel::*;
    [
        &[FrontLeft, FrontRight],
        &[FrontCenter],
        &[FrontLeft, FrontRight],
        &[FrontLeft, FrontCenter, FrontRight],
        &[FrontLeft, FrontRight, RearCenter],
        &[FrontLeft, FrontCenter, FrontRight, RearCenter],
        &[FrontLeft, FrontRight, SideLeft, SideRight],
        &[FrontLeft, FrontCenter, FrontRight, SideLeft, SideRight],
    ]
};

/// Targets of each channel map bit, most significant bit first.
#[rustfmt::skip]
const CHANNEL_MAP_TARGETS: [&[ReferenceChannel]; 16] = {
    use ReferenceChannel::*;
    [
        &[FrontLeft],
        &[FrontCenter],
        &[FrontRight],
        &[SideLeft],
        &[SideRight],
        &[FrontLeftCenter, FrontRightCenter],
        &[RearLeft, RearRight],
        &[RearCenter],
        &[GodsVoice],
        &[SideLeft, SideRight],
        &[WideLeft, WideRight],
        &[TopFrontLeft, TopFrontRight],
        &[TopFrontCenter],
        &[TopSideLeft, TopSideRight],
        &[ScreenLFE],
        &[ScreenLFE],
    ]
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamType {
    #[default]
    Independent,
    Dependent,
    Repackaged,
}

impl StreamType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Independent),
            1 => Some(Self::Dependent),
            2 => Some(Self::Repackaged),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Independent => 0,
            Self::Dependent => 1,
            Self::Repackaged => 2,
        }
    }
}

impl Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Independent => write!(f, "Independent"),
            Self::Dependent => write!(f, "Dependent"),
            Self::Repackaged => write!(f, "Repackaged"),
        }
    }
}

/// Already-decoded fields the body syntax branches on.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext {
    pub stream_type: StreamType,
    pub channel_mode: u8,
    pub lfe: bool,
    pub blocks: u8,
    pub sample_rate_code: u8,
    pub fail_level: log::Level,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancedBody {
    pub dialog_normalization: u8,
    pub compression: Option<u8>,
    pub dialog_normalization2: Option<u8>,
    pub compression2: Option<u8>,
    pub channel_map: Option<u16>,
    pub mixing: Option<MixingMetadata>,
    pub info: Option<InformationalMetadata>,
    pub converter_sync: Option<bool>,
    pub frame_size_code: Option<u8>,
    pub additional_info: Option<Vec<u8>>,
}

impl EnhancedBody {
    pub fn sync<S: BitSyntax>(&mut self, bs: &mut S, ctx: &FieldContext) -> Result<()> {
        bs.field(&mut self.dialog_normalization, 5)?;
        bs.optional(&mut self.compression, 8)?;

        if ctx.channel_mode == 0 {
            bs.field_if(true, &mut self.dialog_normalization2, 5)?;
            bs.optional(&mut self.compression2, 8)?;
        } else {
            self.dialog_normalization2 = None;
            self.compression2 = None;
        }

        if ctx.stream_type == StreamType::Dependent {
            bs.optional(&mut self.channel_map, 16)?;
        } else {
            self.channel_map = None;
        }

        bs.group(&mut self.mixing, |bs, mixing| mixing.sync(bs, ctx))?;
        bs.group(&mut self.info, |bs, info| info.sync(bs, ctx))?;

        self.converter_sync = if ctx.stream_type == StreamType::Independent && ctx.blocks != 6 {
            let mut flag = self.converter_sync.unwrap_or_default();
            bs.flag(&mut flag)?;
            Some(flag)
        } else {
            None
        };

        if ctx.stream_type == StreamType::Repackaged {
            // Six-block frames always carry the frame size code.
            let mut block_id = ctx.blocks == 6 || self.frame_size_code.is_some();
            if ctx.blocks != 6 {
                bs.flag(&mut block_id)?;
            }
            bs.field_if(block_id, &mut self.frame_size_code, 6)?;
        } else {
            self.frame_size_code = None;
        }

        sync_additional_info(bs, &mut self.additional_info)
    }
}

/// Trailing `addbsi` block: presence bit, 6-bit length minus one, bytes.
pub(crate) fn sync_additional_info<S: BitSyntax>(
    bs: &mut S,
    additional_info: &mut Option<Vec<u8>>,
) -> Result<()> {
    bs.group(additional_info, |bs, data| {
        let mut len = data.len().saturating_sub(1) as u8;
        bs.field(&mut len, 6)?;
        bs.bytes(data, len as usize + 1)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderBody {
    Enhanced(EnhancedBody),
    Legacy(LegacyBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub stream_type: StreamType,
    pub substream_id: u8,
    pub words_per_syncframe: u16,
    pub sample_rate_code: u8,
    pub blocks: u8,
    pub channel_mode: u8,
    pub lfe: bool,
    pub decoder_id: u8,
    pub body: HeaderBody,
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self {
            stream_type: StreamType::Independent,
            substream_id: 0,
            words_per_syncframe: 0,
            sample_rate_code: 0,
            blocks: 6,
            channel_mode: 2,
            lfe: false,
            decoder_id: 16,
            body: HeaderBody::Enhanced(EnhancedBody::default()),
        }
    }
}

impl FrameHeader {
    /// Decodes one frame header, pulling exactly one frame out of `source`.
    ///
    /// The returned cursor holds the whole frame and sits on the first bit
    /// after the header.
    pub fn read<S: BlockRead>(state: &ParserState, source: &mut S) -> Result<(Self, BitCursor)> {
        let sync_bytes = source.read_block(2)?;
        let sync = u16::from_be_bytes([sync_bytes[0], sync_bytes[1]]);
        if sync != SYNC_WORD {
            bail!(HeaderError::Sync(sync));
        }

        let mut reader = BitCursor::new(sync_bytes);
        reader.expand(&source.read_block(PREFIX_BYTES - 2)?)?;
        reader.skip_n(16)?;

        let stream_type_code: u8 = reader.get_n(2)?;
        let substream_id: u8 = reader.get_n(3)?;
        let frame_size: u16 = reader.get_n(11)?;
        let sample_rate_code: u8 = reader.get_n(2)?;
        let blocks_code: u8 = reader.get_n(2)?;
        let channel_mode: u8 = reader.get_n(3)?;
        let lfe = reader.get()?;
        let decoder_id: u8 = reader.get_n(5)?;

        trace!(
            "Frame prefix: strmtyp={stream_type_code}, substreamid={substream_id}, frmsiz={frame_size}, \
             fscod={sample_rate_code}, numblkscod={blocks_code}, acmod={channel_mode}, lfeon={lfe}, bsid={decoder_id}"
        );

        let mut header = match decoder_id {
            ALTERNATE_DECODER_ID => {
                let crc1 = (stream_type_code as u16) << 14 | (substream_id as u16) << 11 | frame_size;
                let frame_size_code = blocks_code << 4 | channel_mode << 1 | lfe as u8;

                check_sample_rate_code(sample_rate_code)?;
                let words = legacy_frame_words(sample_rate_code, frame_size_code).ok_or(
                    HeaderError::ReservedValue {
                        field: "frame_size_code",
                        value: frame_size_code as u32,
                    },
                )?;

                debug!("Alternate framing: frmsizecod={frame_size_code}, {words} words");

                Self {
                    stream_type: StreamType::Repackaged,
                    substream_id: 0,
                    words_per_syncframe: words,
                    sample_rate_code,
                    blocks: 6,
                    channel_mode: 0,
                    lfe: false,
                    decoder_id,
                    body: HeaderBody::Legacy(LegacyBody {
                        crc1,
                        frame_size_code,
                        ..Default::default()
                    }),
                }
            }
            11..=16 => Self {
                // Checked once the frame is complete.
                stream_type: StreamType::from_code(stream_type_code)
                    .unwrap_or(StreamType::Independent),
                substream_id,
                words_per_syncframe: frame_size + 1,
                sample_rate_code,
                blocks: BLOCKS_PER_FRAME[blocks_code as usize],
                channel_mode,
                lfe,
                decoder_id,
                body: HeaderBody::Enhanced(EnhancedBody::default()),
            },
            0..=10 => bail!(HeaderError::UnsupportedLegacy(decoder_id)),
            _ => bail!(HeaderError::Unsupported(format!("decoder id {decoder_id}"))),
        };

        let frame_bytes = header.frame_bytes();
        if frame_bytes < PREFIX_BYTES {
            bail!(HeaderError::FrameTooShort(frame_bytes));
        }
        reader.expand(&source.read_block(frame_bytes - PREFIX_BYTES)?)?;

        if matches!(header.body, HeaderBody::Enhanced(_)) && stream_type_code == 3 {
            bail!(HeaderError::ReservedValue {
                field: "stream_type",
                value: 3,
            });
        }
        check_sample_rate_code(sample_rate_code)?;

        let ctx = header.context(state.fail_level);
        match &mut header.body {
            HeaderBody::Enhanced(body) => body.sync(&mut reader, &ctx)?,
            HeaderBody::Legacy(body) => {
                body.sync(&mut reader, &mut header.channel_mode, &mut header.lfe)?
            }
        }

        header.channel_arrangement()?;

        Ok((header, reader))
    }

    /// Decodes a header from a byte slice holding at least one complete frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut source = bytes;
        Self::read(&ParserState::default(), &mut source).map(|(header, _)| header)
    }

    /// Encodes the header, zero-padded to a byte boundary.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut writer = BitCursorWriter::default();
        writer.put(SYNC_WORD as u32, 16)?;

        match &self.body {
            HeaderBody::Enhanced(body) => {
                let blocks_code = BLOCKS_PER_FRAME
                    .iter()
                    .position(|&blocks| blocks == self.blocks)
                    .ok_or(HeaderError::ReservedValue {
                        field: "blocks",
                        value: self.blocks as u32,
                    })?;
                let frame_size = self
                    .words_per_syncframe
                    .checked_sub(1)
                    .ok_or(HeaderError::FrameTooShort(0))?;

                writer.put(self.stream_type.code() as u32, 2)?;
                writer.put(self.substream_id as u32, 3)?;
                writer.put(frame_size as u32, 11)?;
                writer.put(self.sample_rate_code as u32, 2)?;
                writer.put(blocks_code as u32, 2)?;
                writer.put(self.channel_mode as u32, 3)?;
                writer.put_bit(self.lfe)?;
                writer.put(self.decoder_id as u32, 5)?;

                body.clone()
                    .sync(&mut writer, &self.context(log::Level::Error))?;
            }
            HeaderBody::Legacy(body) => {
                writer.put(body.crc1 as u32, 16)?;
                writer.put(self.sample_rate_code as u32, 2)?;
                writer.put(body.frame_size_code as u32, 6)?;
                writer.put(self.decoder_id as u32, 5)?;

                let (mut channel_mode, mut lfe) = (self.channel_mode, self.lfe);
                body.clone().sync(&mut writer, &mut channel_mode, &mut lfe)?;
            }
        }

        Ok(writer.finish()?)
    }

    pub fn context(&self, fail_level: log::Level) -> FieldContext {
        FieldContext {
            stream_type: self.stream_type,
            channel_mode: self.channel_mode,
            lfe: self.lfe,
            blocks: self.blocks,
            sample_rate_code: self.sample_rate_code,
            fail_level,
        }
    }

    pub fn enhanced(&self) -> Option<&EnhancedBody> {
        match &self.body {
            HeaderBody::Enhanced(body) => Some(body),
            HeaderBody::Legacy(_) => None,
        }
    }

    pub fn legacy(&self) -> Option<&LegacyBody> {
        match &self.body {
            HeaderBody::Legacy(body) => Some(body),
            HeaderBody::Enhanced(_) => None,
        }
    }

    pub fn channel_map(&self) -> Option<u16> {
        self.enhanced().and_then(|body| body.channel_map)
    }

    pub fn mixing(&self) -> Option<&MixingMetadata> {
        self.enhanced().and_then(|body| body.mixing.as_ref())
    }

    pub fn info(&self) -> Option<&InformationalMetadata> {
        self.enhanced().and_then(|body| body.info.as_ref())
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATES
            .get(self.sample_rate_code as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn frame_bytes(&self) -> usize {
        self.words_per_syncframe as usize * 2
    }

    pub fn samples_per_frame(&self) -> usize {
        self.blocks as usize * SAMPLES_PER_BLOCK
    }

    /// Coded bitrate in bits per second.
    pub fn bitrate(&self) -> u32 {
        let samples = self.samples_per_frame() as u64;
        if samples == 0 {
            return 0;
        }

        (self.frame_bytes() as u64 * 8 * self.sample_rate() as u64 / samples) as u32
    }

    pub fn dialog_normalization_db(&self) -> i8 {
        let dialnorm = match &self.body {
            HeaderBody::Enhanced(body) => body.dialog_normalization,
            HeaderBody::Legacy(body) => body.dialog_normalization,
        };

        if dialnorm == 0 { -31 } else { -(dialnorm as i8) }
    }

    /// Number of channels implied by the channel mode and LFE flag.
    pub fn channel_count(&self) -> usize {
        CHANNEL_MODES[(self.channel_mode & 7) as usize].len() + self.lfe as usize
    }

    /// Resolves the logical channel order of the frame.
    ///
    /// Starts from the channel mode table and, for dependent streams with a
    /// channel map, overwrites slots in map bit order.
    pub fn channel_arrangement(&self) -> Result<Vec<ReferenceChannel>> {
        let mut channels = CHANNEL_MODES[(self.channel_mode & 7) as usize].to_vec();
        if self.lfe {
            channels.push(ReferenceChannel::ScreenLFE);
        }

        let Some(channel_map) = self.channel_map() else {
            return Ok(channels);
        };

        let targets = CHANNEL_MAP_TARGETS
            .iter()
            .enumerate()
            .filter(|&(bit, _)| channel_map & (0x8000 >> bit) != 0)
            .flat_map(|(_, &targets)| targets.iter().copied())
            .collect::<Vec<_>>();

        if targets.len() > channels.len() {
            bail!(HeaderError::Corruption {
                produced: targets.len(),
                slots: channels.len(),
            });
        }

        channels[..targets.len()].copy_from_slice(&targets);

        Ok(channels)
    }
}

fn check_sample_rate_code(sample_rate_code: u8) -> Result<()> {
    if sample_rate_code as usize >= SAMPLE_RATES.len() {
        return Err(anyhow!(HeaderError::ReservedValue {
            field: "sample_rate_code",
            value: sample_rate_code as u32,
        }));
    }

    Ok(())
}
