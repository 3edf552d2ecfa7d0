//! Body of the alternate (Annex D) bit stream information.
//!
//! The alternate decoder id keeps the legacy framing: the 16 bits after the
//! sync word are a CRC word and the frame size comes from a size code. The
//! body carries its own channel mode and LFE flag.

use anyhow::Result;

use crate::structs::header::sync_additional_info;
use crate::structs::info::ProductionInfo;
use crate::utils::bitstream_io::BitSyntax;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondProgram {
    pub dialog_normalization: u8,
    pub compression: Option<u8>,
    pub language_code: Option<u8>,
    pub production: Option<ProductionInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedInfo1 {
    pub downmix_mode: u8,
    pub ltrt_center_level: u8,
    pub ltrt_surround_level: u8,
    pub loro_center_level: u8,
    pub loro_surround_level: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedInfo2 {
    pub surround_ex_mode: u8,
    pub headphone_mode: u8,
    pub ad_converter_type: u8,
    pub reserved: u8,
    pub encoder_info: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyBody {
    /// First check word, stored as read.
    pub crc1: u16,
    pub frame_size_code: u8,

    pub bitstream_mode: u8,
    pub center_mix_level: Option<u8>,
    pub surround_mix_level: Option<u8>,
    pub surround_mode: Option<u8>,
    pub dialog_normalization: u8,
    pub compression: Option<u8>,
    pub language_code: Option<u8>,
    pub production: Option<ProductionInfo>,
    pub second_program: Option<SecondProgram>,
    pub copyright: bool,
    pub original: bool,
    pub extended_info1: Option<ExtendedInfo1>,
    pub extended_info2: Option<ExtendedInfo2>,
    pub additional_info: Option<Vec<u8>>,
}

impl LegacyBody {
    /// Runs the body field list; `channel_mode` and `lfe` live in the frame header.
    pub fn sync<S: BitSyntax>(
        &mut self,
        bs: &mut S,
        channel_mode: &mut u8,
        lfe: &mut bool,
    ) -> Result<()> {
        bs.field(&mut self.bitstream_mode, 3)?;
        bs.field(channel_mode, 3)?;

        let acmod = *channel_mode;
        bs.field_if(acmod & 1 != 0 && acmod != 1, &mut self.center_mix_level, 2)?;
        bs.field_if(acmod & 4 != 0, &mut self.surround_mix_level, 2)?;
        bs.field_if(acmod == 2, &mut self.surround_mode, 2)?;
        bs.flag(lfe)?;

        bs.field(&mut self.dialog_normalization, 5)?;
        bs.optional(&mut self.compression, 8)?;
        bs.optional(&mut self.language_code, 8)?;
        bs.group(&mut self.production, |bs, info| info.sync(bs, false))?;

        self.second_program = if acmod == 0 {
            let mut second = self.second_program.take().unwrap_or_default();
            bs.field(&mut second.dialog_normalization, 5)?;
            bs.optional(&mut second.compression, 8)?;
            bs.optional(&mut second.language_code, 8)?;
            bs.group(&mut second.production, |bs, info| info.sync(bs, false))?;
            Some(second)
        } else {
            None
        };

        bs.flag(&mut self.copyright)?;
        bs.flag(&mut self.original)?;

        bs.group(&mut self.extended_info1, |bs, info| {
            bs.field(&mut info.downmix_mode, 2)?;
            bs.field(&mut info.ltrt_center_level, 3)?;
            bs.field(&mut info.ltrt_surround_level, 3)?;
            bs.field(&mut info.loro_center_level, 3)?;
            bs.field(&mut info.loro_surround_level, 3)
        })?;

        bs.group(&mut self.extended_info2, |bs, info| {
            bs.field(&mut info.surround_ex_mode, 2)?;
            bs.field(&mut info.headphone_mode, 2)?;
            bs.field(&mut info.ad_converter_type, 1)?;
            bs.field(&mut info.reserved, 8)?;
            bs.flag(&mut info.encoder_info)
        })?;

        sync_additional_info(bs, &mut self.additional_info)
    }
}
