//! Informational metadata carried in the enhanced header body.

use anyhow::Result;

use crate::structs::header::FieldContext;
use crate::utils::bitstream_io::BitSyntax;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductionInfo {
    /// Peak mixing level, 80..=111 dB SPL.
    pub mix_level: u8,
    pub room_type: u8,
    pub ad_converter_type: u8,
}

impl ProductionInfo {
    pub fn mix_level_db(&self) -> u8 {
        self.mix_level + 80
    }

    pub fn room_type_name(&self) -> &'static str {
        match self.room_type {
            0 => "Not indicated",
            1 => "Large room",
            2 => "Small room",
            _ => "Reserved",
        }
    }

    pub(crate) fn sync<S: BitSyntax>(&mut self, bs: &mut S, with_converter: bool) -> Result<()> {
        bs.field(&mut self.mix_level, 5)?;
        bs.field(&mut self.room_type, 2)?;

        if with_converter {
            bs.field(&mut self.ad_converter_type, 1)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InformationalMetadata {
    pub bitstream_mode: u8,
    pub copyright: bool,
    pub original: bool,
    pub surround_mode: Option<u8>,
    pub headphone_mode: Option<u8>,
    pub surround_ex_mode: Option<u8>,
    pub production: Option<ProductionInfo>,
    pub production2: Option<ProductionInfo>,
    /// Set when the source was sampled at twice the coded rate.
    pub source_sample_rate: Option<bool>,
}

impl InformationalMetadata {
    pub fn sync<S: BitSyntax>(&mut self, bs: &mut S, ctx: &FieldContext) -> Result<()> {
        let acmod = ctx.channel_mode;

        bs.field(&mut self.bitstream_mode, 3)?;
        bs.flag(&mut self.copyright)?;
        bs.flag(&mut self.original)?;

        bs.field_if(acmod == 2, &mut self.surround_mode, 2)?;
        bs.field_if(acmod == 2, &mut self.headphone_mode, 2)?;
        bs.field_if(acmod >= 6, &mut self.surround_ex_mode, 2)?;

        bs.group(&mut self.production, |bs, info| info.sync(bs, true))?;
        if acmod == 0 {
            bs.group(&mut self.production2, |bs, info| info.sync(bs, true))?;
        } else {
            self.production2 = None;
        }

        self.source_sample_rate = if ctx.sample_rate_code < 3 {
            let mut flag = self.source_sample_rate.unwrap_or_default();
            bs.flag(&mut flag)?;
            Some(flag)
        } else {
            None
        };

        Ok(())
    }
}

pub fn bitstream_mode_name(bitstream_mode: u8, channel_mode: u8) -> &'static str {
    match bitstream_mode {
        0 => "Main audio service: complete main",
        1 => "Main audio service: music and effects",
        2 => "Associated service: visually impaired",
        3 => "Associated service: hearing impaired",
        4 => "Associated service: dialogue",
        5 => "Associated service: commentary",
        6 => "Associated service: emergency",
        7 if channel_mode == 1 => "Associated service: voice over",
        _ => "Main audio service: karaoke",
    }
}

pub fn surround_mode_name(mode: u8) -> &'static str {
    match mode {
        0 => "Not indicated",
        1 => "Not encoded",
        2 => "Encoded",
        _ => "Reserved",
    }
}
