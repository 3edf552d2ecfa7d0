//! Mixing metadata carried in the enhanced header body.

use anyhow::Result;
use log::Level;

use crate::log_or_err;
use crate::structs::header::{FieldContext, StreamType};
use crate::utils::bitstream_io::BitSyntax;
use crate::utils::errors::HeaderError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanInfo {
    pub mean: u8,
    pub info: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixingMetadata {
    /// Preferred stereo downmix, channel modes above 2.
    pub downmix_mode: Option<u8>,
    pub ltrt_center_level: Option<u8>,
    pub loro_center_level: Option<u8>,
    pub ltrt_surround_level: Option<u8>,
    pub loro_surround_level: Option<u8>,
    pub lfe_mix_level: Option<u8>,

    // Independent streams only from here on.
    pub program_scale: Option<u8>,
    pub program_scale2: Option<u8>,
    pub external_program_scale: Option<u8>,
    pub mix_definition: u8,
    pub mix_data: u16,
    pub mix_blob: Vec<u8>,
    pub pan: Option<PanInfo>,
    pub pan2: Option<PanInfo>,
    /// One entry per audio block; a single unconditional entry for one-block frames.
    pub block_mix_config: Option<Vec<Option<u8>>>,
}

impl MixingMetadata {
    pub fn sync<S: BitSyntax>(&mut self, bs: &mut S, ctx: &FieldContext) -> Result<()> {
        let acmod = ctx.channel_mode;

        bs.field_if(acmod > 2, &mut self.downmix_mode, 2)?;

        let has_center = acmod & 1 != 0 && acmod > 2;
        bs.field_if(has_center, &mut self.ltrt_center_level, 3)?;
        bs.field_if(has_center, &mut self.loro_center_level, 3)?;

        let has_surround = acmod & 4 != 0;
        bs.field_if(has_surround, &mut self.ltrt_surround_level, 3)?;
        bs.field_if(has_surround, &mut self.loro_surround_level, 3)?;

        if ctx.lfe {
            bs.optional(&mut self.lfe_mix_level, 5)?;
        } else {
            self.lfe_mix_level = None;
        }

        if ctx.stream_type != StreamType::Independent {
            self.clear_independent();
            return Ok(());
        }

        bs.optional(&mut self.program_scale, 6)?;
        if acmod == 0 {
            bs.optional(&mut self.program_scale2, 6)?;
        } else {
            self.program_scale2 = None;
        }
        bs.optional(&mut self.external_program_scale, 6)?;

        self.sync_mix_definition(bs, ctx)?;

        if acmod < 2 {
            bs.group(&mut self.pan, sync_pan)?;
        } else {
            self.pan = None;
        }

        if acmod == 0 {
            bs.group(&mut self.pan2, sync_pan)?;
        } else {
            self.pan2 = None;
        }

        let blocks = ctx.blocks as usize;
        bs.group(&mut self.block_mix_config, |bs, config| {
            if blocks == 1 {
                let mut value = config.first().copied().flatten().unwrap_or_default();
                bs.field(&mut value, 5)?;
                *config = vec![Some(value)];
            } else {
                config.resize(blocks, None);
                for entry in config.iter_mut() {
                    bs.optional(entry, 5)?;
                }
            }

            Ok(())
        })
    }

    fn sync_mix_definition<S: BitSyntax>(&mut self, bs: &mut S, ctx: &FieldContext) -> Result<()> {
        bs.field(&mut self.mix_definition, 2)?;

        match self.mix_definition {
            1 => bs.field(&mut self.mix_data, 5)?,
            2 => bs.field(&mut self.mix_data, 12)?,
            3 => {
                let mut len = self.mix_blob.len().saturating_sub(2) as u8;
                bs.field(&mut len, 5)?;
                bs.bytes(&mut self.mix_blob, len as usize + 2)?;
            }
            _ => {}
        }

        if self.mix_definition != 1 && self.mix_definition != 2 {
            self.mix_data = 0;
        }
        if self.mix_definition != 3 {
            self.mix_blob.clear();
        }

        if bs.reading() && self.mix_definition != 0 {
            log_or_err!(
                ctx,
                Level::Warn,
                HeaderError::Unsupported(format!(
                    "mix definition {} is carried but not interpreted",
                    self.mix_definition
                ))
            );
        }

        Ok(())
    }

    fn clear_independent(&mut self) {
        self.program_scale = None;
        self.program_scale2 = None;
        self.external_program_scale = None;
        self.mix_definition = 0;
        self.mix_data = 0;
        self.mix_blob.clear();
        self.pan = None;
        self.pan2 = None;
        self.block_mix_config = None;
    }

    /// Program scale factor in dB, `-51..=12`.
    pub fn program_scale_db(&self) -> Option<i8> {
        self.program_scale.map(|scale| scale as i8 - 51)
    }
}

fn sync_pan<S: BitSyntax>(bs: &mut S, pan: &mut PanInfo) -> Result<()> {
    bs.field(&mut pan.mean, 8)?;
    bs.field(&mut pan.info, 6)
}

/// Downmix gain in dB for each 3-bit LtRt/LoRo level code.
pub const DOWNMIX_LEVELS_DB: [f32; 8] = [3.0, 1.5, 0.0, -1.5, -3.0, -4.5, -6.0, f32::NEG_INFINITY];
