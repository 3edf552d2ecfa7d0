//! Audio and metadata sources feeding the renderers.

use anyhow::{Result, bail};

use crate::render::movement::MovementTimeframe;
use crate::render::vector::Vec3;
use crate::structs::channel::ReferenceChannel;
use crate::utils::errors::RenderError;

/// A decoded multichannel PCM stream.
pub trait StreamDecoder {
    fn channel_count(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// Role of every channel, in decode order.
    fn channels(&self) -> Vec<ReferenceChannel>;

    /// Decodes the next frames into `buffer[from..to]`, measured in frames of
    /// an interleaved buffer with [`StreamDecoder::channel_count`] channels.
    ///
    /// Past the end of the stream the range is filled with silence.
    fn decode_block(&mut self, buffer: &mut [f32], from: usize, to: usize) -> Result<()>;
}

/// Positional metadata for the objects carried by a stream.
pub trait ObjectMetadata {
    fn object_count(&self) -> usize;

    fn lfe_index(&self) -> Option<usize>;

    /// Keyframes of one object, ordered by offset.
    fn timeframes(&self, object: usize) -> &[MovementTimeframe];

    /// Called with the playback position before every rendered block.
    fn poll(&mut self, _position: u64) -> Result<()> {
        Ok(())
    }

    /// Turns one block of interleaved channel samples into interleaved object
    /// samples.
    ///
    /// The default maps channel `n` to object `n` and needs at least as many
    /// channels as objects.
    fn apply(
        &mut self,
        channels: &[f32],
        channel_count: usize,
        objects: &mut [f32],
        object_count: usize,
    ) -> Result<()> {
        if object_count == 0 {
            return Ok(());
        }
        if channel_count < object_count {
            bail!(RenderError::ObjectMismatch {
                objects: object_count,
                channels: channel_count,
            });
        }

        for (input, output) in channels
            .chunks_exact(channel_count)
            .zip(objects.chunks_exact_mut(object_count))
        {
            output.copy_from_slice(&input[..object_count]);
        }

        Ok(())
    }
}

/// Objects pinned to fixed positions.
#[derive(Debug, Clone, Default)]
pub struct StaticObjects {
    lfe_index: Option<usize>,
    timeframes: Vec<Vec<MovementTimeframe>>,
}

impl StaticObjects {
    pub fn new(positions: &[Vec3], lfe_index: Option<usize>) -> Self {
        let timeframes = positions
            .iter()
            .map(|&position| {
                vec![MovementTimeframe {
                    position,
                    ..Default::default()
                }]
            })
            .collect();

        Self {
            lfe_index,
            timeframes,
        }
    }

    /// One object per channel, placed at the channel's reference position.
    pub fn from_channels(channels: &[ReferenceChannel]) -> Self {
        let positions = channels.iter().map(|channel| channel.position()).collect::<Vec<_>>();
        Self::new(&positions, channels.iter().position(|channel| channel.is_lfe()))
    }
}

impl ObjectMetadata for StaticObjects {
    fn object_count(&self) -> usize {
        self.timeframes.len()
    }

    fn lfe_index(&self) -> Option<usize> {
        self.lfe_index
    }

    fn timeframes(&self, object: usize) -> &[MovementTimeframe] {
        self.timeframes.get(object).map(Vec::as_slice).unwrap_or_default()
    }
}

/// In-memory interleaved PCM.
#[derive(Debug, Clone)]
pub struct PcmStream {
    samples: Vec<f32>,
    channels: Vec<ReferenceChannel>,
    sample_rate: u32,
    cursor: usize,
}

impl PcmStream {
    pub fn new(samples: Vec<f32>, channels: Vec<ReferenceChannel>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            cursor: 0,
        }
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        match self.channels.len() {
            0 => 0,
            n => self.samples.len().saturating_sub(self.cursor) / n,
        }
    }
}

impl StreamDecoder for PcmStream {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> Vec<ReferenceChannel> {
        self.channels.clone()
    }

    fn decode_block(&mut self, buffer: &mut [f32], from: usize, to: usize) -> Result<()> {
        let channels = self.channels.len();
        let target = &mut buffer[from * channels..to * channels];

        let available = self.samples.len().saturating_sub(self.cursor).min(target.len());
        let (filled, silent) = target.split_at_mut(available);
        filled.copy_from_slice(&self.samples[self.cursor..self.cursor + available]);
        silent.fill(0.0);

        self.cursor += available;
        Ok(())
    }
}
