use anyhow::{Result, bail};
use log::debug;

use crate::render::source::StreamDecoder;
use crate::render::vector::Vec3;
use crate::render::{AudioObject, Renderer, deinterleave};
use crate::structs::channel::ReferenceChannel;
use crate::utils::errors::RenderError;

/// Renders every decoded channel as a static object at its reference
/// position.
#[derive(Debug)]
pub struct ChannelRenderer<D> {
    decoder: D,
    channels: Vec<ReferenceChannel>,
    objects: Vec<AudioObject>,
    buffer: Vec<f32>,
}

impl<D: StreamDecoder> ChannelRenderer<D> {
    pub fn new(decoder: D, environment_size: Vec3) -> Result<Self> {
        let channels = decoder.channels();
        if channels.len() != decoder.channel_count() {
            bail!(RenderError::ChannelMismatch {
                produced: decoder.channel_count(),
                expected: channels.len(),
            });
        }

        let objects = channels
            .iter()
            .map(|channel| AudioObject {
                position: channel.position().scale(environment_size),
                lfe: channel.is_lfe(),
                ..Default::default()
            })
            .collect();

        debug!(
            "Channel renderer for {} channels at {} Hz",
            channels.len(),
            decoder.sample_rate()
        );

        Ok(Self {
            decoder,
            channels,
            objects,
            buffer: Vec::new(),
        })
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<D: StreamDecoder> Renderer for ChannelRenderer<D> {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channels(&self) -> &[ReferenceChannel] {
        &self.channels
    }

    fn objects(&self) -> &[AudioObject] {
        &self.objects
    }

    fn update(&mut self, samples: usize) -> Result<()> {
        self.buffer.clear();
        self.buffer.resize(samples * self.channels.len(), 0.0);
        self.decoder.decode_block(&mut self.buffer, 0, samples)?;

        deinterleave(&self.buffer, samples, &mut self.objects);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::source::PcmStream;

    #[derive(Debug)]
    struct Mislabelled;

    impl StreamDecoder for Mislabelled {
        fn channel_count(&self) -> usize {
            3
        }

        fn sample_rate(&self) -> u32 {
            48000
        }

        fn channels(&self) -> Vec<ReferenceChannel> {
            vec![ReferenceChannel::FrontLeft]
        }

        fn decode_block(&mut self, _buffer: &mut [f32], _from: usize, _to: usize) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn objects_follow_channel_positions() -> Result<()> {
        let stream = PcmStream::new(
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            vec![ReferenceChannel::FrontRight, ReferenceChannel::ScreenLFE],
            48000,
        );
        let mut renderer = ChannelRenderer::new(stream, Vec3::new(10.0, 7.0, 10.0))?;

        let objects = renderer.objects();
        assert_eq!(objects[0].position, Vec3::new(10.0, 0.0, 10.0));
        assert!(!objects[0].lfe);
        assert!(objects[1].lfe);

        renderer.update(2)?;
        assert_eq!(renderer.objects()[0].samples, [0.1, 0.3]);
        assert_eq!(renderer.objects()[1].samples, [0.2, 0.4]);

        renderer.update(2)?;
        assert_eq!(renderer.objects()[1].samples, [0.6, 0.0]);

        Ok(())
    }

    #[test]
    fn rejects_mislabelled_decoder() {
        let err = ChannelRenderer::new(Mislabelled, Vec3::ONE).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::ChannelMismatch { produced: 3, expected: 1 })
        ));
    }
}
