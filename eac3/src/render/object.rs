use anyhow::Result;
use log::debug;

use crate::render::movement::MovementInterpolator;
use crate::render::source::{ObjectMetadata, StreamDecoder};
use crate::render::vector::Vec3;
use crate::render::{AudioObject, Renderer, deinterleave};
use crate::structs::channel::ReferenceChannel;

/// Renders metadata-driven moving objects from a decoded stream.
///
/// Object positions are evaluated at the first sample of every block.
#[derive(Debug)]
pub struct ObjectRenderer<D, M> {
    decoder: D,
    metadata: M,
    channels: Vec<ReferenceChannel>,
    environment_size: Vec3,
    objects: Vec<AudioObject>,
    interpolators: Vec<MovementInterpolator>,
    channel_buffer: Vec<f32>,
    object_buffer: Vec<f32>,
    position: u64,
}

impl<D: StreamDecoder, M: ObjectMetadata> ObjectRenderer<D, M> {
    pub fn new(decoder: D, metadata: M, environment_size: Vec3) -> Self {
        let mut renderer = Self {
            channels: decoder.channels(),
            decoder,
            metadata,
            environment_size,
            objects: Vec::new(),
            interpolators: Vec::new(),
            channel_buffer: Vec::new(),
            object_buffer: Vec::new(),
            position: 0,
        };

        renderer.refresh_objects();
        renderer
    }

    /// Samples rendered so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Matches the object set to the metadata and moves every object to its
    /// position, gain and size at the current playback position.
    fn refresh_objects(&mut self) {
        let count = self.metadata.object_count();
        if count != self.objects.len() {
            debug!("Object count changed from {} to {count}", self.objects.len());
            self.objects.resize_with(count, AudioObject::default);
            self.interpolators.resize_with(count, MovementInterpolator::default);
        }

        let lfe = self.metadata.lfe_index();
        for (n, (object, interpolator)) in self
            .objects
            .iter_mut()
            .zip(&mut self.interpolators)
            .enumerate()
        {
            object.lfe = lfe == Some(n);
            if let Some(state) = interpolator.state(self.metadata.timeframes(n), self.position) {
                object.position = state.position.scale(self.environment_size);
                object.gain = state.gain;
                object.size = state.size;
            }
        }
    }
}

impl<D: StreamDecoder, M: ObjectMetadata> Renderer for ObjectRenderer<D, M> {
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
        self.metadata.poll(self.position)?;
        self.refresh_objects();

        let channel_count = self.channels.len();
        self.channel_buffer.clear();
        self.channel_buffer.resize(samples * channel_count, 0.0);
        self.decoder.decode_block(&mut self.channel_buffer, 0, samples)?;

        let object_count = self.objects.len();
        self.object_buffer.clear();
        self.object_buffer.resize(samples * object_count, 0.0);
        self.metadata.apply(
            &self.channel_buffer,
            channel_count,
            &mut self.object_buffer,
            object_count,
        )?;

        deinterleave(&self.object_buffer, samples, &mut self.objects);
        self.position += samples as u64;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::movement::MovementTimeframe;
    use crate::render::source::{PcmStream, StaticObjects};
    use crate::structs::oamd::{OamdTimeline, TEST_DATA, single_object_payload};

    /// One object sweeping from left to right over the first 100 samples.
    #[derive(Debug)]
    struct Sweep {
        frames: Vec<MovementTimeframe>,
        polls: Vec<u64>,
    }

    impl ObjectMetadata for Sweep {
        fn object_count(&self) -> usize {
            1
        }

        fn lfe_index(&self) -> Option<usize> {
            None
        }

        fn timeframes(&self, _object: usize) -> &[MovementTimeframe] {
            &self.frames
        }

        fn poll(&mut self, position: u64) -> Result<()> {
            self.polls.push(position);
            Ok(())
        }
    }

    fn mono(samples: usize) -> PcmStream {
        PcmStream::new(vec![0.5; samples], vec![ReferenceChannel::FrontCenter], 48000)
    }

    #[test]
    fn positions_follow_keyframes() -> Result<()> {
        let sweep = Sweep {
            frames: vec![
                MovementTimeframe {
                    offset: 0,
                    fade: 0,
                    position: Vec3::new(-1.0, 0.0, 0.0),
                    ..Default::default()
                },
                MovementTimeframe {
                    offset: 100,
                    fade: 100,
                    position: Vec3::new(1.0, 0.0, 0.0),
                    ..Default::default()
                },
            ],
            polls: Vec::new(),
        };
        let mut renderer = ObjectRenderer::new(mono(200), sweep, Vec3::new(2.0, 1.0, 1.0));

        // Initial position is known before the first block
        assert_eq!(renderer.objects()[0].position, Vec3::new(-2.0, 0.0, 0.0));

        renderer.update(50)?;
        assert_eq!(renderer.objects()[0].position, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(renderer.objects()[0].samples.len(), 50);

        renderer.update(50)?;
        assert_eq!(renderer.objects()[0].position, Vec3::ZERO);

        renderer.update(50)?;
        assert_eq!(renderer.objects()[0].position, Vec3::new(2.0, 0.0, 0.0));

        assert_eq!(renderer.metadata().polls, [0, 50, 100]);
        assert_eq!(renderer.position(), 150);

        Ok(())
    }

    #[test]
    fn static_objects_carry_lfe_flag() -> Result<()> {
        let stream = PcmStream::new(
            vec![1.0, 0.25],
            vec![ReferenceChannel::FrontLeft, ReferenceChannel::ScreenLFE],
            48000,
        );
        let metadata = StaticObjects::from_channels(&stream.channels());
        let mut renderer = ObjectRenderer::new(stream, metadata, Vec3::ONE);
        renderer.update(1)?;

        let objects = renderer.objects();
        assert!(!objects[0].lfe);
        assert!(objects[1].lfe);
        assert_eq!(objects[1].samples, [0.25]);
        assert_eq!(objects[0].position, Vec3::new(-1.0, 0.0, 1.0));

        Ok(())
    }

    #[test]
    fn object_stream_wider_than_decoder_fails() -> Result<()> {
        let mut timeline = OamdTimeline::default();
        timeline.push(TEST_DATA, 0)?;

        let mut renderer = ObjectRenderer::new(mono(16), timeline, Vec3::ONE);
        assert_eq!(renderer.objects().len(), 16);
        assert!(renderer.update(4).is_err());

        Ok(())
    }

    #[test]
    fn empty_metadata_renders_nothing() -> Result<()> {
        let mut renderer = ObjectRenderer::new(mono(16), StaticObjects::default(), Vec3::ONE);
        renderer.update(8)?;
        assert!(renderer.objects().is_empty());

        Ok(())
    }

    #[test]
    fn oamd_objects_move_between_payloads() -> Result<()> {
        let mut timeline = OamdTimeline::default();
        timeline.push(&single_object_payload(0, 0, 0)?, 0)?;
        timeline.push(&single_object_payload(0, 62, 0)?, 1536)?;

        let mut renderer = ObjectRenderer::new(mono(3072), timeline, Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(renderer.objects()[0].position, Vec3::new(-2.0, 1.0, 1.0));

        // The second ramp runs from 1104 to 1616
        renderer.update(1360)?;
        assert_eq!(renderer.objects()[0].position, Vec3::new(-2.0, 1.0, 1.0));
        assert_eq!(renderer.objects()[0].samples.len(), 1360);

        renderer.update(256)?;
        assert_eq!(renderer.objects()[0].position, Vec3::new(0.0, 1.0, 1.0));

        renderer.update(256)?;
        assert_eq!(renderer.objects()[0].position, Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(renderer.objects()[0].gain, 1.0);

        Ok(())
    }

    #[test]
    fn oamd_gain_and_size_reach_objects() -> Result<()> {
        let mut timeline = OamdTimeline::default();
        timeline.push(&single_object_payload(1, 31, 0)?, 0)?;
        let mut renderer = ObjectRenderer::new(mono(8), timeline, Vec3::ONE);
        renderer.update(4)?;
        assert_eq!(renderer.objects()[0].gain, 0.0);

        let mut timeline = OamdTimeline::default();
        timeline.push(&single_object_payload(0, 31, 31)?, 0)?;
        let mut renderer = ObjectRenderer::new(mono(8), timeline, Vec3::ONE);
        renderer.update(4)?;
        assert_eq!(renderer.objects()[0].gain, 1.0);
        assert_eq!(renderer.objects()[0].size, 1.0);

        Ok(())
    }
}
