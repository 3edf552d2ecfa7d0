//! Output stage mixing every attached renderer onto a speaker layout.

use std::sync::Arc;

use anyhow::{Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::mixer::layout::SpeakerLayout;
use crate::mixer::{MixerKind, SpatialMixer};
use crate::render::Renderer;
use crate::render::vector::Vec3;
use crate::utils::errors::RenderError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
    Perfect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Home,
    Theatre,
}

impl Environment {
    /// Exponent of the directional weighting curve.
    pub fn sharpness(self) -> i32 {
        match self {
            Environment::Home => 8,
            Environment::Theatre => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerSettings {
    /// Room dimensions in meters.
    pub environment_size: Vec3,
    pub quality: Quality,
    pub environment: Environment,
    pub lfe_separation: bool,
    pub mixer: MixerKind,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            environment_size: Vec3::new(10.0, 7.0, 10.0),
            quality: Quality::default(),
            environment: Environment::default(),
            lfe_separation: true,
            mixer: MixerKind::default(),
        }
    }
}

/// Mixes rendered objects into an interleaved output buffer.
pub struct Listener {
    layout: Arc<SpeakerLayout>,
    settings: ListenerSettings,
    mixer: Box<dyn SpatialMixer>,
    renderers: Vec<Box<dyn Renderer>>,
    output: Vec<f32>,
}

impl Listener {
    pub fn new(layout: Arc<SpeakerLayout>, settings: ListenerSettings) -> Result<Self> {
        if layout.is_empty() {
            bail!(RenderError::EmptyLayout);
        }

        info!(
            "Listener: {} output channels, {:?} mixer, {:?} quality",
            layout.len(),
            settings.mixer,
            settings.quality
        );

        Ok(Self {
            mixer: settings.mixer.build(layout.clone(), &settings),
            layout,
            settings,
            renderers: Vec::new(),
            output: Vec::new(),
        })
    }

    pub fn attach(&mut self, renderer: Box<dyn Renderer>) {
        debug!(
            "Attached renderer with {} channels, {} objects",
            renderer.channel_count(),
            renderer.objects().len()
        );
        self.renderers.push(renderer);
    }

    pub fn renderers(&self) -> &[Box<dyn Renderer>] {
        &self.renderers
    }

    pub fn layout(&self) -> &SpeakerLayout {
        &self.layout
    }

    pub fn settings(&self) -> &ListenerSettings {
        &self.settings
    }

    /// Switches to a new output layout, rebuilding the mixer.
    pub fn set_layout(&mut self, layout: Arc<SpeakerLayout>) -> Result<()> {
        if layout.is_empty() {
            bail!(RenderError::EmptyLayout);
        }

        self.mixer = self.settings.mixer.build(layout.clone(), &self.settings);
        self.layout = layout;
        Ok(())
    }

    /// Renders the next `samples` samples of every attached renderer.
    ///
    /// Returns the interleaved mix with one sample per layout channel and
    /// frame.
    pub fn render(&mut self, samples: usize) -> Result<&[f32]> {
        self.output.clear();
        self.output.resize(samples * self.layout.len(), 0.0);

        let environment_size = self.settings.environment_size;
        for renderer in &mut self.renderers {
            renderer.update(samples)?;

            for object in renderer.objects() {
                let direction = object.position.unscale(environment_size);
                self.mixer.render(
                    object,
                    direction,
                    &object.samples,
                    &mut self.output,
                    object.gain,
                );
            }
        }

        Ok(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::LFE_GAIN;
    use crate::render::channel::ChannelRenderer;
    use crate::render::source::PcmStream;
    use crate::structs::channel::ReferenceChannel;

    fn stereo_listener() -> Result<Listener> {
        Listener::new(
            Arc::new(SpeakerLayout::preset("2.0")?),
            ListenerSettings::default(),
        )
    }

    #[test]
    fn center_channel_splits_evenly() -> Result<()> {
        let settings = ListenerSettings::default();
        let stream = PcmStream::new(vec![1.0; 4], vec![ReferenceChannel::FrontCenter], 48000);

        let mut listener = stereo_listener()?;
        listener.attach(Box::new(ChannelRenderer::new(
            stream,
            settings.environment_size,
        )?));

        let output = listener.render(4)?;
        assert_eq!(output.len(), 8);

        let half = 0.5f32.sqrt();
        for &sample in output {
            assert!((sample - half).abs() < 1e-6);
        }

        Ok(())
    }

    #[test]
    fn lfe_channel_follows_layout() -> Result<()> {
        let stream = || {
            PcmStream::new(
                vec![0.0, 1.0, 0.0, 1.0],
                vec![ReferenceChannel::FrontLeft, ReferenceChannel::ScreenLFE],
                48000,
            )
        };
        let size = ListenerSettings::default().environment_size;

        let mut listener = Listener::new(
            Arc::new(SpeakerLayout::preset("5.1")?),
            ListenerSettings::default(),
        )?;
        listener.attach(Box::new(ChannelRenderer::new(stream(), size)?));

        let output = listener.render(2)?;
        assert_eq!(output.len(), 12);
        assert!((output[3] - LFE_GAIN).abs() < 1e-6);
        assert!(output[..3].iter().all(|&s| s == 0.0));

        // Without an LFE output the LFE channel is panned like any other
        let mut listener = stereo_listener()?;
        listener.attach(Box::new(ChannelRenderer::new(stream(), size)?));
        let output = listener.render(2)?;
        assert!(output.iter().any(|&s| s != 0.0));

        Ok(())
    }

    #[test]
    fn layout_switch_resizes_output() -> Result<()> {
        let mut listener = stereo_listener()?;
        assert_eq!(listener.render(16)?.len(), 32);

        listener.set_layout(Arc::new(SpeakerLayout::preset("7.1.4")?))?;
        assert_eq!(listener.layout().len(), 12);
        assert_eq!(listener.render(16)?.len(), 192);

        Ok(())
    }

    #[test]
    fn settings_defaults() {
        let settings = ListenerSettings {
            quality: Quality::Perfect,
            ..Default::default()
        };
        assert!(settings.lfe_separation);
        assert_eq!(settings.environment.sharpness(), 8);
        assert_eq!(Environment::Theatre.sharpness(), 16);
    }
}
