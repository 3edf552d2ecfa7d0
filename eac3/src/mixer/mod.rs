//! Spatial mixers placing rendered sources onto a speaker layout.
//!
//! Both strategies share the same low-frequency routing: LFE sources go to
//! every LFE output channel at -10 dB and skip directional panning. Without
//! LFE separation every source additionally feeds the LFE channels.

pub mod balance;
pub mod directional;
pub mod layout;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mixer::balance::BalanceMixer;
use crate::mixer::directional::DirectionalMixer;
use crate::mixer::layout::SpeakerLayout;
use crate::render::AudioObject;
use crate::render::listener::ListenerSettings;
use crate::render::vector::Vec3;

/// Linear gain of -10 dB.
pub const LFE_GAIN: f32 = 0.316_227_78;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixerKind {
    #[default]
    Balance,
    Directional,
}

pub trait SpatialMixer {
    fn layout(&self) -> &SpeakerLayout;

    /// Output gains for one source, one per layout channel.
    ///
    /// `direction` is the source position relative to the listener in cube
    /// space. Degenerate directions leave the directional part silent.
    fn gains(&mut self, source: &AudioObject, direction: Vec3, gain: f32) -> &[f32];

    /// Accumulates `samples` into the interleaved `output`.
    fn render(
        &mut self,
        source: &AudioObject,
        direction: Vec3,
        samples: &[f32],
        output: &mut [f32],
        gain: f32,
    ) {
        let gains = self.gains(source, direction, gain);
        if gains.is_empty() || gains.iter().all(|&g| g == 0.0) {
            return;
        }

        for (frame, &sample) in output.chunks_exact_mut(gains.len()).zip(samples) {
            for (out, &g) in frame.iter_mut().zip(gains) {
                *out += sample * g;
            }
        }
    }
}

impl MixerKind {
    pub fn build(self, layout: Arc<SpeakerLayout>, settings: &ListenerSettings) -> Box<dyn SpatialMixer> {
        match self {
            MixerKind::Balance => Box::new(BalanceMixer::new(layout, settings.lfe_separation)),
            MixerKind::Directional => Box::new(DirectionalMixer::new(
                layout,
                settings.quality,
                settings.environment,
                settings.lfe_separation,
            )),
        }
    }
}

/// Clears `gains` and fills the LFE routing for a source.
///
/// Returns `true` when the source must not be panned directionally. A layout
/// without LFE channels pans every source, LFE ones included.
pub(crate) fn route_lfe(
    layout: &SpeakerLayout,
    source_lfe: bool,
    lfe_separation: bool,
    gain: f32,
    gains: &mut Vec<f32>,
) -> bool {
    gains.clear();
    gains.resize(layout.len(), 0.0);

    if !layout.has_lfe() {
        return false;
    }

    if source_lfe || !lfe_separation {
        for (g, channel) in gains.iter_mut().zip(layout.channels()) {
            if channel.lfe {
                *g = gain * LFE_GAIN;
            }
        }
    }

    source_lfe
}

/// Splits a source into its directional and diffuse parts by size.
pub(crate) fn size_split(size: f32, gain: f32) -> (f32, f32) {
    let size = if size.is_finite() { size.clamp(0.0, 1.0) } else { 0.0 };
    (gain * (1.0 - size), size)
}
