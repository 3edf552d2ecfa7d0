//! Angle-weighted panning over spherical speaker positions.
//!
//! Every non-LFE channel is weighted by how close it is to the source
//! direction, `(pi - angle)^n`, and the weights are normalized to unit power.
//! Lower qualities approximate the angle linearly from the dot product and
//! keep only the three strongest channels.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use crate::mixer::layout::SpeakerLayout;
use crate::mixer::{SpatialMixer, route_lfe, size_split};
use crate::render::AudioObject;
use crate::render::listener::{Environment, Quality};
use crate::render::vector::Vec3;

const STRONGEST_CHANNELS: usize = 3;

#[derive(Debug)]
pub struct DirectionalMixer {
    layout: Arc<SpeakerLayout>,
    quality: Quality,
    exponent: i32,
    lfe_separation: bool,
    weights: Vec<f32>,
    order: Vec<usize>,
    gains: Vec<f32>,
}

impl DirectionalMixer {
    pub fn new(
        layout: Arc<SpeakerLayout>,
        quality: Quality,
        environment: Environment,
        lfe_separation: bool,
    ) -> Self {
        let channels = layout.len();
        Self {
            layout,
            quality,
            exponent: environment.sharpness(),
            lfe_separation,
            weights: vec![0.0; channels],
            order: Vec::with_capacity(channels),
            gains: Vec::with_capacity(channels),
        }
    }

    fn weigh(&mut self, direction: Vec3, size: f32) {
        let linear = matches!(self.quality, Quality::Low | Quality::Medium);

        self.order.clear();
        for (i, channel) in self.layout.channels().iter().enumerate() {
            if channel.lfe {
                self.weights[i] = 0.0;
                continue;
            }

            let dot = direction.dot(channel.spherical).clamp(-1.0, 1.0);
            let closeness = if linear {
                FRAC_PI_2 * (1.0 + dot)
            } else {
                PI - dot.acos()
            };

            self.weights[i] = closeness.powi(self.exponent);
            self.order.push(i);
        }

        if size > 0.0 {
            let max = self.order.iter().map(|&i| self.weights[i]).fold(0.0, f32::max);
            for &i in &self.order {
                self.weights[i] += (max - self.weights[i]) * size;
            }
        }

        if self.quality != Quality::Perfect && self.order.len() > STRONGEST_CHANNELS {
            let weights = &self.weights;
            self.order
                .sort_unstable_by(|&a, &b| weights[b].total_cmp(&weights[a]));
            for &i in &self.order[STRONGEST_CHANNELS..] {
                self.weights[i] = 0.0;
            }
        }
    }
}

impl SpatialMixer for DirectionalMixer {
    fn layout(&self) -> &SpeakerLayout {
        &self.layout
    }

    fn gains(&mut self, source: &AudioObject, direction: Vec3, gain: f32) -> &[f32] {
        let lfe_only = route_lfe(
            &self.layout,
            source.lfe,
            self.lfe_separation,
            gain,
            &mut self.gains,
        );
        if lfe_only {
            return &self.gains;
        }

        let Some(direction) = direction.normalized() else {
            return &self.gains;
        };

        let (_, size) = size_split(source.size, gain);
        self.weigh(direction, size);

        let norm = self.weights.iter().map(|w| w * w).sum::<f32>().sqrt();
        if norm <= 0.0 || !norm.is_finite() {
            return &self.gains;
        }

        for (g, w) in self.gains.iter_mut().zip(&self.weights) {
            *g += gain * w / norm;
        }

        &self.gains
    }
}
