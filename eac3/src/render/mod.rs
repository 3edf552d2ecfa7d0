//! Source rendering.
//!
//! Renderers turn a decoded stream into a set of positioned mono
//! [`AudioObject`]s once per block; the [`listener::Listener`] mixes every
//! attached renderer onto the output layout.

pub mod channel;
pub mod listener;
pub mod movement;
pub mod object;
pub mod source;
pub mod vector;

use anyhow::Result;

use crate::render::vector::Vec3;
use crate::structs::channel::ReferenceChannel;

/// A positioned mono source, refreshed by its renderer every block.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioObject {
    /// Room position, the environment size scaled cube coordinates.
    pub position: Vec3,
    pub lfe: bool,
    /// Spread in `0..=1`.
    pub size: f32,
    pub gain: f32,
    /// Samples of the last rendered block.
    pub samples: Vec<f32>,
}

impl Default for AudioObject {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            lfe: false,
            size: 0.0,
            gain: 1.0,
            samples: Vec::new(),
        }
    }
}

pub trait Renderer {
    /// Channels decoded from the source stream.
    fn channel_count(&self) -> usize;

    fn channels(&self) -> &[ReferenceChannel];

    fn objects(&self) -> &[AudioObject];

    /// Renders the next `samples` samples into every object's buffer and
    /// refreshes object positions.
    fn update(&mut self, samples: usize) -> Result<()>;
}

/// Splits an interleaved block into per-object sample buffers.
pub(crate) fn deinterleave(input: &[f32], samples: usize, objects: &mut [AudioObject]) {
    let count = objects.len();
    for (n, object) in objects.iter_mut().enumerate() {
        object.samples.clear();
        object
            .samples
            .extend(input.iter().skip(n).step_by(count).take(samples));
    }
}
