//! Layer, plane and column balancing over cube-warped speaker positions.
//!
//! The layout is split into horizontal layers by height, each layer into
//! planes by depth and each plane into columns by width. A source is placed
//! between the two neighbours it falls between on every axis; a missing
//! neighbour is substituted by the existing one. Energy shares multiply
//! across the axes, so the squared gains always sum to one.

use std::sync::Arc;

use crate::mixer::layout::SpeakerLayout;
use crate::mixer::{SpatialMixer, route_lfe, size_split};
use crate::render::AudioObject;
use crate::render::vector::Vec3;

const EPSILON: f32 = 1e-3;

#[derive(Debug)]
struct Plane {
    keys: Vec<f32>,
    columns: Vec<Vec<usize>>,
}

#[derive(Debug)]
struct Layer {
    keys: Vec<f32>,
    planes: Vec<Plane>,
}

#[derive(Debug)]
pub struct BalanceMixer {
    layout: Arc<SpeakerLayout>,
    lfe_separation: bool,
    layer_keys: Vec<f32>,
    layers: Vec<Layer>,
    directional: Vec<usize>,
    energy: Vec<f32>,
    gains: Vec<f32>,
}

/// Groups items by key in ascending order, merging keys closer than [`EPSILON`].
fn group<T>(mut items: Vec<(f32, T)>) -> (Vec<f32>, Vec<Vec<T>>) {
    items.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut keys: Vec<f32> = Vec::new();
    let mut groups: Vec<Vec<T>> = Vec::new();
    for (key, item) in items {
        match (keys.last(), groups.last_mut()) {
            (Some(&last), Some(members)) if (key - last).abs() < EPSILON => members.push(item),
            _ => {
                keys.push(key);
                groups.push(vec![item]);
            }
        }
    }

    (keys, groups)
}

/// Neighbouring keys around `value` and the share of the upper one.
fn straddle(keys: &[f32], value: f32) -> (usize, usize, f32) {
    let below = keys.iter().rposition(|&k| k <= value + EPSILON);
    let above = keys.iter().position(|&k| k >= value - EPSILON);

    match (below, above) {
        (Some(lo), Some(hi)) if lo < hi => {
            let t = (value - keys[lo]) / (keys[hi] - keys[lo]);
            (lo, hi, t.clamp(0.0, 1.0))
        }
        (Some(i), _) | (None, Some(i)) => (i, i, 0.0),
        (None, None) => (0, 0, 0.0),
    }
}

impl BalanceMixer {
    pub fn new(layout: Arc<SpeakerLayout>, lfe_separation: bool) -> Self {
        let directional = layout
            .channels()
            .iter()
            .enumerate()
            .filter(|(_, channel)| !channel.lfe)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        let position = |i: usize| layout.channels()[i].cubical;

        let (layer_keys, layer_members) =
            group(directional.iter().map(|&i| (position(i).y, i)).collect());

        let layers = layer_members
            .into_iter()
            .map(|members| {
                let (keys, plane_members) =
                    group(members.into_iter().map(|i| (position(i).z, i)).collect());
                let planes = plane_members
                    .into_iter()
                    .map(|members| {
                        let (keys, columns) =
                            group(members.into_iter().map(|i| (position(i).x, i)).collect());
                        Plane { keys, columns }
                    })
                    .collect();
                Layer { keys, planes }
            })
            .collect();

        let channels = layout.len();
        Self {
            layout,
            lfe_separation,
            layer_keys,
            layers,
            directional,
            energy: vec![0.0; channels],
            gains: Vec::with_capacity(channels),
        }
    }

    /// Distributes unit energy over the channels surrounding `direction`.
    fn balance(&mut self, direction: Vec3) {
        let d = direction.clamp(-1.0, 1.0);
        self.energy.fill(0.0);

        let (lo, hi, t) = straddle(&self.layer_keys, d.y);
        for (layer, layer_share) in [(lo, 1.0 - t), (hi, t)] {
            if layer_share <= 0.0 {
                continue;
            }
            let layer = &self.layers[layer];

            let (back, front, t) = straddle(&layer.keys, d.z);
            for (plane, plane_share) in [(back, 1.0 - t), (front, t)] {
                if plane_share <= 0.0 {
                    continue;
                }
                let plane = &layer.planes[plane];

                let (left, right, t) = straddle(&plane.keys, d.x);
                for (column, column_share) in [(left, 1.0 - t), (right, t)] {
                    if column_share <= 0.0 {
                        continue;
                    }
                    let column = &plane.columns[column];

                    let share = layer_share * plane_share * column_share / column.len() as f32;
                    for &channel in column {
                        self.energy[channel] += share;
                    }
                }
            }
        }
    }
}

impl SpatialMixer for BalanceMixer {
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
        if lfe_only || self.layers.is_empty() || !direction.length().is_finite() {
            return &self.gains;
        }

        let (directional_gain, size) = size_split(source.size, gain);
        self.balance(direction);
        for (g, energy) in self.gains.iter_mut().zip(&self.energy) {
            *g += directional_gain * energy.sqrt();
        }

        // Size is spread as alternating polarity over every non-LFE channel.
        if size > 0.0 {
            let diffuse = gain * (size / self.directional.len() as f32).sqrt();
            for (n, &channel) in self.directional.iter().enumerate() {
                let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
                self.gains[channel] += sign * diffuse;
            }
        }

        &self.gains
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::mixer::layout::{ChannelConfig, LayoutConfig};

    fn mixer(config: &LayoutConfig) -> Result<BalanceMixer> {
        Ok(BalanceMixer::new(
            Arc::new(SpeakerLayout::from_config(config)?),
            true,
        ))
    }

    fn quad() -> LayoutConfig {
        let channel = |name: &str, azimuth| ChannelConfig {
            name: name.to_string(),
            azimuth,
            elevation: 0.0,
            lfe: false,
        };

        LayoutConfig {
            channels: vec![
                channel("FL", -45.0),
                channel("FR", 45.0),
                channel("BL", -135.0),
                channel("BR", 135.0),
            ],
        }
    }

    #[test]
    fn center_source_is_symmetric() -> Result<()> {
        let mut mixer = mixer(&quad())?;
        let gains = mixer.gains(&AudioObject::default(), Vec3::ZERO, 1.0);

        for &g in gains {
            assert!((g - 0.5).abs() < 1e-6, "{gains:?}");
        }

        Ok(())
    }

    #[test]
    fn power_is_preserved() -> Result<()> {
        let mut mixer = mixer(&LayoutConfig::preset("7.1.4")?)?;

        for direction in [
            Vec3::new(0.3, 0.2, 0.9),
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.7, -0.4, -0.1),
            Vec3::new(2.0, 2.0, 2.0),
        ] {
            let gains = mixer.gains(&AudioObject::default(), direction, 1.0);
            let power = gains.iter().map(|g| g * g).sum::<f32>();
            assert!((power - 1.0).abs() < 1e-4, "{direction:?}: {power}");
        }

        Ok(())
    }

    #[test]
    fn speaker_position_hits_single_channel() -> Result<()> {
        let mut mixer = mixer(&LayoutConfig::preset("5.1")?)?;
        let gains = mixer.gains(&AudioObject::default(), Vec3::new(0.0, 0.0, 1.0), 0.8);

        assert!((gains[2] - 0.8).abs() < 1e-6);
        assert_eq!(gains.iter().filter(|&&g| g != 0.0).count(), 1);

        Ok(())
    }

    #[test]
    fn lone_layer_plane_is_substituted() -> Result<()> {
        // The height layer of 5.1.2 only has a middle plane
        let mut mixer = mixer(&LayoutConfig::preset("5.1.2")?)?;
        let gains = mixer.gains(&AudioObject::default(), Vec3::new(0.0, 1.0, 1.0), 1.0);

        let half = 0.5f32.sqrt();
        assert!((gains[6] - half).abs() < 1e-6);
        assert!((gains[7] - half).abs() < 1e-6);
        assert!(gains[..6].iter().all(|&g| g == 0.0));

        Ok(())
    }

    #[test]
    fn size_spreads_alternating_energy() -> Result<()> {
        let mut mixer = mixer(&quad())?;
        let source = AudioObject {
            size: 1.0,
            ..Default::default()
        };
        let gains = mixer.gains(&source, Vec3::new(-1.0, 0.0, 1.0), 1.0);

        assert!((gains[0] - 0.5).abs() < 1e-6);
        assert!((gains[1] + 0.5).abs() < 1e-6);
        assert!((gains[2] - 0.5).abs() < 1e-6);
        assert!((gains[3] + 0.5).abs() < 1e-6);

        Ok(())
    }
}
