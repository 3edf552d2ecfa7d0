//! Output speaker layouts.
//!
//! Every channel carries two positions: a unit vector on the sphere for
//! angle-based panning and a cube-warped position for balance panning.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::render::vector::Vec3;
use crate::utils::errors::RenderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Degrees, positive to the right of the listener.
    pub azimuth: f32,
    /// Degrees, positive above the listener.
    #[serde(default)]
    pub elevation: f32,
    #[serde(default)]
    pub lfe: bool,
}

impl ChannelConfig {
    fn new(name: &str, azimuth: f32, elevation: f32) -> Self {
        Self {
            name: name.to_string(),
            azimuth,
            elevation,
            lfe: false,
        }
    }

    fn lfe(name: &str) -> Self {
        Self {
            name: name.to_string(),
            azimuth: 0.0,
            elevation: -45.0,
            lfe: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub channels: Vec<ChannelConfig>,
}

pub const PRESET_NAMES: [&str; 5] = ["2.0", "5.1", "7.1", "5.1.2", "7.1.4"];

impl LayoutConfig {
    /// Standard layouts in WAVE channel order.
    pub fn preset(name: &str) -> Result<Self> {
        let front = || {
            vec![
                ChannelConfig::new("L", -30.0, 0.0),
                ChannelConfig::new("R", 30.0, 0.0),
            ]
        };
        let with_center = || {
            let mut channels = front();
            channels.push(ChannelConfig::new("C", 0.0, 0.0));
            channels.push(ChannelConfig::lfe("LFE"));
            channels
        };

        let channels = match name {
            "2.0" => front(),
            "5.1" | "5.1.2" => {
                let mut channels = with_center();
                channels.push(ChannelConfig::new("Ls", -110.0, 0.0));
                channels.push(ChannelConfig::new("Rs", 110.0, 0.0));
                if name == "5.1.2" {
                    channels.push(ChannelConfig::new("Ltm", -90.0, 45.0));
                    channels.push(ChannelConfig::new("Rtm", 90.0, 45.0));
                }
                channels
            }
            "7.1" | "7.1.4" => {
                let mut channels = with_center();
                channels.push(ChannelConfig::new("Lrs", -150.0, 0.0));
                channels.push(ChannelConfig::new("Rrs", 150.0, 0.0));
                channels.push(ChannelConfig::new("Lss", -90.0, 0.0));
                channels.push(ChannelConfig::new("Rss", 90.0, 0.0));
                if name == "7.1.4" {
                    channels.push(ChannelConfig::new("Ltf", -45.0, 45.0));
                    channels.push(ChannelConfig::new("Rtf", 45.0, 45.0));
                    channels.push(ChannelConfig::new("Ltr", -135.0, 45.0));
                    channels.push(ChannelConfig::new("Rtr", 135.0, 45.0));
                }
                channels
            }
            _ => bail!(RenderError::UnknownPreset(name.to_string())),
        };

        Ok(Self { channels })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutChannel {
    pub name: String,
    pub lfe: bool,
    pub spherical: Vec3,
    pub cubical: Vec3,
}

impl LayoutChannel {
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self {
            name: config.name.clone(),
            lfe: config.lfe,
            spherical: spherical(config.azimuth, config.elevation),
            cubical: cube_warp(config.azimuth, config.elevation),
        }
    }
}

/// Immutable set of output channels, shared by every mixer of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerLayout {
    channels: Vec<LayoutChannel>,
}

impl SpeakerLayout {
    pub fn new(channels: Vec<LayoutChannel>) -> Result<Self> {
        if channels.is_empty() {
            bail!(RenderError::EmptyLayout);
        }

        Ok(Self { channels })
    }

    pub fn from_config(config: &LayoutConfig) -> Result<Self> {
        Self::new(config.channels.iter().map(LayoutChannel::from_config).collect())
    }

    pub fn preset(name: &str) -> Result<Self> {
        Self::from_config(&LayoutConfig::preset(name)?)
    }

    pub fn channels(&self) -> &[LayoutChannel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn has_lfe(&self) -> bool {
        self.channels.iter().any(|channel| channel.lfe)
    }

    pub fn has_directional(&self) -> bool {
        self.channels.iter().any(|channel| !channel.lfe)
    }
}

fn wrap_degrees(angle: f32) -> f32 {
    let angle = angle.rem_euclid(360.0);
    if angle > 180.0 { angle - 360.0 } else { angle }
}

/// Unit vector for an azimuth/elevation pair (x right, y up, z front).
pub fn spherical(azimuth: f32, elevation: f32) -> Vec3 {
    let (az, el) = (azimuth.to_radians(), elevation.to_radians());
    Vec3::new(az.sin() * el.cos(), el.sin(), az.cos() * el.cos())
}

/// Maps an azimuth/elevation pair onto the surface of the unit cube.
///
/// The horizontal circle is unrolled onto the cube walls in 45 degree
/// segments; elevations beyond 45 degrees pull the point towards the
/// ceiling center.
pub fn cube_warp(azimuth: f32, elevation: f32) -> Vec3 {
    let az = wrap_degrees(azimuth);
    let abs = az.abs();
    let side = az.signum();

    let (mut x, mut z) = if abs <= 45.0 {
        (az / 45.0, 1.0)
    } else if abs <= 135.0 {
        (side, (90.0 - abs) / 45.0)
    } else {
        (side * (180.0 - abs) / 45.0, -1.0)
    };

    let el = elevation.clamp(-90.0, 90.0);
    if el.abs() > 45.0 {
        let shrink = (90.0 - el.abs()) / 45.0;
        x *= shrink;
        z *= shrink;
    }

    Vec3::new(x, (el / 45.0).clamp(-1.0, 1.0), z)
}
