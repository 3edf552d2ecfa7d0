use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::Serialize;

use super::command::{Cli, PanArgs};
use eac3::mixer::layout::{LayoutConfig, PRESET_NAMES, SpeakerLayout};
use eac3::mixer::{MixerKind, SpatialMixer};
use eac3::render::AudioObject;
use eac3::render::listener::{Environment, ListenerSettings, Quality};
use eac3::render::vector::Vec3;

pub fn cmd_pan(args: &PanArgs, cli: &Cli) -> Result<()> {
    let layout = Arc::new(load_layout(&args.layout)?);
    let settings = settings(args)?;

    let &[x, y, z] = args.position.as_slice() else {
        bail!(
            "--position takes three comma separated values, got {}",
            args.position.len()
        );
    };
    let direction = Vec3::new(x, y, z);
    if direction.clamp(-1.0, 1.0) != direction {
        if cli.strict {
            bail!("Position {x},{y},{z} lies outside the room");
        }
        warn!("Position {x},{y},{z} lies outside the room and is clamped to its walls");
    }

    let size = if (0.0..=1.0).contains(&args.size) {
        args.size
    } else if cli.strict {
        bail!("Size {} is outside 0..1", args.size);
    } else {
        warn!("Size {} is clamped to 0..1", args.size);
        args.size.clamp(0.0, 1.0)
    };

    let source = AudioObject {
        position: direction.scale(settings.environment_size),
        lfe: args.lfe,
        size,
        gain: args.gain,
        samples: Vec::new(),
    };

    info!(
        "Panning with {:?} mixer onto {} channels",
        settings.mixer,
        layout.len()
    );

    let mut mixer = settings.mixer.build(layout.clone(), &settings);
    let report = PanReport::new(mixer.as_mut(), &settings, &source, direction);

    print!("{}", serde_yaml_ng::to_string(&report)?);

    Ok(())
}

fn load_layout(layout: &str) -> Result<SpeakerLayout> {
    if PRESET_NAMES.contains(&layout) {
        return SpeakerLayout::preset(layout);
    }

    let yaml = fs::read_to_string(layout)
        .with_context(|| format!("{layout:?} is neither a layout preset nor a readable file"))?;
    parse_layout(&yaml)
}

fn parse_layout(yaml: &str) -> Result<SpeakerLayout> {
    let config: LayoutConfig = serde_yaml_ng::from_str(yaml)?;
    SpeakerLayout::from_config(&config)
}

fn settings(args: &PanArgs) -> Result<ListenerSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let yaml = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings {}", path.display()))?;
            serde_yaml_ng::from_str(&yaml)?
        }
        None => ListenerSettings::default(),
    };

    if let Some(mixer) = args.mixer {
        settings.mixer = MixerKind::from(mixer);
    }
    if let Some(quality) = args.quality {
        settings.quality = Quality::from(quality);
    }
    if args.theatre {
        settings.environment = Environment::Theatre;
    }
    if args.no_lfe_separation {
        settings.lfe_separation = false;
    }

    Ok(settings)
}

#[derive(Debug, Serialize)]
struct ChannelGain {
    name: String,
    gain: f32,
    gain_db: Option<f32>,
}

#[derive(Debug, Serialize)]
struct PanReport {
    mixer: MixerKind,
    quality: Quality,
    environment: Environment,
    position: Vec3,
    channels: Vec<ChannelGain>,
    total_power: f32,
}

impl PanReport {
    fn new(
        mixer: &mut dyn SpatialMixer,
        settings: &ListenerSettings,
        source: &AudioObject,
        direction: Vec3,
    ) -> Self {
        let names = mixer
            .layout()
            .channels()
            .iter()
            .map(|channel| channel.name.clone())
            .collect::<Vec<_>>();
        let gains = mixer.gains(source, direction, source.gain);

        let channels = names
            .into_iter()
            .zip(gains)
            .map(|(name, &gain)| ChannelGain {
                name,
                gain,
                gain_db: (gain != 0.0).then(|| 20.0 * gain.abs().log10()),
            })
            .collect();

        Self {
            mixer: settings.mixer,
            quality: settings.quality,
            environment: settings.environment,
            position: direction,
            channels,
            total_power: gains.iter().map(|g| g * g).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "
channels:
  - name: FL
    azimuth: -45
  - name: FR
    azimuth: 45
  - name: BL
    azimuth: -135
  - name: BR
    azimuth: 135
  - name: SUB
    azimuth: 0
    lfe: true
";

    #[test]
    fn yaml_layout_report() -> Result<()> {
        let layout = Arc::new(parse_layout(QUAD)?);
        assert_eq!(layout.len(), 5);
        assert!(layout.has_lfe());

        let settings = ListenerSettings::default();
        let mut mixer = MixerKind::Balance.build(layout, &settings);
        let report = PanReport::new(
            mixer.as_mut(),
            &settings,
            &AudioObject::default(),
            Vec3::ZERO,
        );

        assert_eq!(report.channels[0].name, "FL");
        assert!((report.channels[0].gain - 0.5).abs() < 1e-6);
        assert_eq!(report.channels[4].gain_db, None);
        assert!((report.total_power - 1.0).abs() < 1e-5);

        let yaml = serde_yaml_ng::to_string(&report)?;
        assert!(yaml.contains("mixer: balance"));

        Ok(())
    }

    #[test]
    fn empty_yaml_layout_is_rejected() {
        assert!(parse_layout("channels: []").is_err());
    }
}
