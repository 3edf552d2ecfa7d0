//! Keyframed object movement.

use crate::render::vector::Vec3;

/// Target state reached at `offset`, approached over the `fade` samples
/// leading up to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementTimeframe {
    pub offset: u64,
    pub fade: u64,
    pub position: Vec3,
    /// Linear gain, 0 for a muted object.
    pub gain: f32,
    /// Object size, `0..=1`.
    pub size: f32,
}

impl Default for MovementTimeframe {
    fn default() -> Self {
        Self {
            offset: 0,
            fade: 0,
            position: Vec3::ZERO,
            gain: 1.0,
            size: 0.0,
        }
    }
}

/// Interpolated object state at one sample position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementState {
    pub position: Vec3,
    pub gain: f32,
    pub size: f32,
}

impl MovementTimeframe {
    #[inline]
    pub fn start(&self) -> u64 {
        self.offset.saturating_sub(self.fade)
    }

    /// Progress of the fade at `at`, clamped to `0..=1`.
    fn progress(&self, at: u64) -> f32 {
        if self.fade == 0 {
            return if at >= self.offset { 1.0 } else { 0.0 };
        }

        let elapsed = at as f64 - self.start() as f64;
        (elapsed / self.fade as f64).clamp(0.0, 1.0) as f32
    }
}

/// Walks the keyframes of one object as playback advances.
///
/// The cursor is kept between calls and moves one entry at a time, so
/// sequential playback never rescans the list while seeks in either
/// direction still land on the right keyframe. Dropping keyframes from the
/// front of the list only costs one walk back.
#[derive(Debug, Clone, Default)]
pub struct MovementInterpolator {
    cursor: usize,
}

impl MovementInterpolator {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Position at sample `at`, or `None` without keyframes.
    pub fn position(&mut self, frames: &[MovementTimeframe], at: u64) -> Option<Vec3> {
        self.state(frames, at).map(|state| state.position)
    }

    /// Position, gain and size at sample `at`, all faded with the same ratio.
    pub fn state(&mut self, frames: &[MovementTimeframe], at: u64) -> Option<MovementState> {
        if frames.is_empty() {
            return None;
        }

        self.cursor = self.cursor.min(frames.len() - 1);
        while self.cursor > 0 && frames[self.cursor].start() > at {
            self.cursor -= 1;
        }
        while self.cursor + 1 < frames.len() && frames[self.cursor + 1].start() <= at {
            self.cursor += 1;
        }

        let current = &frames[self.cursor];
        let previous = match self.cursor {
            0 => current,
            n => &frames[n - 1],
        };

        let t = current.progress(at);
        Some(MovementState {
            position: previous.position.lerp(current.position, t),
            gain: previous.gain + (current.gain - previous.gain) * t,
            size: previous.size + (current.size - previous.size) * t,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyframes() -> Vec<MovementTimeframe> {
        vec![
            MovementTimeframe {
                offset: 0,
                fade: 0,
                position: Vec3::ZERO,
                ..Default::default()
            },
            MovementTimeframe {
                offset: 48000,
                fade: 4800,
                position: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
        ]
    }

    fn x_at(interpolator: &mut MovementInterpolator, frames: &[MovementTimeframe], at: u64) -> f32 {
        interpolator.position(frames, at).map_or(f32::NAN, |p| p.x)
    }

    #[test]
    fn fades_into_next_keyframe() {
        let frames = keyframes();
        let mut interpolator = MovementInterpolator::default();

        assert_eq!(x_at(&mut interpolator, &frames, 0), 0.0);
        assert_eq!(x_at(&mut interpolator, &frames, 43199), 0.0);
        assert_eq!(interpolator.cursor(), 0);

        assert_eq!(x_at(&mut interpolator, &frames, 43200), 0.0);
        assert_eq!(interpolator.cursor(), 1);
        assert!((x_at(&mut interpolator, &frames, 45600) - 0.5).abs() < 1e-6);
        assert!((x_at(&mut interpolator, &frames, 46800) - 0.75).abs() < 1e-6);
        assert_eq!(x_at(&mut interpolator, &frames, 48000), 1.0);
        assert_eq!(x_at(&mut interpolator, &frames, 96000), 1.0);
    }

    #[test]
    fn seeks_backwards() {
        let frames = keyframes();
        let mut interpolator = MovementInterpolator::default();

        assert_eq!(x_at(&mut interpolator, &frames, 60000), 1.0);
        assert_eq!(interpolator.cursor(), 1);
        assert_eq!(x_at(&mut interpolator, &frames, 1000), 0.0);
        assert_eq!(interpolator.cursor(), 0);
    }

    #[test]
    fn hard_cut_without_fade() {
        let frames = vec![
            MovementTimeframe {
                offset: 100,
                fade: 0,
                position: Vec3::new(0.0, 1.0, 0.0),
                ..Default::default()
            },
            MovementTimeframe {
                offset: 200,
                fade: 0,
                position: Vec3::new(0.0, -1.0, 0.0),
                ..Default::default()
            },
        ];
        let mut interpolator = MovementInterpolator::default();

        // The first keyframe holds before its offset
        assert_eq!(interpolator.position(&frames, 0).map(|p| p.y), Some(1.0));
        assert_eq!(interpolator.position(&frames, 199).map(|p| p.y), Some(1.0));
        assert_eq!(interpolator.position(&frames, 200).map(|p| p.y), Some(-1.0));
        assert!(interpolator.position(&[], 200).is_none());
    }

    #[test]
    fn gain_and_size_fade_with_position() {
        let frames = vec![
            MovementTimeframe::default(),
            MovementTimeframe {
                offset: 1000,
                fade: 1000,
                gain: 0.0,
                size: 1.0,
                ..Default::default()
            },
        ];
        let mut interpolator = MovementInterpolator::default();

        let state = interpolator.state(&frames, 500);
        assert_eq!(
            state,
            Some(MovementState {
                position: Vec3::ZERO,
                gain: 0.5,
                size: 0.5,
            })
        );
        assert_eq!(interpolator.state(&frames, 1000).map(|s| s.gain), Some(0.0));
    }

    #[test]
    fn cursor_recovers_after_front_trim() {
        let mut frames = (0..10)
            .map(|n| MovementTimeframe {
                offset: n * 100,
                position: Vec3::new(n as f32, 0.0, 0.0),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let mut interpolator = MovementInterpolator::default();

        assert_eq!(x_at(&mut interpolator, &frames, 850), 8.0);
        assert_eq!(interpolator.cursor(), 8);

        frames.drain(..7);
        assert_eq!(x_at(&mut interpolator, &frames, 950), 9.0);
        assert_eq!(interpolator.cursor(), 2);
    }
}
