//! Transparency envelope for a playing sequence
//!
//! # Timing points
//!
//! ```text
//! 0 ──fade-in── fade_in_time ──── steady ──── duration-fade_out_time ──fade-out── duration
//! alpha_start ─────────► alpha_play ───────────────────────► alpha_play ─────────► alpha_end
//! ```
//!
//! Both ramps are linear. Positions and durations are in seconds; a
//! negative value means "not known" (the last query failed).

use photomat_common::config::CatalogConfig;

use super::slot::SlotStatus;

/// Fade envelope parameters of one sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeProfile {
    /// Seconds after start during which alpha ramps up
    pub fade_in_time: f64,

    /// Seconds before end during which alpha ramps down
    pub fade_out_time: f64,

    pub alpha_start: u8,
    pub alpha_play: u8,
    pub alpha_end: u8,
}

impl Default for FadeProfile {
    fn default() -> Self {
        Self {
            fade_in_time: 2.0,
            fade_out_time: 2.0,
            alpha_start: 0,
            alpha_play: 255,
            alpha_end: 0,
        }
    }
}

impl From<&CatalogConfig> for FadeProfile {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            fade_in_time: config.fade_in,
            fade_out_time: config.fade_out,
            alpha_start: config.alpha_start,
            alpha_play: config.alpha_play,
            alpha_end: config.alpha_end,
        }
    }
}

impl FadeProfile {
    /// Transparency the session should show right now
    ///
    /// Returns `None` when there is nothing to apply: the session is not
    /// playing (staged, absent or faulted) or the position is unknown.
    /// Without a known duration only the fade-in and steady parts apply.
    pub fn target_alpha(&self, status: &SlotStatus, position: f64, duration: f64) -> Option<u8> {
        if *status == SlotStatus::Stopped {
            return Some(self.alpha_end);
        }
        if position < 0.0 {
            return None;
        }
        let duration_known = duration >= 0.0;
        if duration_known && position >= duration {
            return Some(self.alpha_end);
        }
        if *status != SlotStatus::Playing {
            return None;
        }

        let alpha_start = f64::from(self.alpha_start);
        let alpha_play = f64::from(self.alpha_play);
        let alpha_end = f64::from(self.alpha_end);

        let alpha = if duration_known && position > duration - self.fade_out_time {
            let t = 1.0 - (duration - position) / self.fade_out_time;
            alpha_play - t * (alpha_play - alpha_end)
        } else if position < self.fade_in_time {
            let t = if self.fade_in_time > 0.0 {
                position / self.fade_in_time
            } else {
                1.0
            };
            alpha_start + t * (alpha_play - alpha_start)
        } else {
            alpha_play
        };

        Some(clamp_alpha(alpha))
    }

    /// Whether `position` lies inside either ramp
    pub fn is_ramping(&self, position: f64, duration: f64) -> bool {
        if position < 0.0 {
            return false;
        }
        position < self.fade_in_time || (duration >= 0.0 && position > duration - self.fade_out_time)
    }
}

/// Round and clamp to the 0..=255 alpha range
pub fn clamp_alpha(alpha: f64) -> u8 {
    if alpha.is_nan() {
        return 0;
    }
    alpha.round().clamp(0.0, 255.0) as u8
}

/// Normalised volume for a transparency value
pub fn volume_for_alpha(alpha: u8) -> f64 {
    f64::from(alpha) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> FadeProfile {
        FadeProfile {
            fade_in_time: 2.0,
            fade_out_time: 3.0,
            alpha_start: 10,
            alpha_play: 250,
            alpha_end: 20,
        }
    }

    fn playing(profile: &FadeProfile, position: f64, duration: f64) -> u8 {
        profile
            .target_alpha(&SlotStatus::Playing, position, duration)
            .unwrap()
    }

    #[test]
    fn test_fade_in_ramp() {
        let p = profile();
        assert_eq!(playing(&p, 0.0, 20.0), 10);
        assert_eq!(playing(&p, 1.0, 20.0), 130);
        assert_eq!(playing(&p, 5.0, 20.0), 250);
    }

    #[test]
    fn test_fade_out_ramp() {
        let p = profile();
        assert_eq!(playing(&p, 18.5, 20.0), 135);
        assert_eq!(playing(&p, 19.99, 20.0), 21);
    }

    #[test]
    fn test_no_discontinuity_at_ramp_boundaries() {
        let p = profile();
        let eps = 1e-9;
        // Fade-in end
        assert_eq!(playing(&p, p.fade_in_time - eps, 20.0), p.alpha_play);
        assert_eq!(playing(&p, p.fade_in_time, 20.0), p.alpha_play);
        // Fade-out start
        assert_eq!(playing(&p, 20.0 - p.fade_out_time, 20.0), p.alpha_play);
        assert_eq!(playing(&p, 20.0 - p.fade_out_time + eps, 20.0), p.alpha_play);
    }

    #[test]
    fn test_zero_fade_in_is_fully_in() {
        let p = FadeProfile {
            fade_in_time: 0.0,
            ..profile()
        };
        assert_eq!(playing(&p, 0.0, 20.0), 250);
    }

    #[test]
    fn test_end_states_use_alpha_end() {
        let p = profile();
        assert_eq!(p.target_alpha(&SlotStatus::Stopped, -1.0, -1.0), Some(20));
        assert_eq!(p.target_alpha(&SlotStatus::Playing, 20.0, 20.0), Some(20));
        assert_eq!(p.target_alpha(&SlotStatus::Paused, 25.0, 20.0), Some(20));
    }

    #[test]
    fn test_nothing_to_apply_when_not_playing_or_unknown() {
        let p = profile();
        assert_eq!(p.target_alpha(&SlotStatus::Paused, 0.0, 20.0), None);
        assert_eq!(p.target_alpha(&SlotStatus::Absent, 0.0, 20.0), None);
        assert_eq!(p.target_alpha(&SlotStatus::Faulted("gone".into()), 3.0, 20.0), None);
        assert_eq!(p.target_alpha(&SlotStatus::Playing, -1.0, 20.0), None);
    }

    #[test]
    fn test_unknown_duration_skips_fade_out() {
        let p = profile();
        assert_eq!(playing(&p, 1.0, -1.0), 130);
        assert_eq!(playing(&p, 500.0, -1.0), 250);
    }

    #[test]
    fn test_alpha_stays_in_range_over_whole_sequence() {
        let extremes = [
            FadeProfile {
                fade_in_time: 0.5,
                fade_out_time: 0.5,
                alpha_start: 0,
                alpha_play: 255,
                alpha_end: 0,
            },
            FadeProfile {
                fade_in_time: 4.0,
                fade_out_time: 4.0,
                alpha_start: 255,
                alpha_play: 0,
                alpha_end: 255,
            },
            // Ramps longer than the video overlap
            FadeProfile {
                fade_in_time: 8.0,
                fade_out_time: 8.0,
                ..FadeProfile::default()
            },
        ];
        for p in extremes {
            let mut position = -0.5;
            while position <= 6.5 {
                if let Some(alpha) = p.target_alpha(&SlotStatus::Playing, position, 6.0) {
                    // u8 already bounds the range; make sure the value is not saturated garbage
                    let lo = p.alpha_start.min(p.alpha_play).min(p.alpha_end);
                    let hi = p.alpha_start.max(p.alpha_play).max(p.alpha_end);
                    assert!(alpha >= lo && alpha <= hi, "alpha {} at {}", alpha, position);
                }
                position += 0.02;
            }
        }
    }

    #[test]
    fn test_is_ramping() {
        let p = profile();
        assert!(p.is_ramping(1.0, 20.0));
        assert!(!p.is_ramping(10.0, 20.0));
        assert!(p.is_ramping(18.0, 20.0));
        assert!(!p.is_ramping(18.0, -1.0));
        assert!(!p.is_ramping(-1.0, 20.0));
    }

    #[test]
    fn test_clamp_and_volume() {
        assert_eq!(clamp_alpha(-3.0), 0);
        assert_eq!(clamp_alpha(300.0), 255);
        assert_eq!(clamp_alpha(127.5), 128);
        assert_eq!(clamp_alpha(f64::NAN), 0);
        assert_eq!(volume_for_alpha(255), 1.0);
        assert_eq!(volume_for_alpha(0), 0.0);
    }
}
