//! Volume policy: defaults, clamping, and smart-balance composition.

use narramix_project_model::defaults;
use narramix_project_model::options::{VolumeOptions, VolumeRequest};
use serde::{Deserialize, Serialize};

/// Which gain a correction applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeChannel {
    Voice,
    Bgm,
    Original,
}

impl VolumeChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeChannel::Voice => "voice",
            VolumeChannel::Bgm => "bgm",
            VolumeChannel::Original => "original",
        }
    }
}

/// A requested volume that had to be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeCorrection {
    pub channel: VolumeChannel,
    pub requested: f64,
    pub applied: f64,
}

impl VolumeCorrection {
    pub fn describe(&self) -> String {
        format!(
            "{} volume {} outside valid range, using {}",
            self.channel.as_str(),
            self.requested,
            self.applied
        )
    }
}

/// Outcome of resolving a [`VolumeRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVolumes {
    pub volumes: VolumeOptions,
    pub corrections: Vec<VolumeCorrection>,
    /// Original audio exists and will be audible in the mix.
    pub original_audible: bool,
}

/// Gain bounds and smart-balance safety bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePolicy {
    pub min: f64,
    pub max: f64,
    pub smart_voice_range: (f64, f64),
    pub smart_original_range: (f64, f64),
}

impl Default for VolumePolicy {
    fn default() -> Self {
        Self {
            min: defaults::MIN_VOLUME,
            max: defaults::MAX_VOLUME,
            smart_voice_range: defaults::SMART_VOICE_RANGE,
            smart_original_range: defaults::SMART_ORIGINAL_RANGE,
        }
    }
}

impl VolumePolicy {
    /// Resolve requested gains into bounded gains.
    ///
    /// Unset channels take the default; an explicit zero stays zero.
    pub fn resolve(&self, request: &VolumeRequest, have_original_audio: bool) -> ResolvedVolumes {
        let mut corrections = Vec::new();

        let mut resolve_one = |channel: VolumeChannel, requested: Option<f64>, default: f64| {
            let Some(value) = requested else {
                return default;
            };
            let applied = if value.is_nan() {
                default
            } else {
                value.clamp(self.min, self.max)
            };
            if applied != value {
                let correction = VolumeCorrection {
                    channel,
                    requested: value,
                    applied,
                };
                tracing::debug!(
                    channel = channel.as_str(),
                    requested = value,
                    applied,
                    "Volume outside [{}, {}], clamped",
                    self.min,
                    self.max
                );
                corrections.push(correction);
            }
            applied
        };

        let volumes = VolumeOptions {
            voice: resolve_one(VolumeChannel::Voice, request.voice, defaults::VOICE_VOLUME),
            bgm: resolve_one(VolumeChannel::Bgm, request.bgm, defaults::BGM_VOLUME),
            original: resolve_one(
                VolumeChannel::Original,
                request.original,
                defaults::ORIGINAL_VOLUME,
            ),
        };

        tracing::info!(
            voice = volumes.voice,
            bgm = volumes.bgm,
            original = volumes.original,
            have_original_audio,
            "Volumes resolved"
        );

        ResolvedVolumes {
            original_audible: have_original_audio && volumes.original > 0.0,
            volumes,
            corrections,
        }
    }

    /// Compose smart-balance factors into user volumes.
    ///
    /// Factors multiply the user's choice, so relative preferences survive;
    /// results are re-clamped to the tighter smart bands. A channel at
    /// exactly zero stays muted. Non-finite or non-positive factors leave
    /// the volumes unchanged.
    pub fn apply_balance(
        &self,
        volumes: &VolumeOptions,
        voice_factor: f64,
        original_factor: f64,
    ) -> VolumeOptions {
        if !(voice_factor.is_finite() && original_factor.is_finite())
            || voice_factor <= 0.0
            || original_factor <= 0.0
        {
            return *volumes;
        }

        let scale = |volume: f64, factor: f64, (min, max): (f64, f64)| {
            if volume == 0.0 {
                0.0
            } else {
                (volume * factor).clamp(min, max)
            }
        };
        VolumeOptions {
            voice: scale(volumes.voice, voice_factor, self.smart_voice_range),
            bgm: volumes.bgm,
            original: scale(volumes.original, original_factor, self.smart_original_range),
        }
    }
}

/// Whether a gain differs enough from unity to be worth applying.
pub fn needs_gain(gain: f64) -> bool {
    (gain - 1.0).abs() > defaults::GAIN_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unset_takes_defaults() {
        let resolved = VolumePolicy::default().resolve(&VolumeRequest::default(), true);
        assert_eq!(resolved.volumes, VolumeOptions::default());
        assert!(resolved.corrections.is_empty());
        assert!(resolved.original_audible);
    }

    #[test]
    fn test_explicit_zero_mutes() {
        let request = VolumeRequest {
            original: Some(0.0),
            ..VolumeRequest::default()
        };
        let resolved = VolumePolicy::default().resolve(&request, true);
        assert_eq!(resolved.volumes.original, 0.0);
        assert!(!resolved.original_audible);
    }

    #[test]
    fn test_out_of_range_is_clamped_with_correction() {
        let request = VolumeRequest {
            voice: Some(3.5),
            bgm: Some(-0.2),
            original: None,
        };
        let resolved = VolumePolicy::default().resolve(&request, false);
        assert_eq!(resolved.volumes.voice, 2.0);
        assert_eq!(resolved.volumes.bgm, 0.0);
        assert_eq!(resolved.corrections.len(), 2);
        assert_eq!(resolved.corrections[0].channel, VolumeChannel::Voice);
        assert!(!resolved.original_audible);
    }

    #[test]
    fn test_nan_falls_back_to_default() {
        let request = VolumeRequest {
            bgm: Some(f64::NAN),
            ..VolumeRequest::default()
        };
        let resolved = VolumePolicy::default().resolve(&request, true);
        assert_eq!(resolved.volumes.bgm, defaults::BGM_VOLUME);
        assert_eq!(resolved.corrections.len(), 1);
    }

    #[test]
    fn test_apply_balance_composes_and_clamps() {
        let policy = VolumePolicy::default();
        let volumes = VolumeOptions {
            voice: 1.0,
            bgm: 0.3,
            original: 0.7,
        };
        let balanced = policy.apply_balance(&volumes, 2.0, 0.5);
        assert_eq!(balanced.voice, 1.5);
        assert!((balanced.original - 0.35).abs() < 1e-9);
        assert_eq!(balanced.bgm, 0.3);

        let quiet = policy.apply_balance(&volumes, 0.01, 0.01);
        assert_eq!(quiet.voice, 0.1);
        assert_eq!(quiet.original, 0.1);
    }

    #[test]
    fn test_apply_balance_keeps_muted_channels_muted() {
        let policy = VolumePolicy::default();
        let request = VolumeRequest {
            voice: Some(0.0),
            bgm: None,
            original: Some(0.0),
        };
        let resolved = policy.resolve(&request, true);
        assert_eq!(resolved.volumes.voice, 0.0);

        let balanced = policy.apply_balance(&resolved.volumes, 1.2, 0.9);
        assert_eq!(balanced.voice, 0.0);
        assert_eq!(balanced.original, 0.0);
        assert_eq!(balanced.bgm, resolved.volumes.bgm);
    }

    #[test]
    fn test_apply_balance_ignores_bad_factors() {
        let policy = VolumePolicy::default();
        let volumes = VolumeOptions::default();
        assert_eq!(policy.apply_balance(&volumes, f64::NAN, 1.0), volumes);
        assert_eq!(policy.apply_balance(&volumes, 1.0, 0.0), volumes);
    }

    #[test]
    fn test_needs_gain_tolerance() {
        assert!(!needs_gain(1.0));
        assert!(!needs_gain(1.0005));
        assert!(needs_gain(1.01));
        assert!(needs_gain(0.0));
    }

    proptest! {
        #[test]
        fn prop_resolve_stays_in_bounds(v in -10.0f64..10.0) {
            let request = VolumeRequest { voice: Some(v), bgm: Some(v), original: Some(v) };
            let resolved = VolumePolicy::default().resolve(&request, true);
            for gain in [resolved.volumes.voice, resolved.volumes.bgm, resolved.volumes.original] {
                prop_assert!((defaults::MIN_VOLUME..=defaults::MAX_VOLUME).contains(&gain));
            }
        }

        #[test]
        fn prop_in_range_is_identity(v in 0.0f64..=2.0) {
            let request = VolumeRequest { voice: Some(v), bgm: Some(v), original: Some(v) };
            let resolved = VolumePolicy::default().resolve(&request, true);
            prop_assert_eq!(resolved.volumes.voice, v);
            prop_assert_eq!(resolved.volumes.bgm, v);
            prop_assert_eq!(resolved.volumes.original, v);
            prop_assert!(resolved.corrections.is_empty());
        }
    }
}
