use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use shared::tcu_hal::{RawInputs, TcuConfig};

use crate::{driver::NoiseConfig, SilError};

/// One hour of simulated time at the firmware's 1 kHz control rate.
pub const MAX_STEPS: usize = 3_600_000;

/// Pedal positions from `time_s` until the next keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PedalKeyframe {
    pub time_s: f32,
    #[serde(default)]
    pub forward: f32,
    #[serde(default)]
    pub reverse: f32,
    #[serde(default)]
    pub regen: f32,
}

impl PedalKeyframe {
    pub fn pedals(&self) -> RawInputs {
        RawInputs::new(self.forward, self.reverse, self.regen)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub dt: f32,
    pub duration_s: f32,
    #[serde(default)]
    pub noise: Option<NoiseConfig>,
    #[serde(default)]
    pub config: TcuConfig,
    pub keyframes: Vec<PedalKeyframe>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SilError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, SilError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;

        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), SilError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SilError::InvalidTimeStep);
        }

        if !self.duration_s.is_finite() || self.duration_s < 0.0 {
            return Err(SilError::InvalidDuration);
        }

        if (self.duration_s as f64 / self.dt as f64).round() > MAX_STEPS as f64 {
            return Err(SilError::InvalidTimeStep);
        }

        if self.keyframes.is_empty() {
            return Err(SilError::NoKeyframes);
        }

        let sorted = self
            .keyframes
            .windows(2)
            .all(|pair| pair[0].time_s <= pair[1].time_s);
        if !sorted {
            return Err(SilError::UnsortedKeyframes);
        }

        Ok(())
    }

    pub fn steps(&self) -> usize {
        (self.duration_s / self.dt).round() as usize
    }

    /// Step interpolation. Before the first keyframe every pedal is released.
    pub fn pedals_at(&self, time_s: f32) -> RawInputs {
        self.keyframes
            .iter()
            .take_while(|keyframe| keyframe.time_s <= time_s)
            .last()
            .map(PedalKeyframe::pedals)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::tcu_hal::{IdleBehavior, RunMode};

    const SCENARIO: &str = r#"{
        "name": "tap",
        "dt": 0.001,
        "duration_s": 1.0,
        "keyframes": [
            { "time_s": 0.1, "forward": 0.3 },
            { "time_s": 0.5, "regen": 0.15 },
            { "time_s": 0.8 }
        ]
    }"#;

    #[test]
    fn parses_with_default_config() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();

        assert_eq!(scenario.name, "tap");
        assert_eq!(scenario.steps(), 1000);
        assert_eq!(scenario.noise, None);
        assert_eq!(scenario.config, TcuConfig::default());
        assert_eq!(scenario.config.run_mode, RunMode::Normal);
        assert_eq!(scenario.config.idle_behavior, IdleBehavior::ReverseFallthrough);
    }

    #[test]
    fn holds_last_keyframe() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();

        assert_eq!(scenario.pedals_at(0.0), RawInputs::default());
        assert_eq!(scenario.pedals_at(0.1), RawInputs::new(0.3, 0.0, 0.0));
        assert_eq!(scenario.pedals_at(0.45), RawInputs::new(0.3, 0.0, 0.0));
        assert_eq!(scenario.pedals_at(0.6), RawInputs::new(0.0, 0.0, 0.15));
        assert_eq!(scenario.pedals_at(5.0), RawInputs::default());
    }

    #[test]
    fn rejects_bad_scenarios() {
        let mut scenario = Scenario::from_json(SCENARIO).unwrap();
        scenario.dt = 0.0;
        assert_eq!(scenario.validate(), Err(SilError::InvalidTimeStep));

        let mut scenario = Scenario::from_json(SCENARIO).unwrap();
        scenario.dt = 1e-30;
        assert_eq!(scenario.validate(), Err(SilError::InvalidTimeStep));

        let mut scenario = Scenario::from_json(SCENARIO).unwrap();
        scenario.duration_s = 3600.0;
        assert_eq!(scenario.validate(), Ok(()));
        assert_eq!(scenario.steps(), MAX_STEPS);

        let mut scenario = Scenario::from_json(SCENARIO).unwrap();
        scenario.keyframes.reverse();
        assert_eq!(scenario.validate(), Err(SilError::UnsortedKeyframes));

        let mut scenario = Scenario::from_json(SCENARIO).unwrap();
        scenario.keyframes.clear();
        assert_eq!(scenario.validate(), Err(SilError::NoKeyframes));

        assert!(matches!(
            Scenario::from_json("{ \"name\": 3 }"),
            Err(SilError::Parse { .. })
        ));
    }
}
