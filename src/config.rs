//! Simulation inputs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The parameters of a simulation run, loaded once and shared by value with every worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inputs {
    /// The length of the whole road, in cells.
    pub length: usize,
    /// The number of lanes.
    pub lanes: usize,
    /// The maximum speed of a vehicle, in cells per tick.
    pub max_speed: usize,
    /// Probability that a moving vehicle randomly slows down in a tick.
    pub prob_slow_down: f64,
    /// Probability that a vehicle takes an available lane change.
    pub prob_change: f64,
    /// Probability that a vehicle enters a free lane in a tick.
    pub prob_spawn: f64,
    /// The number of ticks to simulate.
    pub max_time: u64,
    /// Vehicles finishing at or before this tick are not sampled.
    pub warmup_time: u64,
    /// Seed for the per-worker random number generators.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            length: 1000,
            lanes: 2,
            max_speed: 5,
            prob_slow_down: 0.1,
            prob_change: 0.5,
            prob_spawn: 0.3,
            max_time: 10_000,
            warmup_time: 1_000,
            seed: None,
        }
    }
}

impl Inputs {
    /// Reads and validates the inputs from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates the inputs from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let inputs: Inputs = serde_json::from_str(json)?;
        inputs.validate()?;
        Ok(inputs)
    }

    /// Checks that every parameter is within its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("length", self.length),
            ("lanes", self.lanes),
            ("max_speed", self.max_speed),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".into(),
                });
            }
        }

        let probabilities = [
            ("prob_slow_down", self.prob_slow_down),
            ("prob_change", self.prob_change),
            ("prob_spawn", self.prob_spawn),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is not a probability", value),
                });
            }
        }

        if self.warmup_time >= self.max_time {
            return Err(ConfigError::Invalid {
                field: "warmup_time",
                reason: format!("must be less than max_time ({})", self.max_time),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_full_config() {
        let inputs = Inputs::from_json(
            r#"{
                "length": 100, "lanes": 2, "max_speed": 5,
                "prob_slow_down": 0.2, "prob_change": 0.5, "prob_spawn": 0.1,
                "max_time": 500, "warmup_time": 50, "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(inputs.length, 100);
        assert_eq!(inputs.seed, Some(7));
    }

    #[test]
    fn seed_is_optional() {
        let inputs = Inputs::from_json(
            r#"{
                "length": 100, "lanes": 1, "max_speed": 5,
                "prob_slow_down": 0.0, "prob_change": 0.0, "prob_spawn": 0.1,
                "max_time": 10, "warmup_time": 0
            }"#,
        )
        .unwrap();
        assert_eq!(inputs.seed, None);
    }

    #[test]
    fn rejects_bad_probability() {
        let inputs = Inputs {
            prob_spawn: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            inputs.validate(),
            Err(ConfigError::Invalid {
                field: "prob_spawn",
                ..
            })
        ));
    }

    #[test]
    fn rejects_warmup_past_end() {
        let inputs = Inputs {
            max_time: 10,
            warmup_time: 10,
            ..Default::default()
        };
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Inputs::from_json(r#"{ "length": 10, "colour": "red" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Inputs::load("/nonexistent/inputs.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
