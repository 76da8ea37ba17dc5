use serde::{Deserialize, Serialize};
use shared::tcu_hal::{ConverterConfig, ConverterCurve};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConverterError {
    /// `input_min_ratio` must be strictly below `input_max_ratio`.
    InvalidThresholds,
    NonFiniteThreshold,
}

/// Deadband, rescale and curve transfer function for one pedal channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConverter {
    config: ConverterConfig,
}

impl ChannelConverter {
    pub fn new(config: ConverterConfig) -> Result<Self, ConverterError> {
        if !config.input_min_ratio.is_finite() || !config.input_max_ratio.is_finite() {
            return Err(ConverterError::NonFiniteThreshold);
        }

        if config.input_min_ratio >= config.input_max_ratio {
            return Err(ConverterError::InvalidThresholds);
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Maps a sampled ratio to an output command ratio in [0, 1].
    pub fn convert(&self, input_ratio: f32) -> f32 {
        // Deadband zone. Also swallows NaN.
        if input_ratio.is_nan() || input_ratio <= self.config.input_min_ratio {
            return 0.0;
        }

        // Beyond full scale, peg to full output
        if input_ratio >= self.config.input_max_ratio {
            return 1.0;
        }

        let ratio = (input_ratio - self.config.input_min_ratio)
            / (self.config.input_max_ratio - self.config.input_min_ratio);

        match self.config.curve {
            ConverterCurve::Linear => ratio,
            // Hits 0 and 1 at the ends and stays under the linear ramp in between.
            // Denominator stays in [-3, -1], no singularity.
            ConverterCurve::Logarithmic => -ratio / (2.0 * ratio - 3.0),
        }
    }
}
