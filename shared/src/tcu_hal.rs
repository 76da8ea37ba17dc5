use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount as EnumCountMacro, EnumDiscriminants, EnumIter};

use crate::{alerts::AlertBitmaskType, ADC_FULL_SCALE_COUNTS, DAC_FULL_SCALE_CODE, THROTTLE_DEADBAND_RATIO};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumCountMacro, EnumIter, Hash)]
pub enum ThrottleChannel {
    Forward,
    Reverse,
    Regen,
}

impl ThrottleChannel {
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum SystemMode {
    Fault,
    Regen,
    Forward,
    Reverse,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunMode {
    #[default]
    Normal,
    Calibration,
}

/// What happens to the physical outputs on the cycle a fault latches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FaultResponse {
    /// Leave the outputs at whatever was last commanded.
    HoldOutputs,
    /// Command zero drive, zero regen and forward direction once, then stop updating.
    #[default]
    ForceSafe,
}

/// What gets commanded when no pedal is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IdleBehavior {
    /// Fall through to reverse mode: zero drive with the reverse signal asserted.
    #[default]
    ReverseFallthrough,
    /// Report `SystemMode::Idle`: zero drive, zero regen, forward direction.
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultCause {
    /// Both throttle pot sides read nonzero. Improper wiring or a corroded pot.
    DualThrottleInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConverterCurve {
    Linear,
    /// Rational approximation of a log curve, more resolution at low speeds.
    Logarithmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub input_min_ratio: f32,
    pub input_max_ratio: f32,
    /// Motor controller starting threshold. Carried for calibration, unused by the transfer function.
    pub output_min_scale_ratio: f32,
    pub curve: ConverterCurve,
}

impl ConverterConfig {
    pub const fn forward_default() -> Self {
        Self {
            input_min_ratio: THROTTLE_DEADBAND_RATIO,
            input_max_ratio: 0.5,
            output_min_scale_ratio: 0.5 / 5.0,
            curve: ConverterCurve::Logarithmic,
        }
    }

    pub const fn reverse_default() -> Self {
        Self::forward_default()
    }

    pub const fn regen_default() -> Self {
        Self {
            input_min_ratio: 0.1,
            input_max_ratio: 0.2,
            output_min_scale_ratio: 0.5 / 5.0,
            curve: ConverterCurve::Logarithmic,
        }
    }
}

/// Normalized pedal ratios for one cycle, already deadbanded at the sampling stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RawInputs {
    pub forward: f32,
    pub reverse: f32,
    pub regen: f32,
}

impl RawInputs {
    pub const fn new(forward: f32, reverse: f32, regen: f32) -> Self {
        Self {
            forward,
            reverse,
            regen,
        }
    }

    pub fn get(&self, channel: ThrottleChannel) -> f32 {
        match channel {
            ThrottleChannel::Forward => self.forward,
            ThrottleChannel::Reverse => self.reverse,
            ThrottleChannel::Regen => self.regen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputCommand {
    pub drive_ratio: f32,
    pub direction: Direction,
    pub regen_ratio: f32,
}

impl OutputCommand {
    pub const fn safe() -> Self {
        Self {
            drive_ratio: 0.0,
            direction: Direction::Forward,
            regen_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcuConfig {
    pub forward_converter: ConverterConfig,
    pub reverse_converter: ConverterConfig,
    pub regen_converter: ConverterConfig,
    pub run_mode: RunMode,
    pub fault_response: FaultResponse,
    pub idle_behavior: IdleBehavior,
    pub debug_info_enabled: bool,
    pub telemetry_rate_s: f32,
    pub calibration_readout_rate_s: f32,
}

impl TcuConfig {
    pub const fn default() -> Self {
        Self {
            forward_converter: ConverterConfig::forward_default(),
            reverse_converter: ConverterConfig::reverse_default(),
            regen_converter: ConverterConfig::regen_default(),
            run_mode: RunMode::Normal,
            fault_response: FaultResponse::ForceSafe,
            idle_behavior: IdleBehavior::ReverseFallthrough,
            debug_info_enabled: false,
            telemetry_rate_s: 0.02,
            calibration_readout_rate_s: 0.25,
        }
    }

    pub fn converter(&self, channel: ThrottleChannel) -> &ConverterConfig {
        match channel {
            ThrottleChannel::Forward => &self.forward_converter,
            ThrottleChannel::Reverse => &self.reverse_converter,
            ThrottleChannel::Regen => &self.regen_converter,
        }
    }
}

impl Default for TcuConfig {
    fn default() -> Self {
        TcuConfig::default()
    }
}

/// Counts-to-ratio rule used by every analog input binding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogInputConfig {
    pub full_scale_counts: u16,
    pub deadband_ratio: Option<f32>,
}

impl AnalogInputConfig {
    pub const fn throttle() -> Self {
        Self {
            full_scale_counts: ADC_FULL_SCALE_COUNTS,
            deadband_ratio: Some(THROTTLE_DEADBAND_RATIO),
        }
    }

    pub const fn regen() -> Self {
        Self {
            full_scale_counts: ADC_FULL_SCALE_COUNTS,
            deadband_ratio: None,
        }
    }

    pub const fn for_channel(channel: ThrottleChannel) -> Self {
        match channel {
            ThrottleChannel::Forward | ThrottleChannel::Reverse => Self::throttle(),
            ThrottleChannel::Regen => Self::regen(),
        }
    }

    pub fn apply(&self, counts: u16) -> f32 {
        if self.full_scale_counts == 0 {
            return 0.0;
        }

        let ratio = ((counts as f32) / (self.full_scale_counts as f32)).min(1.0);

        match self.deadband_ratio {
            Some(deadband) if ratio <= deadband => 0.0,
            _ => ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DacOutputConfig {
    pub full_scale_code: u16,
}

impl DacOutputConfig {
    pub const fn default() -> Self {
        Self {
            full_scale_code: DAC_FULL_SCALE_CODE,
        }
    }

    pub fn apply(&self, ratio: f32) -> u16 {
        // NaN saturates to 0 in the cast
        (ratio.clamp(0.0, 1.0) * (self.full_scale_code as f32)) as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionOutputConfig {
    pub invert: bool,
}

impl DirectionOutputConfig {
    pub const fn default() -> Self {
        Self { invert: true }
    }

    /// Pin level for the reverse signal line.
    pub fn apply(&self, direction: Direction) -> bool {
        let reverse = direction == Direction::Reverse;

        if self.invert {
            !reverse
        } else {
            reverse
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumCountMacro, EnumIter)]
pub enum TcuAlertCondition {
    FaultLatched,
    CalibrationModeEnabled,
    DebugInfoEnabled,
}

impl From<TcuAlertCondition> for AlertBitmaskType {
    fn from(condition: TcuAlertCondition) -> Self {
        condition as AlertBitmaskType
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcuTelemetryFrame {
    pub timestamp: u64,
    pub run_mode: RunMode,
    pub mode: Option<SystemMode>,
    pub inputs: RawInputs,
    pub command: Option<OutputCommand>,
    pub fault_cause: Option<FaultCause>,
    pub alert_bitmask: AlertBitmaskType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(TcuDebugInfoVariant))]
#[strum_discriminants(derive(EnumIter))]
pub enum TcuDebugInfo {
    CalibrationReadout {
        timestamp: u64,
        forward_input: f32,
        reverse_input: f32,
        regen_input: f32,
        forward_output: f32,
        reverse_output: f32,
        regen_output: f32,
    },
    ArbitrationInfo {
        timestamp: u64,
        mode: Option<SystemMode>,
        command: Option<OutputCommand>,
    },
    FaultInfo {
        timestamp: u64,
        fault_latched: bool,
        fault_cause: Option<FaultCause>,
        alert_bitmask: AlertBitmaskType,
    },
}

/// One sampled sensor path. Returns a normalized ratio in [0, 1].
pub trait InputChannel {
    fn sample(&mut self) -> f32;
}

/// One actuator path: a DAC, a digital pin, an indicator LED.
pub trait OutputChannel<T> {
    fn apply(&mut self, command: T);
}
