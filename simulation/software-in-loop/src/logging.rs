use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use shared::tcu_hal::{RawInputs, SystemMode, TcuDebugInfo};

use crate::SilError;

/// Board state after one controller cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilFrame {
    pub time_s: f32,
    pub pedals: RawInputs,
    pub adc_counts: [u16; 3],
    pub throttle_dac_code: u16,
    pub regen_dac_code: u16,
    pub reverse_pin: bool,
    pub fault_led: bool,
    pub mode: Option<SystemMode>,
    pub fault_latched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilLog {
    pub scenario: String,
    pub dt: f32,
    pub frames: Vec<SilFrame>,
    /// Data points decoded from the serial diagnostics stream.
    pub debug_info: Vec<TcuDebugInfo>,
}

impl SilLog {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SilError> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;

        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SilError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Number of frames spent in `mode`.
    pub fn time_in_mode(&self, mode: SystemMode) -> usize {
        self.frames
            .iter()
            .filter(|frame| frame.mode == Some(mode))
            .count()
    }

    pub fn first_fault(&self) -> Option<&SilFrame> {
        self.frames.iter().find(|frame| frame.fault_latched)
    }
}
