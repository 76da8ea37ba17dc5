use shared::tcu_hal::{TcuDebugInfo, TcuDebugInfoVariant, ThrottleChannel};
use strum::IntoEnumIterator;

use crate::Tcu;

impl<'a> Tcu<'a> {
    pub fn generate_debug_info(&self, variant: TcuDebugInfoVariant) -> TcuDebugInfo {
        let timestamp = self.timestamp_ms();
        let inputs = self.last_inputs;

        match variant {
            TcuDebugInfoVariant::CalibrationReadout => TcuDebugInfo::CalibrationReadout {
                timestamp,
                forward_input: inputs.forward,
                reverse_input: inputs.reverse,
                regen_input: inputs.regen,
                forward_output: self.convert(ThrottleChannel::Forward, inputs.forward),
                reverse_output: self.convert(ThrottleChannel::Reverse, inputs.reverse),
                regen_output: self.convert(ThrottleChannel::Regen, inputs.regen),
            },
            TcuDebugInfoVariant::ArbitrationInfo => TcuDebugInfo::ArbitrationInfo {
                timestamp,
                mode: self.last_cycle.map(|cycle| cycle.mode),
                command: self.last_cycle.and_then(|cycle| cycle.command),
            },
            TcuDebugInfoVariant::FaultInfo => TcuDebugInfo::FaultInfo {
                timestamp,
                fault_latched: self.fault_latched(),
                fault_cause: self.fault_cause(),
                alert_bitmask: self.alert_manager.bitmask(),
            },
        }
    }

    pub fn generate_debug_info_all_variants(&self, mut callback: impl FnMut(TcuDebugInfo)) {
        for variant in TcuDebugInfoVariant::iter() {
            callback(self.generate_debug_info(variant));
        }
    }
}
