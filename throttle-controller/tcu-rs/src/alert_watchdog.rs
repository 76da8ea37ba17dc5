use shared::tcu_hal::{RunMode, TcuAlertCondition};

use crate::Tcu;

impl<'a> Tcu<'a> {
    pub(crate) fn update_alert_watchdog(&mut self) {
        let fault_latched = self.fault_latched();
        let calibrating = self.run_mode() == RunMode::Calibration;
        let debug_info_enabled = self.config().debug_info_enabled;

        self.alert_manager
            .assign_condition(TcuAlertCondition::FaultLatched, fault_latched);

        self.alert_manager
            .assign_condition(TcuAlertCondition::CalibrationModeEnabled, calibrating);

        self.alert_manager
            .assign_condition(TcuAlertCondition::DebugInfoEnabled, debug_info_enabled);
    }
}
