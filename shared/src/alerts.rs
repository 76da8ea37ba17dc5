use core::marker::PhantomData;

use crate::util::LoopTimer;

pub type AlertBitmaskType = u32;

/// Tracks a bitmask of active alert conditions. `update` reports the bitmask
/// whenever it changes, and otherwise at a fixed heartbeat rate.
pub struct AlertManager<C> {
    condition_bitmask: AlertBitmaskType,
    last_reported_bitmask: Option<AlertBitmaskType>,
    report_timer: LoopTimer<f32>,
    _marker: PhantomData<C>,
}

impl<C> AlertManager<C>
where
    C: Into<AlertBitmaskType>,
{
    pub fn new(report_rate_s: f32) -> Self {
        Self {
            condition_bitmask: 0,
            last_reported_bitmask: None,
            report_timer: LoopTimer::new(report_rate_s),
            _marker: PhantomData,
        }
    }

    pub fn set_condition(&mut self, condition: C) {
        self.condition_bitmask |= 1 << condition.into();
    }

    pub fn clear_condition(&mut self, condition: C) {
        self.condition_bitmask &= !(1 << condition.into());
    }

    pub fn assign_condition(&mut self, condition: C, state: bool) {
        if state {
            self.set_condition(condition);
        } else {
            self.clear_condition(condition);
        }
    }

    pub fn is_set(&self, condition: C) -> bool {
        self.condition_bitmask & (1 << condition.into()) != 0
    }

    pub fn bitmask(&self) -> AlertBitmaskType {
        self.condition_bitmask
    }

    pub fn update(&mut self, dt: f32) -> Option<AlertBitmaskType> {
        let heartbeat = self.report_timer.should_update(dt);
        let changed = self.last_reported_bitmask != Some(self.condition_bitmask);

        if heartbeat || changed {
            self.last_reported_bitmask = Some(self.condition_bitmask);
            return Some(self.condition_bitmask);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcu_hal::TcuAlertCondition;

    #[test]
    fn conditions_set_and_clear() {
        let mut manager = AlertManager::new(1.0);

        manager.set_condition(TcuAlertCondition::FaultLatched);
        manager.set_condition(TcuAlertCondition::DebugInfoEnabled);
        assert!(manager.is_set(TcuAlertCondition::FaultLatched));
        assert!(!manager.is_set(TcuAlertCondition::CalibrationModeEnabled));
        assert_eq!(manager.bitmask(), 0b101);

        manager.assign_condition(TcuAlertCondition::DebugInfoEnabled, false);
        assert_eq!(manager.bitmask(), 0b001);
    }

    #[test]
    fn reports_on_change_and_heartbeat() {
        let mut manager = AlertManager::<TcuAlertCondition>::new(0.5);

        assert_eq!(manager.update(0.1), Some(0));
        assert_eq!(manager.update(0.1), None);

        manager.set_condition(TcuAlertCondition::FaultLatched);
        assert_eq!(manager.update(0.1), Some(1));
        assert_eq!(manager.update(0.1), None);

        // 0.5s heartbeat elapses
        assert_eq!(manager.update(0.2), Some(1));
    }
}
