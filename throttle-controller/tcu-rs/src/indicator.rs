use shared::{util::LoopTimer, FAULT_BLINK_PERIOD_S};

/// Blinks the fault LED twice a second while a fault is latched.
pub struct FaultIndicator {
    blink_timer: LoopTimer<f32>,
    led_on: bool,
    blinking: bool,
}

impl FaultIndicator {
    pub fn new() -> Self {
        Self {
            blink_timer: LoopTimer::new(FAULT_BLINK_PERIOD_S),
            led_on: false,
            blinking: false,
        }
    }

    /// Advances the blink pattern and returns the LED state to drive.
    pub fn update(&mut self, dt: f32, fault_latched: bool) -> bool {
        if !fault_latched {
            self.led_on = false;
            return self.led_on;
        }

        if !self.blinking {
            self.blinking = true;
            self.blink_timer.reset();
            self.led_on = true;
        } else if self.blink_timer.should_update(dt) {
            self.led_on = !self.led_on;
        }

        self.led_on
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }
}

impl Default for FaultIndicator {
    fn default() -> Self {
        Self::new()
    }
}
