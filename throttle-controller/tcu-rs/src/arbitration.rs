use shared::tcu_hal::{Direction, IdleBehavior, OutputCommand, RawInputs, SystemMode, ThrottleChannel};

use crate::tcu::TcuConverters;

/// Picks this cycle's mode. Priority is fault, regen, forward, then reverse.
///
/// Inputs arrive deadbanded from the sampling stage, so any nonzero ratio
/// counts as a pressed pedal. NaN compares unequal to zero and is treated as
/// pressed, which lets a broken sensor path trip the dual-input fault.
pub fn select_mode(inputs: &RawInputs, idle_behavior: IdleBehavior) -> SystemMode {
    let forward = engaged(inputs.forward);
    let reverse = engaged(inputs.reverse);

    // Signal from both pot sides: improper wiring or a corroded pot
    if forward && reverse {
        return SystemMode::Fault;
    }

    // Regen comes next to hit the brakes just that little bit quicker
    if engaged(inputs.regen) {
        return SystemMode::Regen;
    }

    if forward {
        return SystemMode::Forward;
    }

    if !reverse && idle_behavior == IdleBehavior::Neutral {
        return SystemMode::Idle;
    }

    SystemMode::Reverse
}

/// Output triple for a non-fault mode. Returns `None` for `SystemMode::Fault`.
pub fn command_for_mode(
    mode: SystemMode,
    inputs: &RawInputs,
    converters: &TcuConverters,
) -> Option<OutputCommand> {
    let command = match mode {
        SystemMode::Fault => return None,
        SystemMode::Regen => OutputCommand {
            drive_ratio: 0.0,
            direction: Direction::Forward,
            regen_ratio: converters.convert(ThrottleChannel::Regen, inputs.regen),
        },
        SystemMode::Forward => OutputCommand {
            drive_ratio: converters.convert(ThrottleChannel::Forward, inputs.forward),
            direction: Direction::Forward,
            regen_ratio: 0.0,
        },
        SystemMode::Reverse => OutputCommand {
            drive_ratio: converters.convert(ThrottleChannel::Reverse, inputs.reverse),
            direction: Direction::Reverse,
            regen_ratio: 0.0,
        },
        SystemMode::Idle => OutputCommand::safe(),
    };

    Some(command)
}

fn engaged(ratio: f32) -> bool {
    ratio != 0.0
}
