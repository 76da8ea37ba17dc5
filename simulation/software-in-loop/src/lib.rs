pub mod driver;
pub mod logging;
pub mod scenario;

use std::cell::RefCell;

use shared::{
    logger::retrieve_data_point, tcu_hal::TcuDebugInfo, DataPointLogger, SerialFrameLogger,
};
use tcu_rs::{Tcu, TcuError};

use driver::SilHardware;
use logging::{SilFrame, SilLog};
use scenario::Scenario;

pub const SERIAL_PAGE_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum SilError {
    Io(std::io::ErrorKind),
    Parse { line: usize, column: usize },
    InvalidTimeStep,
    InvalidDuration,
    NoKeyframes,
    UnsortedKeyframes,
    InvalidNoise,
    Tcu(TcuError),
}

impl From<std::io::Error> for SilError {
    fn from(error: std::io::Error) -> Self {
        SilError::Io(error.kind())
    }
}

impl From<serde_json::Error> for SilError {
    fn from(error: serde_json::Error) -> Self {
        SilError::Parse {
            line: error.line(),
            column: error.column(),
        }
    }
}

impl From<TcuError> for SilError {
    fn from(error: TcuError) -> Self {
        SilError::Tcu(error)
    }
}

/// Runs the controller against simulated pedals for the whole scenario. The
/// serial diagnostics stream is captured and decoded into the log.
pub fn run_scenario(scenario: &Scenario) -> Result<SilLog, SilError> {
    scenario.validate()?;

    let serial_stream = RefCell::new(Vec::new());
    let mut serial_logger =
        SerialFrameLogger::<TcuDebugInfo, _, SERIAL_PAGE_SIZE>::new(|page: &[u8]| {
            serial_stream.borrow_mut().extend_from_slice(page);
        });

    let hardware = SilHardware::new();
    let mut channels = hardware.channels(scenario.noise)?;
    let mut frames = Vec::with_capacity(scenario.steps());

    {
        let data_logger: &mut dyn DataPointLogger<TcuDebugInfo> = &mut serial_logger;
        let mut tcu = Tcu::new(scenario.config.clone(), channels.tcu_channels(), Some(data_logger))?;

        for step in 0..scenario.steps() {
            let time_s = step as f32 * scenario.dt;
            let pedals = scenario.pedals_at(time_s);

            hardware.set_pedals(pedals);
            tcu.update(scenario.dt);

            frames.push(SilFrame {
                time_s,
                pedals,
                adc_counts: hardware.adc_counts(),
                throttle_dac_code: hardware.throttle_dac_code.get(),
                regen_dac_code: hardware.regen_dac_code.get(),
                reverse_pin: hardware.reverse_pin.get(),
                fault_led: hardware.fault_led.get(),
                mode: tcu.last_cycle().map(|cycle| cycle.mode),
                fault_latched: tcu.fault_latched(),
            });
        }
    }

    serial_logger.flush();
    if serial_logger.dropped_data_points() > 0 {
        println!(
            "SIL: {} debug data points did not fit a serial frame",
            serial_logger.dropped_data_points()
        );
    }

    let serial_bytes = serial_stream.borrow();
    let mut serial_iter = serial_bytes.iter();
    let mut debug_info = Vec::new();
    while let Some(data_point) = retrieve_data_point::<TcuDebugInfo>(&mut serial_iter) {
        debug_info.push(data_point);
    }

    println!(
        "SIL: Finished '{}' after {} steps, {} serial bytes",
        scenario.name,
        frames.len(),
        serial_bytes.len()
    );

    Ok(SilLog {
        scenario: scenario.name.clone(),
        dt: scenario.dt,
        frames,
        debug_info,
    })
}
