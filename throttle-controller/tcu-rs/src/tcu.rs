use serde::{Deserialize, Serialize};
use shared::{
    alerts::{AlertBitmaskType, AlertManager},
    tcu_hal::{
        Direction, FaultCause, FaultResponse, InputChannel, OutputChannel, OutputCommand, RawInputs,
        RunMode, SystemMode, TcuAlertCondition, TcuConfig, TcuDebugInfo, TcuDebugInfoVariant,
        TcuTelemetryFrame, ThrottleChannel,
    },
    util::LoopTimer,
    DataPointLogger,
};
use strum::IntoEnumIterator;

use crate::{
    arbitration,
    converter::{ChannelConverter, ConverterError},
    fault::FaultLatch,
    indicator::FaultIndicator,
    silprintln, ALERT_RATE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TcuError {
    InvalidConverter {
        channel: ThrottleChannel,
        error: ConverterError,
    },
}

/// The three per-channel converters, validated together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TcuConverters {
    forward: ChannelConverter,
    reverse: ChannelConverter,
    regen: ChannelConverter,
}

impl TcuConverters {
    pub fn new(config: &TcuConfig) -> Result<Self, TcuError> {
        Ok(Self {
            forward: build_converter(config, ThrottleChannel::Forward)?,
            reverse: build_converter(config, ThrottleChannel::Reverse)?,
            regen: build_converter(config, ThrottleChannel::Regen)?,
        })
    }

    pub fn get(&self, channel: ThrottleChannel) -> &ChannelConverter {
        match channel {
            ThrottleChannel::Forward => &self.forward,
            ThrottleChannel::Reverse => &self.reverse,
            ThrottleChannel::Regen => &self.regen,
        }
    }

    pub fn convert(&self, channel: ThrottleChannel, input_ratio: f32) -> f32 {
        self.get(channel).convert(input_ratio)
    }
}

fn build_converter(config: &TcuConfig, channel: ThrottleChannel) -> Result<ChannelConverter, TcuError> {
    ChannelConverter::new(*config.converter(channel))
        .map_err(|error| TcuError::InvalidConverter { channel, error })
}

/// Hardware bindings handed to the controller at construction.
pub struct TcuChannels<'a> {
    pub forward_input: &'a mut dyn InputChannel,
    pub reverse_input: &'a mut dyn InputChannel,
    pub regen_input: &'a mut dyn InputChannel,
    pub drive_output: &'a mut dyn OutputChannel<f32>,
    pub direction_output: &'a mut dyn OutputChannel<Direction>,
    pub regen_output: &'a mut dyn OutputChannel<f32>,
    pub fault_led: Option<&'a mut dyn OutputChannel<bool>>,
}

impl<'a> TcuChannels<'a> {
    pub fn sample(&mut self) -> RawInputs {
        RawInputs {
            forward: self.forward_input.sample(),
            reverse: self.reverse_input.sample(),
            regen: self.regen_input.sample(),
        }
    }

    /// Zeroes the channel being released before commanding the active one.
    /// The drive output is also zeroed ahead of any direction change, so the
    /// previous drive level never reaches the motor in the new direction.
    fn apply(&mut self, mode: SystemMode, command: &OutputCommand, last_direction: Direction) {
        if last_direction != command.direction {
            self.drive_output.apply(0.0);
        }

        if mode == SystemMode::Regen {
            self.drive_output.apply(command.drive_ratio);
            self.direction_output.apply(command.direction);
            self.regen_output.apply(command.regen_ratio);
        } else {
            self.regen_output.apply(command.regen_ratio);
            self.direction_output.apply(command.direction);
            self.drive_output.apply(command.drive_ratio);
        }
    }
}

/// Outcome of one arbitration cycle. `command` is `None` when nothing
/// should be written to the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub mode: SystemMode,
    pub command: Option<OutputCommand>,
}

pub struct Tcu<'a> {
    config: TcuConfig,
    converters: TcuConverters,
    fault_latch: FaultLatch,
    pub channels: TcuChannels<'a>,
    pub data_logger: Option<&'a mut dyn DataPointLogger<TcuDebugInfo>>,
    pub last_telemetry_frame: Option<TcuTelemetryFrame>,
    pub(crate) alert_manager: AlertManager<TcuAlertCondition>,
    pub(crate) last_inputs: RawInputs,
    pub(crate) last_cycle: Option<CycleResult>,
    fault_indicator: FaultIndicator,
    telemetry_timer: LoopTimer<f32>,
    readout_timer: LoopTimer<f32>,
    last_alert_report: Option<AlertBitmaskType>,
    last_direction: Direction,
    uptime_us: u64,
}

impl<'a> Tcu<'a> {
    pub fn new(
        config: TcuConfig,
        channels: TcuChannels<'a>,
        data_logger: Option<&'a mut dyn DataPointLogger<TcuDebugInfo>>,
    ) -> Result<Self, TcuError> {
        let converters = TcuConverters::new(&config)?;

        let mut tcu = Self {
            telemetry_timer: LoopTimer::new(config.telemetry_rate_s),
            readout_timer: LoopTimer::new(config.calibration_readout_rate_s),
            config,
            converters,
            fault_latch: FaultLatch::new(),
            channels,
            data_logger,
            last_telemetry_frame: None,
            alert_manager: AlertManager::new(ALERT_RATE),
            last_inputs: RawInputs::default(),
            last_cycle: None,
            fault_indicator: FaultIndicator::new(),
            last_alert_report: None,
            // The reverse signal powers up commanding forward
            last_direction: Direction::Forward,
            uptime_us: 0,
        };

        tcu.sync_logging_enabled();

        Ok(tcu)
    }

    /// One control cycle: sample, arbitrate, write outputs, drive the indicator.
    /// Once the fault is latched only the indicator, alerts and telemetry run.
    pub fn update(&mut self, dt: f32) {
        self.uptime_us = self.uptime_us.saturating_add((dt * 1e6).round() as u64);

        match self.config.run_mode {
            _ if self.fault_latch.is_latched() => {
                self.last_cycle = Some(CycleResult {
                    mode: SystemMode::Fault,
                    command: None,
                });
            }
            RunMode::Normal => {
                self.last_inputs = self.channels.sample();

                let result = self.step(self.last_inputs);
                if let Some(command) = result.command {
                    self.channels.apply(result.mode, &command, self.last_direction);
                    self.last_direction = command.direction;
                }
                self.last_cycle = Some(result);
            }
            RunMode::Calibration => {
                self.last_inputs = self.channels.sample();
                if self.readout_timer.should_update(dt) {
                    let readout = self.generate_debug_info(TcuDebugInfoVariant::CalibrationReadout);
                    self.log_debug_info(&readout);
                    self.flush_data_logger();
                }
            }
        }

        let led_on = self.fault_indicator.update(dt, self.fault_latch.is_latched());
        if let Some(fault_led) = self.channels.fault_led.as_mut() {
            fault_led.apply(led_on);
        }

        self.update_alert_watchdog();
        if let Some(bitmask) = self.alert_manager.update(dt) {
            if self.last_alert_report != Some(bitmask) {
                silprintln!("TCU: Alert conditions changed: {:#b}", bitmask);
            }
            self.last_alert_report = Some(bitmask);
        }

        if self.telemetry_timer.should_update(dt) {
            self.last_telemetry_frame = Some(self.generate_telemetry_frame());

            if self.config.debug_info_enabled {
                for variant in TcuDebugInfoVariant::iter() {
                    if variant != TcuDebugInfoVariant::CalibrationReadout {
                        let debug_info = self.generate_debug_info(variant);
                        self.log_debug_info(&debug_info);
                    }
                }
                self.flush_data_logger();
            }
        }
    }

    /// Arbitration core without any I/O. Latches the fault flag on dual
    /// throttle input and reports what should be written this cycle.
    pub fn step(&mut self, inputs: RawInputs) -> CycleResult {
        if self.fault_latch.is_latched() {
            return CycleResult {
                mode: SystemMode::Fault,
                command: None,
            };
        }

        let mode = arbitration::select_mode(&inputs, self.config.idle_behavior);

        if mode == SystemMode::Fault {
            self.fault_latch.latch(FaultCause::DualThrottleInput);
            silprintln!(
                "TCU: Fault latched, forward {} and reverse {} both engaged",
                inputs.forward,
                inputs.reverse
            );

            let command = match self.config.fault_response {
                FaultResponse::ForceSafe => Some(OutputCommand::safe()),
                FaultResponse::HoldOutputs => None,
            };

            return CycleResult { mode, command };
        }

        CycleResult {
            mode,
            command: arbitration::command_for_mode(mode, &inputs, &self.converters),
        }
    }

    /// Runs one channel's transfer function without touching arbitration or outputs.
    pub fn convert(&self, channel: ThrottleChannel, input_ratio: f32) -> f32 {
        self.converters.convert(channel, input_ratio)
    }

    pub fn generate_telemetry_frame(&self) -> TcuTelemetryFrame {
        TcuTelemetryFrame {
            timestamp: self.timestamp_ms(),
            run_mode: self.config.run_mode,
            mode: self.last_cycle.map(|cycle| cycle.mode),
            inputs: self.last_inputs,
            command: self.last_cycle.and_then(|cycle| cycle.command),
            fault_cause: self.fault_latch.cause(),
            alert_bitmask: self.alert_manager.bitmask(),
        }
    }

    /// Swaps in a new configuration. On error the old one stays active.
    pub fn configure_tcu(&mut self, config: TcuConfig) -> Result<(), TcuError> {
        let converters = TcuConverters::new(&config)?;
        let run_mode_changed = config.run_mode != self.config.run_mode;

        self.converters = converters;
        self.telemetry_timer.set_interval(config.telemetry_rate_s);
        self.readout_timer.set_interval(config.calibration_readout_rate_s);
        self.config = config;
        silprintln!("TCU: Configured: {:?}", self.config);

        if run_mode_changed {
            self.on_run_mode_changed();
        }
        self.sync_logging_enabled();

        Ok(())
    }

    pub fn set_run_mode(&mut self, run_mode: RunMode) {
        if self.config.run_mode != run_mode {
            self.config.run_mode = run_mode;
            self.on_run_mode_changed();
        }
    }

    pub fn config(&self) -> &TcuConfig {
        &self.config
    }

    pub fn converters(&self) -> &TcuConverters {
        &self.converters
    }

    pub fn run_mode(&self) -> RunMode {
        self.config.run_mode
    }

    pub fn fault_latched(&self) -> bool {
        self.fault_latch.is_latched()
    }

    pub fn fault_cause(&self) -> Option<FaultCause> {
        self.fault_latch.cause()
    }

    pub fn fault_led_on(&self) -> bool {
        self.fault_indicator.led_on()
    }

    pub fn last_inputs(&self) -> RawInputs {
        self.last_inputs
    }

    pub fn last_cycle(&self) -> Option<CycleResult> {
        self.last_cycle
    }

    /// Seconds since construction, summed from the `dt` of every update.
    pub fn uptime(&self) -> f64 {
        self.uptime_us as f64 * 1e-6
    }

    pub(crate) fn timestamp_ms(&self) -> u64 {
        self.uptime_us / 1000
    }

    fn on_run_mode_changed(&mut self) {
        silprintln!("TCU: Run mode is now {:?}", self.config.run_mode);
        self.readout_timer.reset();
        self.last_cycle = None;
        self.sync_logging_enabled();
    }

    /// Calibration readouts and debug info are the only things logged.
    fn sync_logging_enabled(&mut self) {
        let enabled = self.config.run_mode == RunMode::Calibration || self.config.debug_info_enabled;

        if let Some(logger) = self.data_logger.as_mut() {
            logger.set_logging_enabled(enabled);
        }
    }

    fn log_debug_info(&mut self, debug_info: &TcuDebugInfo) {
        if let Some(logger) = self.data_logger.as_mut() {
            logger.log_data_point(debug_info);
        }
    }

    fn flush_data_logger(&mut self) {
        if let Some(logger) = self.data_logger.as_mut() {
            logger.flush();
        }
    }
}

// The firmware moves the controller into an RTIC shared resource once, at init
#[allow(unsafe_code)]
unsafe impl Send for Tcu<'_> {}
