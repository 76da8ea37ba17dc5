use std::cell::Cell;

use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use shared::tcu_hal::{
    AnalogInputConfig, DacOutputConfig, Direction, DirectionOutputConfig, InputChannel,
    OutputChannel, RawInputs, ThrottleChannel,
};
use tcu_rs::TcuChannels;

use crate::SilError;

/// Gaussian noise added to every pedal position before quantization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub std_dev: f32,
    pub seed: u64,
}

/// Pedal pot feeding a 10-bit ADC channel.
pub struct AdcInputSim<'a> {
    position: &'a Cell<f32>,
    counts: &'a Cell<u16>,
    config: AnalogInputConfig,
    noise: Option<(Normal<f32>, StdRng)>,
}

impl<'a> AdcInputSim<'a> {
    pub fn new(
        position: &'a Cell<f32>,
        counts: &'a Cell<u16>,
        config: AnalogInputConfig,
        noise: Option<NoiseConfig>,
    ) -> Result<Self, SilError> {
        let noise = match noise {
            Some(noise) => {
                let distribution =
                    Normal::new(0.0, noise.std_dev).map_err(|_| SilError::InvalidNoise)?;
                Some((distribution, StdRng::seed_from_u64(noise.seed)))
            }
            None => None,
        };

        Ok(Self {
            position,
            counts,
            config,
            noise,
        })
    }
}

impl InputChannel for AdcInputSim<'_> {
    fn sample(&mut self) -> f32 {
        let mut position = self.position.get();
        if let Some((distribution, rng)) = self.noise.as_mut() {
            position += distribution.sample(rng);
        }

        let full_scale = self.config.full_scale_counts as f32;
        let counts = (position.clamp(0.0, 1.0) * full_scale).round() as u16;
        self.counts.set(counts);

        self.config.apply(counts)
    }
}

/// MCP4725 stand-in. Keeps the last 12-bit code written.
pub struct DacOutputSim<'a> {
    code: &'a Cell<u16>,
    writes: &'a Cell<u32>,
    config: DacOutputConfig,
}

impl OutputChannel<f32> for DacOutputSim<'_> {
    fn apply(&mut self, ratio: f32) {
        self.code.set(self.config.apply(ratio));
        self.writes.set(self.writes.get() + 1);
    }
}

pub struct DirectionOutputSim<'a> {
    level: &'a Cell<bool>,
    config: DirectionOutputConfig,
}

impl OutputChannel<Direction> for DirectionOutputSim<'_> {
    fn apply(&mut self, direction: Direction) {
        self.level.set(self.config.apply(direction));
    }
}

pub struct LedSim<'a> {
    state: &'a Cell<bool>,
}

impl OutputChannel<bool> for LedSim<'_> {
    fn apply(&mut self, on: bool) {
        self.state.set(on);
    }
}

/// Simulated board state. Pedal positions go in, pin levels and DAC codes
/// come out. Everything is a `Cell` so the harness can poke at it while the
/// controller holds the channel bindings.
#[derive(Debug, Default)]
pub struct SilHardware {
    pub forward_position: Cell<f32>,
    pub reverse_position: Cell<f32>,
    pub regen_position: Cell<f32>,
    pub forward_counts: Cell<u16>,
    pub reverse_counts: Cell<u16>,
    pub regen_counts: Cell<u16>,
    pub throttle_dac_code: Cell<u16>,
    pub regen_dac_code: Cell<u16>,
    pub dac_writes: Cell<u32>,
    pub reverse_pin: Cell<bool>,
    pub fault_led: Cell<bool>,
}

pub struct SilChannels<'a> {
    pub forward: AdcInputSim<'a>,
    pub reverse: AdcInputSim<'a>,
    pub regen: AdcInputSim<'a>,
    pub throttle_dac: DacOutputSim<'a>,
    pub regen_dac: DacOutputSim<'a>,
    pub reverse_signal: DirectionOutputSim<'a>,
    pub fault_led: LedSim<'a>,
}

impl SilHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pedals(&self, pedals: RawInputs) {
        self.forward_position.set(pedals.forward);
        self.reverse_position.set(pedals.reverse);
        self.regen_position.set(pedals.regen);
    }

    pub fn adc_counts(&self) -> [u16; 3] {
        [
            self.forward_counts.get(),
            self.reverse_counts.get(),
            self.regen_counts.get(),
        ]
    }

    /// Builds the channel bindings. Each pot gets its own noise stream
    /// derived from the configured seed.
    pub fn channels(&self, noise: Option<NoiseConfig>) -> Result<SilChannels<'_>, SilError> {
        let channel_noise = |channel: ThrottleChannel| {
            noise.map(|noise| NoiseConfig {
                seed: noise.seed.wrapping_add(channel.index() as u64),
                ..noise
            })
        };

        Ok(SilChannels {
            forward: AdcInputSim::new(
                &self.forward_position,
                &self.forward_counts,
                AnalogInputConfig::for_channel(ThrottleChannel::Forward),
                channel_noise(ThrottleChannel::Forward),
            )?,
            reverse: AdcInputSim::new(
                &self.reverse_position,
                &self.reverse_counts,
                AnalogInputConfig::for_channel(ThrottleChannel::Reverse),
                channel_noise(ThrottleChannel::Reverse),
            )?,
            regen: AdcInputSim::new(
                &self.regen_position,
                &self.regen_counts,
                AnalogInputConfig::for_channel(ThrottleChannel::Regen),
                channel_noise(ThrottleChannel::Regen),
            )?,
            throttle_dac: DacOutputSim {
                code: &self.throttle_dac_code,
                writes: &self.dac_writes,
                config: DacOutputConfig::default(),
            },
            regen_dac: DacOutputSim {
                code: &self.regen_dac_code,
                writes: &self.dac_writes,
                config: DacOutputConfig::default(),
            },
            reverse_signal: DirectionOutputSim {
                level: &self.reverse_pin,
                config: DirectionOutputConfig::default(),
            },
            fault_led: LedSim {
                state: &self.fault_led,
            },
        })
    }
}

impl<'a> SilChannels<'a> {
    pub fn tcu_channels(&mut self) -> TcuChannels<'_> {
        TcuChannels {
            forward_input: &mut self.forward,
            reverse_input: &mut self.reverse,
            regen_input: &mut self.regen,
            drive_output: &mut self.throttle_dac,
            direction_output: &mut self.reverse_signal,
            regen_output: &mut self.regen_dac,
            fault_led: Some(&mut self.fault_led),
        }
    }
}
