use core::cell::Cell;

use crate::tcu_hal::{Direction, InputChannel, OutputChannel, RawInputs};

/// Records what the controller last wrote to an output and how many times.
#[derive(Debug, Default)]
pub struct OutputRecord<T: Copy> {
    last_command: Cell<Option<T>>,
    writes: Cell<u32>,
}

impl<T: Copy> OutputRecord<T> {
    pub fn new() -> Self {
        Self {
            last_command: Cell::new(None),
            writes: Cell::new(0),
        }
    }

    pub fn last(&self) -> Option<T> {
        self.last_command.get()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

pub struct InputChannelMock<'a> {
    value: &'a Cell<f32>,
}

impl InputChannel for InputChannelMock<'_> {
    fn sample(&mut self) -> f32 {
        self.value.get()
    }
}

pub struct OutputChannelMock<'a, T: Copy> {
    record: &'a OutputRecord<T>,
}

impl<T: Copy> OutputChannel<T> for OutputChannelMock<'_, T> {
    fn apply(&mut self, command: T) {
        self.record.last_command.set(Some(command));
        self.record.writes.set(self.record.writes.get() + 1);
    }
}

/// Stand-in for the pedal pots, DACs, reverse pin and fault LED. Inputs can be
/// changed between cycles while the controller holds the channel mocks.
#[derive(Debug, Default)]
pub struct TcuHardwareMock {
    pub forward: Cell<f32>,
    pub reverse: Cell<f32>,
    pub regen: Cell<f32>,
    pub drive_output: OutputRecord<f32>,
    pub direction_output: OutputRecord<Direction>,
    pub regen_output: OutputRecord<f32>,
    pub fault_led: OutputRecord<bool>,
}

pub struct TcuChannelMocks<'a> {
    pub forward: InputChannelMock<'a>,
    pub reverse: InputChannelMock<'a>,
    pub regen: InputChannelMock<'a>,
    pub drive_output: OutputChannelMock<'a, f32>,
    pub direction_output: OutputChannelMock<'a, Direction>,
    pub regen_output: OutputChannelMock<'a, f32>,
    pub fault_led: OutputChannelMock<'a, bool>,
}

impl TcuHardwareMock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_inputs(&self, inputs: RawInputs) {
        self.forward.set(inputs.forward);
        self.reverse.set(inputs.reverse);
        self.regen.set(inputs.regen);
    }

    pub fn output_writes(&self) -> u32 {
        self.drive_output.writes() + self.direction_output.writes() + self.regen_output.writes()
    }

    pub fn channels(&self) -> TcuChannelMocks<'_> {
        TcuChannelMocks {
            forward: InputChannelMock { value: &self.forward },
            reverse: InputChannelMock { value: &self.reverse },
            regen: InputChannelMock { value: &self.regen },
            drive_output: OutputChannelMock { record: &self.drive_output },
            direction_output: OutputChannelMock { record: &self.direction_output },
            regen_output: OutputChannelMock { record: &self.regen_output },
            fault_led: OutputChannelMock { record: &self.fault_led },
        }
    }
}
