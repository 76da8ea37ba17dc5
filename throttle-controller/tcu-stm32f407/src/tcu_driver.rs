use core::{
    cell::RefCell,
    sync::atomic::{AtomicU16, Ordering},
};

use embedded_hal::blocking::serial::Write;
use heapless::spsc::{Consumer, Producer, Queue};
use rtic::Mutex;
use shared::{
    tcu_hal::{
        AnalogInputConfig, DacOutputConfig, Direction, DirectionOutputConfig, InputChannel,
        OutputChannel, ThrottleChannel,
    },
    FrameSink,
};
use stm32f4xx_hal::{
    gpio::{self, Alternate, Output, Pin, PE2, PE5},
    i2c::I2c,
    pac::{I2C1, USART2},
    prelude::*,
    serial,
};
use strum::EnumCount;

use crate::{app, drivers::mcp4725::Mcp4725};

pub type I2C1Type = I2c<I2C1, (Pin<'B', 6, Alternate<4, gpio::OpenDrain>>, Pin<'B', 7, Alternate<4, gpio::OpenDrain>>)>;

/// Latest ADC1 scan, written by the DMA interrupt and read by the control loop.
pub static ADC_COUNTS: [AtomicU16; ThrottleChannel::COUNT] =
    [AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0)];

pub struct AdcInput {
    channel: ThrottleChannel,
    config: AnalogInputConfig,
}

impl AdcInput {
    pub fn new(channel: ThrottleChannel) -> Self {
        Self {
            channel,
            config: AnalogInputConfig::for_channel(channel),
        }
    }
}

impl InputChannel for AdcInput {
    fn sample(&mut self) -> f32 {
        let counts = ADC_COUNTS[self.channel.index()].load(Ordering::Relaxed);
        self.config.apply(counts)
    }
}

pub struct DacOutput {
    dac: Mcp4725,
    bus: &'static RefCell<I2C1Type>,
    config: DacOutputConfig,
}

impl DacOutput {
    pub fn new(addr: u8, bus: &'static RefCell<I2C1Type>) -> Self {
        Self {
            dac: Mcp4725::new(addr),
            bus,
            config: DacOutputConfig::default(),
        }
    }
}

impl OutputChannel<f32> for DacOutput {
    fn apply(&mut self, ratio: f32) {
        let code = self.config.apply(ratio);

        // Skip the bus transaction when nothing changed
        if self.dac.last_code() == Some(code) {
            return;
        }

        if let Err(err) = self.dac.set_code(&mut self.bus.borrow_mut(), code) {
            defmt::error!(
                "MCP4725 {=u8:#x} write failed: {}",
                self.dac.addr(),
                defmt::Debug2Format(&err)
            );
        }
    }
}

pub struct ReverseSignalPin {
    pin: PE2<Output>,
    config: DirectionOutputConfig,
}

impl ReverseSignalPin {
    pub fn new(pin: PE2<Output>) -> Self {
        Self {
            pin,
            config: DirectionOutputConfig::default(),
        }
    }
}

impl OutputChannel<Direction> for ReverseSignalPin {
    fn apply(&mut self, direction: Direction) {
        if self.config.apply(direction) {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

pub struct FaultLed {
    pin: PE5<Output>,
}

impl FaultLed {
    pub fn new(pin: PE5<Output>) -> Self {
        Self { pin }
    }
}

impl OutputChannel<bool> for FaultLed {
    fn apply(&mut self, on: bool) {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

pub const SERIAL_QUEUE_LEN: usize = 1024;

pub type SerialQueue = Queue<u8, SERIAL_QUEUE_LEN>;
pub type SerialConsumer = Consumer<'static, u8, SERIAL_QUEUE_LEN>;

/// Queues calibration readouts and debug info frames for `serial_drain`.
/// Never touches the UART, so it is safe to call from the control loop.
pub struct SerialSink {
    producer: Producer<'static, u8, SERIAL_QUEUE_LEN>,
    dropped_pages: u32,
}

impl SerialSink {
    pub fn new(producer: Producer<'static, u8, SERIAL_QUEUE_LEN>) -> Self {
        Self {
            producer,
            dropped_pages: 0,
        }
    }
}

impl FrameSink for SerialSink {
    fn write_page(&mut self, page: &[u8]) {
        // Whole pages only, a cut frame would desync the COBS stream
        if self.producer.capacity() - self.producer.len() < page.len() {
            self.dropped_pages += 1;
            defmt::warn!(
                "Serial queue full, dropped {} byte page ({} total)",
                page.len(),
                self.dropped_pages
            );
            return;
        }

        for &byte in page {
            // Room was checked above
            let _ = self.producer.enqueue(byte);
        }
    }
}

/// Lowest priority task, preempted by the control loop while it blocks on the UART.
pub fn serial_drain(ctx: app::serial_drain::Context) {
    app::serial_drain::spawn_after(1.millis().into()).unwrap();

    let tx: &mut serial::Tx<USART2> = ctx.local.serial_tx;
    let consumer: &mut SerialConsumer = ctx.local.serial_consumer;

    while let Some(byte) = consumer.dequeue() {
        if tx.bwrite_all(&[byte]).is_err() {
            defmt::warn!("Serial diagnostics write failed");
        }
    }
}

pub fn tcu_update(mut ctx: app::tcu_update::Context) {
    app::tcu_update::spawn_after(1.millis().into()).unwrap();

    ctx.shared.tcu.lock(|tcu| {
        tcu.update(crate::TCU_UPDATE_PERIOD_S);
    });
}
