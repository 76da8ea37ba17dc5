#![no_main]
#![no_std]

mod drivers;
mod peripherals;
pub mod tcu_driver;

use core::panic::PanicInfo;
use cortex_m_rt::{exception, ExceptionFrame};
use defmt_rtt as _;
use stm32f4xx_hal::{pac, prelude::*};

pub(crate) const TCU_UPDATE_PERIOD_S: f32 = 0.001;

#[rtic::app(device = stm32f4xx_hal::pac, dispatchers = [EXTI0, EXTI1])]
mod app {
    use crate::drivers::mcp4725::{REGEN_DAC_ADDR, THROTTLE_DAC_ADDR};
    use crate::peripherals::{adc_dma, ADCStorage, ADC_SCAN_LEN};
    use crate::tcu_driver::{
        serial_drain, tcu_update, AdcInput, DacOutput, FaultLed, I2C1Type, ReverseSignalPin,
        SerialConsumer, SerialQueue, SerialSink,
    };
    use core::{cell::RefCell, mem::MaybeUninit};
    use shared::{
        tcu_hal::{TcuConfig, TcuDebugInfo, ThrottleChannel},
        DataPointLogger, SerialFrameLogger,
    };
    use stm32f4xx_hal::{
        adc::{
            config::{AdcConfig, Clock, Dma, Resolution, SampleTime, Scan, Sequence},
            Adc,
        },
        dma::{config::DmaConfig, StreamsTuple, Transfer},
        gpio::PinState,
        prelude::*,
        pac::USART2,
        serial::{self, Serial, Tx},
    };
    use systick_monotonic::Systick;
    use tcu_rs::{Tcu, TcuChannels};

    const CRYSTAL_FREQ: u32 = 25_000_000;
    const MCU_FREQ: u32 = 84_000_000;
    const PCLK1_FREQ: u32 = 42_000_000;
    const PCLK2_FREQ: u32 = 84_000_000;

    const SERIAL_PAGE_SIZE: usize = 64;

    type DebugLoggerType = SerialFrameLogger<TcuDebugInfo, SerialSink, SERIAL_PAGE_SIZE>;

    #[local]
    struct Local {
        adc: ADCStorage,
        serial_tx: Tx<USART2>,
        serial_consumer: SerialConsumer,
    }

    #[shared]
    struct Shared {
        tcu: Tcu<'static>,
    }

    extern "Rust" {
        #[task(
            shared = [tcu],
            local = [],
            capacity = 8,
            priority = 7,
        )]
        fn tcu_update(mut ctx: tcu_update::Context);

        #[task(
            local = [serial_tx, serial_consumer],
            priority = 1,
        )]
        fn serial_drain(ctx: serial_drain::Context);

        #[task(binds = DMA2_STREAM0,
            local = [adc],
            priority = 10
        )]
        fn adc_dma(ctx: adc_dma::Context);
    }

    #[monotonic(binds = SysTick, default = true)]
    type Monotonic = Systick<1000>;

    #[init(local = [
        i2c1_bus: MaybeUninit<RefCell<I2C1Type>> = MaybeUninit::uninit(),
        forward_input: MaybeUninit<AdcInput> = MaybeUninit::uninit(),
        reverse_input: MaybeUninit<AdcInput> = MaybeUninit::uninit(),
        regen_input: MaybeUninit<AdcInput> = MaybeUninit::uninit(),
        throttle_dac: MaybeUninit<DacOutput> = MaybeUninit::uninit(),
        regen_dac: MaybeUninit<DacOutput> = MaybeUninit::uninit(),
        reverse_signal: MaybeUninit<ReverseSignalPin> = MaybeUninit::uninit(),
        fault_led: MaybeUninit<FaultLed> = MaybeUninit::uninit(),
        debug_logger: MaybeUninit<DebugLoggerType> = MaybeUninit::uninit(),
        serial_queue: SerialQueue = SerialQueue::new(),
    ])]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        let core = ctx.core;
        let p = ctx.device;

        let rcc = p.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(CRYSTAL_FREQ.Hz())
            .sysclk(MCU_FREQ.Hz())
            .hclk(MCU_FREQ.Hz())
            .pclk1(PCLK1_FREQ.Hz())
            .pclk2(PCLK2_FREQ.Hz())
            .freeze();

        let mono = Systick::new(core.SYST, clocks.hclk().raw());

        let gpioa = p.GPIOA.split();
        let gpiob = p.GPIOB.split();
        let gpiod = p.GPIOD.split();
        let gpioe = p.GPIOE.split();

        // Reverse signal is active low, start out commanding forward
        let reverse_signal = gpioe.pe2.into_push_pull_output_in_state(PinState::High);
        let fault_led = gpioe.pe5.into_push_pull_output_in_state(PinState::Low);

        let forward_pot = gpioa.pa1.into_analog();
        let reverse_pot = gpioa.pa2.into_analog();
        let regen_pot = gpioa.pa3.into_analog();

        let i2c1_scl = gpiob.pb6.into_alternate_open_drain();
        let i2c1_sda = gpiob.pb7.into_alternate_open_drain();

        let usart2_tx = gpiod.pd5.into_alternate();
        let usart2_rx = gpiod.pd6.into_alternate();

        let dma2 = StreamsTuple::new(p.DMA2);

        let adc_config = AdcConfig::default()
            .clock(Clock::Pclk2_div_4)
            .resolution(Resolution::Ten)
            .dma(Dma::Continuous)
            .scan(Scan::Enabled);

        let mut adc1 = Adc::adc1(p.ADC1, true, adc_config);
        adc1.configure_channel(&forward_pot, Sequence::One, SampleTime::Cycles_480);
        adc1.configure_channel(&reverse_pot, Sequence::Two, SampleTime::Cycles_480);
        adc1.configure_channel(&regen_pot, Sequence::Three, SampleTime::Cycles_480);

        let adc1_buffer1 = cortex_m::singleton!(: [u16; ADC_SCAN_LEN] = [0; ADC_SCAN_LEN]).unwrap();
        let adc1_buffer2 = Some(cortex_m::singleton!(: [u16; ADC_SCAN_LEN] = [0; ADC_SCAN_LEN]).unwrap());

        let dma_config = DmaConfig::default()
            .transfer_complete_interrupt(true)
            .memory_increment(true)
            .double_buffer(false);

        let mut adc1_transfer =
            Transfer::init_peripheral_to_memory(dma2.0, adc1, adc1_buffer1, None, dma_config);

        let i2c1_bus: &'static RefCell<I2C1Type> = ctx.local.i2c1_bus.write(RefCell::new(p.I2C1.i2c(
            (i2c1_scl, i2c1_sda),
            400.kHz(),
            &clocks,
        )));

        let usart2 = Serial::new(
            p.USART2,
            (usart2_tx, usart2_rx),
            serial::config::Config::default().baudrate(115_200.bps()),
            &clocks,
        ).unwrap().with_u8_data();
        let (usart2_tx, _usart2_rx) = usart2.split();
        let (serial_producer, serial_consumer) = ctx.local.serial_queue.split();

        let forward_input = ctx.local.forward_input.write(AdcInput::new(ThrottleChannel::Forward));
        let reverse_input = ctx.local.reverse_input.write(AdcInput::new(ThrottleChannel::Reverse));
        let regen_input = ctx.local.regen_input.write(AdcInput::new(ThrottleChannel::Regen));
        let throttle_dac = ctx.local.throttle_dac.write(DacOutput::new(THROTTLE_DAC_ADDR, i2c1_bus));
        let regen_dac = ctx.local.regen_dac.write(DacOutput::new(REGEN_DAC_ADDR, i2c1_bus));
        let reverse_signal = ctx.local.reverse_signal.write(ReverseSignalPin::new(reverse_signal));
        let fault_led = ctx.local.fault_led.write(FaultLed::new(fault_led));
        let debug_logger: &'static mut dyn DataPointLogger<TcuDebugInfo> = ctx.local.debug_logger.write(
            SerialFrameLogger::new(SerialSink::new(serial_producer)),
        );

        let channels = TcuChannels {
            forward_input,
            reverse_input,
            regen_input,
            drive_output: throttle_dac,
            direction_output: reverse_signal,
            regen_output: regen_dac,
            fault_led: Some(fault_led),
        };

        let tcu = match Tcu::new(TcuConfig::default(), channels, Some(debug_logger)) {
            Ok(tcu) => tcu,
            Err(err) => panic!("Invalid TCU config: {:?}", err),
        };

        adc1_transfer.start(|adc| adc.start_conversion());
        tcu_update::spawn().unwrap();
        serial_drain::spawn().unwrap();

        defmt::info!("TCU init complete");

        (
            Shared { tcu },
            Local {
                adc: ADCStorage {
                    adc1_transfer,
                    adc1_buffer: adc1_buffer2,
                },
                serial_tx: usart2_tx,
                serial_consumer,
            },
            init::Monotonics(mono),
        )
    }
}

#[exception]
unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
    panic!("{:?}", ef);
}

#[panic_handler]
fn fault_led_panic(_: &PanicInfo) -> ! {
    let dp = unsafe { pac::Peripherals::steal() };
    let gpioe = dp.GPIOE.split();
    let mut fault_led = gpioe.pe5.into_push_pull_output();

    loop {
        fault_led.set_low();
        cortex_m::asm::delay(3_000_000);
        fault_led.set_high();
        cortex_m::asm::delay(3_000_000);
    }
}
