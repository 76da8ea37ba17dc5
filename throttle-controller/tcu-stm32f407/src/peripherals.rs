use core::sync::atomic::Ordering;

use crate::{app, tcu_driver::ADC_COUNTS};
use stm32f4xx_hal::{
    adc::Adc,
    dma::{PeripheralToMemory, Stream0, Transfer},
    pac::{ADC1, DMA2},
};

pub const ADC_SCAN_LEN: usize = 3;

pub struct ADCStorage {
    pub adc1_transfer:
        Transfer<Stream0<DMA2>, 0, Adc<ADC1>, PeripheralToMemory, &'static mut [u16; ADC_SCAN_LEN]>,
    pub adc1_buffer: Option<&'static mut [u16; ADC_SCAN_LEN]>,
}

/// Scan order is forward, reverse, regen, matching `ThrottleChannel` indices.
pub fn adc_dma(ctx: app::adc_dma::Context) {
    let storage = ctx.local.adc;

    let Some(next_buffer) = storage.adc1_buffer.take() else {
        return;
    };

    let adc1_buffer = match storage.adc1_transfer.next_transfer(next_buffer) {
        Ok((buffer, _)) => buffer,
        Err(_) => {
            // Buffer is gone with the failed transfer, read every pedal as released from here on
            for counts in ADC_COUNTS.iter() {
                counts.store(0, Ordering::Relaxed);
            }
            defmt::error!("ADC1 DMA transfer error, pedal inputs disabled");
            return;
        }
    };

    for (counts, sample) in ADC_COUNTS.iter().zip(adc1_buffer.iter()) {
        counts.store(*sample, Ordering::Relaxed);
    }

    storage.adc1_buffer = Some(adc1_buffer);
    storage.adc1_transfer.start(|adc| adc.start_conversion());
}
