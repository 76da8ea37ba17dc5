use stm32f4xx_hal::i2c;

/// Write DAC register, no EEPROM, normal power mode.
const CMD_WRITE_DAC: u8 = 0x40;
const MAX_CODE: u16 = 0x0FFF;

pub const THROTTLE_DAC_ADDR: u8 = 0x60;
pub const REGEN_DAC_ADDR: u8 = 0x61;

pub struct Mcp4725 {
    addr: u8,
    last_code: Option<u16>,
}

impl Mcp4725 {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            last_code: None,
        }
    }

    pub fn set_code<I2Cx: i2c::Instance, PINS>(
        &mut self,
        i2c: &mut i2c::I2c<I2Cx, PINS>,
        code: u16,
    ) -> Result<(), i2c::Error> {
        let code = code.min(MAX_CODE);

        // 12-bit code, upper 8 bits first then the low nibble left aligned
        i2c.write(self.addr, &[CMD_WRITE_DAC, (code >> 4) as u8, ((code & 0x0F) << 4) as u8])?;
        self.last_code = Some(code);

        Ok(())
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn last_code(&self) -> Option<u16> {
        self.last_code
    }
}
