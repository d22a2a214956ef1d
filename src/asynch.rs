//! Async API
//!
//! This module contains the async API for the OPT3001 sensor. It mirrors the
//! blocking [`crate::Opt3001`] on top of the `embedded-hal-async` traits.
//!
//! Unlike the blocking traits, the async I2C error exposes its kind, so a
//! missing acknowledge is reported as [`Opt3001Error::NoAcknowledge`].

use embedded_hal_async::i2c::{Error as _, ErrorKind};

use crate::{
    lux_to_raw, raw_to_lux, Configuration, ConversionTime, DeviceAddr, FaultCount, LatchMode,
    Mode, Opt3001Error, Polarity, Range, Register, Result, DEFAULT_CONFIGURATION,
    POLL_INTERVAL_MS,
};

/// Represents an I2C-connected OPT3001 sensor, driven through async I2C.
#[derive(Copy, Clone, Debug)]
pub struct Opt3001<I2C, D> {
    /// Marker to satisfy the compiler.
    _delay: core::marker::PhantomData<D>,

    /// I2C Interface for communcating with the sensor.
    _i2c: core::marker::PhantomData<I2C>,

    /// Bus address of this sensor.
    address: DeviceAddr,
}

impl<I2C, D> Opt3001<I2C, D>
where
    D: embedded_hal_async::delay::DelayNs,
    I2C: embedded_hal_async::i2c::I2c<embedded_hal_async::i2c::SevenBitAddress>,
{
    /// Creates a connection with an OPT3001 sensor via I2C.
    ///
    /// This writes the default configuration, see [`Opt3001::initialize`].
    pub async fn new(address: DeviceAddr, i2c: &mut I2C) -> Result<Self> {
        let sensor = Self {
            _delay: core::marker::PhantomData,
            _i2c: core::marker::PhantomData,
            address,
        };
        sensor.initialize(i2c).await?;

        Ok(sensor)
    }

    pub fn address(&self) -> DeviceAddr {
        self.address
    }

    /// Overwrites the whole configuration register with [`DEFAULT_CONFIGURATION`].
    pub async fn initialize(&self, i2c: &mut I2C) -> Result<()> {
        self.write_configuration(Configuration::from(DEFAULT_CONFIGURATION), i2c)
            .await
    }

    pub async fn read_configuration(&self, i2c: &mut I2C) -> Result<Configuration> {
        Ok(Configuration::from(
            self.read_register(Register::Configuration, i2c).await?,
        ))
    }

    pub async fn write_configuration(&self, config: Configuration, i2c: &mut I2C) -> Result<()> {
        self.write_register(Register::Configuration, config.bits(), i2c)
            .await
    }

    pub async fn read_device_id(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::DeviceId, i2c).await
    }

    pub async fn read_manufacturer_id(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::ManufacturerId, i2c).await
    }

    pub async fn read_high_limit(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::HighLimit, i2c).await
    }

    pub async fn read_low_limit(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::LowLimit, i2c).await
    }

    pub async fn write_high_limit(&self, raw: u16, i2c: &mut I2C) -> Result<()> {
        self.write_register(Register::HighLimit, raw, i2c).await
    }

    pub async fn write_low_limit(&self, raw: u16, i2c: &mut I2C) -> Result<()> {
        self.write_register(Register::LowLimit, raw, i2c).await
    }

    pub async fn set_high_limit_lux(&self, lux: f32, i2c: &mut I2C) -> Result<()> {
        self.write_high_limit(lux_to_raw(lux), i2c).await
    }

    pub async fn set_low_limit_lux(&self, lux: f32, i2c: &mut I2C) -> Result<()> {
        self.write_low_limit(lux_to_raw(lux), i2c).await
    }

    pub async fn set_conversion_time_100ms(&self, i2c: &mut I2C) -> Result<()> {
        self.set_conversion_time(ConversionTime::Ms100, i2c).await
    }

    pub async fn set_conversion_time_800ms(&self, i2c: &mut I2C) -> Result<()> {
        self.set_conversion_time(ConversionTime::Ms800, i2c).await
    }

    pub async fn set_conversion_time(&self, time: ConversionTime, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_conversion_time(time), i2c)
            .await
    }

    pub async fn read_conversion_time(&self, i2c: &mut I2C) -> Result<ConversionTime> {
        Ok(self.read_configuration(i2c).await?.conversion_time())
    }

    pub async fn start_single_shot(&self, i2c: &mut I2C) -> Result<()> {
        self.set_mode(Mode::SingleShot, i2c).await
    }

    pub async fn start_continuous(&self, i2c: &mut I2C) -> Result<()> {
        self.set_mode(Mode::Continuous, i2c).await
    }

    pub async fn shutdown(&self, i2c: &mut I2C) -> Result<()> {
        self.set_mode(Mode::Shutdown, i2c).await
    }

    /// Set the mode of the sensor.
    pub async fn set_mode(&self, mode: Mode, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_mode(mode), i2c).await
    }

    pub async fn read_mode(&self, i2c: &mut I2C) -> Result<Mode> {
        Ok(self.read_configuration(i2c).await?.mode())
    }

    pub async fn set_range(&self, range: Range, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_range(range), i2c).await
    }

    pub async fn set_latch(&self, latch: LatchMode, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_latch(latch), i2c).await
    }

    pub async fn set_polarity(&self, polarity: Polarity, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_polarity(polarity), i2c)
            .await
    }

    pub async fn set_exponent_mask(&self, enabled: bool, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_exponent_mask(enabled), i2c)
            .await
    }

    pub async fn set_fault_count(&self, count: FaultCount, i2c: &mut I2C) -> Result<()> {
        let config = self.read_configuration(i2c).await?;
        self.write_configuration(config.with_fault_count(count), i2c)
            .await
    }

    /// Returns `true` while the conversion ready flag is not set.
    pub async fn is_measuring(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(!self.read_configuration(i2c).await?.is_conversion_ready())
    }

    pub async fn is_overflow(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(self.read_configuration(i2c).await?.is_overflow())
    }

    pub async fn is_flag_high(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(self.read_configuration(i2c).await?.is_flag_high())
    }

    pub async fn is_flag_low(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(self.read_configuration(i2c).await?.is_flag_low())
    }

    /// Polls the conversion ready flag until it is set, yielding between polls.
    pub async fn wait_for_conversion(
        &self,
        timeout_ms: u32,
        delay: &mut D,
        i2c: &mut I2C,
    ) -> Result<()> {
        let mut waited_ms = 0;
        while self.is_measuring(i2c).await? {
            if waited_ms >= timeout_ms {
                log::debug!("Conversion not ready after {} ms", waited_ms);
                return Err(Opt3001Error::Timeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS).await;
            waited_ms += POLL_INTERVAL_MS;
        }

        Ok(())
    }

    /// Perform a single-shot measurement of the ambient light intensity in lux.
    pub async fn measure_lux_single_shot(&self, delay: &mut D, i2c: &mut I2C) -> Result<f32> {
        let config = self
            .read_configuration(i2c)
            .await?
            .with_mode(Mode::SingleShot);
        self.write_configuration(config, i2c).await?;

        self.wait_for_conversion(config.conversion_time().max_ms(), delay, i2c)
            .await?;

        self.measure_lux(i2c).await
    }

    pub async fn measure_lux(&self, i2c: &mut I2C) -> Result<f32> {
        self.register_to_lux(Register::Result, i2c).await
    }

    pub async fn register_to_lux(&self, register: Register, i2c: &mut I2C) -> Result<f32> {
        let raw = self.read_register(register, i2c).await?;
        let lux = raw_to_lux(raw);
        log::debug!("{:?} 0x{:04X} = {} lux", register, raw, lux);

        Ok(lux)
    }

    /// Writes a new value to a specific register, MSB first
    pub async fn write_register(
        &self,
        register: Register,
        value: u16,
        i2c: &mut I2C,
    ) -> Result<()> {
        let [msb, lsb] = value.to_be_bytes();
        log::trace!("Write {:?}: 0x{:04X}", register, value);

        i2c.write(self.address as u8, &[register.address(), msb, lsb])
            .await
            .map_err(|e| map_i2c_error(e.kind(), Opt3001Error::WriteI2CError))?;

        Ok(())
    }

    /// Reads the value of a specific register, MSB first
    pub async fn read_register(&self, register: Register, i2c: &mut I2C) -> Result<u16> {
        let mut read_data = [0; 2];

        i2c.write_read(self.address as u8, &[register.address()], &mut read_data)
            .await
            .map_err(|e| map_i2c_error(e.kind(), Opt3001Error::ReadI2CError))?;

        let value = u16::from_be_bytes(read_data);
        log::trace!("Read {:?}: 0x{:04X}", register, value);

        Ok(value)
    }
}

/// Maps the bus error kind, `fallback` covers everything but a missing acknowledge.
fn map_i2c_error(kind: ErrorKind, fallback: Opt3001Error) -> Opt3001Error {
    match kind {
        ErrorKind::NoAcknowledge(_) => Opt3001Error::NoAcknowledge,
        _ => fallback,
    }
}
