//! This crate provides a platform agnostic no_std driver for the OPT3001 ambient light sensor.
//! The driver is compatible with the [`embedded-hal`](https://crates.io/crates/embedded-hal) traits.
//!
//! The datasheet of the sensor can be found [here](https://www.ti.com/lit/ds/symlink/opt3001.pdf).
//!
//! ## Supported features
//! * Shutdown, single-shot and continuous conversion modes
//! * Conversion time, full-scale range, latch, polarity, exponent mask and fault count settings
//! * Overflow, conversion-ready, high and low flags
//! * Reading and writing the high/low limit registers, raw or in lux
//! * Reading the manufacturer and device id of the sensor
//! * Converting the raw result register into the ambient light intensity in lux
//! * Async (feature `async`)
//!
//! ## Unsupported features
//! * Interrupt pin handling
//!
//! Every setter reads the configuration register, changes only its own field and
//! writes the word back. The I2C bus is borrowed mutably for the whole operation,
//! so the read and the write cannot be interleaved with other traffic from safe code.
//!
//! ## Usage
//!
//! ### Creating a driver instance
//!
//! ```rust
//! use embedded_hal_mock::delay::MockNoop;
//! use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction};
//! use opt3001::{DeviceAddr, Opt3001};
//!
//! // The driver writes the default configuration on creation
//! let mut i2c = I2cMock::new(&[Transaction::write(0x44, vec![0x01, 0xC8, 0x10])]);
//! let _sensor: Opt3001<_, MockNoop> = Opt3001::new(DeviceAddr::Gnd, &mut i2c).unwrap();
//!
//! i2c.done();
//! ```
//!
//! ### Reading the ambient light intensity
//!
//! ```rust
//! use embedded_hal_mock::delay::MockNoop;
//! use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction};
//! use opt3001::{DeviceAddr, Opt3001};
//!
//! let mut i2c = I2cMock::new(&[
//!     Transaction::write(0x44, vec![0x01, 0xC8, 0x10]),
//!     Transaction::write_read(0x44, vec![0x01], vec![0xC8, 0x10]),
//!     Transaction::write(0x44, vec![0x01, 0xCC, 0x10]),
//!     // Result register: exponent 1, mantissa 0x350
//!     Transaction::write_read(0x44, vec![0x00], vec![0x13, 0x50]),
//! ]);
//! let sensor: Opt3001<_, MockNoop> = Opt3001::new(DeviceAddr::Gnd, &mut i2c).unwrap();
//!
//! // The sensor keeps converting until shut down, this reads the latest result
//! sensor.start_continuous(&mut i2c).unwrap();
//! let lux = sensor.measure_lux(&mut i2c).unwrap();
//! assert_eq!(lux, 16.96);
//!
//! i2c.done();
//! ```
//!
//! ### Single-shot measurement
//!
//! ```rust
//! use embedded_hal_mock::delay::MockNoop;
//! use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction};
//! use opt3001::{DeviceAddr, Opt3001};
//!
//! let mut i2c = I2cMock::new(&[
//!     Transaction::write(0x45, vec![0x01, 0xC8, 0x10]),
//!     // Read-modify-write of the mode field
//!     Transaction::write_read(0x45, vec![0x01], vec![0xC8, 0x10]),
//!     Transaction::write(0x45, vec![0x01, 0xCA, 0x10]),
//!     // Conversion ready flag set on the first poll
//!     Transaction::write_read(0x45, vec![0x01], vec![0xC8, 0x90]),
//!     Transaction::write_read(0x45, vec![0x00], vec![0x00, 0x64]),
//! ]);
//! let mut delay = MockNoop::new();
//! let sensor = Opt3001::new(DeviceAddr::Vdd, &mut i2c).unwrap();
//!
//! // Blocks until the conversion is done or the datasheet maximum has passed
//! let lux = sensor.measure_lux_single_shot(&mut delay, &mut i2c).unwrap();
//! assert_eq!(lux, 1.0);
//!
//! i2c.done();
//! ```

#![cfg_attr(not(test), no_std)]

pub mod config;

#[cfg(feature = "async")]
pub mod asynch;

pub use config::{
    ConversionTime, Configuration, FaultCount, LatchMode, Mode, Polarity, Range,
    DEFAULT_CONFIGURATION,
};

/// Value of the manufacturer id register ("TI" in ASCII).
pub const MANUFACTURER_ID: u16 = 0x5449;

/// Value of the device id register.
pub const DEVICE_ID: u16 = 0x3001;

/// Interval between two polls of the conversion ready flag.
pub const POLL_INTERVAL_MS: u32 = 10;

/// Highest exponent the sensor produces in the result and limit registers.
const MAX_EXPONENT: u16 = 11;

/// I2C address of the sensor, selected by the connection of the ADDR pin.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceAddr {
    /// ADDR connected to GND
    #[default]
    Gnd = 0x44,
    /// ADDR connected to VDD
    Vdd = 0x45,
    /// ADDR connected to SDA
    Sda = 0x46,
    /// ADDR connected to SCL
    Scl = 0x47,
}

/// Represents an I2C-connected OPT3001 sensor.
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
    D: embedded_hal::blocking::delay::DelayMs<u32>,
    I2C: embedded_hal::blocking::i2c::Write + embedded_hal::blocking::i2c::WriteRead,
{
    /// Creates a connection with an OPT3001 sensor via I2C.
    ///
    /// This writes the default configuration, see [`Opt3001::initialize`].
    pub fn new(address: DeviceAddr, i2c: &mut I2C) -> Result<Self> {
        let sensor = Self {
            _delay: core::marker::PhantomData,
            _i2c: core::marker::PhantomData,
            address,
        };
        sensor.initialize(i2c)?;

        Ok(sensor)
    }

    /// The bus address this driver talks to.
    pub fn address(&self) -> DeviceAddr {
        self.address
    }

    /// Overwrites the whole configuration register with [`DEFAULT_CONFIGURATION`].
    ///
    /// Automatic full-scale range and 800 ms conversion time. The mode field of that
    /// word is `00`, so no conversion runs until one is started.
    pub fn initialize(&self, i2c: &mut I2C) -> Result<()> {
        self.write_configuration(Configuration::from(DEFAULT_CONFIGURATION), i2c)
    }

    /// Reads the configuration register.
    ///
    /// Note that this clears the conversion ready flag and, in latched mode,
    /// the high and low flags.
    pub fn read_configuration(&self, i2c: &mut I2C) -> Result<Configuration> {
        Ok(Configuration::from(
            self.read_register(Register::Configuration, i2c)?,
        ))
    }

    /// Writes the configuration register as is.
    pub fn write_configuration(&self, config: Configuration, i2c: &mut I2C) -> Result<()> {
        self.write_register(Register::Configuration, config.bits(), i2c)
    }

    pub fn read_device_id(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::DeviceId, i2c)
    }

    pub fn read_manufacturer_id(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::ManufacturerId, i2c)
    }

    /// Reads the raw high-limit register. Use [`Opt3001::register_to_lux`] for the value in lux.
    pub fn read_high_limit(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::HighLimit, i2c)
    }

    /// Reads the raw low-limit register. Use [`Opt3001::register_to_lux`] for the value in lux.
    pub fn read_low_limit(&self, i2c: &mut I2C) -> Result<u16> {
        self.read_register(Register::LowLimit, i2c)
    }

    pub fn write_high_limit(&self, raw: u16, i2c: &mut I2C) -> Result<()> {
        self.write_register(Register::HighLimit, raw, i2c)
    }

    pub fn write_low_limit(&self, raw: u16, i2c: &mut I2C) -> Result<()> {
        self.write_register(Register::LowLimit, raw, i2c)
    }

    /// Writes the high limit, quantized with [`lux_to_raw`].
    pub fn set_high_limit_lux(&self, lux: f32, i2c: &mut I2C) -> Result<()> {
        self.write_high_limit(lux_to_raw(lux), i2c)
    }

    /// Writes the low limit, quantized with [`lux_to_raw`].
    pub fn set_low_limit_lux(&self, lux: f32, i2c: &mut I2C) -> Result<()> {
        self.write_low_limit(lux_to_raw(lux), i2c)
    }

    pub fn set_conversion_time_100ms(&self, i2c: &mut I2C) -> Result<()> {
        self.set_conversion_time(ConversionTime::Ms100, i2c)
    }

    pub fn set_conversion_time_800ms(&self, i2c: &mut I2C) -> Result<()> {
        self.set_conversion_time(ConversionTime::Ms800, i2c)
    }

    pub fn set_conversion_time(&self, time: ConversionTime, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_conversion_time(time))
    }

    pub fn read_conversion_time(&self, i2c: &mut I2C) -> Result<ConversionTime> {
        Ok(self.read_configuration(i2c)?.conversion_time())
    }

    /// Triggers one conversion, the sensor shuts down again once it is done.
    pub fn start_single_shot(&self, i2c: &mut I2C) -> Result<()> {
        self.set_mode(Mode::SingleShot, i2c)
    }

    /// Start continuous conversion mode.
    pub fn start_continuous(&self, i2c: &mut I2C) -> Result<()> {
        self.set_mode(Mode::Continuous, i2c)
    }

    /// Stops conversions, all other settings are kept.
    pub fn shutdown(&self, i2c: &mut I2C) -> Result<()> {
        self.set_mode(Mode::Shutdown, i2c)
    }

    /// Set the mode of the sensor.
    pub fn set_mode(&self, mode: Mode, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_mode(mode))
    }

    pub fn read_mode(&self, i2c: &mut I2C) -> Result<Mode> {
        Ok(self.read_configuration(i2c)?.mode())
    }

    pub fn set_range(&self, range: Range, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_range(range))
    }

    pub fn set_latch(&self, latch: LatchMode, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_latch(latch))
    }

    pub fn set_polarity(&self, polarity: Polarity, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_polarity(polarity))
    }

    /// Forces the result exponent to zero while a manual range is selected.
    pub fn set_exponent_mask(&self, enabled: bool, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_exponent_mask(enabled))
    }

    pub fn set_fault_count(&self, count: FaultCount, i2c: &mut I2C) -> Result<()> {
        self.modify_configuration(i2c, |config| config.with_fault_count(count))
    }

    /// Returns `true` while the conversion ready flag is not set.
    ///
    /// Reading the configuration clears the flag, so a `false` is only reported once
    /// per finished conversion.
    pub fn is_measuring(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(!self.read_configuration(i2c)?.is_conversion_ready())
    }

    pub fn is_overflow(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(self.read_configuration(i2c)?.is_overflow())
    }

    pub fn is_flag_high(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(self.read_configuration(i2c)?.is_flag_high())
    }

    pub fn is_flag_low(&self, i2c: &mut I2C) -> Result<bool> {
        Ok(self.read_configuration(i2c)?.is_flag_low())
    }

    /// Polls the conversion ready flag until it is set.
    ///
    /// Returns [`Opt3001Error::Timeout`] if the flag is still clear after `timeout_ms`.
    pub fn wait_for_conversion(
        &self,
        timeout_ms: u32,
        delay: &mut D,
        i2c: &mut I2C,
    ) -> Result<()> {
        let mut waited_ms = 0;
        while self.is_measuring(i2c)? {
            if waited_ms >= timeout_ms {
                log::debug!("Conversion not ready after {} ms", waited_ms);
                return Err(Opt3001Error::Timeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
            waited_ms += POLL_INTERVAL_MS;
        }

        Ok(())
    }

    /// Perform a single-shot measurement of the ambient light intensity in lux.
    ///
    /// This blocks until the conversion is done, bounded by the worst-case
    /// conversion time of the configured setting.
    pub fn measure_lux_single_shot(&self, delay: &mut D, i2c: &mut I2C) -> Result<f32> {
        let config = self
            .read_configuration(i2c)?
            .with_mode(Mode::SingleShot);
        self.write_configuration(config, i2c)?;

        self.wait_for_conversion(config.conversion_time().max_ms(), delay, i2c)?;

        self.measure_lux(i2c)
    }

    /// Reads the result register and converts it to lux.
    pub fn measure_lux(&self, i2c: &mut I2C) -> Result<f32> {
        self.register_to_lux(Register::Result, i2c)
    }

    /// Reads a register holding an exponent/mantissa value and converts it to lux.
    ///
    /// Meant for [`Register::Result`], [`Register::HighLimit`] and [`Register::LowLimit`].
    pub fn register_to_lux(&self, register: Register, i2c: &mut I2C) -> Result<f32> {
        let raw = self.read_register(register, i2c)?;
        let lux = raw_to_lux(raw);
        log::debug!("{:?} 0x{:04X} = {} lux", register, raw, lux);

        Ok(lux)
    }

    /// Reads the configuration, applies `f` and writes the result back.
    fn modify_configuration<F>(&self, i2c: &mut I2C, f: F) -> Result<()>
    where
        F: FnOnce(Configuration) -> Configuration,
    {
        let config = self.read_configuration(i2c)?;
        self.write_configuration(f(config), i2c)
    }

    /// Writes a new value to a specific register, MSB first
    pub fn write_register(&self, register: Register, value: u16, i2c: &mut I2C) -> Result<()> {
        let [msb, lsb] = value.to_be_bytes();
        log::trace!("Write {:?}: 0x{:04X}", register, value);

        i2c.write(self.address as u8, &[register.address(), msb, lsb])
            .map_err(|_| Opt3001Error::WriteI2CError)?;

        Ok(())
    }

    /// Reads the value of a specific register, MSB first
    pub fn read_register(&self, register: Register, i2c: &mut I2C) -> Result<u16> {
        let mut read_data = [0; 2];

        i2c.write_read(self.address as u8, &[register.address()], &mut read_data)
            .map_err(|_| Opt3001Error::ReadI2CError)?;

        let value = u16::from_be_bytes(read_data);
        log::trace!("Read {:?}: 0x{:04X}", register, value);

        Ok(value)
    }
}

/// Converts an exponent/mantissa register value into lux.
///
/// `lux = 0.01 * 2^exponent * mantissa` with the exponent in bits 15:12 and the
/// mantissa in bits 11:0. Exponents above 11 are not produced by the sensor but are
/// decoded with the same formula.
pub fn raw_to_lux(raw: u16) -> f32 {
    let exponent = u32::from(raw >> 12);
    let mantissa = u32::from(raw & 0x0FFF);

    (mantissa << exponent) as f32 / 100.0
}

/// Quantizes a lux value into the exponent/mantissa register format.
///
/// Picks the smallest exponent that fits the rounded mantissa into 12 bits.
/// Negative and NaN inputs give `0x0000`, anything above 83865.6 lux saturates to `0xBFFF`.
pub fn lux_to_raw(lux: f32) -> u16 {
    if lux.is_nan() || lux <= 0.0 {
        return 0;
    }

    let centilux = lux * 100.0;
    for exponent in 0..=MAX_EXPONENT {
        let mantissa = round_to_u32(centilux / (1u32 << exponent) as f32);
        if mantissa <= 0x0FFF {
            return (exponent << 12) | mantissa as u16;
        }
    }

    (MAX_EXPONENT << 12) | 0x0FFF
}

// Round half up for non-negative values, saturates on overflow
fn round_to_u32(value: f32) -> u32 {
    (value + 0.5) as u32
}

/// Shorthand for all functions returning an error in this module.
pub type Result<T> = core::result::Result<T, Opt3001Error>;

/// Represents any error that may happen during communication.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum Opt3001Error {
    /// An error occurred while reading from the sensor.
    ReadI2CError,
    /// An error occurred while writing to the sensor.
    WriteI2CError,
    /// The sensor did not acknowledge its address or a data byte.
    NoAcknowledge,
    /// The conversion ready flag was not set in time.
    Timeout,
}

/// All registers of the OPT3001 sensor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Conversion result
    Result = 0x00,

    /// Configuration and status flags
    Configuration = 0x01,

    /// Low comparison limit
    LowLimit = 0x02,

    /// High comparison limit
    HighLimit = 0x03,

    /// Manufacturer id, reads [`MANUFACTURER_ID`]
    ManufacturerId = 0x7E,

    /// Device id, reads [`DEVICE_ID`]
    DeviceId = 0x7F,
}

impl Register {
    /// Register address as sent on the bus.
    pub fn address(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::delay::MockNoop as DelayMock;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use embedded_hal_mock::MockError;

    const ADDR: u8 = 0x44;

    fn init() -> I2cTransaction {
        I2cTransaction::write(ADDR, [0x01, 0xC8, 0x10].to_vec())
    }

    fn read_config(value: u16) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, [0x01].to_vec(), value.to_be_bytes().to_vec())
    }

    fn write_config(value: u16) -> I2cTransaction {
        let [msb, lsb] = value.to_be_bytes();
        I2cTransaction::write(ADDR, [0x01, msb, lsb].to_vec())
    }

    fn sensor(i2c: &mut I2cMock) -> Opt3001<I2cMock, DelayMock> {
        Opt3001::new(DeviceAddr::Gnd, i2c).unwrap()
    }

    #[test]
    fn test_initialize_then_read_configuration() {
        let expectations = [init(), read_config(0xC810)];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        let config = sensor.read_configuration(&mut i2c_mock).unwrap();
        assert_eq!(config.bits(), 0xC810);
        assert_eq!(config.mode(), Mode::Shutdown);

        i2c_mock.done();
    }

    #[test]
    fn test_write_configuration_is_not_masked() {
        let expectations = [init(), write_config(0x0000), read_config(0x0000)];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        sensor
            .write_configuration(Configuration::from(0x0000), &mut i2c_mock)
            .unwrap();
        let config = sensor.read_configuration(&mut i2c_mock).unwrap();
        assert_eq!(config.bits(), 0x0000);

        i2c_mock.done();
    }

    #[test]
    fn test_alternate_address() {
        let expectations = [
            I2cTransaction::write(0x47, [0x01, 0xC8, 0x10].to_vec()),
            I2cTransaction::write_read(0x47, [0x7E].to_vec(), [0x54, 0x49].to_vec()),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor: Opt3001<_, DelayMock> = Opt3001::new(DeviceAddr::Scl, &mut i2c_mock).unwrap();
        assert_eq!(sensor.address(), DeviceAddr::Scl);
        let id = sensor.read_manufacturer_id(&mut i2c_mock).unwrap();
        assert_eq!(id, MANUFACTURER_ID);

        i2c_mock.done();
    }

    #[test]
    fn test_read_ids_and_limits() {
        let expectations = [
            init(),
            I2cTransaction::write_read(ADDR, [0x7F].to_vec(), [0x30, 0x01].to_vec()),
            I2cTransaction::write_read(ADDR, [0x03].to_vec(), [0xBF, 0xFF].to_vec()),
            I2cTransaction::write_read(ADDR, [0x02].to_vec(), [0x00, 0x00].to_vec()),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        assert_eq!(sensor.read_device_id(&mut i2c_mock), Ok(DEVICE_ID));
        assert_eq!(sensor.read_high_limit(&mut i2c_mock), Ok(0xBFFF));
        assert_eq!(sensor.read_low_limit(&mut i2c_mock), Ok(0x0000));

        i2c_mock.done();
    }

    #[test]
    fn test_conversion_time_read_modify_write() {
        let expectations = [
            init(),
            // Status bits 8..5 set, they must be written back as read
            read_config(0xCDF0),
            write_config(0xC5F0),
            read_config(0x0013),
            write_config(0x0813),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        sensor.set_conversion_time_100ms(&mut i2c_mock).unwrap();
        sensor.set_conversion_time_800ms(&mut i2c_mock).unwrap();

        i2c_mock.done();
    }

    #[test]
    fn test_mode_read_modify_write() {
        let expectations = [
            init(),
            read_config(0xCC10),
            write_config(0xCA10),
            read_config(0x0BFF),
            write_config(0x0DFF),
            read_config(0xFFFF),
            write_config(0xF9FF),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        sensor.start_single_shot(&mut i2c_mock).unwrap();
        sensor.start_continuous(&mut i2c_mock).unwrap();
        sensor.shutdown(&mut i2c_mock).unwrap();

        i2c_mock.done();
    }

    #[test]
    fn test_other_setters_read_modify_write() {
        let expectations = [
            init(),
            read_config(0xC810),
            write_config(0x3810),
            read_config(0xC810),
            write_config(0xC800),
            read_config(0xC810),
            write_config(0xC818),
            read_config(0xC810),
            write_config(0xC814),
            read_config(0xC810),
            write_config(0xC813),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        sensor.set_range(Range::Lux327_60, &mut i2c_mock).unwrap();
        sensor
            .set_latch(LatchMode::Transparent, &mut i2c_mock)
            .unwrap();
        sensor
            .set_polarity(Polarity::ActiveHigh, &mut i2c_mock)
            .unwrap();
        sensor.set_exponent_mask(true, &mut i2c_mock).unwrap();
        sensor
            .set_fault_count(FaultCount::Eight, &mut i2c_mock)
            .unwrap();

        i2c_mock.done();
    }

    #[test]
    fn test_is_measuring() {
        let expectations = [
            init(),
            read_config(0xC810),
            write_config(0xCA10),
            read_config(0xCA10),
            read_config(0xC890),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        sensor.start_single_shot(&mut i2c_mock).unwrap();
        assert_eq!(sensor.is_measuring(&mut i2c_mock), Ok(true));
        assert_eq!(sensor.is_measuring(&mut i2c_mock), Ok(false));

        i2c_mock.done();
    }

    #[test]
    fn test_status_flags() {
        let expectations = [
            init(),
            read_config(0x0100),
            read_config(0xFEFF),
            read_config(0x0040),
            read_config(0xFFBF),
            read_config(0x0020),
            read_config(0xFFDF),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        assert_eq!(sensor.is_overflow(&mut i2c_mock), Ok(true));
        assert_eq!(sensor.is_overflow(&mut i2c_mock), Ok(false));
        assert_eq!(sensor.is_flag_high(&mut i2c_mock), Ok(true));
        assert_eq!(sensor.is_flag_high(&mut i2c_mock), Ok(false));
        assert_eq!(sensor.is_flag_low(&mut i2c_mock), Ok(true));
        assert_eq!(sensor.is_flag_low(&mut i2c_mock), Ok(false));

        i2c_mock.done();
    }

    #[test]
    fn test_measure_lux() {
        let expectations = [
            init(),
            I2cTransaction::write_read(ADDR, [0x00].to_vec(), [0x00, 0x00].to_vec()),
            I2cTransaction::write_read(ADDR, [0x00].to_vec(), [0x03, 0x50].to_vec()),
            I2cTransaction::write_read(ADDR, [0x00].to_vec(), [0xB0, 0x01].to_vec()),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        assert_eq!(sensor.measure_lux(&mut i2c_mock), Ok(0.0));
        assert_eq!(sensor.measure_lux(&mut i2c_mock), Ok(8.48));
        assert_eq!(sensor.measure_lux(&mut i2c_mock), Ok(20.48));

        i2c_mock.done();
    }

    #[test]
    fn test_limits_in_lux() {
        let expectations = [
            init(),
            I2cTransaction::write(ADDR, [0x03, 0x19, 0xC4].to_vec()),
            I2cTransaction::write(ADDR, [0x02, 0x00, 0x64].to_vec()),
            I2cTransaction::write_read(ADDR, [0x03].to_vec(), [0x19, 0xC4].to_vec()),
            I2cTransaction::write_read(ADDR, [0x02].to_vec(), [0x00, 0x64].to_vec()),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        sensor.set_high_limit_lux(50.0, &mut i2c_mock).unwrap();
        sensor.set_low_limit_lux(1.0, &mut i2c_mock).unwrap();
        assert_eq!(
            sensor.register_to_lux(Register::HighLimit, &mut i2c_mock),
            Ok(50.0)
        );
        assert_eq!(
            sensor.register_to_lux(Register::LowLimit, &mut i2c_mock),
            Ok(1.0)
        );

        i2c_mock.done();
    }

    #[test]
    fn test_wait_for_conversion_timeout() {
        let expectations = [
            init(),
            read_config(0xCA10),
            read_config(0xCA10),
            read_config(0xCA10),
            read_config(0xCA10),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);
        let mut delay_mock = DelayMock::new();

        let sensor = sensor(&mut i2c_mock);
        // Polls at 0, 10, 20 and 30 ms, then gives up
        let result = sensor.wait_for_conversion(30, &mut delay_mock, &mut i2c_mock);
        assert_eq!(result, Err(Opt3001Error::Timeout));

        i2c_mock.done();
    }

    #[test]
    fn test_measure_lux_single_shot() {
        let expectations = [
            init(),
            read_config(0xC010),
            write_config(0xC210),
            read_config(0xC210),
            read_config(0xC290),
            I2cTransaction::write_read(ADDR, [0x00].to_vec(), [0x20, 0x10].to_vec()),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);
        let mut delay_mock = DelayMock::new();

        let sensor = sensor(&mut i2c_mock);
        let lux = sensor
            .measure_lux_single_shot(&mut delay_mock, &mut i2c_mock)
            .unwrap();
        assert_eq!(lux, 0.64);

        i2c_mock.done();
    }

    #[test]
    fn test_write_error() {
        let expectations = [
            init(),
            write_config(0x0000).with_error(MockError::Io(std::io::ErrorKind::Other)),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        let result = sensor.write_configuration(Configuration::from(0x0000), &mut i2c_mock);
        assert_eq!(result, Err(Opt3001Error::WriteI2CError));

        i2c_mock.done();
    }

    #[test]
    fn test_read_error_is_not_a_zero_reading() {
        let expectations = [
            init(),
            I2cTransaction::write_read(ADDR, [0x00].to_vec(), [0x00, 0x00].to_vec())
                .with_error(MockError::Io(std::io::ErrorKind::Other)),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        let result = sensor.measure_lux(&mut i2c_mock);
        assert_eq!(result, Err(Opt3001Error::ReadI2CError));

        i2c_mock.done();
    }

    #[test]
    fn test_setter_stops_after_failed_read() {
        let expectations = [
            init(),
            read_config(0xC810).with_error(MockError::Io(std::io::ErrorKind::Other)),
        ];

        let mut i2c_mock = I2cMock::new(&expectations);

        let sensor = sensor(&mut i2c_mock);
        let result = sensor.shutdown(&mut i2c_mock);
        assert_eq!(result, Err(Opt3001Error::ReadI2CError));

        i2c_mock.done();
    }

    #[test]
    fn test_raw_to_lux() {
        assert_eq!(raw_to_lux(0x0000), 0.0);
        assert_eq!(raw_to_lux(0x0001), 0.01);
        assert_eq!(raw_to_lux(0x0350), 8.48);
        assert_eq!(raw_to_lux(0x0FFF), 40.95);
        assert_eq!(raw_to_lux(0xBFFF), 83865.6);
        // Out of range exponents are decoded without checks
        assert_eq!(raw_to_lux(0xF001), 327.68);
    }

    #[test]
    fn test_lux_to_raw() {
        assert_eq!(lux_to_raw(0.0), 0x0000);
        assert_eq!(lux_to_raw(-5.0), 0x0000);
        assert_eq!(lux_to_raw(f32::NAN), 0x0000);
        assert_eq!(lux_to_raw(8.48), 0x0350);
        assert_eq!(lux_to_raw(50.0), 0x19C4);
        assert_eq!(lux_to_raw(1_000_000.0), 0xBFFF);
        assert_eq!(lux_to_raw(f32::INFINITY), 0xBFFF);
    }

    #[test]
    fn test_normalized_raw_values_survive_conversion() {
        for raw in 0..=u16::MAX {
            let exponent = raw >> 12;
            let mantissa = raw & 0x0FFF;
            if exponent > MAX_EXPONENT || (exponent > 0 && mantissa < 0x0800) {
                continue;
            }
            assert_eq!(lux_to_raw(raw_to_lux(raw)), raw, "raw 0x{:04X}", raw);
        }
    }

    #[test]
    fn test_denormalized_raw_values_keep_their_lux() {
        // 0x1010 and 0x0020 both mean 0.32 lux
        assert_eq!(lux_to_raw(raw_to_lux(0x1010)), 0x0020);
        assert_eq!(raw_to_lux(0x1010), raw_to_lux(0x0020));
    }
}
