//! Bit-field model of the OPT3001 configuration register.
//!
//! Layout of the 16-bit word, MSB first:
//!
//! | bits  | field            | access |
//! |-------|------------------|--------|
//! | 15:12 | range number     | R/W    |
//! | 11    | conversion time  | R/W    |
//! | 10:9  | mode             | R/W    |
//! | 8     | overflow flag    | R      |
//! | 7     | conversion ready | R      |
//! | 6     | flag high        | R      |
//! | 5     | flag low         | R      |
//! | 4     | latch            | R/W    |
//! | 3     | polarity         | R/W    |
//! | 2     | exponent mask    | R/W    |
//! | 1:0   | fault count      | R/W    |
//!
//! Every `with_*` method touches only its own field. All other bits, the read-only
//! status flags included, are carried over as they were.

const RANGE_MASK: u16 = 0xF000;
const RANGE_SHIFT: u16 = 12;
const CONVERSION_TIME_BIT: u16 = 0x0800;
const MODE_MASK: u16 = 0x0600;
const MODE_SHIFT: u16 = 9;
const OVERFLOW_BIT: u16 = 0x0100;
const CONVERSION_READY_BIT: u16 = 0x0080;
const FLAG_HIGH_BIT: u16 = 0x0040;
const FLAG_LOW_BIT: u16 = 0x0020;
const LATCH_BIT: u16 = 0x0010;
const POLARITY_BIT: u16 = 0x0008;
const EXPONENT_MASK_BIT: u16 = 0x0004;
const FAULT_COUNT_MASK: u16 = 0x0003;

/// Configuration word written by [`crate::Opt3001::initialize`].
///
/// `0b1100_1000_0001_0000`: automatic full-scale range, 800 ms conversion time,
/// mode bits `00` (shutdown), latched comparator, active-low alert, one fault.
pub const DEFAULT_CONFIGURATION: u16 = 0xC810;

/// Contents of the configuration register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Configuration(u16);

impl Default for Configuration {
    fn default() -> Self {
        Self(DEFAULT_CONFIGURATION)
    }
}

impl From<u16> for Configuration {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl From<Configuration> for u16 {
    fn from(config: Configuration) -> Self {
        config.0
    }
}

impl Configuration {
    /// Raw register word.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Full-scale range selection. `None` for the reserved codes `0b1101..=0b1111`.
    pub fn range(self) -> Option<Range> {
        Range::from_reg_value(((self.0 & RANGE_MASK) >> RANGE_SHIFT) as u8)
    }

    pub fn with_range(self, range: Range) -> Self {
        Self((self.0 & !RANGE_MASK) | ((range.into_reg_value() as u16) << RANGE_SHIFT))
    }

    pub fn conversion_time(self) -> ConversionTime {
        if self.0 & CONVERSION_TIME_BIT == 0 {
            ConversionTime::Ms100
        } else {
            ConversionTime::Ms800
        }
    }

    pub fn with_conversion_time(self, time: ConversionTime) -> Self {
        match time {
            ConversionTime::Ms100 => Self(self.0 & !CONVERSION_TIME_BIT),
            ConversionTime::Ms800 => Self(self.0 | CONVERSION_TIME_BIT),
        }
    }

    pub fn mode(self) -> Mode {
        Mode::from_reg_value(((self.0 & MODE_MASK) >> MODE_SHIFT) as u8)
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Self((self.0 & !MODE_MASK) | ((mode.into_reg_value() as u16) << MODE_SHIFT))
    }

    /// The last conversion overflowed the selected full-scale range.
    pub fn is_overflow(self) -> bool {
        self.0 & OVERFLOW_BIT != 0
    }

    /// A conversion completed since the register was last read or written.
    pub fn is_conversion_ready(self) -> bool {
        self.0 & CONVERSION_READY_BIT != 0
    }

    /// The result exceeded the high-limit register.
    pub fn is_flag_high(self) -> bool {
        self.0 & FLAG_HIGH_BIT != 0
    }

    /// The result fell below the low-limit register.
    pub fn is_flag_low(self) -> bool {
        self.0 & FLAG_LOW_BIT != 0
    }

    pub fn latch(self) -> LatchMode {
        if self.0 & LATCH_BIT == 0 {
            LatchMode::Transparent
        } else {
            LatchMode::Latched
        }
    }

    pub fn with_latch(self, latch: LatchMode) -> Self {
        match latch {
            LatchMode::Transparent => Self(self.0 & !LATCH_BIT),
            LatchMode::Latched => Self(self.0 | LATCH_BIT),
        }
    }

    pub fn polarity(self) -> Polarity {
        if self.0 & POLARITY_BIT == 0 {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }

    pub fn with_polarity(self, polarity: Polarity) -> Self {
        match polarity {
            Polarity::ActiveLow => Self(self.0 & !POLARITY_BIT),
            Polarity::ActiveHigh => Self(self.0 | POLARITY_BIT),
        }
    }

    /// Whether the result exponent is forced to zero in manual range modes.
    pub fn exponent_mask(self) -> bool {
        self.0 & EXPONENT_MASK_BIT != 0
    }

    pub fn with_exponent_mask(self, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | EXPONENT_MASK_BIT)
        } else {
            Self(self.0 & !EXPONENT_MASK_BIT)
        }
    }

    pub fn fault_count(self) -> FaultCount {
        FaultCount::from_reg_value((self.0 & FAULT_COUNT_MASK) as u8)
    }

    pub fn with_fault_count(self, count: FaultCount) -> Self {
        Self((self.0 & !FAULT_COUNT_MASK) | count.into_reg_value() as u16)
    }
}

/// Operating mode of the sensor (M[1:0]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Shutdown = 0b00,
    SingleShot = 0b01,
    Continuous = 0b10,
}

impl Mode {
    /// Converts Mode value into the corresponding field value
    pub fn into_reg_value(self) -> u8 {
        self as u8
    }

    // Both 0b10 and 0b11 select continuous conversions
    fn from_reg_value(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Mode::Shutdown,
            0b01 => Mode::SingleShot,
            _ => Mode::Continuous,
        }
    }
}

/// Length of one conversion (CT bit).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConversionTime {
    Ms100,
    Ms800,
}

impl ConversionTime {
    /// Nominal conversion time in milliseconds.
    pub fn typical_ms(self) -> u32 {
        match self {
            ConversionTime::Ms100 => 100,
            ConversionTime::Ms800 => 800,
        }
    }

    /// Worst-case conversion time in milliseconds (datasheet maximum).
    pub fn max_ms(self) -> u32 {
        match self {
            ConversionTime::Ms100 => 110,
            ConversionTime::Ms800 => 880,
        }
    }
}

/// Full-scale range selection (RN[3:0]).
///
/// | RN     | full scale (lux) | LSB (lux) |
/// |--------|------------------|-----------|
/// | 0000   | 40.95            | 0.01      |
/// | 0001   | 81.90            | 0.02      |
/// | ...    | ...              | ...       |
/// | 1011   | 83865.60         | 20.48     |
/// | 1100   | automatic        |           |
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Range {
    Lux40_95 = 0x0,
    Lux81_90 = 0x1,
    Lux163_80 = 0x2,
    Lux327_60 = 0x3,
    Lux655_20 = 0x4,
    Lux1310_40 = 0x5,
    Lux2620_80 = 0x6,
    Lux5241_60 = 0x7,
    Lux10483_20 = 0x8,
    Lux20966_40 = 0x9,
    Lux41932_80 = 0xA,
    Lux83865_60 = 0xB,
    Automatic = 0xC,
}

impl Range {
    /// Converts Range value into the corresponding field value
    pub fn into_reg_value(self) -> u8 {
        self as u8
    }

    fn from_reg_value(value: u8) -> Option<Self> {
        Some(match value {
            0x0 => Range::Lux40_95,
            0x1 => Range::Lux81_90,
            0x2 => Range::Lux163_80,
            0x3 => Range::Lux327_60,
            0x4 => Range::Lux655_20,
            0x5 => Range::Lux1310_40,
            0x6 => Range::Lux2620_80,
            0x7 => Range::Lux5241_60,
            0x8 => Range::Lux10483_20,
            0x9 => Range::Lux20966_40,
            0xA => Range::Lux41932_80,
            0xB => Range::Lux83865_60,
            0xC => Range::Automatic,
            _ => return None,
        })
    }

    /// Upper end of the range in lux, `None` for automatic ranging.
    pub fn full_scale_lux(self) -> Option<f32> {
        match self {
            Range::Automatic => None,
            range => Some(crate::raw_to_lux(((range as u16) << 12) | 0x0FFF)),
        }
    }
}

/// Comparator behaviour of the high/low flags and the alert pin (L bit).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LatchMode {
    /// Flags track the current comparison, the limits act as hysteresis.
    Transparent,
    /// Window comparator, flags stay set until the configuration is read.
    Latched,
}

/// Active level of the alert pin (POL bit).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

/// Consecutive faults required before the flags and the alert pin trigger (FC[1:0]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCount {
    One = 0b00,
    Two = 0b01,
    Four = 0b10,
    Eight = 0b11,
}

impl FaultCount {
    /// Converts FaultCount value into the corresponding field value
    pub fn into_reg_value(self) -> u8 {
        self as u8
    }

    fn from_reg_value(value: u8) -> Self {
        match value & 0b11 {
            0b00 => FaultCount::One,
            0b01 => FaultCount::Two,
            0b10 => FaultCount::Four,
            _ => FaultCount::Eight,
        }
    }
}
