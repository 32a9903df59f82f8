//! Driver error types

use core::fmt;

/// Result of a driver operation on a bus with error type `E`
pub type TdmbResult<T, E> = Result<T, Error<E>>;

/// Failures reported by the RF tuner collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunerError {
    /// Synthesizer did not lock on the requested frequency
    PllUnlocked,
    /// Frequency outside the tuner's bands (kHz)
    UnsupportedFrequency(u32),
    /// Front end did not respond during initialization
    NotResponding,
}

impl fmt::Display for TunerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PllUnlocked => write!(f, "tuner PLL unlocked"),
            Self::UnsupportedFrequency(khz) => write!(f, "unsupported frequency {khz} kHz"),
            Self::NotResponding => write!(f, "tuner not responding"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TunerError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::PllUnlocked => defmt::write!(f, "PllUnlocked"),
            Self::UnsupportedFrequency(khz) => defmt::write!(f, "UnsupportedFrequency({}kHz)", khz),
            Self::NotResponding => defmt::write!(f, "NotResponding"),
        }
    }
}

/// Driver error, generic over the register bus error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// Register transport failure
    Bus(E),
    /// RF tuner failure
    Tuner(TunerError),
    /// Sub-channel ID outside 0..64
    InvalidSubChannelId(u8),
    /// MSC interrupt threshold too large for the host interface
    InvalidThresholdSize(u32),
    /// No free hardware slot or registration entry
    NoMoreSubChannels,
    /// ADC clock code not known to the demodulator
    UnsupportedAdcClock(u8),
    /// Country band not supported by this firmware
    InvalidCountryBand,
    /// Chip index not present on this board
    InvalidChipIndex(u8),
    /// FIC interrupt never fired within the polling budget
    FicReadTimeout,
    /// FIC read before `open_fic`
    FicNotOpened,
    /// Diversity requested on a single-chip board
    DiversityUnavailable,
}

impl<E> From<TunerError> for Error<E> {
    fn from(e: TunerError) -> Self {
        Self::Tuner(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "register bus error: {e:?}"),
            Self::Tuner(e) => write!(f, "{e}"),
            Self::InvalidSubChannelId(id) => write!(f, "invalid sub-channel ID {id}"),
            Self::InvalidThresholdSize(size) => write!(f, "invalid threshold size {size}"),
            Self::NoMoreSubChannels => write!(f, "no more sub-channels available"),
            Self::UnsupportedAdcClock(code) => write!(f, "unsupported ADC clock code {code}"),
            Self::InvalidCountryBand => write!(f, "unsupported country band"),
            Self::InvalidChipIndex(idx) => write!(f, "invalid chip index {idx}"),
            Self::FicReadTimeout => write!(f, "FIC read timeout"),
            Self::FicNotOpened => write!(f, "FIC not opened"),
            Self::DiversityUnavailable => write!(f, "diversity needs a dual-chip board"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

#[cfg(feature = "embedded")]
impl<E: defmt::Format> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus(e) => defmt::write!(f, "Bus({})", e),
            Self::Tuner(e) => defmt::write!(f, "Tuner({})", e),
            Self::InvalidSubChannelId(id) => defmt::write!(f, "InvalidSubChannelId({})", id),
            Self::InvalidThresholdSize(size) => defmt::write!(f, "InvalidThresholdSize({})", size),
            Self::NoMoreSubChannels => defmt::write!(f, "NoMoreSubChannels"),
            Self::UnsupportedAdcClock(code) => defmt::write!(f, "UnsupportedAdcClock({})", code),
            Self::InvalidCountryBand => defmt::write!(f, "InvalidCountryBand"),
            Self::InvalidChipIndex(idx) => defmt::write!(f, "InvalidChipIndex({})", idx),
            Self::FicReadTimeout => defmt::write!(f, "FicReadTimeout"),
            Self::FicNotOpened => defmt::write!(f, "FicNotOpened"),
            Self::DiversityUnavailable => defmt::write!(f, "DiversityUnavailable"),
        }
    }
}
