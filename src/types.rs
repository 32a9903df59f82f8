//! Shared types used across the T-DMB driver
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

/// Demodulator chip selector
///
/// Index 0 is the master chip; index 1 is the slave chip of a
/// dual-chip diversity board.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChipIndex(u8);

impl ChipIndex {
    /// Master chip (always present)
    pub const MASTER: Self = Self(0);

    /// Slave chip (diversity boards only)
    pub const SLAVE: Self = Self(1);

    /// Create a chip index, returns None for anything but 0 or 1
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < 2 {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Raw chip number
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Index into per-chip arrays
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ChipIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "ChipIndex(master)"),
            _ => write!(f, "ChipIndex(slave)"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChipIndex {
    fn format(&self, f: defmt::Formatter) {
        match self.0 {
            0 => defmt::write!(f, "master"),
            _ => defmt::write!(f, "slave"),
        }
    }
}

/// Country band plan the demodulator is configured for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CountryBand {
    /// Korean T-DMB (VHF Band III, transmission mode I only)
    #[default]
    Korea,
    /// European DAB on VHF Band III
    BandIii,
    /// DAB on L-Band
    LBand,
}

#[cfg(feature = "embedded")]
impl defmt::Format for CountryBand {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Korea => defmt::write!(f, "KOREA"),
            Self::BandIii => defmt::write!(f, "BAND-III"),
            Self::LBand => defmt::write!(f, "L-BAND"),
        }
    }
}

/// Sampling clock of the tuner's analog front end
///
/// Every scan threshold and OFDM timing constant depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AdcClock {
    /// 8 MHz
    #[default]
    Mhz8,
    /// 8.192 MHz
    Mhz8_192,
    /// 9 MHz
    Mhz9,
    /// 9.6 MHz
    Mhz9_6,
}

impl AdcClock {
    /// Decode the vendor clock code (0 to 3)
    ///
    /// Returns the rejected code on failure.
    pub const fn from_code(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Mhz8),
            1 => Ok(Self::Mhz8_192),
            2 => Ok(Self::Mhz9),
            3 => Ok(Self::Mhz9_6),
            other => Err(other),
        }
    }

    /// Vendor clock code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Mhz8 => 0,
            Self::Mhz8_192 => 1,
            Self::Mhz9 => 2,
            Self::Mhz9_6 => 3,
        }
    }

    /// Clock frequency in kHz
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        match self {
            Self::Mhz8 => 8_000,
            Self::Mhz8_192 => 8_192,
            Self::Mhz9 => 9_000,
            Self::Mhz9_6 => 9_600,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for AdcClock {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}kHz", self.as_khz());
    }
}

/// Service carried by a sub-channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ServiceType {
    /// Video (DMB) service, decoded by the single RS-protected slot
    Video,
    /// Audio or data service
    #[default]
    AudioData,
}

#[cfg(feature = "embedded")]
impl defmt::Format for ServiceType {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Video => defmt::write!(f, "VIDEO"),
            Self::AudioData => defmt::write!(f, "AUDIO/DATA"),
        }
    }
}

/// DAB transmission mode as reported by the mode monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransmissionMode {
    /// Mode I (96 ms frame)
    #[default]
    I,
    /// Mode II (24 ms frame)
    Ii,
    /// Mode III (24 ms frame)
    Iii,
    /// Mode IV (48 ms frame)
    Iv,
}

impl TransmissionMode {
    /// Decode the 2-bit monitor field
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::I,
            1 => Self::Ii,
            2 => Self::Iii,
            _ => Self::Iv,
        }
    }

    /// Raw 2-bit monitor value
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::I => 0,
            Self::Ii => 1,
            Self::Iii => 2,
            Self::Iv => 3,
        }
    }

    /// Half a transmission frame, the FIC polling interval
    #[must_use]
    pub const fn fic_poll_interval_ms(self) -> u32 {
        match self {
            Self::I => 96 / 2,
            Self::Ii | Self::Iii => (96 / 4) / 2,
            Self::Iv => (96 / 2) / 2,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TransmissionMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::I => defmt::write!(f, "TM-I"),
            Self::Ii => defmt::write!(f, "TM-II"),
            Self::Iii => defmt::write!(f, "TM-III"),
            Self::Iv => defmt::write!(f, "TM-IV"),
        }
    }
}

/// Demodulator lock flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LockStatus(u8);

impl LockStatus {
    /// OFDM symbol lock
    pub const OFDM: u8 = 0x01;

    /// FEC sync lock
    pub const FEC: u8 = 0x02;

    /// No lock at all
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw flag bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::OFDM | Self::FEC))
    }

    /// Raw flag bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// OFDM lock acquired
    #[must_use]
    pub const fn ofdm_locked(self) -> bool {
        self.0 & Self::OFDM != 0
    }

    /// FEC sync acquired
    #[must_use]
    pub const fn fec_locked(self) -> bool {
        self.0 & Self::FEC != 0
    }

    /// Both OFDM and FEC are locked, the channel is usable
    #[must_use]
    pub const fn is_channel_locked(self) -> bool {
        self.0 == Self::OFDM | Self::FEC
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LockStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Lock(ofdm={}, fec={})",
            self.ofdm_locked(),
            self.fec_locked()
        );
    }
}
