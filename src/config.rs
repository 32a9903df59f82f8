//! Driver configuration and hardware constants
//!
//! Compile-time limits of the mtv818 demodulator live here as constants.
//! Board-level choices (host interface, slot layout, CIF framing, ADC
//! clock, chip count) are carried at runtime by [`HardwareProfile`].

use crate::error::{Error, TdmbResult};
use crate::types::AdcClock;

/// Number of chips a driver instance can manage (master + slave)
pub const MAX_CHIPS: usize = 2;

/// Sub-channel IDs are 6 bits wide
pub const MAX_SUB_CHANNEL_ID: u8 = 64;

/// Registration table entries per chip
pub const MAX_REGISTRATIONS: usize = 64;

/// Size of one FIC burst in bytes
pub const FIC_SIZE: usize = 384;

/// MPEG-2 transport stream packet size in bytes
pub const TS_PACKET_SIZE: u32 = 188;

/// Largest MSC memory interrupt threshold on SPI/EBI2 interfaces
pub const MAX_THRESHOLD_SIZE: u32 = TS_PACKET_SIZE * 18;

/// Scan-done poll budget (the last iteration reports a timeout)
pub const SCAN_POLL_LIMIT: u32 = 10_000;

/// FIC interrupt status checks in polling mode
pub const FIC_POLL_ATTEMPTS: u32 = 10;

/// CNR values are reported in thousandths of a dB
pub const CNR_DIVIDER: u32 = 1_000;

/// RSSI values are reported in tenths of a dBm
pub const RSSI_DIVIDER: i32 = 10;

/// BER values are reported as errors per 100 000 bits
pub const BER_DIVIDER: u32 = 100_000;

/// Settle time after RF initialization before the trim write
pub const RF_SETTLE_MS: u32 = 100;

/// Host interface carrying MSC data out of the demodulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HostInterface {
    /// SPI master read of the on-chip memory
    #[default]
    Spi,
    /// EBI2 parallel bus read of the on-chip memory
    Ebi2,
    /// SPI slave transport stream output
    SpiSlave,
    /// Serial MPEG-2 TSIF
    Mpeg2SerialTsif,
    /// Parallel MPEG-2 TSIF
    Mpeg2ParallelTsif,
    /// Qualcomm TSIF
    QualcommTsif,
}

impl HostInterface {
    /// Data is pulled from on-chip memory on an interrupt (SPI/EBI2)
    #[must_use]
    pub const fn is_memory_mapped(self) -> bool {
        matches!(self, Self::Spi | Self::Ebi2)
    }

    /// Data is pushed out as a transport stream
    #[must_use]
    pub const fn is_tsif(self) -> bool {
        !self.is_memory_mapped()
    }

    /// Serial transport stream flavours
    #[must_use]
    pub const fn is_serial_tsif(self) -> bool {
        matches!(
            self,
            Self::SpiSlave | Self::Mpeg2SerialTsif | Self::QualcommTsif
        )
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HostInterface {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Spi => defmt::write!(f, "SPI"),
            Self::Ebi2 => defmt::write!(f, "EBI2"),
            Self::SpiSlave => defmt::write!(f, "SPI-slave"),
            Self::Mpeg2SerialTsif => defmt::write!(f, "TSIF-serial"),
            Self::Mpeg2ParallelTsif => defmt::write!(f, "TSIF-parallel"),
            Self::QualcommTsif => defmt::write!(f, "TSIF-qualcomm"),
        }
    }
}

/// Number of sub-channels a chip decodes at once
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SlotMode {
    /// One sub-channel at a time on slot 0
    Single,
    /// Video on slot 0 plus up to four audio/data slots
    #[default]
    Multi,
}

/// How FIC data is retrieved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FicReadMode {
    /// Poll the FIC interrupt status before reading
    #[default]
    Polling,
    /// Read unconditionally; the caller waits for the FIC interrupt
    Direct,
}

/// Runtime hardware configuration of one driver instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareProfile {
    host_interface: HostInterface,
    slot_mode: SlotMode,
    cif_mode: bool,
    fic_read_mode: FicReadMode,
    adc_clock: AdcClock,
    chip_count: u8,
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareProfile {
    /// Single-chip SPI board, multi-slot, individual framing, polled FIC,
    /// 8 MHz ADC clock
    #[must_use]
    pub const fn new() -> Self {
        Self {
            host_interface: HostInterface::Spi,
            slot_mode: SlotMode::Multi,
            cif_mode: false,
            fic_read_mode: FicReadMode::Polling,
            adc_clock: AdcClock::Mhz8,
            chip_count: 1,
        }
    }

    /// Use another host interface
    #[must_use]
    pub const fn with_host_interface(self, host_interface: HostInterface) -> Self {
        Self {
            host_interface,
            ..self
        }
    }

    /// Use another slot layout
    #[must_use]
    pub const fn with_slot_mode(self, slot_mode: SlotMode) -> Self {
        Self { slot_mode, ..self }
    }

    /// Enable or disable CIF (multiplexed) stream framing
    #[must_use]
    pub const fn with_cif_mode(self, cif_mode: bool) -> Self {
        Self { cif_mode, ..self }
    }

    /// Use another FIC read strategy
    #[must_use]
    pub const fn with_fic_read_mode(self, fic_read_mode: FicReadMode) -> Self {
        Self {
            fic_read_mode,
            ..self
        }
    }

    /// Use another ADC clock
    #[must_use]
    pub const fn with_adc_clock(self, adc_clock: AdcClock) -> Self {
        Self { adc_clock, ..self }
    }

    /// Use the ADC clock named by a vendor clock code
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAdcClock`] for codes above 3.
    pub fn with_adc_clock_code<E>(self, code: u8) -> TdmbResult<Self, E> {
        let adc_clock = AdcClock::from_code(code).map_err(Error::UnsupportedAdcClock)?;
        Ok(self.with_adc_clock(adc_clock))
    }

    /// Configure a dual-chip diversity board
    #[must_use]
    pub const fn with_dual_chip(self, dual: bool) -> Self {
        Self {
            chip_count: if dual { 2 } else { 1 },
            ..self
        }
    }

    /// Host interface
    #[must_use]
    pub const fn host_interface(&self) -> HostInterface {
        self.host_interface
    }

    /// Slot layout
    #[must_use]
    pub const fn slot_mode(&self) -> SlotMode {
        self.slot_mode
    }

    /// CIF framing enabled
    #[must_use]
    pub const fn cif_mode(&self) -> bool {
        self.cif_mode
    }

    /// FIC read strategy
    #[must_use]
    pub const fn fic_read_mode(&self) -> FicReadMode {
        self.fic_read_mode
    }

    /// ADC clock
    #[must_use]
    pub const fn adc_clock(&self) -> AdcClock {
        self.adc_clock
    }

    /// Number of chips on the board (1 or 2)
    #[must_use]
    pub const fn chip_count(&self) -> u8 {
        self.chip_count
    }

    /// Diversity needs both chips
    #[must_use]
    pub const fn is_dual_chip(&self) -> bool {
        self.chip_count == 2
    }

    /// Registration table entries usable per chip
    #[must_use]
    pub const fn max_sub_channels(&self) -> usize {
        match self.slot_mode {
            SlotMode::Single => 1,
            SlotMode::Multi => MAX_REGISTRATIONS,
        }
    }

    /// Requested thresholds are replaced by one TS packet
    #[must_use]
    pub const fn forces_ts_threshold(&self) -> bool {
        self.cif_mode || self.host_interface.is_tsif()
    }

    /// Thresholds are bounded by [`MAX_THRESHOLD_SIZE`]
    #[must_use]
    pub const fn checks_threshold_size(&self) -> bool {
        !self.cif_mode && self.host_interface.is_memory_mapped()
    }

    /// MSC memory interrupts are masked and unmasked with the slots
    #[must_use]
    pub const fn uses_msc_interrupts(&self) -> bool {
        self.host_interface.is_memory_mapped()
    }

    /// The FIC interrupt follows Open/CloseFIC
    #[must_use]
    pub const fn uses_fic_interrupt(&self) -> bool {
        let wired = self.host_interface.is_memory_mapped()
            || matches!(self.slot_mode, SlotMode::Single);
        wired && matches!(self.fic_read_mode, FicReadMode::Direct)
    }

    /// Threshold actually programmed for a requested one
    #[must_use]
    pub const fn effective_threshold(&self, requested: u32) -> u32 {
        if self.forces_ts_threshold() {
            TS_PACKET_SIZE
        } else {
            requested
        }
    }
}
