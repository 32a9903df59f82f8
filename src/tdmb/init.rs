//! Demodulator bring-up, power and stream control
//!
//! The register tables are the vendor calibration values for the
//! Korean T-DMB band. Table order matters: some registers are written
//! twice on purpose.

use embedded_hal::delay::DelayNs;

use super::regs::{comm, dd, host, intr, ofdm, rf};
use super::state::ChipState;
use super::Session;
use crate::config::{HardwareProfile, HostInterface, RF_SETTLE_MS};
use crate::error::{Error, TdmbResult};
use crate::hal::{Page, PagedBus, RegisterBus, RfTuner};
use crate::types::{AdcClock, ChipIndex, CountryBand};

/// Clock and output setup, written in the OFDM page
const TOP_TABLE: &[(u8, u8)] = &[(0x07, 0x08), (0x05, 0x17), (0x06, 0x10), (0x0A, 0x00)];

const COMM_TABLE: &[(u8, u8)] = &[
    (0x10, 0x91),
    (0xE1, 0x00),
    (0x35, 0x8B),
    (0x3B, 0x3C),
    (0x36, 0x67),
    (0x3A, 0x0F),
    (0x3C, 0x20),
    (0x3D, 0x0B),
    (0x3D, 0x09),
];

const HOST_TABLE: &[(u8, u8)] = &[
    (0x10, 0x00),
    (0x13, 0x16),
    (0x14, 0x00),
    (0x19, 0x0A),
    (0xF0, 0x00),
    (0xF1, 0x00),
    (0xF2, 0x00),
    (0xF3, 0x00),
    (0xF4, 0x00),
    (0xF5, 0x00),
    (0xF6, 0x00),
    (0xF7, 0x00),
    (0xF8, 0x00),
    (0xFB, 0xFF),
];

const OFDM_TABLE: &[(u8, u8)] = &[
    (0x12, 0x04),
    (0x13, 0x72),
    (0x14, 0x63),
    (0x15, 0x64),
    (0x16, 0x6C),
    (0x38, 0x01),
    (0x20, 0x5B),
    (0x25, 0x09),
    (0x44, 0x09),
    (0x46, 0xA0),
    (0x47, 0x0F),
    (0x48, 0xB8),
    (0x49, 0x0B),
    (0x54, 0x58),
    (0x55, 0x06),
    (0x56, 0x10),
    (0x59, 0x51),
    (0x5A, 0x1C),
    (0x6D, 0x00),
    (0x8B, 0x24),
    (0x6B, 0x2D),
    (0x85, 0x32),
    (0x8E, 0x01),
    (0x33, 0x02),
    (0x53, 0x06),
    (0x6F, 0x03),
    (0xBA, 0x08),
];

const OFDM_TAIL_TABLE: &[(u8, u8)] = &[
    (0x42, 0x00),
    (0x43, 0x00),
    (0x94, 0x08),
    (0x98, 0x05),
    (0x99, 0x03),
    (0x9B, 0xCF),
    (0x9C, 0x10),
    (0x9D, 0x1C),
    (0x9F, 0x32),
    (0xA0, 0x90),
    (0xA4, 0x01),
    (0xA8, 0xF6),
    (0xA9, 0x89),
    (0xAA, 0x0C),
    (0xAB, 0x32),
    (0xAC, 0x14),
    (0xAD, 0x09),
    (0xAE, 0xFF),
    (0xEB, 0x6B),
];

const FEC_TABLE: &[(u8, u8)] = &[
    (0x80, 0x80),
    (0x81, 0xFF),
    (0x87, 0x07),
    (0x45, 0xA0),
    (0xDD, 0xD0),
    (0x39, 0x07),
    (0xE6, 0x10),
    (0xA5, 0xA0),
];

/// Korea-only OFDM setting, written before [`OFDM_TABLE`]
const OFDM_KOREA: (u8, u8) = (0x11, 0x8E);

/// FEC output control, stream enable on SPI/EBI2 in individual mode
const FEC_OUTPUT_CTRL: u8 = 0x7D;
const FEC_OUTPUT_STREAM: u8 = 0x10;

/// Clock-dependent timing: COMM 0x6A, then OFDM 0x3C..=0x3F
const fn adc_timing(adc_clock: AdcClock) -> (u8, [u8; 4]) {
    match adc_clock {
        AdcClock::Mhz8 => (0x01, [0x4B, 0x37, 0x89, 0x41]),
        AdcClock::Mhz8_192 => (0x01, [0x00, 0x00, 0x00, 0x40]),
        AdcClock::Mhz9 => (0x21, [0xB5, 0x14, 0x41, 0x3A]),
        AdcClock::Mhz9_6 => (0x31, [0x69, 0x03, 0x9D, 0x36]),
    }
}

/// TSIF output enable value for the profile's framing
const fn tsif_enable(profile: &HardwareProfile) -> u8 {
    if profile.cif_mode() {
        comm::TSIF_CIF
    } else {
        comm::TSIF_INDIVIDUAL
    }
}

impl<B, R, D> Session<'_, B, R, D>
where
    B: RegisterBus,
    R: RfTuner<B>,
    D: DelayNs,
{
    pub(super) fn initialize(&mut self, band: CountryBand) -> TdmbResult<(), B::Error> {
        if self.profile.is_dual_chip() {
            *self.diversity_enabled = false;
        }
        if band != CountryBand::Korea {
            warn!("unsupported country band {}", band);
            return Err(Error::InvalidCountryBand);
        }

        *self.state = ChipState::new(band, self.profile.adc_clock());
        debug!("initialize {} ({})", self.chip, self.profile.adc_clock());

        self.init_demod()?;

        self.tuner.initialize(self.bus.inner_mut(), self.chip)?;
        self.delay.delay_ms(RF_SETTLE_MS);
        self.bus.page(Page::Rf)?;
        self.bus.write_reg(rf::TRIM, rf::TRIM_VALUE)
    }

    fn init_demod(&mut self) -> TdmbResult<(), B::Error> {
        let profile = *self.profile;

        self.bus.page(Page::Ofdm)?;
        self.bus.write_table(TOP_TABLE)?;

        self.bus.page(Page::Comm)?;
        self.bus.write_table(COMM_TABLE)?;
        let cif_tsif = profile.cif_mode() && profile.host_interface().is_serial_tsif();
        self.bus
            .write_reg(comm::CIF_CTRL, if cif_tsif { 0x30 } else { 0x10 })?;
        self.bus.write_reg(0xAA, 0x01)?;

        self.bus.page(Page::Host)?;
        self.bus.write_table(HOST_TABLE)?;

        self.bus.page(Page::Ofdm)?;
        if self.state.country_band() == CountryBand::Korea {
            self.bus.write_reg(OFDM_KOREA.0, OFDM_KOREA.1)?;
        }
        self.bus.write_table(OFDM_TABLE)?;
        let (adc_ctrl, timing) = adc_timing(profile.adc_clock());
        self.bus.page(Page::Comm)?;
        self.bus.write_reg(comm::ADC_CLOCK, adc_ctrl)?;
        self.bus.page(Page::Ofdm)?;
        for (addr, value) in (0x3C..=0x3F).zip(timing) {
            self.bus.write_reg(addr, value)?;
        }
        self.bus.write_table(OFDM_TAIL_TABLE)?;

        self.bus.page(Page::Fec)?;
        if profile.checks_threshold_size() {
            self.bus
                .masked_write(FEC_OUTPUT_CTRL, FEC_OUTPUT_STREAM, FEC_OUTPUT_STREAM)?;
        }
        self.bus.write_table(FEC_TABLE)?;

        self.reset_fic_memory()?;

        self.bus.page(Page::Host)?;
        self.bus.write_reg(host::INTR_MASK_L, self.state.intr_mask_l)?;

        self.bus.page(Page::Dd)?;
        let headers = if profile.cif_mode() { 0x03 } else { 0x00 };
        self.bus.masked_write(dd::HEAD_CTRL, 0x03, headers)?;

        // parallel TSIF output is left to the board
        if profile.host_interface().is_serial_tsif() {
            if profile.cif_mode() {
                self.bus.write_reg(dd::CIF_TSIF_FORMAT, 0xF4)?;
            }
            self.bus.page(Page::Comm)?;
            self.bus.write_reg(comm::TSIF_CTRL, tsif_enable(&profile))?;
        }
        Ok(())
    }

    pub(super) fn standby(&mut self, on: bool) -> TdmbResult<(), B::Error> {
        debug!("standby {}: {}", self.chip, on);
        self.bus.page(Page::Rf)?;
        self.bus
            .masked_write(rf::POWER_CTRL, rf::STANDBY, if on { rf::STANDBY } else { 0 })
    }

    pub(super) fn disable_stream_out(&mut self) -> TdmbResult<(), B::Error> {
        if self.profile.host_interface().is_memory_mapped() {
            self.bus.page(Page::Host)?;
            self.bus.write_reg(host::INTR_MASK_L, intr::ALL)
        } else {
            self.bus.page(Page::Comm)?;
            self.bus.write_reg(comm::TSIF_CTRL, comm::TSIF_OFF)
        }
    }

    /// Undo [`Self::disable_stream_out`] from the shadowed state
    pub(super) fn restore_stream(&mut self) -> TdmbResult<(), B::Error> {
        if self.profile.host_interface().is_memory_mapped() {
            self.bus.page(Page::Host)?;
            self.bus.write_reg(host::INTR_MASK_L, self.state.intr_mask_l)
        } else {
            self.bus.page(Page::Comm)?;
            self.bus.write_reg(comm::TSIF_CTRL, tsif_enable(self.profile))
        }
    }

    /// Assert and release the OFDM/FEC soft reset
    pub(super) fn soft_reset(&mut self) -> TdmbResult<(), B::Error> {
        self.bus.page(Page::Ofdm)?;
        self.bus.write_reg(ofdm::SOFT_RESET, ofdm::RESET_ASSERT)?;
        self.delay.delay_ms(1);
        self.bus.write_reg(ofdm::SOFT_RESET, ofdm::RESET_RELEASE)
    }
}

/// Role-specific diversity values: OFDM role, COMM combiner control
const fn diversity_role(chip: ChipIndex) -> (u8, u8) {
    if chip.as_u8() == 0 {
        (0xC0, 0x85)
    } else {
        (0xE0, 0x83)
    }
}

pub(super) fn enable_diversity<B: RegisterBus>(
    bus: &mut PagedBus<B>,
    profile: &HardwareProfile,
) -> TdmbResult<(), B::Error> {
    for chip in [ChipIndex::MASTER, ChipIndex::SLAVE] {
        let (role, combiner) = diversity_role(chip);
        bus.chip(chip)?;
        bus.page(Page::Ofdm)?;
        if profile.host_interface().is_serial_tsif() {
            bus.write_reg(ofdm::DIVERSITY_INPUT, 0x69)?;
        } else if profile.host_interface() == HostInterface::Spi {
            bus.write_reg(ofdm::DIVERSITY_INPUT, 0x68)?;
        }
        bus.write_reg(ofdm::DIVERSITY_ROLE, role)?;

        bus.page(Page::Comm)?;
        bus.write_reg(comm::DIVERSITY_CTRL, combiner)?;
        bus.write_reg(comm::DIVERSITY_WEIGHT, 0x1E)?;

        bus.page(Page::Ofdm)?;
        bus.write_reg(ofdm::DIVERSITY_COMBINE, 0x50)?;
        bus.masked_write(ofdm::DIVERSITY_SYNC, 0x01, 0x01)?;
    }
    debug!("diversity enabled");
    Ok(())
}

pub(super) fn disable_diversity<B: RegisterBus>(
    bus: &mut PagedBus<B>,
    profile: &HardwareProfile,
) -> TdmbResult<(), B::Error> {
    for chip in [ChipIndex::MASTER, ChipIndex::SLAVE] {
        bus.chip(chip)?;
        bus.page(Page::Ofdm)?;
        if profile.host_interface().is_serial_tsif() {
            bus.write_reg(ofdm::DIVERSITY_INPUT, 0x29)?;
            bus.write_reg(ofdm::DIVERSITY_ROLE, 0xF4)?;
        } else if profile.host_interface() == HostInterface::Spi {
            bus.write_reg(ofdm::DIVERSITY_INPUT, 0x40)?;
            bus.write_reg(ofdm::DIVERSITY_ROLE, 0xF5)?;
        }

        bus.page(Page::Comm)?;
        bus.write_reg(comm::DIVERSITY_CTRL, 0x91)?;
        bus.write_reg(comm::DIVERSITY_WEIGHT, 0x40)?;

        bus.page(Page::Ofdm)?;
        bus.write_reg(ofdm::DIVERSITY_COMBINE, 0x10)?;
    }
    debug!("diversity disabled");
    Ok(())
}
