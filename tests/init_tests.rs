//! Bring-up Tests
//!
//! Tests for initialization, standby, stream output and diversity control
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test init_tests

mod common;

use common::{rig, MockBusError};
use mtv_tdmb::config::{HardwareProfile, HostInterface};
use mtv_tdmb::error::{Error, TunerError};
use mtv_tdmb::hal::Page;
use mtv_tdmb::tdmb::regs::{comm, dd, host, ofdm, rf};
use mtv_tdmb::types::{AdcClock, ChipIndex, CountryBand, ServiceType};

const MASTER: ChipIndex = ChipIndex::MASTER;
const SLAVE: ChipIndex = ChipIndex::SLAVE;

// ============================================================================
// Initialize Tests
// ============================================================================

#[test]
fn initialize_korea_programs_chip_and_rf() {
    let r = rig(HardwareProfile::new());
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    assert_eq!(r.tuner.initialized(), vec![0]);
    assert_eq!(r.delay.total_ms(), 100);
    // RF trim is the very last write
    assert_eq!(r.bus.writes().last(), Some(&(Page::Rf, rf::TRIM, rf::TRIM_VALUE)));

    assert_eq!(r.bus.writes_to(Page::Ofdm, 0x11), vec![0x8E]);
    assert_eq!(r.bus.value(Page::Comm, comm::ADC_CLOCK), 0x01);
    assert_eq!(r.bus.value(Page::Comm, comm::CIF_CTRL), 0x10);
    assert_eq!(r.bus.value(Page::Host, host::INTR_MASK_L), 0xFF);
    assert_eq!(r.bus.value(Page::Dd, dd::MEM_CTRL) & dd::FIC_MEM_ENABLE, 0);
    assert_eq!(r.bus.value(Page::Fec, 0x7D) & 0x10, 0x10);
}

#[test]
fn initialize_writes_adc_timing_for_clock() {
    let r = rig(HardwareProfile::new().with_adc_clock(AdcClock::Mhz9_6));
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    assert_eq!(r.bus.value(Page::Comm, comm::ADC_CLOCK), 0x31);
    assert_eq!(r.bus.value(Page::Ofdm, 0x3C), 0x69);
    assert_eq!(r.bus.value(Page::Ofdm, 0x3F), 0x36);
    assert_eq!(r.tdmb.chip_state(MASTER).unwrap().adc_clock(), AdcClock::Mhz9_6);
}

#[test]
fn initialize_rejects_other_bands_without_writes() {
    for band in [CountryBand::BandIii, CountryBand::LBand] {
        let r = rig(HardwareProfile::new());
        assert_eq!(
            r.tdmb.initialize(MASTER, band),
            Err(Error::InvalidCountryBand)
        );
        assert!(r.bus.writes().is_empty());
        assert!(r.tuner.initialized().is_empty());
    }
}

#[test]
fn initialize_rejects_missing_slave() {
    let r = rig(HardwareProfile::new());
    assert_eq!(
        r.tdmb.initialize(SLAVE, CountryBand::Korea),
        Err(Error::InvalidChipIndex(1))
    );
    assert_eq!(r.bus.access_count(), 0);
}

#[test]
fn initialize_slave_on_dual_board() {
    let r = rig(HardwareProfile::new().with_dual_chip(true));
    r.tdmb.initialize(SLAVE, CountryBand::Korea).unwrap();

    assert_eq!(r.tuner.initialized(), vec![1]);
    assert_eq!(r.bus.writes_on(SLAVE, Page::Rf, rf::TRIM), vec![rf::TRIM_VALUE]);
    assert!(r.bus.writes_on(MASTER, Page::Rf, rf::TRIM).is_empty());
}

#[test]
fn initialize_resets_chip_state() {
    let r = rig(HardwareProfile::new());
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();
    r.tdmb
        .open_sub_channel(MASTER, 181_280, 5, ServiceType::AudioData, 188)
        .unwrap();
    r.tdmb.open_fic(MASTER).unwrap();

    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    let state = r.tdmb.chip_state(MASTER).unwrap();
    assert_eq!(state.previous_frequency_khz(), 0);
    assert!(state.used_hw_slots().is_empty());
    assert!(state.registered_ids().is_empty());
    assert!(!state.fic_configured());
    assert!(r.tdmb.open_sub_channels(MASTER).unwrap().is_empty());
}

#[test]
fn initialize_reports_tuner_failure() {
    let r = rig(HardwareProfile::new());
    r.tuner.fail_with(Some(TunerError::NotResponding));

    assert_eq!(
        r.tdmb.initialize(MASTER, CountryBand::Korea),
        Err(Error::Tuner(TunerError::NotResponding))
    );
    assert!(r.bus.writes_to(Page::Rf, rf::TRIM).is_empty());
}

#[test]
fn initialize_reports_bus_failure() {
    let r = rig(HardwareProfile::new());
    r.bus.fail_on_page(Page::Fec);

    assert_eq!(
        r.tdmb.initialize(MASTER, CountryBand::Korea),
        Err(Error::Bus(MockBusError))
    );
    assert!(r.tuner.initialized().is_empty());
}

#[test]
fn initialize_tsif_cif_output() {
    let profile = HardwareProfile::new()
        .with_host_interface(HostInterface::Mpeg2SerialTsif)
        .with_cif_mode(true);
    let r = rig(profile);
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    assert_eq!(r.bus.value(Page::Comm, comm::CIF_CTRL), 0x30);
    assert_eq!(r.bus.value(Page::Dd, dd::CIF_TSIF_FORMAT), 0xF4);
    assert_eq!(r.bus.value(Page::Dd, dd::HEAD_CTRL) & 0x03, 0x03);
    assert_eq!(r.bus.value(Page::Comm, comm::TSIF_CTRL), comm::TSIF_CIF);
    // no stream enable on TSIF boards
    assert!(r.bus.writes_to(Page::Fec, 0x7D).is_empty());
}

#[test]
fn initialize_tsif_individual_output() {
    let profile = HardwareProfile::new().with_host_interface(HostInterface::SpiSlave);
    let r = rig(profile);
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    assert_eq!(r.bus.value(Page::Comm, comm::TSIF_CTRL), comm::TSIF_INDIVIDUAL);
    assert!(r.bus.writes_to(Page::Dd, dd::CIF_TSIF_FORMAT).is_empty());
}

#[test]
fn initialize_parallel_tsif_leaves_stream_enable() {
    let profile = HardwareProfile::new()
        .with_host_interface(HostInterface::Mpeg2ParallelTsif)
        .with_cif_mode(true);
    let r = rig(profile);
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    assert!(r.bus.writes_to(Page::Comm, comm::TSIF_CTRL).is_empty());
    assert!(r.bus.writes_to(Page::Dd, dd::CIF_TSIF_FORMAT).is_empty());
}

#[test]
fn initialize_writes_fec_table() {
    let r = rig(HardwareProfile::new());
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();
    assert_eq!(r.bus.value(Page::Fec, 0x80), 0x80);
    assert_eq!(r.bus.value(Page::Fec, 0x81), 0xFF);
    assert_eq!(r.bus.value(Page::Fec, 0xA5), 0xA0);
}

// ============================================================================
// Standby / Stream Output Tests
// ============================================================================

#[test]
fn standby_toggles_only_standby_bit() {
    let r = rig(HardwareProfile::new());
    r.bus.set(Page::Rf, rf::POWER_CTRL, 0x81);

    r.tdmb.standby(MASTER, true).unwrap();
    assert_eq!(r.bus.value(Page::Rf, rf::POWER_CTRL), 0x85);

    r.tdmb.standby(MASTER, false).unwrap();
    assert_eq!(r.bus.value(Page::Rf, rf::POWER_CTRL), 0x81);
}

#[test]
fn disable_stream_out_masks_interrupts_on_spi() {
    let r = rig(HardwareProfile::new());
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();
    r.tdmb
        .open_sub_channel(MASTER, 181_280, 1, ServiceType::AudioData, 188)
        .unwrap();
    assert_ne!(r.bus.value(Page::Host, host::INTR_MASK_L), 0xFF);

    r.tdmb.disable_stream_out(MASTER).unwrap();
    assert_eq!(r.bus.value(Page::Host, host::INTR_MASK_L), 0xFF);
}

#[test]
fn disable_stream_out_stops_tsif() {
    let profile = HardwareProfile::new().with_host_interface(HostInterface::QualcommTsif);
    let r = rig(profile);
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();

    r.tdmb.disable_stream_out(MASTER).unwrap();
    assert_eq!(r.bus.value(Page::Comm, comm::TSIF_CTRL), comm::TSIF_OFF);
}

#[test]
fn reopen_restores_stream_after_disable() {
    let profile = HardwareProfile::new().with_host_interface(HostInterface::QualcommTsif);
    let r = rig(profile);
    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();
    r.tdmb
        .open_sub_channel(MASTER, 181_280, 1, ServiceType::AudioData, 188)
        .unwrap();
    r.tdmb.disable_stream_out(MASTER).unwrap();

    // same frequency, same ID: only the stream output comes back
    r.tdmb
        .open_sub_channel(MASTER, 181_280, 1, ServiceType::AudioData, 188)
        .unwrap();
    assert_eq!(r.bus.value(Page::Comm, comm::TSIF_CTRL), comm::TSIF_INDIVIDUAL);
    assert_eq!(r.tdmb.open_sub_channels(MASTER).unwrap().len(), 1);
}

// ============================================================================
// Diversity Tests
// ============================================================================

#[test]
fn diversity_needs_dual_chip() {
    let r = rig(HardwareProfile::new());
    assert_eq!(r.tdmb.enable_diversity(), Err(Error::DiversityUnavailable));
    assert_eq!(r.tdmb.disable_diversity(), Err(Error::DiversityUnavailable));
    assert!(!r.tdmb.is_diversity_enabled());
    assert_eq!(r.bus.access_count(), 0);
}

#[test]
fn diversity_enable_programs_both_roles() {
    let r = rig(HardwareProfile::new().with_dual_chip(true));
    r.tdmb.enable_diversity().unwrap();

    assert!(r.tdmb.is_diversity_enabled());
    assert_eq!(r.bus.writes_on(MASTER, Page::Ofdm, ofdm::DIVERSITY_ROLE), vec![0xC0]);
    assert_eq!(r.bus.writes_on(SLAVE, Page::Ofdm, ofdm::DIVERSITY_ROLE), vec![0xE0]);
    assert_eq!(r.bus.writes_on(MASTER, Page::Comm, comm::DIVERSITY_CTRL), vec![0x85]);
    assert_eq!(r.bus.writes_on(SLAVE, Page::Comm, comm::DIVERSITY_CTRL), vec![0x83]);
    assert_eq!(r.bus.writes_on(SLAVE, Page::Ofdm, ofdm::DIVERSITY_INPUT), vec![0x68]);
    assert_eq!(r.bus.value_on(SLAVE, Page::Ofdm, ofdm::DIVERSITY_SYNC) & 0x01, 0x01);
}

#[test]
fn diversity_enable_is_idempotent() {
    let r = rig(HardwareProfile::new().with_dual_chip(true));
    r.tdmb.enable_diversity().unwrap();
    let accesses = r.bus.access_count();

    r.tdmb.enable_diversity().unwrap();
    assert_eq!(r.bus.access_count(), accesses);
}

#[test]
fn diversity_disable_restores_single_chip_setup() {
    let r = rig(HardwareProfile::new().with_dual_chip(true));
    // nothing to undo yet
    r.tdmb.disable_diversity().unwrap();
    assert_eq!(r.bus.access_count(), 0);

    r.tdmb.enable_diversity().unwrap();
    r.tdmb.disable_diversity().unwrap();

    assert!(!r.tdmb.is_diversity_enabled());
    for chip in [MASTER, SLAVE] {
        assert_eq!(r.bus.value_on(chip, Page::Ofdm, ofdm::DIVERSITY_COMBINE), 0x10);
        assert_eq!(r.bus.value_on(chip, Page::Ofdm, ofdm::DIVERSITY_INPUT), 0x40);
        assert_eq!(r.bus.value_on(chip, Page::Comm, comm::DIVERSITY_WEIGHT), 0x40);
    }
}

#[test]
fn diversity_serial_tsif_inputs() {
    let profile = HardwareProfile::new()
        .with_dual_chip(true)
        .with_host_interface(HostInterface::SpiSlave);
    let r = rig(profile);
    r.tdmb.enable_diversity().unwrap();
    assert_eq!(r.bus.value_on(MASTER, Page::Ofdm, ofdm::DIVERSITY_INPUT), 0x69);

    r.tdmb.disable_diversity().unwrap();
    assert_eq!(r.bus.value_on(SLAVE, Page::Ofdm, ofdm::DIVERSITY_INPUT), 0x29);
    assert_eq!(r.bus.value_on(SLAVE, Page::Ofdm, ofdm::DIVERSITY_ROLE), 0xF4);
}

#[test]
fn initialize_clears_diversity() {
    let r = rig(HardwareProfile::new().with_dual_chip(true));
    r.tdmb.enable_diversity().unwrap();

    r.tdmb.initialize(MASTER, CountryBand::Korea).unwrap();
    assert!(!r.tdmb.is_diversity_enabled());
}
