//! Ensemble scan
//!
//! After a retune the demodulator runs its own autocorrelation search
//! and reports a scan-done code. A positive code is then confirmed by a
//! chain of software gates: band/mode, coarse frequency, scan power,
//! pre-AGC gain, null-symbol stability, a fine-check loop and finally
//! OFDM and FEC lock. The first failing gate decides the outcome.

use embedded_hal::delay::DelayNs;

use super::regs::{comm, fec, ofdm};
use super::Session;
use crate::config::SCAN_POLL_LIMIT;
use crate::error::{Error, TdmbResult};
use crate::hal::{Page, RegisterBus, RfTuner};
use crate::types::{AdcClock, CountryBand, TransmissionMode};

/// Null-symbol samples taken per scan
const NULL_SAMPLES: u8 = 16;
/// Longest plausible null symbol
const NULL_LENGTH_MAX: u16 = 3000;
/// Fine-check iterations before giving up on coarse lock
const FINE_CHECKS: u32 = 100;
/// OFDM lock polls once coarse lock is seen
const LOCK_POLLS: u32 = 50;
/// FEC sync retries when only one sync bit is set
const FEC_RETRIES: u32 = 20;
/// Interval of every scan loop
const SCAN_STEP_MS: u32 = 10;

/// Why a frequency was judged empty
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanReject {
    /// Demodulator search ran out of candidates
    ScanOut,
    /// Demodulator found no ensemble
    NoEnsemble,
    /// Transmission mode not allowed in the band
    TransmissionMode,
    /// Coarse frequency offset inside the rejection window
    CoarseFrequency,
    /// Scan power below threshold
    LowScanPower,
    /// Pre-AGC gain below threshold or zero
    LowPreAgcGain,
    /// Transmission mode changed while checking
    ModeChanged,
    /// Too many degenerate null symbols at low gain
    NullSymbol,
    /// Auto-scan control value out of range twice
    AutoScanControl,
    /// I/Q imbalance at low gain
    IqImbalance,
    /// Demodulator FSM stuck at low gain
    FsmUnlock,
    /// OFDM lock lost or never acquired
    OfdmUnlock,
    /// FEC sync not acquired
    FecSyncMiss,
    /// No coarse lock within the fine-check budget
    NoCoarseLock,
}

#[cfg(feature = "embedded")]
impl defmt::Format for ScanReject {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ScanOut => defmt::write!(f, "ScanOut"),
            Self::NoEnsemble => defmt::write!(f, "NoEnsemble"),
            Self::TransmissionMode => defmt::write!(f, "TransmissionMode"),
            Self::CoarseFrequency => defmt::write!(f, "CoarseFrequency"),
            Self::LowScanPower => defmt::write!(f, "LowScanPower"),
            Self::LowPreAgcGain => defmt::write!(f, "LowPreAgcGain"),
            Self::ModeChanged => defmt::write!(f, "ModeChanged"),
            Self::NullSymbol => defmt::write!(f, "NullSymbol"),
            Self::AutoScanControl => defmt::write!(f, "AutoScanControl"),
            Self::IqImbalance => defmt::write!(f, "IqImbalance"),
            Self::FsmUnlock => defmt::write!(f, "FsmUnlock"),
            Self::OfdmUnlock => defmt::write!(f, "OfdmUnlock"),
            Self::FecSyncMiss => defmt::write!(f, "FecSyncMiss"),
            Self::NoCoarseLock => defmt::write!(f, "NoCoarseLock"),
        }
    }
}

/// Result of a frequency scan
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// An ensemble is present and locked
    Detected,
    /// No usable ensemble
    NotDetected(ScanReject),
    /// The demodulator never finished its search
    Timeout,
}

impl ScanOutcome {
    /// An ensemble was found
    #[must_use]
    pub const fn is_detected(self) -> bool {
        matches!(self, Self::Detected)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ScanOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Detected => defmt::write!(f, "Detected"),
            Self::NotDetected(reason) => defmt::write!(f, "NotDetected({})", reason),
            Self::Timeout => defmt::write!(f, "Timeout"),
        }
    }
}

/// Detection thresholds for one ADC clock and transmission mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanThresholds {
    /// Minimum scan power
    pub power: u16,
    /// Minimum pre-AGC gain
    pub pre_gain: u16,
    /// Fine-check loop budget from the calibration table
    pub inner_loop: u16,
    /// Upper edge of the coarse frequency rejection window
    pub coarse_high: u8,
    /// Lower edge of the coarse frequency rejection window
    pub coarse_low: u8,
}

impl ScanThresholds {
    /// Calibration entry for a clock and mode
    #[must_use]
    pub const fn lookup(adc_clock: AdcClock, mode: TransmissionMode) -> Self {
        let pre_gain = match adc_clock {
            AdcClock::Mhz8 | AdcClock::Mhz8_192 => 405,
            AdcClock::Mhz9 | AdcClock::Mhz9_6 => 380,
        };
        let power = match (adc_clock, mode) {
            (AdcClock::Mhz8, TransmissionMode::I) => 2400,
            (AdcClock::Mhz8, TransmissionMode::Ii) => 2000,
            (AdcClock::Mhz8, TransmissionMode::Iii) => 1300,
            (AdcClock::Mhz8, TransmissionMode::Iv) => 280,
            (AdcClock::Mhz8_192, TransmissionMode::I) => 1700,
            (AdcClock::Mhz8_192, TransmissionMode::Ii) => 1500,
            (AdcClock::Mhz8_192, TransmissionMode::Iii) => 1200,
            (AdcClock::Mhz8_192, TransmissionMode::Iv) => 1900,
            (AdcClock::Mhz9 | AdcClock::Mhz9_6, TransmissionMode::I) => 7000,
            (AdcClock::Mhz9 | AdcClock::Mhz9_6, TransmissionMode::Ii) => 5000,
            (AdcClock::Mhz9 | AdcClock::Mhz9_6, TransmissionMode::Iii) => 1300,
            (AdcClock::Mhz9 | AdcClock::Mhz9_6, TransmissionMode::Iv) => 8000,
        };
        let (inner_loop, coarse_high, coarse_low) = match mode {
            TransmissionMode::I => (200, 206, 55),
            TransmissionMode::Ii => (180, 242, 14),
            TransmissionMode::Iii => (180, 248, 8),
            TransmissionMode::Iv => (180, 230, 26),
        };
        Self {
            power,
            pre_gain,
            inner_loop,
            coarse_high,
            coarse_low,
        }
    }
}

/// Early exit of the gate chain
enum Stop<E> {
    Reject(ScanReject),
    Fault(Error<E>),
}

impl<E> From<Error<E>> for Stop<E> {
    fn from(e: Error<E>) -> Self {
        Self::Fault(e)
    }
}

type Gate<T, E> = Result<T, Stop<E>>;

/// 16-bit I/Q monitor value away from zero in either direction
const fn iq_imbalanced(value: u16) -> bool {
    value > 5 && value < 65530
}

impl<B, R, D> Session<'_, B, R, D>
where
    B: RegisterBus,
    R: RfTuner<B>,
    D: DelayNs,
{
    pub(super) fn scan_frequency(
        &mut self,
        frequency_khz: u32,
    ) -> TdmbResult<ScanOutcome, B::Error> {
        let outcome = self.scan(frequency_khz);
        self.state.set_previous_frequency_khz(frequency_khz);
        debug!("scan {} kHz on {}", frequency_khz, self.chip);
        outcome
    }

    fn scan(&mut self, frequency_khz: u32) -> TdmbResult<ScanOutcome, B::Error> {
        self.close_all_sub_channels()?;
        self.tuner
            .set_frequency(self.bus.inner_mut(), self.chip, frequency_khz)?;

        self.bus.page(Page::Ofdm)?;
        self.bus.write_reg(ofdm::SCAN_CTRL, ofdm::SCAN_START)?;
        self.soft_reset()?;

        for _ in 1..SCAN_POLL_LIMIT {
            self.bus.page(Page::Ofdm)?;
            let scan_done = self.bus.read_reg(ofdm::SCAN_DONE)?;
            self.bus.page(Page::Comm)?;
            let power = self
                .bus
                .read_u16(comm::SCAN_POWER_LO, comm::SCAN_POWER_HI)?;
            self.bus.page(Page::Ofdm)?;

            if scan_done == 0xFF {
                return Ok(ScanOutcome::NotDetected(ScanReject::ScanOut));
            }

            let gain = self.pre_agc_gain()?;
            let mode = self.transmission_mode()?;
            let thresholds = ScanThresholds::lookup(self.state.adc_clock(), mode);

            match scan_done {
                0x01 => return Ok(ScanOutcome::NotDetected(ScanReject::NoEnsemble)),
                0x03 => {
                    let verdict = self.confirm_ensemble(power, gain, mode, &thresholds);
                    return match verdict {
                        Ok(()) => Ok(ScanOutcome::Detected),
                        Err(Stop::Reject(reason)) => {
                            trace!("scan rejected: {}", reason);
                            Ok(ScanOutcome::NotDetected(reason))
                        }
                        Err(Stop::Fault(e)) => Err(e),
                    };
                }
                _ => {}
            }
        }

        warn!("scan timeout at {} kHz", frequency_khz);
        Ok(ScanOutcome::Timeout)
    }

    /// One-shot read of the 10-bit pre-AGC gain
    fn pre_agc_gain(&mut self) -> TdmbResult<u16, B::Error> {
        let mon = self.bus.read_reg(ofdm::PRE_AGC_MON)?;
        self.bus.write_reg(ofdm::PRE_AGC_MON, mon | 0x80)?;
        let lo = self.bus.read_reg(ofdm::PRE_AGC_LO)?;
        let hi = self.bus.read_reg(ofdm::PRE_AGC_HI)?;
        Ok((u16::from(hi) << 2) | u16::from(lo & 0x03))
    }

    /// Transmission mode monitor, OFDM page must be selected
    pub(super) fn transmission_mode(&mut self) -> TdmbResult<TransmissionMode, B::Error> {
        let mon = self.bus.read_reg(ofdm::MODE_MON)?;
        Ok(TransmissionMode::from_bits((mon & 0x30) >> 4))
    }

    fn check_mode(&mut self, expected: TransmissionMode) -> Gate<(), B::Error> {
        if self.transmission_mode()? == expected {
            Ok(())
        } else {
            Err(Stop::Reject(ScanReject::ModeChanged))
        }
    }

    fn confirm_ensemble(
        &mut self,
        power: u16,
        gain: u16,
        mode: TransmissionMode,
        thresholds: &ScanThresholds,
    ) -> Gate<(), B::Error> {
        self.bus.page(Page::Ofdm)?;
        let coarse = self.bus.read_reg(ofdm::COARSE_FREQ)?;

        if self.state.country_band() == CountryBand::Korea && mode != TransmissionMode::I {
            return Err(Stop::Reject(ScanReject::TransmissionMode));
        }
        if coarse < thresholds.coarse_high && coarse > thresholds.coarse_low {
            return Err(Stop::Reject(ScanReject::CoarseFrequency));
        }
        if power < thresholds.power {
            return Err(Stop::Reject(ScanReject::LowScanPower));
        }
        if gain < thresholds.pre_gain || gain == 0 {
            return Err(Stop::Reject(ScanReject::LowPreAgcGain));
        }

        let null_hits = self.sample_null_symbols(mode, gain)?;
        self.fine_check(mode, gain, null_hits)
    }

    /// Count degenerate null symbols over [`NULL_SAMPLES`] samples
    fn sample_null_symbols(&mut self, mode: TransmissionMode, gain: u16) -> Gate<u8, B::Error> {
        let mut hits = 0u8;
        for sample in 0..NULL_SAMPLES {
            if sample > 0 {
                self.delay.delay_ms(SCAN_STEP_MS);
            }
            let ctrl = self.bus.read_reg(ofdm::NULL_CTRL)?;
            self.bus.write_reg(ofdm::NULL_CTRL, ctrl | 0x10)?;
            let lo = self.bus.read_reg(ofdm::NULL_LENGTH_LO)?;
            let hi = self.bus.read_reg(ofdm::MODE_MON)?;
            let length = (u16::from(hi & 0x0F) << 8) | u16::from(lo);
            self.check_mode(mode)?;

            if length == 0 || length > NULL_LENGTH_MAX {
                hits += 1;
            }
        }
        if hits > 10 && gain < 400 {
            return Err(Stop::Reject(ScanReject::NullSymbol));
        }
        Ok(hits)
    }

    fn fine_check(
        &mut self,
        mode: TransmissionMode,
        gain: u16,
        null_hits: u8,
    ) -> Gate<(), B::Error> {
        let mut scv_hits = 0u8;
        let mut fsm_hits = 0u8;
        let mut coarse_count = 0u8;

        for _ in 0..FINE_CHECKS {
            self.delay.delay_ms(SCAN_STEP_MS);

            self.bus.page(Page::Ofdm)?;
            let scv = self.bus.read_reg(ofdm::AUTO_SCAN)? & 0x0F;
            if scv > 7 {
                if scv_hits > 0 {
                    return Err(Stop::Reject(ScanReject::AutoScanControl));
                }
                scv_hits += 1;
            }
            self.check_mode(mode)?;

            self.bus.page(Page::Comm)?;
            self.bus
                .masked_write(comm::IQ_LATCH, comm::IQ_LATCH_STROBE, 0x00)?;
            self.bus
                .masked_write(comm::IQ_LATCH, comm::IQ_LATCH_STROBE, comm::IQ_LATCH_STROBE)?;
            let i = self.bus.read_u16(comm::I_MON_LO, comm::I_MON_HI)?;
            let q = self.bus.read_u16(comm::Q_MON_LO, comm::Q_MON_HI)?;
            if (iq_imbalanced(i) || iq_imbalanced(q)) && gain < 500 {
                return Err(Stop::Reject(ScanReject::IqImbalance));
            }

            self.bus.page(Page::Ofdm)?;
            let fsm = self.bus.read_reg(ofdm::FSM_MON)? & 0x07;
            if fsm == 1 && gain < 600 {
                fsm_hits = fsm_hits.saturating_add(1);
                if null_hits > 14 {
                    fsm_hits = fsm_hits.saturating_add(3);
                }
            }
            if fsm == 1 && fsm_hits > 9 && coarse_count < 2 {
                return Err(Stop::Reject(ScanReject::FsmUnlock));
            }

            coarse_count = self.bus.read_reg(ofdm::COARSE_COUNT)? & 0x1F;
            if coarse_count > 1 {
                return self.confirm_lock();
            }
        }
        Err(Stop::Reject(ScanReject::NoCoarseLock))
    }

    /// Wait for OFDM lock with a live CNR, then check FEC sync
    fn confirm_lock(&mut self) -> Gate<(), B::Error> {
        let mut ofdm_locked = false;
        for _ in 0..LOCK_POLLS {
            self.delay.delay_ms(SCAN_STEP_MS);
            self.bus.page(Page::Ofdm)?;
            ofdm_locked = self.bus.read_reg(ofdm::LOCK)? & ofdm::LOCKED != 0;
            let cnr = self.read_cnr_monitor()?;
            if ofdm_locked && cnr > 0 {
                self.bus.page(Page::Ofdm)?;
                self.bus.write_reg(ofdm::SCAN_CTRL, ofdm::SCAN_STOP)?;
                break;
            }
        }
        if !ofdm_locked {
            return Err(Stop::Reject(ScanReject::OfdmUnlock));
        }

        self.bus.page(Page::Fec)?;
        match self.bus.read_reg(fec::SYNC)? & fec::SYNC_LOCKED {
            fec::SYNC_LOCKED => Ok(()),
            0x02 => self.retry_fec_sync(),
            _ => Err(Stop::Reject(ScanReject::FecSyncMiss)),
        }
    }

    fn retry_fec_sync(&mut self) -> Gate<(), B::Error> {
        for _ in 0..FEC_RETRIES {
            self.delay.delay_ms(SCAN_STEP_MS);
            self.bus.page(Page::Fec)?;
            let sync = self.bus.read_reg(fec::SYNC)? & fec::SYNC_LOCKED;
            self.bus.page(Page::Ofdm)?;
            if self.bus.read_reg(ofdm::LOCK)? & ofdm::LOCKED == 0 {
                return Err(Stop::Reject(ScanReject::OfdmUnlock));
            }
            if sync == fec::SYNC_LOCKED {
                return Ok(());
            }
        }
        Err(Stop::Reject(ScanReject::FecSyncMiss))
    }
}
