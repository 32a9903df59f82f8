//! T-DMB demodulator driver
//!
//! [`Tdmb`] owns the register bus, the RF tuner, the delay provider and
//! the state of every chip behind one blocking mutex. Each public call
//! runs its whole register sequence inside a single lock acquisition.
//!
//! # Channel changes
//!
//! Scans and frequency-changing opens raise a per-chip channel-changing
//! flag before they take the lock and lower it after they release it.
//! Signal quality accessors check the flag first and report zero without
//! waiting for the lock while it is raised.
//!
//! # Locking
//!
//! The lock is held across the delays of a sequence, and a scan can keep
//! it for more than a second. With `CriticalSectionRawMutex` on a
//! single-core MCU that means interrupts stay off for the whole scan and
//! a timer-driven `Delay` never completes. Use `NoopRawMutex` when the
//! driver lives in one executor, or `ThreadModeRawMutex` when it is only
//! used from thread mode. Keep `CriticalSectionRawMutex` for hosts where
//! the critical section is a real OS lock.
//!
//! # Example
//!
//! ```ignore
//! let tdmb: Tdmb<NoopRawMutex, _, _, _> =
//!     Tdmb::new(HardwareProfile::new(), bus, tuner, Delay);
//! tdmb.initialize(ChipIndex::MASTER, CountryBand::Korea)?;
//! if tdmb.scan_frequency(ChipIndex::MASTER, 181_280)?.is_detected() {
//!     tdmb.open_fic(ChipIndex::MASTER)?;
//! }
//! ```

pub mod regs;

mod fic;
mod init;
mod quality;
mod scan;
mod slots;
mod state;
mod subchannel;

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;

use crate::config::{HardwareProfile, FIC_SIZE, MAX_CHIPS, MAX_REGISTRATIONS};
use crate::error::{Error, TdmbResult};
use crate::hal::{PagedBus, RegisterBus, RfTuner};
use crate::types::{ChipIndex, CountryBand, LockStatus, ServiceType};

pub use quality::{cnr_db, cnr_from_raw, rssi_dbm, rssi_from_gain_monitors};
pub use scan::{ScanOutcome, ScanReject, ScanThresholds};
pub use slots::{BitSet, RegistrationMask, SlotMask, SubChannelIdSet};
pub use state::{ChipState, SubChannelRegistration};

/// Registrations returned by [`Tdmb::open_sub_channels`]
pub type OpenSubChannels = heapless::Vec<SubChannelRegistration, MAX_REGISTRATIONS>;

struct Inner<B, R, D> {
    bus: PagedBus<B>,
    tuner: R,
    delay: D,
    chips: [ChipState; MAX_CHIPS],
    diversity_enabled: bool,
}

/// Everything one chip operation works on, borrowed from the locked state
pub(crate) struct Session<'a, B, R, D> {
    pub(crate) bus: &'a mut PagedBus<B>,
    pub(crate) tuner: &'a mut R,
    pub(crate) delay: &'a mut D,
    pub(crate) state: &'a mut ChipState,
    pub(crate) chip: ChipIndex,
    pub(crate) profile: &'a HardwareProfile,
    pub(crate) diversity_enabled: &'a mut bool,
}

/// Raised channel-changing flag, lowered on drop
struct ChannelChange<'a>(&'a AtomicBool);

impl<'a> ChannelChange<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ChannelChange<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// mtv818 T-DMB demodulator driver
///
/// Every call holds the `M` lock for its whole register sequence,
/// including the delays in it. See the module docs for picking `M`.
pub struct Tdmb<M: RawMutex, B, R, D> {
    profile: HardwareProfile,
    channel_changing: [AtomicBool; MAX_CHIPS],
    inner: Mutex<M, RefCell<Inner<B, R, D>>>,
}

impl<M, B, R, D> Tdmb<M, B, R, D>
where
    M: RawMutex,
    B: RegisterBus,
    R: RfTuner<B>,
    D: DelayNs,
{
    /// Create a driver; call [`Self::initialize`] for every chip before use
    #[must_use]
    pub fn new(profile: HardwareProfile, bus: B, tuner: R, delay: D) -> Self {
        let adc_clock = profile.adc_clock();
        Self {
            profile,
            channel_changing: [AtomicBool::new(false), AtomicBool::new(false)],
            inner: Mutex::new(RefCell::new(Inner {
                bus: PagedBus::new(bus),
                tuner,
                delay,
                chips: [
                    ChipState::new(CountryBand::Korea, adc_clock),
                    ChipState::new(CountryBand::Korea, adc_clock),
                ],
                diversity_enabled: false,
            })),
        }
    }

    /// Hardware profile this driver was built with
    #[must_use]
    pub const fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    /// Tear the driver down and return its collaborators
    pub fn release(self) -> (B, R, D) {
        let inner = self.inner.into_inner().into_inner();
        (inner.bus.release(), inner.tuner, inner.delay)
    }

    /// A scan or retune is in progress on `chip`
    #[must_use]
    pub fn is_channel_changing(&self, chip: ChipIndex) -> bool {
        self.channel_changing[chip.as_usize()].load(Ordering::Acquire)
    }

    /// Copy of the state of `chip`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] when the board lacks the chip.
    pub fn chip_state(&self, chip: ChipIndex) -> TdmbResult<ChipState, B::Error> {
        self.check_chip(chip)?;
        Ok(self
            .inner
            .lock(|cell| cell.borrow().chips[chip.as_usize()].clone()))
    }

    /// Program the demodulator of `chip` and bring its RF front end up
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`], [`Error::InvalidCountryBand`] for any
    /// band but Korea, bus and tuner failures.
    pub fn initialize(&self, chip: ChipIndex, band: CountryBand) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.initialize(band))
    }

    /// Put the RF front end of `chip` into or out of standby
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn standby(&self, chip: ChipIndex, on: bool) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.standby(on))
    }

    /// Stop MSC data leaving `chip`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn disable_stream_out(&self, chip: ChipIndex) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.disable_stream_out())
    }

    /// Open a sub-channel, retuning first when `frequency_khz` differs
    /// from the previous frequency
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSubChannelId`], [`Error::InvalidThresholdSize`],
    /// [`Error::NoMoreSubChannels`], bus failures, and tuner failures of
    /// the retune (reported after the sub-channel was opened).
    pub fn open_sub_channel(
        &self,
        chip: ChipIndex,
        frequency_khz: u32,
        sub_channel_id: u8,
        service_type: ServiceType,
        threshold_size: u32,
    ) -> TdmbResult<(), B::Error> {
        self.check_chip(chip)?;
        let threshold_size = self.profile.effective_threshold(threshold_size);
        subchannel::validate(&self.profile, sub_channel_id, threshold_size)?;

        // Raised under the lock so the retune decision cannot go stale,
        // lowered once the lock is released
        let mut changing = None;
        let opened = self.with_session(chip, |s| {
            if s.state.previous_frequency_khz() != frequency_khz {
                changing = Some(self.begin_channel_change(chip));
            }
            s.open_sub_channel(frequency_khz, sub_channel_id, service_type, threshold_size)
        });
        drop(changing);
        opened
    }

    /// Close a sub-channel; unknown IDs succeed
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn close_sub_channel(
        &self,
        chip: ChipIndex,
        sub_channel_id: u8,
    ) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.close_sub_channel(sub_channel_id))
    }

    /// Close every open sub-channel of `chip`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn close_all_sub_channels(&self, chip: ChipIndex) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.close_all_sub_channels())
    }

    /// Registrations currently open on `chip`, in table order
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`].
    pub fn open_sub_channels(&self, chip: ChipIndex) -> TdmbResult<OpenSubChannels, B::Error> {
        self.check_chip(chip)?;
        Ok(self.inner.lock(|cell| {
            cell.borrow().chips[chip.as_usize()]
                .registrations()
                .copied()
                .collect()
        }))
    }

    /// `sub_channel_id` is open on `chip`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`].
    pub fn is_sub_channel_open(
        &self,
        chip: ChipIndex,
        sub_channel_id: u8,
    ) -> TdmbResult<bool, B::Error> {
        self.check_chip(chip)?;
        Ok(self.inner.lock(|cell| {
            cell.borrow().chips[chip.as_usize()]
                .registered_ids()
                .is_set(usize::from(sub_channel_id))
        }))
    }

    /// Frequency of the last scan or frequency-changing open
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`].
    pub fn previous_frequency(&self, chip: ChipIndex) -> TdmbResult<u32, B::Error> {
        self.check_chip(chip)?;
        Ok(self
            .inner
            .lock(|cell| cell.borrow().chips[chip.as_usize()].previous_frequency_khz()))
    }

    /// Check whether `frequency_khz` carries a T-DMB ensemble
    ///
    /// Closes every open sub-channel. The frequency becomes the previous
    /// frequency whatever the outcome.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`], bus failures and tuner failures.
    /// Negative scans are [`ScanOutcome`] values, not errors.
    pub fn scan_frequency(
        &self,
        chip: ChipIndex,
        frequency_khz: u32,
    ) -> TdmbResult<ScanOutcome, B::Error> {
        self.check_chip(chip)?;
        let _changing = self.begin_channel_change(chip);
        self.with_session(chip, |s| s.scan_frequency(frequency_khz))
    }

    /// Enable the FIC memory of `chip`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn open_fic(&self, chip: ChipIndex) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.open_fic())
    }

    /// Disable the FIC memory of `chip`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn close_fic(&self, chip: ChipIndex) -> TdmbResult<(), B::Error> {
        self.with_session(chip, |s| s.close_fic())
    }

    /// Read one FIC burst, returns the number of bytes read
    ///
    /// # Errors
    ///
    /// [`Error::FicNotOpened`], [`Error::FicReadTimeout`] when polling
    /// gives up (the buffer is left untouched), bus failures.
    pub fn read_fic(
        &self,
        chip: ChipIndex,
        buffer: &mut [u8; FIC_SIZE],
    ) -> TdmbResult<usize, B::Error> {
        self.with_session(chip, |s| s.read_fic(buffer))
    }

    /// OFDM and FEC lock flags
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn lock_status(&self, chip: ChipIndex) -> TdmbResult<LockStatus, B::Error> {
        if self.is_channel_changing(chip) {
            debug!("lock status: channel changing");
            return Ok(LockStatus::empty());
        }
        self.with_session(chip, |s| s.lock_status())
    }

    /// Packet error count of the RS decoder
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn per(&self, chip: ChipIndex) -> TdmbResult<u32, B::Error> {
        if self.is_channel_changing(chip) {
            debug!("PER: channel changing");
            return Ok(0);
        }
        self.with_session(chip, |s| s.per())
    }

    /// RSSI in tenths of a dBm
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn rssi(&self, chip: ChipIndex) -> TdmbResult<i32, B::Error> {
        if self.is_channel_changing(chip) {
            debug!("RSSI: channel changing");
            return Ok(0);
        }
        self.with_session(chip, |s| s.rssi())
    }

    /// CNR in thousandths of a dB
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn cnr(&self, chip: ChipIndex) -> TdmbResult<u32, B::Error> {
        if self.is_channel_changing(chip) {
            debug!("CNR: channel changing");
            return Ok(0);
        }
        self.with_session(chip, |s| s.cnr())
    }

    /// MSC channel bit errors
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn cer(&self, chip: ChipIndex) -> TdmbResult<u32, B::Error> {
        if self.is_channel_changing(chip) {
            debug!("CER: channel changing");
            return Ok(0);
        }
        self.with_session(chip, |s| s.cer())
    }

    /// Bit error rate, errors per 100 000 bits
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChipIndex`] and bus failures.
    pub fn ber(&self, chip: ChipIndex) -> TdmbResult<u32, B::Error> {
        if self.is_channel_changing(chip) {
            debug!("BER: channel changing");
            return Ok(0);
        }
        self.with_session(chip, |s| s.ber())
    }

    /// Combine master and slave in diversity; repeated calls are no-ops
    ///
    /// # Errors
    ///
    /// [`Error::DiversityUnavailable`] on single-chip boards, bus failures.
    pub fn enable_diversity(&self) -> TdmbResult<(), B::Error> {
        if !self.profile.is_dual_chip() {
            return Err(Error::DiversityUnavailable);
        }
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if inner.diversity_enabled {
                return Ok(());
            }
            init::enable_diversity(&mut inner.bus, &self.profile)?;
            inner.diversity_enabled = true;
            Ok(())
        })
    }

    /// Split master and slave again; repeated calls are no-ops
    ///
    /// # Errors
    ///
    /// [`Error::DiversityUnavailable`] on single-chip boards, bus failures.
    pub fn disable_diversity(&self) -> TdmbResult<(), B::Error> {
        if !self.profile.is_dual_chip() {
            return Err(Error::DiversityUnavailable);
        }
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if !inner.diversity_enabled {
                return Ok(());
            }
            init::disable_diversity(&mut inner.bus, &self.profile)?;
            inner.diversity_enabled = false;
            Ok(())
        })
    }

    /// Diversity combining is active
    #[must_use]
    pub fn is_diversity_enabled(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().diversity_enabled)
    }

    fn check_chip(&self, chip: ChipIndex) -> TdmbResult<(), B::Error> {
        if chip.as_u8() < self.profile.chip_count() {
            Ok(())
        } else {
            Err(Error::InvalidChipIndex(chip.as_u8()))
        }
    }

    fn begin_channel_change(&self, chip: ChipIndex) -> ChannelChange<'_> {
        trace!("channel change start: {}", chip);
        ChannelChange::raise(&self.channel_changing[chip.as_usize()])
    }

    fn with_session<T>(
        &self,
        chip: ChipIndex,
        f: impl FnOnce(&mut Session<'_, B, R, D>) -> TdmbResult<T, B::Error>,
    ) -> TdmbResult<T, B::Error> {
        self.check_chip(chip)?;
        self.inner.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let Inner {
                bus,
                tuner,
                delay,
                chips,
                diversity_enabled,
            } = &mut *guard;
            bus.chip(chip)?;
            let mut session = Session {
                bus,
                tuner,
                delay,
                state: &mut chips[chip.as_usize()],
                chip,
                profile: &self.profile,
                diversity_enabled,
            };
            f(&mut session)
        })
    }
}
