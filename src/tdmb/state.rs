//! Per-chip driver state

use super::regs::intr;
use super::slots::{RegistrationMask, SlotMask, SubChannelIdSet};
use crate::config::MAX_REGISTRATIONS;
use crate::types::{AdcClock, CountryBand, ServiceType};

/// One open sub-channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SubChannelRegistration {
    /// Logical sub-channel ID (0 to 63)
    pub sub_channel_id: u8,
    /// Hardware decode slot (0, or 3 to 6)
    pub hw_slot: u8,
    /// Service carried
    pub service_type: ServiceType,
    /// MSC memory interrupt threshold in bytes
    pub threshold_size: u32,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SubChannelRegistration {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "SubCh(id={}, slot={}, {}, th={})",
            self.sub_channel_id,
            self.hw_slot,
            self.service_type,
            self.threshold_size
        );
    }
}

/// Bookkeeping of one demodulator
#[derive(Clone, Debug)]
pub struct ChipState {
    previous_frequency_khz: u32,
    pub(crate) used_hw_slots: SlotMask,
    registered_slots: RegistrationMask,
    registered_ids: SubChannelIdSet,
    registrations: [SubChannelRegistration; MAX_REGISTRATIONS],
    pub(crate) fic_configured: bool,
    pub(crate) intr_mask_l: u8,
    country_band: CountryBand,
    adc_clock: AdcClock,
}

impl ChipState {
    /// Nothing open, all interrupts masked
    #[must_use]
    pub const fn new(country_band: CountryBand, adc_clock: AdcClock) -> Self {
        Self {
            previous_frequency_khz: 0,
            used_hw_slots: SlotMask::new(),
            registered_slots: RegistrationMask::new(),
            registered_ids: SubChannelIdSet::new(),
            registrations: [SubChannelRegistration {
                sub_channel_id: 0,
                hw_slot: 0,
                service_type: ServiceType::AudioData,
                threshold_size: 0,
            }; MAX_REGISTRATIONS],
            fic_configured: false,
            intr_mask_l: intr::ALL,
            country_band,
            adc_clock,
        }
    }

    /// Frequency of the last scan or frequency-changing open
    #[must_use]
    pub const fn previous_frequency_khz(&self) -> u32 {
        self.previous_frequency_khz
    }

    pub(crate) fn set_previous_frequency_khz(&mut self, khz: u32) {
        self.previous_frequency_khz = khz;
    }

    /// Occupied hardware slots
    #[must_use]
    pub const fn used_hw_slots(&self) -> SlotMask {
        self.used_hw_slots
    }

    /// Open sub-channel IDs
    #[must_use]
    pub const fn registered_ids(&self) -> SubChannelIdSet {
        self.registered_ids
    }

    /// Occupied registration table entries
    #[must_use]
    pub const fn registered_slots(&self) -> RegistrationMask {
        self.registered_slots
    }

    /// FIC memory opened
    #[must_use]
    pub const fn fic_configured(&self) -> bool {
        self.fic_configured
    }

    /// Band this chip was initialized for
    #[must_use]
    pub const fn country_band(&self) -> CountryBand {
        self.country_band
    }

    /// ADC clock thresholds are looked up with
    #[must_use]
    pub const fn adc_clock(&self) -> AdcClock {
        self.adc_clock
    }

    /// Registration in table entry `index`, if occupied
    #[must_use]
    pub fn registration(&self, index: usize) -> Option<&SubChannelRegistration> {
        if self.registered_slots.is_set(index) {
            self.registrations.get(index)
        } else {
            None
        }
    }

    /// Table entry holding `sub_channel_id`
    #[must_use]
    pub fn find(&self, sub_channel_id: u8) -> Option<usize> {
        self.registered_slots
            .iter()
            .find(|&i| self.registrations[i].sub_channel_id == sub_channel_id)
    }

    /// Open registrations in table order
    pub fn registrations(&self) -> impl Iterator<Item = &SubChannelRegistration> + '_ {
        self.registered_slots.iter().map(|i| &self.registrations[i])
    }

    /// Lowest free table entry below `capacity`
    #[must_use]
    pub fn free_entry(&self, capacity: usize) -> Option<usize> {
        (0..capacity.min(MAX_REGISTRATIONS)).find(|&i| !self.registered_slots.is_set(i))
    }

    /// Record an open sub-channel in table entry `index`
    pub(crate) fn register(&mut self, index: usize, registration: SubChannelRegistration) {
        self.registrations[index] = registration;
        self.registered_slots.reserve(index);
        self.used_hw_slots.reserve(usize::from(registration.hw_slot));
        self.registered_ids
            .reserve(usize::from(registration.sub_channel_id));
    }

    /// Drop table entry `index`, returning what it held
    pub(crate) fn deregister(&mut self, index: usize) -> Option<SubChannelRegistration> {
        let registration = *self.registration(index)?;
        self.used_hw_slots.release(usize::from(registration.hw_slot));
        self.registered_slots.release(index);
        self.registered_ids
            .release(usize::from(registration.sub_channel_id));
        Some(registration)
    }
}
