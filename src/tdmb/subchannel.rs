//! Sub-channel manager
//!
//! Video goes to slot 0, the only slot with a Reed-Solomon decoder, and
//! drains through the MSC1 memory. Audio and data take the lowest free
//! slot of 3 to 6 and share the MSC0 memory. A class memory (and its
//! interrupts on SPI/EBI2) is set up when its first slot opens and reset
//! when its last slot closes.

use embedded_hal::delay::DelayNs;

use super::regs::{dd, host, intr};
use super::slots::{SlotMask, AUDIO_DATA_SLOTS, VIDEO_SLOTS};
use super::state::SubChannelRegistration;
use super::Session;
use crate::config::{HardwareProfile, SlotMode, MAX_SUB_CHANNEL_ID, MAX_THRESHOLD_SIZE};
use crate::error::{Error, TdmbResult};
use crate::hal::{Page, RegisterBus, RfTuner};
use crate::types::ServiceType;

/// Hardware slot decoding video
const VIDEO_SLOT: u8 = 0;

/// Check an open request before anything is touched
///
/// `threshold_size` is the one left after the profile forced TS packets.
pub(super) fn validate<E>(
    profile: &HardwareProfile,
    sub_channel_id: u8,
    threshold_size: u32,
) -> TdmbResult<(), E> {
    if sub_channel_id >= MAX_SUB_CHANNEL_ID {
        return Err(Error::InvalidSubChannelId(sub_channel_id));
    }
    if profile.checks_threshold_size() && threshold_size > MAX_THRESHOLD_SIZE {
        return Err(Error::InvalidThresholdSize(threshold_size));
    }
    Ok(())
}

/// Slots a service can be decoded in
const fn class_slots(service_type: ServiceType) -> SlotMask {
    match service_type {
        ServiceType::Video => VIDEO_SLOTS,
        ServiceType::AudioData => AUDIO_DATA_SLOTS,
    }
}

/// Memory class a hardware slot drains through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MscClass {
    /// Slot 0
    Msc1,
    /// Slots 3 to 6
    Msc0,
}

impl MscClass {
    const fn of_slot(slot: u8) -> Self {
        if slot == VIDEO_SLOT {
            Self::Msc1
        } else {
            Self::Msc0
        }
    }

    const fn slots(self) -> SlotMask {
        match self {
            Self::Msc1 => VIDEO_SLOTS,
            Self::Msc0 => AUDIO_DATA_SLOTS,
        }
    }

    const fn interrupt(self) -> u8 {
        match self {
            Self::Msc1 => intr::MSC1,
            Self::Msc0 => intr::MSC0,
        }
    }

    const fn mask_bits(self) -> u8 {
        match self {
            Self::Msc1 => intr::MSC1_BITS,
            Self::Msc0 => intr::MSC0_BITS,
        }
    }

    const fn memory_enable(self) -> u8 {
        match self {
            Self::Msc1 => dd::MSC1_MEM_ENABLE,
            Self::Msc0 => dd::MSC0_MEM_ENABLE,
        }
    }

    const fn threshold_regs(self) -> (u8, u8) {
        match self {
            Self::Msc1 => (dd::MSC1_THRESHOLD_LO, dd::MSC1_THRESHOLD_HI),
            Self::Msc0 => (dd::MSC0_THRESHOLD_LO, dd::MSC0_THRESHOLD_HI),
        }
    }
}

/// Sub-channel control value of a hardware slot
const fn subch_ctrl(slot: u8, sub_channel_id: u8, enable: bool, rs_enable: bool) -> u8 {
    let mut value = sub_channel_id & dd::SUBCH_ID_MASK;
    if enable {
        value |= dd::SUBCH_ENABLE;
    }
    if slot == VIDEO_SLOT && rs_enable {
        value |= dd::SUBCH_RS_ENABLE;
    }
    value
}

/// Sub-channel control register of a hardware slot
const fn subch_reg(slot: u8) -> u8 {
    if slot == VIDEO_SLOT {
        dd::SUBCH0_CTRL
    } else {
        dd::SUBCH3_CTRL + (slot - 3)
    }
}

impl<B, R, D> Session<'_, B, R, D>
where
    B: RegisterBus,
    R: RfTuner<B>,
    D: DelayNs,
{
    pub(super) fn open_sub_channel(
        &mut self,
        frequency_khz: u32,
        sub_channel_id: u8,
        service_type: ServiceType,
        threshold_size: u32,
    ) -> TdmbResult<(), B::Error> {
        if self.state.previous_frequency_khz() != frequency_khz {
            return self.retune_and_open(
                frequency_khz,
                sub_channel_id,
                service_type,
                threshold_size,
            );
        }

        if self.state.registered_ids().is_set(usize::from(sub_channel_id)) {
            debug!("sub-channel {} already opened", sub_channel_id);
            return self.restore_stream();
        }

        match self.profile.slot_mode() {
            SlotMode::Single => {
                self.close_entry(0)?;
                self.attach(sub_channel_id, service_type, threshold_size)
            }
            SlotMode::Multi => {
                if self
                    .state
                    .used_hw_slots()
                    .contains_all(&class_slots(service_type))
                {
                    warn!("no free slot for {}", service_type);
                    self.restore_stream()?;
                    return Err(Error::NoMoreSubChannels);
                }
                self.attach(sub_channel_id, service_type, threshold_size)?;
                self.restore_stream()
            }
        }
    }

    fn retune_and_open(
        &mut self,
        frequency_khz: u32,
        sub_channel_id: u8,
        service_type: ServiceType,
        threshold_size: u32,
    ) -> TdmbResult<(), B::Error> {
        debug!("retune {} -> {} kHz", self.state.previous_frequency_khz(), frequency_khz);
        self.state.set_previous_frequency_khz(frequency_khz);

        self.close_all_sub_channels()?;
        let tuned = self
            .tuner
            .set_frequency(self.bus.inner_mut(), self.chip, frequency_khz);
        self.attach(sub_channel_id, service_type, threshold_size)?;
        tuned
    }

    pub(super) fn close_sub_channel(&mut self, sub_channel_id: u8) -> TdmbResult<(), B::Error> {
        let entry = match self.profile.slot_mode() {
            SlotMode::Single => Some(0),
            SlotMode::Multi => self.state.find(sub_channel_id),
        };
        match entry {
            Some(index) => self.close_entry(index),
            None => Ok(()),
        }
    }

    pub(super) fn close_all_sub_channels(&mut self) -> TdmbResult<(), B::Error> {
        for index in self.state.registered_slots().iter() {
            self.close_entry(index)?;
        }
        Ok(())
    }

    /// Program a free slot and record the registration
    fn attach(
        &mut self,
        sub_channel_id: u8,
        service_type: ServiceType,
        threshold_size: u32,
    ) -> TdmbResult<(), B::Error> {
        let entry = self
            .state
            .free_entry(self.profile.max_sub_channels())
            .ok_or(Error::NoMoreSubChannels)?;

        let (slot, rs_enable) = match (self.profile.slot_mode(), service_type) {
            (SlotMode::Single, _) => (VIDEO_SLOT, service_type == ServiceType::Video),
            (SlotMode::Multi, ServiceType::Video) => (VIDEO_SLOT, true),
            (SlotMode::Multi, ServiceType::AudioData) => {
                let free = self
                    .state
                    .used_hw_slots()
                    .first_free_in(&AUDIO_DATA_SLOTS)
                    .and_then(|slot| u8::try_from(slot).ok())
                    .ok_or(Error::NoMoreSubChannels)?;
                (free, false)
            }
        };

        let class = MscClass::of_slot(slot);
        let class_was_idle = !self.state.used_hw_slots().intersects(&class.slots());

        self.bus.page(Page::Dd)?;
        self.bus
            .write_reg(subch_reg(slot), subch_ctrl(slot, sub_channel_id, true, rs_enable))?;

        if class_was_idle {
            if self.profile.uses_msc_interrupts() {
                self.bus.write_reg(dd::INT_CLEAR, class.interrupt())?;
                self.state.intr_mask_l &= !class.mask_bits();
                self.bus.page(Page::Host)?;
                self.bus.write_reg(host::INTR_MASK_L, self.state.intr_mask_l)?;
            }
            self.setup_msc_memory(class, threshold_size)?;
        }

        self.state.register(
            entry,
            SubChannelRegistration {
                sub_channel_id,
                hw_slot: slot,
                service_type,
                threshold_size,
            },
        );
        trace!("sub-channel {} on slot {}", sub_channel_id, slot);
        Ok(())
    }

    /// Disable the slot of table entry `index` and forget it
    fn close_entry(&mut self, index: usize) -> TdmbResult<(), B::Error> {
        let Some(registration) = self.state.registration(index).copied() else {
            return Ok(());
        };
        let slot = registration.hw_slot;
        let class = MscClass::of_slot(slot);

        self.bus.page(Page::Dd)?;
        self.bus.write_reg(
            subch_reg(slot),
            subch_ctrl(slot, registration.sub_channel_id, false, false),
        )?;

        self.state.deregister(index);

        if !self.state.used_hw_slots().intersects(&class.slots()) {
            if self.profile.uses_msc_interrupts() {
                self.state.intr_mask_l |= class.mask_bits();
                self.bus.page(Page::Host)?;
                self.bus.write_reg(host::INTR_MASK_L, self.state.intr_mask_l)?;
            }
            self.reset_msc_memory(class)?;
        }
        trace!("sub-channel {} closed", registration.sub_channel_id);
        Ok(())
    }

    fn setup_msc_memory(
        &mut self,
        class: MscClass,
        threshold_size: u32,
    ) -> TdmbResult<(), B::Error> {
        let (lo, hi) = class.threshold_regs();
        let [b0, b1, ..] = threshold_size.to_le_bytes();
        self.bus.page(Page::Dd)?;
        self.bus.masked_write(dd::MEM_CTRL, class.memory_enable(), 0)?;
        self.bus.write_reg(lo, b0)?;
        self.bus.write_reg(hi, b1)?;
        self.bus
            .masked_write(dd::MEM_CTRL, class.memory_enable(), class.memory_enable())
    }

    fn reset_msc_memory(&mut self, class: MscClass) -> TdmbResult<(), B::Error> {
        self.bus.page(Page::Dd)?;
        self.bus.masked_write(dd::MEM_CTRL, class.memory_enable(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subch_ctrl_layout() {
        assert_eq!(subch_ctrl(0, 12, true, true), 0x80 | 0x40 | 12);
        assert_eq!(subch_ctrl(0, 12, false, false), 12);
        // RS only exists on slot 0
        assert_eq!(subch_ctrl(4, 63, true, true), 0x80 | 63);
    }

    #[test]
    fn subch_regs() {
        assert_eq!(subch_reg(0), 0x3A);
        assert_eq!(subch_reg(3), 0x3D);
        assert_eq!(subch_reg(6), 0x40);
    }

    #[test]
    fn validate_limits() {
        let spi = HardwareProfile::new();
        assert_eq!(validate::<()>(&spi, 64, 188), Err(Error::InvalidSubChannelId(64)));
        assert_eq!(
            validate::<()>(&spi, 1, MAX_THRESHOLD_SIZE + 1),
            Err(Error::InvalidThresholdSize(MAX_THRESHOLD_SIZE + 1))
        );
        assert_eq!(validate::<()>(&spi, 63, MAX_THRESHOLD_SIZE), Ok(()));

        let cif = spi.with_cif_mode(true);
        assert_eq!(validate::<()>(&cif, 1, 100_000), Ok(()));
    }
}
