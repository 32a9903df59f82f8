//! Fast Information Channel reader

use embedded_hal::delay::DelayNs;

use super::regs::{dd, fic, host, intr};
use super::Session;
use crate::config::{FicReadMode, FIC_POLL_ATTEMPTS, FIC_SIZE};
use crate::error::{Error, TdmbResult};
use crate::hal::{Page, RegisterBus, RfTuner};

impl<B, R, D> Session<'_, B, R, D>
where
    B: RegisterBus,
    R: RfTuner<B>,
    D: DelayNs,
{
    pub(super) fn open_fic(&mut self) -> TdmbResult<(), B::Error> {
        if self.state.fic_configured {
            return Ok(());
        }
        if self.profile.uses_fic_interrupt() {
            self.bus.page(Page::Dd)?;
            self.bus.write_reg(dd::INT_CLEAR, intr::FIC)?;
            self.state.intr_mask_l &= !intr::FIC;
            self.bus.page(Page::Host)?;
            self.bus.write_reg(host::INTR_MASK_L, self.state.intr_mask_l)?;
        }
        self.setup_fic_memory()?;
        self.state.fic_configured = true;
        debug!("FIC opened on {}", self.chip);
        Ok(())
    }

    pub(super) fn close_fic(&mut self) -> TdmbResult<(), B::Error> {
        if !self.state.fic_configured {
            return Ok(());
        }
        if self.profile.uses_fic_interrupt() {
            self.state.intr_mask_l |= intr::FIC;
            self.bus.page(Page::Host)?;
            self.bus.write_reg(host::INTR_MASK_L, self.state.intr_mask_l)?;
        }
        self.reset_fic_memory()?;
        self.state.fic_configured = false;
        debug!("FIC closed on {}", self.chip);
        Ok(())
    }

    pub(super) fn read_fic(&mut self, buffer: &mut [u8; FIC_SIZE]) -> TdmbResult<usize, B::Error> {
        if !self.state.fic_configured {
            warn!("FIC read before open on {}", self.chip);
            return Err(Error::FicNotOpened);
        }

        if self.profile.fic_read_mode() == FicReadMode::Polling {
            self.bus.page(Page::Ofdm)?;
            let interval = self.transmission_mode()?.fic_poll_interval_ms();
            self.bus.page(Page::Dd)?;
            let mut ready = false;
            for _ in 0..FIC_POLL_ATTEMPTS {
                if self.bus.read_reg(dd::INT_STATUS)? & intr::FIC != 0 {
                    ready = true;
                    break;
                }
                self.delay.delay_ms(interval);
            }
            if !ready {
                warn!("FIC read timeout on {}", self.chip);
                return Err(Error::FicReadTimeout);
            }
        }

        self.burst_fic(buffer)?;
        self.bus.page(Page::Dd)?;
        self.bus.write_reg(dd::INT_CLEAR, intr::FIC)?;
        Ok(FIC_SIZE)
    }

    /// TSIF boards stream the FIC port in two halves
    fn burst_fic(&mut self, buffer: &mut [u8; FIC_SIZE]) -> TdmbResult<(), B::Error> {
        self.bus.page(Page::Fic)?;
        if self.profile.host_interface().is_tsif() {
            let (first, second) = buffer.split_at_mut(FIC_SIZE / 2);
            self.bus.burst_read(fic::DATA_PORT, first)?;
            self.bus.burst_read(fic::DATA_PORT, second)
        } else {
            self.bus.burst_read(fic::DATA_PORT, buffer)
        }
    }

    fn setup_fic_memory(&mut self) -> TdmbResult<(), B::Error> {
        self.bus.page(Page::Dd)?;
        self.bus.masked_write(dd::MEM_CTRL, dd::FIC_MEM_ENABLE, 0)?;
        self.bus
            .masked_write(dd::MEM_CTRL, dd::FIC_MEM_ENABLE, dd::FIC_MEM_ENABLE)
    }

    pub(super) fn reset_fic_memory(&mut self) -> TdmbResult<(), B::Error> {
        self.bus.page(Page::Dd)?;
        self.bus.masked_write(dd::MEM_CTRL, dd::FIC_MEM_ENABLE, 0)
    }
}

