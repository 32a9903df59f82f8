//! RF tuner collaborator
//!
//! The RF synthesizer and its PLL tables belong to the board's tuner
//! driver. The demodulator driver only asks it to come up and to move to
//! a frequency, handing over the register bus it holds the lock for.

use crate::error::TdmbResult;
use crate::hal::bus::RegisterBus;
use crate::types::ChipIndex;

/// RF front end driven through the demodulator's register bus
pub trait RfTuner<B: RegisterBus> {
    /// Bring the RF front end of `chip` up after the demodulator tables
    /// were loaded
    ///
    /// # Errors
    ///
    /// Bus failures as [`crate::Error::Bus`], front end faults as
    /// [`crate::Error::Tuner`].
    fn initialize(&mut self, bus: &mut B, chip: ChipIndex) -> TdmbResult<(), B::Error>;

    /// Tune `chip` to `frequency_khz`
    ///
    /// # Errors
    ///
    /// Bus failures as [`crate::Error::Bus`], synthesizer faults as
    /// [`crate::Error::Tuner`].
    fn set_frequency(
        &mut self,
        bus: &mut B,
        chip: ChipIndex,
        frequency_khz: u32,
    ) -> TdmbResult<(), B::Error>;
}
