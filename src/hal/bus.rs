//! Register Bus Abstractions
//!
//! The mtv818 exposes its registers through a page-select window: the
//! host writes a map-select value, then addresses 8-bit registers inside
//! that page. Dual-chip boards additionally select which demodulator
//! answers.

use crate::error::{Error, TdmbResult};
use crate::types::ChipIndex;

/// Register page of the demodulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    /// Host interface, interrupt masks
    Host,
    /// RF front end
    Rf,
    /// Common block (clocks, scan power, I/Q monitor, TSIF)
    Comm,
    /// Data decoder (sub-channels, memories, interrupt status)
    Dd,
    /// OFDM demodulator
    Ofdm,
    /// FEC decoder
    Fec,
    /// FIC memory
    Fic,
}

impl Page {
    /// Value written to the map-select register
    #[must_use]
    pub const fn map_select(self) -> u8 {
        match self {
            Self::Host => 0x07,
            Self::Rf => 0x0F,
            Self::Comm => 0x04,
            Self::Dd => 0x0D,
            Self::Ofdm => 0x06,
            Self::Fec => 0x09,
            Self::Fic => 0x0A,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Page {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "page 0x{:02X}", self.map_select());
    }
}

/// Register transport supplied by the board
pub trait RegisterBus {
    /// Transport error
    type Error;

    /// Route following accesses to one chip
    ///
    /// Single-chip boards can keep the default no-op.
    fn select_chip(&mut self, chip: ChipIndex) -> Result<(), Self::Error> {
        let _ = chip;
        Ok(())
    }

    /// Switch the register page window
    fn select_page(&mut self, page: Page) -> Result<(), Self::Error>;

    /// Write one register of the current page
    fn write(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;

    /// Read one register of the current page
    fn read(&mut self, addr: u8) -> Result<u8, Self::Error>;

    /// Read consecutive bytes from one memory port
    fn burst_read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Replace the bits selected by `mask`
    fn masked_write(&mut self, addr: u8, mask: u8, value: u8) -> Result<(), Self::Error> {
        let current = self.read(addr)?;
        self.write(addr, (current & !mask) | (value & mask))
    }
}

/// Register bus wrapper used by the driver
///
/// Maps transport errors into [`Error::Bus`] and adds the multi-register
/// helpers the demodulator sequences need.
pub struct PagedBus<B> {
    bus: B,
}

impl<B: RegisterBus> PagedBus<B> {
    /// Wrap a board transport
    #[must_use]
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Underlying transport, for collaborators that drive it directly
    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the transport back
    pub fn release(self) -> B {
        self.bus
    }

    /// Select a chip
    pub fn chip(&mut self, chip: ChipIndex) -> TdmbResult<(), B::Error> {
        self.bus.select_chip(chip).map_err(Error::Bus)
    }

    /// Select a page
    pub fn page(&mut self, page: Page) -> TdmbResult<(), B::Error> {
        self.bus.select_page(page).map_err(Error::Bus)
    }

    /// Write a single register
    pub fn write_reg(&mut self, addr: u8, value: u8) -> TdmbResult<(), B::Error> {
        self.bus.write(addr, value).map_err(Error::Bus)
    }

    /// Read a single register
    pub fn read_reg(&mut self, addr: u8) -> TdmbResult<u8, B::Error> {
        self.bus.read(addr).map_err(Error::Bus)
    }

    /// Read-modify-write under a mask
    pub fn masked_write(&mut self, addr: u8, mask: u8, value: u8) -> TdmbResult<(), B::Error> {
        self.bus.masked_write(addr, mask, value).map_err(Error::Bus)
    }

    /// Read a 16-bit value split over a low and a high register
    pub fn read_u16(&mut self, lo: u8, hi: u8) -> TdmbResult<u16, B::Error> {
        let lo = self.read_reg(lo)?;
        let hi = self.read_reg(hi)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Read a big-endian value spread over consecutive registers
    ///
    /// At most four registers contribute.
    pub fn read_be(&mut self, base: u8, count: u8) -> TdmbResult<u32, B::Error> {
        let mut value = 0u32;
        for offset in 0..count.min(4) {
            value = (value << 8) | u32::from(self.read_reg(base + offset)?);
        }
        Ok(value)
    }

    /// Write an `(address, value)` table in order
    pub fn write_table(&mut self, table: &[(u8, u8)]) -> TdmbResult<(), B::Error> {
        for &(addr, value) in table {
            self.write_reg(addr, value)?;
        }
        Ok(())
    }

    /// Burst read from a memory port
    pub fn burst_read(&mut self, addr: u8, buffer: &mut [u8]) -> TdmbResult<(), B::Error> {
        self.bus.burst_read(addr, buffer).map_err(Error::Bus)
    }
}
