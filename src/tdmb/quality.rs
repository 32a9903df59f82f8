//! Signal quality estimation
//!
//! Raw demodulator monitors converted to scaled integers:
//! CNR in thousandths of a dB, RSSI in tenths of a dBm, BER per 100 000
//! bits. [`cnr_db`] and [`rssi_dbm`] present them as fixed-point values.

use embedded_hal::delay::DelayNs;
use fixed::types::{I16F16, U16F16};

use super::regs::{dd, fec, ofdm, rf};
use super::Session;
use crate::config::{BER_DIVIDER, CNR_DIVIDER, RSSI_DIVIDER};
use crate::error::TdmbResult;
use crate::hal::{Page, RegisterBus, RfTuner};
use crate::types::LockStatus;

/// CNR (x1000) for monitor values 15 to 160
const CNR_TABLE: [u16; 146] = [
    33163, 32214, 31327, 30496, 29714, 28978, 28281, 27622, 26995, 26400, 25832, 25290, 24772,
    24277, 23801, 23345, 22907, 22486, 22080, 21690, 21313, 20949, 20597, 20257, 19928, 19610,
    19301, 19002, 18712, 18430, 18156, 17890, 17632, 17380, 17135, 16897, 16665, 16438, 16218,
    16002, 15792, 15587, 15387, 15192, 15001, 14814, 14631, 14453, 14278, 14107, 13939, 13775,
    13615, 13457, 13303, 13152, 13004, 12858, 12715, 12575, 12438, 12303, 12171, 12041, 11913,
    11788, 11664, 11543, 11424, 11307, 11192, 11078, 10967, 10857, 10749, 10643, 10539, 10436,
    10334, 10235, 10136, 10039, 9944, 9850, 9757, 9666, 9576, 9487, 9400, 9314, 9229, 9145, 9062,
    8980, 8900, 8820, 8742, 8664, 8588, 8512, 8438, 8364, 8292, 8220, 8149, 8079, 8010, 7942,
    7874, 7807, 7742, 7676, 7612, 7548, 7485, 7423, 7362, 7301, 7241, 7181, 7123, 7064, 7007,
    6950, 6894, 6838, 6783, 6728, 6674, 6621, 6568, 6516, 6464, 6412, 6362, 6311, 6262, 6212,
    6164, 6115, 6067, 6020, 5973, 5927, 5881, 5835,
];

/// First monitor value covered by [`CNR_TABLE`]
const CNR_TABLE_FIRST: u16 = 15;
/// Last monitor value covered by [`CNR_TABLE`]
const CNR_TABLE_LAST: u16 = 160;
/// CNR reported below the table
const CNR_CEILING: u32 = 33_000;
/// CNR reported above the table
const CNR_FLOOR: u32 = 5_440;

/// Map the 13-bit CNR monitor to thousandths of a dB
#[must_use]
pub fn cnr_from_raw(raw: u16) -> u32 {
    if raw == 0 {
        0
    } else if raw < CNR_TABLE_FIRST {
        CNR_CEILING
    } else if raw <= CNR_TABLE_LAST {
        u32::from(CNR_TABLE[usize::from(raw - CNR_TABLE_FIRST)])
    } else {
        CNR_FLOOR
    }
}

/// RSSI in tenths of a dBm from the three RF gain monitors
#[must_use]
pub fn rssi_from_gain_monitors(mon0: u8, mon2: u8, mon4: u8) -> i32 {
    let lna = i32::from((mon0 & 0x30) >> 4);
    let mixer = i32::from(mon0 & 0x0F);
    let vga = i32::from((mon2 & 0x1E) >> 1);
    let baseband = i32::from(mon4 & 0x7F);

    let rssi = -(lna * 120 + mixer * 28 + vga * 27 + baseband * 4 - 100);
    if mon0 & 0xC0 == 0x40 {
        rssi - 5
    } else {
        rssi
    }
}

/// CNR in dB
#[must_use]
pub fn cnr_db(cnr: u32) -> U16F16 {
    U16F16::saturating_from_num(cnr) / U16F16::from_num(CNR_DIVIDER)
}

/// RSSI in dBm
#[must_use]
pub fn rssi_dbm(rssi: i32) -> I16F16 {
    I16F16::saturating_from_num(rssi) / I16F16::from_num(RSSI_DIVIDER)
}

impl<B, R, D> Session<'_, B, R, D>
where
    B: RegisterBus,
    R: RfTuner<B>,
    D: DelayNs,
{
    pub(super) fn lock_status(&mut self) -> TdmbResult<LockStatus, B::Error> {
        let mut bits = 0;
        self.bus.page(Page::Dd)?;
        if self.bus.read_reg(dd::LOCK_STATUS)? & 0x01 != 0 {
            bits |= LockStatus::OFDM;
        }
        self.bus.page(Page::Fec)?;
        if self.bus.read_reg(fec::SYNC)? & fec::SYNC_LOCKED == fec::SYNC_LOCKED {
            bits |= LockStatus::FEC;
        }
        Ok(LockStatus::from_bits(bits))
    }

    fn rs_synced(&mut self) -> TdmbResult<bool, B::Error> {
        self.bus.page(Page::Fec)?;
        Ok(self.bus.read_reg(fec::RS_STATUS)? & fec::RS_SYNC != 0)
    }

    pub(super) fn per(&mut self) -> TdmbResult<u32, B::Error> {
        if !self.rs_synced()? {
            return Ok(0);
        }
        let hi = self.bus.read_reg(fec::PER_HI)?;
        let lo = self.bus.read_reg(fec::PER_LO)?;
        Ok(u32::from(u16::from_be_bytes([hi, lo])))
    }

    pub(super) fn rssi(&mut self) -> TdmbResult<i32, B::Error> {
        self.bus.page(Page::Rf)?;
        let mon0 = self.bus.read_reg(rf::GAIN_MON0)?;
        let mon2 = self.bus.read_reg(rf::GAIN_MON2)?;
        let mon4 = self.bus.read_reg(rf::GAIN_MON4)?;
        Ok(rssi_from_gain_monitors(mon0, mon2, mon4))
    }

    /// Latch and read the 13-bit CNR monitor
    pub(super) fn read_cnr_monitor(&mut self) -> TdmbResult<u16, B::Error> {
        self.bus.page(Page::Ofdm)?;
        self.bus.masked_write(ofdm::MON_LATCH, 0x01, 0x01)?;
        let lo = self.bus.read_reg(ofdm::CNR_LO)?;
        let hi = self.bus.read_reg(ofdm::CNR_HI)?;
        Ok((u16::from(hi & 0x1F) << 8) + u16::from(lo))
    }

    pub(super) fn cnr(&mut self) -> TdmbResult<u32, B::Error> {
        self.bus.page(Page::Ofdm)?;
        self.bus.write_reg(ofdm::MON_LATCH, 0x01)?;
        let lo = self.bus.read_reg(ofdm::CNR_LO)?;
        let hi = self.bus.read_reg(ofdm::CNR_HI)?;
        Ok(cnr_from_raw((u16::from(hi & 0x1F) << 8) + u16::from(lo)))
    }

    pub(super) fn cer(&mut self) -> TdmbResult<u32, B::Error> {
        self.bus.page(Page::Fec)?;
        let count = self.bus.read_be(fec::CER_COUNT, 4)?;
        Ok((count / 1000) * 25)
    }

    pub(super) fn ber(&mut self) -> TdmbResult<u32, B::Error> {
        if !self.rs_synced()? {
            return Ok(0);
        }
        let bits = self.bus.read_be(fec::BER_BIT_COUNT, 3)?;
        let errors = self.bus.read_be(fec::BER_ERR_COUNT, 3)?;
        if bits == 0 {
            return Ok(0);
        }
        let ber = u64::from(errors) * u64::from(BER_DIVIDER) / u64::from(bits);
        Ok(u32::try_from(ber).unwrap_or(u32::MAX))
    }
}
