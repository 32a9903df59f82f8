//! mtv818 register map
//!
//! Addresses are grouped by the page they live in. Pages are selected
//! through [`crate::hal::Page`].

/// HOST page
pub mod host {
    /// Low interrupt mask (a set bit masks the source)
    pub const INTR_MASK_L: u8 = 0x62;
}

/// RF page
pub mod rf {
    /// LNA/mixer gain monitor (bits 7:6 mode, 5:4 and 3:0 gain steps)
    pub const GAIN_MON0: u8 = 0x00;
    /// IF gain monitor (bits 4:1)
    pub const GAIN_MON2: u8 = 0x02;
    /// Baseband gain monitor (bits 6:0)
    pub const GAIN_MON4: u8 = 0x04;
    /// Power-down control
    pub const POWER_CTRL: u8 = 0x57;
    /// Standby bit of [`POWER_CTRL`]
    pub const STANDBY: u8 = 0x04;
    /// Post-initialization trim
    pub const TRIM: u8 = 0x6B;
    /// Trim value written after RF bring-up
    pub const TRIM_VALUE: u8 = 0xC5;
}

/// COMM page
pub mod comm {
    /// Diversity combiner control
    pub const DIVERSITY_CTRL: u8 = 0x10;
    /// Diversity combiner weighting
    pub const DIVERSITY_WEIGHT: u8 = 0x11;
    /// Scan power, low byte
    pub const SCAN_POWER_LO: u8 = 0x38;
    /// Scan power, high byte
    pub const SCAN_POWER_HI: u8 = 0x39;
    /// TSIF stream output control
    pub const TSIF_CTRL: u8 = 0x47;
    /// I/Q monitor latch
    pub const IQ_LATCH: u8 = 0x4D;
    /// Latch strobe bit of [`IQ_LATCH`]
    pub const IQ_LATCH_STROBE: u8 = 0x04;
    /// I imbalance, low byte
    pub const I_MON_LO: u8 = 0x4E;
    /// I imbalance, high byte
    pub const I_MON_HI: u8 = 0x4F;
    /// Q imbalance, low byte
    pub const Q_MON_LO: u8 = 0x50;
    /// Q imbalance, high byte
    pub const Q_MON_HI: u8 = 0x51;
    /// ADC clock divider
    pub const ADC_CLOCK: u8 = 0x6A;
    /// CIF framing control
    pub const CIF_CTRL: u8 = 0xA6;
    /// TSIF enable in individual mode
    pub const TSIF_INDIVIDUAL: u8 = 0x13;
    /// TSIF enable in CIF mode
    pub const TSIF_CIF: u8 = 0x3F;
    /// TSIF output off
    pub const TSIF_OFF: u8 = 0x00;
}

/// DD page
pub mod dd {
    /// Stream header control (bits 1:0 select CIF headers)
    pub const HEAD_CTRL: u8 = 0x31;
    /// Interrupt status, low byte
    pub const INT_STATUS: u8 = 0x33;
    /// Interrupt status clear, low byte
    pub const INT_CLEAR: u8 = 0x35;
    /// OFDM lock monitor (bit 0)
    pub const LOCK_STATUS: u8 = 0x37;
    /// Sub-channel control of slot 0 (enable, RS enable, 6-bit ID)
    pub const SUBCH0_CTRL: u8 = 0x3A;
    /// Sub-channel control of slot 3, slots 4 to 6 follow
    pub const SUBCH3_CTRL: u8 = 0x3D;
    /// Memory enables
    pub const MEM_CTRL: u8 = 0x46;
    /// MSC0 threshold, low byte
    pub const MSC0_THRESHOLD_LO: u8 = 0x48;
    /// MSC0 threshold, high byte
    pub const MSC0_THRESHOLD_HI: u8 = 0x49;
    /// MSC1 threshold, low byte
    pub const MSC1_THRESHOLD_LO: u8 = 0x4A;
    /// MSC1 threshold, high byte
    pub const MSC1_THRESHOLD_HI: u8 = 0x4B;
    /// TSIF packet format in CIF mode
    pub const CIF_TSIF_FORMAT: u8 = 0xD6;

    /// Sub-channel enable bit
    pub const SUBCH_ENABLE: u8 = 0x80;
    /// Reed-Solomon enable bit (slot 0 only)
    pub const SUBCH_RS_ENABLE: u8 = 0x40;
    /// Sub-channel ID field
    pub const SUBCH_ID_MASK: u8 = 0x3F;

    /// FIC memory enable
    pub const FIC_MEM_ENABLE: u8 = 0x01;
    /// MSC0 memory enable
    pub const MSC0_MEM_ENABLE: u8 = 0x02;
    /// MSC1 memory enable
    pub const MSC1_MEM_ENABLE: u8 = 0x04;
}

/// OFDM page
pub mod ofdm {
    /// Diversity input select
    pub const DIVERSITY_INPUT: u8 = 0x04;
    /// Diversity role
    pub const DIVERSITY_ROLE: u8 = 0x0C;
    /// Soft reset of OFDM and FEC
    pub const SOFT_RESET: u8 = 0x10;
    /// OFDM lock (bit 7)
    pub const LOCK: u8 = 0x12;
    /// Coarse lock counter (bits 4:0)
    pub const COARSE_COUNT: u8 = 0x17;
    /// Coarse frequency offset
    pub const COARSE_FREQ: u8 = 0x18;
    /// Diversity combining
    pub const DIVERSITY_COMBINE: u8 = 0x19;
    /// Diversity sync enable (bit 0)
    pub const DIVERSITY_SYNC: u8 = 0x1A;
    /// Null symbol detector control
    pub const NULL_CTRL: u8 = 0x1C;
    /// Null symbol length, low byte
    pub const NULL_LENGTH_LO: u8 = 0x26;
    /// Transmission mode (bits 5:4) and null length high nibble
    pub const MODE_MON: u8 = 0x27;
    /// Auto-scan control value (bits 3:0)
    pub const AUTO_SCAN: u8 = 0x30;
    /// Demodulator FSM state (bits 2:0)
    pub const FSM_MON: u8 = 0x37;
    /// Pre-AGC monitor, bit 7 latches the gain
    pub const PRE_AGC_MON: u8 = 0x53;
    /// Scan control
    pub const SCAN_CTRL: u8 = 0x54;
    /// Pre-AGC gain, low bits
    pub const PRE_AGC_LO: u8 = 0x66;
    /// Pre-AGC gain, high bits
    pub const PRE_AGC_HI: u8 = 0x67;
    /// CNR monitor, low byte
    pub const CNR_LO: u8 = 0x7E;
    /// CNR monitor, high bits (4:0)
    pub const CNR_HI: u8 = 0x7F;
    /// Monitor latch
    pub const MON_LATCH: u8 = 0x82;
    /// Scan result
    pub const SCAN_DONE: u8 = 0xCF;

    /// Lock bit of [`LOCK`]
    pub const LOCKED: u8 = 0x80;
    /// Enter scan mode
    pub const SCAN_START: u8 = 0x70;
    /// Leave scan mode once locked
    pub const SCAN_STOP: u8 = 0x58;
    /// Soft reset asserted
    pub const RESET_ASSERT: u8 = 0x48;
    /// Soft reset released
    pub const RESET_RELEASE: u8 = 0xC9;
}

/// FEC page
pub mod fec {
    /// MSC bit error counter, 4 bytes big-endian
    pub const CER_COUNT: u8 = 0x8C;
    /// BER bit count, 3 bytes big-endian
    pub const BER_BIT_COUNT: u8 = 0xA6;
    /// BER error count, 3 bytes big-endian
    pub const BER_ERR_COUNT: u8 = 0xA9;
    /// Packet error count, high byte
    pub const PER_HI: u8 = 0xB4;
    /// Packet error count, low byte
    pub const PER_LO: u8 = 0xB5;
    /// Reed-Solomon status
    pub const RS_STATUS: u8 = 0xD7;
    /// RS sync bit of [`RS_STATUS`]
    pub const RS_SYNC: u8 = 0x08;
    /// FEC sync state (bits 1:0)
    pub const SYNC: u8 = 0xFB;
    /// Both FEC sync bits
    pub const SYNC_LOCKED: u8 = 0x03;
}

/// FIC page
pub mod fic {
    /// FIC memory read port
    pub const DATA_PORT: u8 = 0x10;
}

/// Interrupt sources in the DD status and HOST mask registers
pub mod intr {
    /// FIC memory filled
    pub const FIC: u8 = 0x01;
    /// MSC0 memory reached its threshold
    pub const MSC0: u8 = 0x02;
    /// MSC1 memory reached its threshold
    pub const MSC1: u8 = 0x04;
    /// All MSC0 mask bits (threshold, overrun, underrun)
    pub const MSC0_BITS: u8 = 0x1A;
    /// All MSC1 mask bits (threshold, overrun, underrun)
    pub const MSC1_BITS: u8 = 0x64;
    /// Every source masked
    pub const ALL: u8 = 0xFF;
}
