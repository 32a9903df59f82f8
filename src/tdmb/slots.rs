//! Fixed-width bitsets for slot and sub-channel bookkeeping
//!
//! Bits keep the hardware layout: bit `n` lives in word `n >> 5` at
//! position `n & 31`.

/// Bitset over `WORDS` 32-bit words
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSet<const WORDS: usize>([u32; WORDS]);

impl<const WORDS: usize> Default for BitSet<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Occupied hardware decode slots (0 to 6)
pub type SlotMask = BitSet<1>;

/// Occupied registration table entries
pub type RegistrationMask = BitSet<2>;

/// Open sub-channel IDs (0 to 63)
pub type SubChannelIdSet = BitSet<2>;

/// Slot 0, the only slot with a Reed-Solomon decoder
pub const VIDEO_SLOTS: SlotMask = BitSet::from_words([0x01]);

/// Slots 3 to 6
pub const AUDIO_DATA_SLOTS: SlotMask = BitSet::from_words([0x78]);

impl<const WORDS: usize> BitSet<WORDS> {
    /// Number of addressable bits
    pub const CAPACITY: usize = WORDS * 32;

    /// All bits clear
    #[must_use]
    pub const fn new() -> Self {
        Self([0; WORDS])
    }

    /// Build from raw words
    #[must_use]
    pub const fn from_words(words: [u32; WORDS]) -> Self {
        Self(words)
    }

    /// Raw words
    #[must_use]
    pub const fn words(&self) -> [u32; WORDS] {
        self.0
    }

    /// Bit `n` is set; out-of-range bits read as clear
    #[must_use]
    pub const fn is_set(&self, n: usize) -> bool {
        n < Self::CAPACITY && self.0[n >> 5] & (1 << (n & 31)) != 0
    }

    /// Set bit `n`; out-of-range bits are ignored
    pub fn reserve(&mut self, n: usize) {
        if n < Self::CAPACITY {
            self.0[n >> 5] |= 1 << (n & 31);
        }
    }

    /// Clear bit `n`; out-of-range bits are ignored
    pub fn release(&mut self, n: usize) {
        if n < Self::CAPACITY {
            self.0[n >> 5] &= !(1 << (n & 31));
        }
    }

    /// No bit set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Number of bits set
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Every bit of `mask` is set here
    #[must_use]
    pub fn contains_all(&self, mask: &Self) -> bool {
        self.0.iter().zip(mask.0.iter()).all(|(w, m)| w & m == *m)
    }

    /// At least one bit of `mask` is set here
    #[must_use]
    pub fn intersects(&self, mask: &Self) -> bool {
        self.0.iter().zip(mask.0.iter()).any(|(w, m)| w & m != 0)
    }

    /// Lowest clear bit of `mask`, if any
    #[must_use]
    pub fn first_free_in(&self, mask: &Self) -> Option<usize> {
        (0..Self::CAPACITY).find(|&n| mask.is_set(n) && !self.is_set(n))
    }

    /// Set bits in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::CAPACITY).filter(move |&n| self.is_set(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_layout() {
        let mut ids = SubChannelIdSet::new();
        ids.reserve(5);
        ids.reserve(33);
        assert_eq!(ids.words(), [1 << 5, 1 << 1]);
    }

    #[test]
    fn reserve_release_round_trip() {
        let mut ids = SubChannelIdSet::new();
        for id in [0, 31, 32, 63] {
            ids.reserve(id);
            assert!(ids.is_set(id));
        }
        assert_eq!(ids.count(), 4);
        for id in [0, 31, 32, 63] {
            ids.release(id);
        }
        assert!(ids.is_empty());
    }

    #[test]
    fn out_of_range_ignored() {
        let mut slots = SlotMask::new();
        slots.reserve(40);
        assert!(slots.is_empty());
        assert!(!slots.is_set(40));
    }

    #[test]
    fn class_masks() {
        let mut used = SlotMask::new();
        assert_eq!(used.first_free_in(&AUDIO_DATA_SLOTS), Some(3));
        used.reserve(3);
        used.reserve(4);
        assert_eq!(used.first_free_in(&AUDIO_DATA_SLOTS), Some(5));
        used.reserve(5);
        used.reserve(6);
        assert!(used.contains_all(&AUDIO_DATA_SLOTS));
        assert_eq!(used.first_free_in(&AUDIO_DATA_SLOTS), None);
        assert!(!used.intersects(&VIDEO_SLOTS));
    }

    #[test]
    fn iter_ascending() {
        let mut set = RegistrationMask::new();
        set.reserve(40);
        set.reserve(2);
        set.reserve(17);
        let order: heapless::Vec<usize, 8> = set.iter().collect();
        assert_eq!(order.as_slice(), &[2, 17, 40]);
    }
}
