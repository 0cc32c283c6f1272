/// 36.211 Table 5.7.1-1: preamble format of a PRACH configuration index (FDD, formats 0 to 3)
pub fn preamble_format(prach_config_index: u8) -> u8 {
    (prach_config_index / 16).min(3)
}

/// 36.321 Table 7.6-1: DELTA_PREAMBLE per preamble format, in dB
const DELTA_PREAMBLE_DB: [i32; 5] = [0, 0, -3, -3, 8];

/// DELTA_PREAMBLE for the preamble format selected by `prach_config_index`
pub fn delta_preamble_db(prach_config_index: u8) -> i32 {
    DELTA_PREAMBLE_DB[preamble_format(prach_config_index) as usize]
}

/// 36.321 Table 7.3-1: PRACH resources allowed by ra-PRACH-MaskIndex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrachMask {
    /// Every PRACH occasion of the configuration
    All,
    /// Only the PRACH resource with this index, 0 to 9
    Index(u8),
    Even,
    Odd,
    /// First PRACH resource in the subframe (TDD)
    First,
    /// Second PRACH resource in the subframe (TDD)
    Second,
    /// Third PRACH resource in the subframe (TDD)
    Third,
}

impl PrachMask {
    pub fn from_index(mask_index: u8) -> Option<Self> {
        match mask_index {
            0 => Some(PrachMask::All),
            1..=10 => Some(PrachMask::Index(mask_index - 1)),
            11 => Some(PrachMask::Even),
            12 => Some(PrachMask::Odd),
            13 => Some(PrachMask::First),
            14 => Some(PrachMask::Second),
            15 => Some(PrachMask::Third),
            _ => None,
        }
    }

    pub fn into_index(self) -> u8 {
        match self {
            PrachMask::All => 0,
            PrachMask::Index(i) => i + 1,
            PrachMask::Even => 11,
            PrachMask::Odd => 12,
            PrachMask::First => 13,
            PrachMask::Second => 14,
            PrachMask::Third => 15,
        }
    }

    /// Whether PRACH resource `resource_idx` of a frame may be used
    pub fn allows(&self, resource_idx: u8) -> bool {
        match self {
            PrachMask::All => true,
            PrachMask::Index(i) => *i == resource_idx,
            PrachMask::Even => resource_idx % 2 == 0,
            PrachMask::Odd => resource_idx % 2 == 1,
            PrachMask::First => resource_idx == 0,
            PrachMask::Second => resource_idx == 1,
            PrachMask::Third => resource_idx == 2,
        }
    }
}

impl core::fmt::Display for PrachMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PrachMask::All => write!(f, "All"),
            PrachMask::Index(i) => write!(f, "Index({})", i),
            PrachMask::Even => write!(f, "Even"),
            PrachMask::Odd => write!(f, "Odd"),
            PrachMask::First => write!(f, "First"),
            PrachMask::Second => write!(f, "Second"),
            PrachMask::Third => write!(f, "Third"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_preamble() {
        assert_eq!(delta_preamble_db(0), 0);
        assert_eq!(delta_preamble_db(15), 0);
        assert_eq!(delta_preamble_db(16), 0);
        assert_eq!(delta_preamble_db(32), -3);
        assert_eq!(delta_preamble_db(63), -3);
    }

    #[test]
    fn test_mask_index() {
        assert_eq!(PrachMask::from_index(0), Some(PrachMask::All));
        assert_eq!(PrachMask::from_index(1), Some(PrachMask::Index(0)));
        assert_eq!(PrachMask::from_index(10), Some(PrachMask::Index(9)));
        assert_eq!(PrachMask::from_index(12), Some(PrachMask::Odd));
        assert_eq!(PrachMask::from_index(16), None);
        for i in 0..16 {
            assert_eq!(PrachMask::from_index(i).unwrap().into_index(), i);
        }
        assert!(PrachMask::Even.allows(4));
        assert!(!PrachMask::Even.allows(3));
        assert!(PrachMask::Index(2).allows(2));
    }
}
