/// 36.321 Table 6.2.1-1: Values of LCID for DL-SCH
/// Bits: 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlLcid {
    Ccch,
    /// Logical channel 1..=10
    Lcid(u8),
    UeContentionResolutionId,
    TimingAdvanceCmd,
    DrxCmd,
    Padding,
}

impl std::convert::TryFrom<u64> for DlLcid {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(DlLcid::Ccch),
            1..=10 => Ok(DlLcid::Lcid(x as u8)),
            28 => Ok(DlLcid::UeContentionResolutionId),
            29 => Ok(DlLcid::TimingAdvanceCmd),
            30 => Ok(DlLcid::DrxCmd),
            31 => Ok(DlLcid::Padding),
            _ => Err(()),
        }
    }
}

impl DlLcid {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        match self {
            DlLcid::Ccch => 0,
            DlLcid::Lcid(lcid) => lcid as u64,
            DlLcid::UeContentionResolutionId => 28,
            DlLcid::TimingAdvanceCmd => 29,
            DlLcid::DrxCmd => 30,
            DlLcid::Padding => 31,
        }
    }

    /// Length in bytes of MAC CEs that have no L field in their subheader
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            DlLcid::UeContentionResolutionId => Some(6),
            DlLcid::TimingAdvanceCmd => Some(1),
            DlLcid::DrxCmd => Some(0),
            DlLcid::Padding => Some(0),
            _ => None,
        }
    }
}

impl From<DlLcid> for u64 {
    fn from(e: DlLcid) -> Self { e.into_raw() }
}

impl core::fmt::Display for DlLcid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DlLcid::Ccch => write!(f, "Ccch"),
            DlLcid::Lcid(lcid) => write!(f, "Lcid({})", lcid),
            DlLcid::UeContentionResolutionId => write!(f, "UeContentionResolutionId"),
            DlLcid::TimingAdvanceCmd => write!(f, "TimingAdvanceCmd"),
            DlLcid::DrxCmd => write!(f, "DrxCmd"),
            DlLcid::Padding => write!(f, "Padding"),
        }
    }
}
