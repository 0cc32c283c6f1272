/// 36.321 6.1.5, T field of a MAC RAR subheader
/// Bits: 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RarSubheaderType {
    /// Subheader carries a Backoff Indicator
    BackoffIndicator = 0,
    /// Subheader carries a Random Access Preamble IDentifier, followed by a MAC RAR
    Rapid = 1,
}

impl std::convert::TryFrom<u64> for RarSubheaderType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(RarSubheaderType::BackoffIndicator),
            1 => Ok(RarSubheaderType::Rapid),
            _ => Err(()),
        }
    }
}

impl RarSubheaderType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        match self {
            RarSubheaderType::BackoffIndicator => 0,
            RarSubheaderType::Rapid => 1,
        }
    }
}

impl From<RarSubheaderType> for u64 {
    fn from(e: RarSubheaderType) -> Self { e.into_raw() }
}

impl core::fmt::Display for RarSubheaderType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RarSubheaderType::BackoffIndicator => write!(f, "BackoffIndicator"),
            RarSubheaderType::Rapid => write!(f, "Rapid"),
        }
    }
}
