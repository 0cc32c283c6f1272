use core::fmt;

use crate::tti::Tti;

/// Radio network temporary identifier, 16 bits
pub type Rnti = u16;

/// RA-RNTI values occupy 0x0001..=0x003C
pub const RA_RNTI_MAX: Rnti = 0x003C;

/// Which identity a PDCCH search or a grant is scrambled with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RntiType {
    /// Random access response, derived from the PRACH occasion
    RaRnti,
    /// Temporary C-RNTI, assigned by the RAR and used until contention is resolved
    TempCrnti,
    /// C-RNTI, the full identity of a connected UE
    Crnti,
}

impl fmt::Display for RntiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RntiType::RaRnti => write!(f, "RA-RNTI"),
            RntiType::TempCrnti => write!(f, "Temp C-RNTI"),
            RntiType::Crnti => write!(f, "C-RNTI"),
        }
    }
}

/// RA-RNTI for a preamble sent on `prach_tti` (36.321 5.1.4).
/// FDD only, so f_id is always 0 and the RA-RNTI is 1 + t_id.
pub fn ra_rnti_for(prach_tti: Tti) -> Rnti {
    let t_id = prach_tti.sf_idx() as Rnti;
    let f_id: Rnti = 0;
    1 + t_id + 10 * f_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ra_rnti() {
        assert_eq!(ra_rnti_for(Tti::from_sfn_sf(17, 0)), 1);
        assert_eq!(ra_rnti_for(Tti::from_sfn_sf(17, 9)), 10);
        assert!(ra_rnti_for(Tti::new(12345)) <= RA_RNTI_MAX);
    }
}
