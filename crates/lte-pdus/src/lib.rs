//! LTE MAC PDUs and PHY parameters needed by the UE random access procedure
//!
//! - Random Access Response MAC PDU (36.321 6.1.5, 6.2.2, 6.2.3)
//! - DL-SCH MAC PDU subheaders and the UE Contention Resolution Identity MAC CE (36.321 6.1.2, 6.1.3.4)
//! - Preamble format power offsets and PRACH mask indices

pub mod mac;
pub mod phy;
