use core::fmt;

use lte_core::{BitBuffer, PduParseErr, Rnti, let_field};

use crate::mac::enums::rar_subheader_type::RarSubheaderType;
use crate::mac::fields::backoff_indicator::backoff_ms_from_indicator;
use crate::mac::fields::rar_ul_grant::RarUlGrant;

/// Largest RAR transport block the UE accepts, in bytes
pub const MAX_RAR_PDU_LEN: usize = 2048;

/// 36.321 6.2.3 MAC RAR, 48 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacRar {
    /// 11 bits, Timing Advance Command (36.213 4.2.3)
    pub ta_cmd: u16,
    /// 20 bits
    pub ul_grant: RarUlGrant,
    /// 16 bits
    pub temp_crnti: Rnti,
}

impl MacRar {
    pub const BITS: usize = 48;

    pub fn from_bitbuf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let_field!(buf, reserved, 1);
        if reserved != 0 {
            tracing::debug!("MAC RAR reserved bit set");
        }
        let_field!(buf, ta_cmd, 11);
        let ul_grant = RarUlGrant::from_bitbuf(buf)?;
        let_field!(buf, temp_crnti, 16);
        Ok(MacRar {
            ta_cmd: ta_cmd as u16,
            ul_grant,
            temp_crnti: temp_crnti as Rnti,
        })
    }

    pub fn to_bitbuf(&self, buf: &mut BitBuffer) {
        buf.write_bits(0, 1);
        buf.write_bits(self.ta_cmd as u64 & 0x7FF, 11);
        self.ul_grant.to_bitbuf(buf);
        buf.write_bits(self.temp_crnti as u64, 16);
    }
}

/// One E/T/RAPID subheader with its MAC RAR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RarEntry {
    /// 6 bits, index of the preamble this response is for
    pub rapid: u8,
    pub rar: MacRar,
}

/// 36.321 6.1.5 MAC PDU (Random Access Response), received on DL-SCH scrambled with the RA-RNTI.
/// A MAC header of one byte subheaders (E/T/R/R/BI or E/T/RAPID), the MAC RARs in subheader order,
/// then optional padding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RarPdu {
    /// 4 bits. Only allowed as the first subheader.
    pub backoff_indicator: Option<u8>,
    pub entries: Vec<RarEntry>,
}

impl RarPdu {
    /// Parse a received transport block. Payloads above MAX_RAR_PDU_LEN are rejected.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PduParseErr> {
        if data.len() > MAX_RAR_PDU_LEN {
            return Err(PduParseErr::BufferTooLong { len: data.len(), max: MAX_RAR_PDU_LEN });
        }
        let mut buf = BitBuffer::from_bytes(data);
        Self::from_bitbuf(&mut buf)
    }

    pub fn from_bitbuf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let mut backoff_indicator = None;
        let mut rapids = Vec::new();

        // MAC header
        let mut first = true;
        loop {
            let_field!(buf, ext, 1);
            let_field!(buf, subheader_type, 1);
            let Ok(subheader_type) = RarSubheaderType::try_from(subheader_type) else {
                // 1 bit field, unreachable
                return Err(PduParseErr::InvalidValue { field: "subheader_type", value: subheader_type });
            };
            match subheader_type {
                RarSubheaderType::BackoffIndicator => {
                    if !first {
                        return Err(PduParseErr::Inconsistency {
                            field: "backoff_indicator",
                            reason: "BI subheader not first in RAR header",
                        });
                    }
                    let_field!(buf, reserved, 2);
                    if reserved != 0 {
                        tracing::debug!("RAR BI subheader reserved bits set");
                    }
                    let_field!(buf, bi, 4);
                    backoff_indicator = Some(bi as u8);
                }
                RarSubheaderType::Rapid => {
                    let_field!(buf, rapid, 6);
                    rapids.push(rapid as u8);
                }
            }
            first = false;
            if ext == 0 {
                break;
            }
        }

        // MAC payload. Anything after the last MAC RAR is padding.
        let mut entries = Vec::with_capacity(rapids.len());
        for rapid in rapids {
            if buf.get_len_remaining() < MacRar::BITS {
                return Err(PduParseErr::BufferEnded { field: Some("mac_rar") });
            }
            let rar = MacRar::from_bitbuf(buf)?;
            entries.push(RarEntry { rapid, rar });
        }

        Ok(RarPdu { backoff_indicator, entries })
    }

    pub fn to_bitbuf(&self, buf: &mut BitBuffer) {
        let num_subheaders = self.entries.len() + self.backoff_indicator.is_some() as usize;
        let mut written = 0;
        if let Some(bi) = self.backoff_indicator {
            written += 1;
            buf.write_bits((written < num_subheaders) as u64, 1);
            buf.write_bits(RarSubheaderType::BackoffIndicator.into_raw(), 1);
            buf.write_bits(0, 2);
            buf.write_bits(bi as u64 & 0x0F, 4);
        }
        for entry in &self.entries {
            written += 1;
            buf.write_bits((written < num_subheaders) as u64, 1);
            buf.write_bits(RarSubheaderType::Rapid.into_raw(), 1);
            buf.write_bits(entry.rapid as u64 & 0x3F, 6);
        }
        for entry in &self.entries {
            entry.rar.to_bitbuf(buf);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BitBuffer::new_autoexpand(8 + self.entries.len() * 56);
        self.to_bitbuf(&mut buf);
        buf.into_bytes()
    }

    /// The MAC RAR answering preamble `rapid`, if present
    pub fn find(&self, rapid: u8) -> Option<&MacRar> {
        self.entries.iter().find(|e| e.rapid == rapid).map(|e| &e.rar)
    }

    /// Backoff Parameter in ms, if the network sent a Backoff Indicator
    pub fn backoff_ms(&self) -> Option<u32> {
        self.backoff_indicator.map(backoff_ms_from_indicator)
    }
}

impl fmt::Display for RarPdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RarPdu {{ bi: {:?}, rapids: [", self.backoff_indicator)?;
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e.rapid)?;
        }
        write!(f, "] }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rar(ta_cmd: u16, temp_crnti: Rnti) -> MacRar {
        MacRar {
            ta_cmd,
            ul_grant: RarUlGrant { rb_assignment: 37, mcs: 4, tpc: 3, ..Default::default() },
            temp_crnti,
        }
    }

    #[test]
    fn test_single_rapid() {
        // E=0 T=1 RAPID=17, then R=0 TA=0x01F grant temp_crnti=0x4601
        let pdu = RarPdu { backoff_indicator: None, entries: vec![RarEntry { rapid: 17, rar: sample_rar(0x1F, 0x4601) }] };
        let bytes = pdu.to_bytes();
        assert_eq!(bytes.len(), 7);
        assert_eq!(bytes[0], 0b0101_0001);
        assert_eq!(bytes[5..7], [0x46, 0x01]);

        let parsed = RarPdu::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, pdu);
        assert_eq!(parsed.find(17).unwrap().ta_cmd, 0x1F);
        assert!(parsed.find(18).is_none());
        assert_eq!(parsed.backoff_ms(), None);
    }

    #[test]
    fn test_backoff_and_multiple_rapids_with_padding() {
        let pdu = RarPdu {
            backoff_indicator: Some(5),
            entries: vec![
                RarEntry { rapid: 3, rar: sample_rar(10, 0x100) },
                RarEntry { rapid: 40, rar: sample_rar(2047, 0x200) },
            ],
        };
        let mut bytes = pdu.to_bytes();
        assert_eq!(bytes[0], 0b1000_0101);
        bytes.extend_from_slice(&[0u8; 5]);

        let parsed = RarPdu::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.backoff_ms(), Some(60));
        assert_eq!(parsed.find(40).unwrap().temp_crnti, 0x200);
        assert_eq!(parsed.find(40).unwrap().ta_cmd, 2047);
    }

    #[test]
    fn test_backoff_only() {
        let parsed = RarPdu::from_bytes(&[0b0000_1100]).unwrap();
        assert_eq!(parsed.backoff_indicator, Some(12));
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn test_malformed() {
        assert_eq!(RarPdu::from_bytes(&[]), Err(PduParseErr::BufferEnded { field: Some("ext") }));
        // Header says two RARs follow, only one present
        let mut bytes = vec![0b1100_0001, 0b0100_0010];
        bytes.extend_from_slice(&[0u8; 6]);
        assert_eq!(RarPdu::from_bytes(&bytes), Err(PduParseErr::BufferEnded { field: Some("mac_rar") }));
        // BI after a RAPID subheader
        assert!(matches!(
            RarPdu::from_bytes(&[0b1100_0001, 0b0000_0101]),
            Err(PduParseErr::Inconsistency { field: "backoff_indicator", .. })
        ));
        // Extension bit set on every subheader, header never ends
        assert!(matches!(RarPdu::from_bytes(&[0xC1, 0xC2]), Err(PduParseErr::BufferEnded { .. })));
    }

    #[test]
    fn test_too_long() {
        let bytes = vec![0u8; MAX_RAR_PDU_LEN + 1];
        assert_eq!(
            RarPdu::from_bytes(&bytes),
            Err(PduParseErr::BufferTooLong { len: MAX_RAR_PDU_LEN + 1, max: MAX_RAR_PDU_LEN })
        );
        assert!(RarPdu::from_bytes(&vec![0u8; MAX_RAR_PDU_LEN]).is_ok());
    }
}
