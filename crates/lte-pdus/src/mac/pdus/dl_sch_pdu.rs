use lte_core::{BitBuffer, CONTENTION_ID_MASK, ContentionId, PduParseErr, let_field};

use crate::mac::enums::dl_lcid::DlLcid;

/// One MAC subheader with its MAC SDU or MAC control element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlSchSubPdu {
    pub lcid: DlLcid,
    pub payload: Vec<u8>,
}

/// 36.321 6.1.2 MAC PDU (DL-SCH). Only the subheader structure is interpreted; SDU contents
/// are left to the layers above. Used during contention resolution, where the PDU addressed to
/// the Temporary C-RNTI carries the UE Contention Resolution Identity MAC CE (6.1.3.4).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DlSchPdu {
    pub subpdus: Vec<DlSchSubPdu>,
}

impl DlSchPdu {
    pub fn from_bytes(data: &[u8]) -> Result<Self, PduParseErr> {
        let mut buf = BitBuffer::from_bytes(data);
        Self::from_bitbuf(&mut buf)
    }

    pub fn from_bitbuf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        // MAC header. R/R/E/LCID, plus F/L for SDUs that are not the last subheader.
        let mut headers: Vec<(DlLcid, Option<usize>)> = Vec::new();
        loop {
            let_field!(buf, reserved, 2);
            if reserved != 0 {
                tracing::debug!("DL-SCH subheader reserved bits set");
            }
            let_field!(buf, ext, 1);
            let_field!(buf, lcid, 5);
            let Ok(lcid) = DlLcid::try_from(lcid) else {
                return Err(PduParseErr::InvalidValue { field: "lcid", value: lcid });
            };

            let len = if let Some(fixed) = lcid.fixed_len() {
                Some(fixed)
            } else if ext == 1 {
                let_field!(buf, format, 1);
                let len_bits = if format == 0 { 7 } else { 15 };
                Some(buf.read_field(len_bits, "length")? as usize)
            } else {
                None
            };
            headers.push((lcid, len));

            if ext == 0 {
                break;
            }
        }

        let remaining = buf.get_len_remaining() / 8;
        let known: usize = headers.iter().filter_map(|(_, len)| *len).sum();
        if known > remaining {
            return Err(PduParseErr::InconsistentLength { expected: known, found: remaining });
        }

        let mut subpdus = Vec::with_capacity(headers.len());
        let num_headers = headers.len();
        for (i, (lcid, len)) in headers.into_iter().enumerate() {
            let len = match len {
                // Last subheader of an SDU or trailing padding: takes all that is left
                None => remaining - known,
                Some(_) if lcid == DlLcid::Padding && i + 1 == num_headers => remaining - known,
                Some(len) => len,
            };
            let payload = buf.read_bytes(len, "payload")?;
            subpdus.push(DlSchSubPdu { lcid, payload });
        }

        Ok(DlSchPdu { subpdus })
    }

    pub fn to_bitbuf(&self, buf: &mut BitBuffer) {
        let num = self.subpdus.len();
        for (i, sub) in self.subpdus.iter().enumerate() {
            let last = i + 1 == num;
            buf.write_bits(0, 2);
            buf.write_bits(!last as u64, 1);
            buf.write_bits(sub.lcid.into_raw(), 5);
            if sub.lcid.fixed_len().is_none() && !last {
                if sub.payload.len() < 128 {
                    buf.write_bits(0, 1);
                    buf.write_bits(sub.payload.len() as u64, 7);
                } else {
                    buf.write_bits(1, 1);
                    buf.write_bits(sub.payload.len() as u64, 15);
                }
            }
        }
        for sub in &self.subpdus {
            buf.write_bytes(&sub.payload);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BitBuffer::new_autoexpand(64);
        self.to_bitbuf(&mut buf);
        buf.into_bytes()
    }

    /// A PDU carrying a UE Contention Resolution Identity MAC CE, optionally followed by a CCCH SDU
    pub fn with_contention_resolution_id(id: ContentionId, ccch_sdu: &[u8]) -> Self {
        let mut subpdus = vec![DlSchSubPdu {
            lcid: DlLcid::UeContentionResolutionId,
            payload: contention_id_to_bytes(id).to_vec(),
        }];
        if !ccch_sdu.is_empty() {
            subpdus.push(DlSchSubPdu { lcid: DlLcid::Ccch, payload: ccch_sdu.to_vec() });
        }
        DlSchPdu { subpdus }
    }

    /// Value of the first UE Contention Resolution Identity MAC CE, if any
    pub fn contention_resolution_id(&self) -> Option<ContentionId> {
        self.subpdus
            .iter()
            .find(|s| s.lcid == DlLcid::UeContentionResolutionId)
            .map(|s| contention_id_from_bytes(&s.payload))
    }
}

/// The 48 bit identity, most significant byte first, as sent in Msg3 and echoed in the MAC CE
pub fn contention_id_to_bytes(id: ContentionId) -> [u8; 6] {
    let b = (id & CONTENTION_ID_MASK).to_be_bytes();
    [b[2], b[3], b[4], b[5], b[6], b[7]]
}

pub fn contention_id_from_bytes(data: &[u8]) -> ContentionId {
    data.iter().take(6).fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contention_resolution_ce() {
        let pdu = DlSchPdu::with_contention_resolution_id(0x1234_5678_9ABC, &[0xAA; 20]);
        let bytes = pdu.to_bytes();
        // CE subheader (E=1, LCID 28) then last subheader for CCCH without L field
        assert_eq!(bytes[0], 0b0011_1100);
        assert_eq!(bytes[1], 0b0000_0000);
        assert_eq!(bytes[2..8], [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(bytes.len(), 2 + 6 + 20);

        let parsed = DlSchPdu::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, pdu);
        assert_eq!(parsed.contention_resolution_id(), Some(0x1234_5678_9ABC));
    }

    #[test]
    fn test_length_fields() {
        let pdu = DlSchPdu {
            subpdus: vec![
                DlSchSubPdu { lcid: DlLcid::Lcid(1), payload: vec![1; 200] },
                DlSchSubPdu { lcid: DlLcid::TimingAdvanceCmd, payload: vec![31] },
                DlSchSubPdu { lcid: DlLcid::Lcid(3), payload: vec![3; 10] },
            ],
        };
        let parsed = DlSchPdu::from_bytes(&pdu.to_bytes()).unwrap();
        assert_eq!(parsed, pdu);
        assert_eq!(parsed.contention_resolution_id(), None);
    }

    #[test]
    fn test_trailing_padding() {
        // CE, then padding subheader swallowing the rest
        let mut bytes = vec![0b0011_1100, 0b0001_1111];
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 7]);
        bytes.extend_from_slice(&[0; 4]);
        let parsed = DlSchPdu::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.contention_resolution_id(), Some(7));
        assert_eq!(parsed.subpdus[1].payload.len(), 4);
    }

    #[test]
    fn test_malformed() {
        // Reserved LCID
        assert_eq!(
            DlSchPdu::from_bytes(&[0b0001_0000]),
            Err(PduParseErr::InvalidValue { field: "lcid", value: 16 })
        );
        // CE announced but truncated
        assert!(matches!(
            DlSchPdu::from_bytes(&[0b0001_1100, 1, 2]),
            Err(PduParseErr::InconsistentLength { expected: 6, found: 2 })
        ));
    }

    #[test]
    fn test_contention_id_bytes() {
        assert_eq!(contention_id_to_bytes(0xFFFF_0000_0000_0001), [0, 0, 0, 0, 0, 1]);
        assert_eq!(contention_id_from_bytes(&[1, 2, 3, 4, 5, 6]), 0x0102_0304_0506);
    }
}
