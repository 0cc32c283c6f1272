use lte_core::ContentionId;
use lte_pdus::mac::pdus::dl_sch_pdu::DlSchPdu;

use crate::mac::interfaces::ContentionDemux;

/// Downlink demultiplexer view used during contention resolution
#[derive(Debug, Default)]
pub struct MacDemux;

impl ContentionDemux for MacDemux {
    fn matches_contention_id(&self, payload: &[u8], id: ContentionId) -> bool {
        let pdu = match DlSchPdu::from_bytes(payload) {
            Ok(pdu) => pdu,
            Err(e) => {
                tracing::warn!("failed parsing DL-SCH PDU: {:?}", e);
                return false;
            }
        };
        tracing::debug!("<- {:?}", pdu);
        match pdu.contention_resolution_id() {
            Some(rx_id) if rx_id == id => true,
            Some(rx_id) => {
                tracing::debug!("contention resolution id mismatch: rx {:012x} expected {:012x}", rx_id, id);
                false
            }
            None => false,
        }
    }
}
