//! Boundary between the random access procedure and the rest of the UE.
//! Implementations are called with the procedure lock held and must not call back into RaProc.

use std::sync::Arc;

use lte_core::{ContentionId, Rnti, RntiType, Tti};
use lte_pdus::mac::fields::rar_ul_grant::RarUlGrant;
use lte_pdus::phy::prach::PrachMask;

/// Timers owned by the random access procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Runs until the end of the RA response window
    ResponseWindow,
    /// mac-ContentionResolutionTimer
    ContentionResolution,
    /// timeAlignmentTimer, shared with the rest of the MAC
    TimeAlignment,
}

impl core::fmt::Display for TimerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TimerId::ResponseWindow => write!(f, "ResponseWindow"),
            TimerId::ContentionResolution => write!(f, "ContentionResolution"),
            TimerId::TimeAlignment => write!(f, "TimeAlignment"),
        }
    }
}

pub trait RaPhy: Send + Sync {
    /// Send `preamble_index` on the next PRACH occasion allowed by `mask`
    fn transmit_preamble(&self, preamble_index: u8, mask: PrachMask, target_power_dbm: i32);

    /// TTI on which the preamble requested by the last transmit_preamble call went out.
    /// None while it is still pending.
    fn prach_tx_tti(&self) -> Option<Tti>;

    /// Blind decode PDCCH for `rnti`. With a window, only within [start, end], otherwise until cancelled.
    fn search_for_grant(&self, rnti_type: RntiType, rnti: Rnti, window: Option<(Tti, Tti)>);

    fn cancel_search(&self, rnti_type: RntiType);

    /// Timing Advance Command from a RAR, 11 bits
    fn apply_timing_advance(&self, ta_cmd: u16);

    /// Uplink grant for Msg3, received in the RAR on `rar_tti`
    fn set_rar_grant(&self, rar_tti: Tti, grant: RarUlGrant);

    fn current_tti(&self) -> Tti;

    /// Downlink path loss estimate, in dB
    fn path_loss_db(&self) -> i32;
}

/// Countdown timers in subframes. Expiry is reported through RaProc::timer_expired.
pub trait TimerService: Send + Sync {
    /// (Re)start `id`. A duration of 0 never expires.
    fn start(&self, id: TimerId, duration: u32);
    fn stop(&self, id: TimerId);
    fn is_running(&self, id: TimerId) -> bool;
}

/// Identity carried by Msg3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg3Identity {
    /// 48 bits, echoed back in the UE Contention Resolution Identity MAC CE
    ContentionId(ContentionId),
    /// C-RNTI MAC CE, for a UE that already holds a C-RNTI
    Crnti(Rnti),
}

impl core::fmt::Display for Msg3Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Msg3Identity::ContentionId(id) => write!(f, "ContentionId({:012x})", id),
            Msg3Identity::Crnti(rnti) => write!(f, "Crnti(0x{:04x})", rnti),
        }
    }
}

pub trait Msg3Mux: Send + Sync {
    /// Build Msg3 around `identity` and send it on the RAR grant
    fn send_identity_message(&self, identity: Msg3Identity);
    /// Drop the Msg3 HARQ buffer
    fn flush_pending_message(&self);
    /// Size of the uplink message waiting for Msg3, in bytes
    fn pending_message_len(&self) -> usize;
}

pub trait ContentionDemux: Send + Sync {
    /// True if `payload` carries a UE Contention Resolution Identity equal to `id`
    fn matches_contention_id(&self, payload: &[u8], id: ContentionId) -> bool;
}

/// Everything the procedure talks to
#[derive(Clone)]
pub struct RaCollaborators {
    pub phy: Arc<dyn RaPhy>,
    pub timers: Arc<dyn TimerService>,
    pub mux: Arc<dyn Msg3Mux>,
    pub demux: Arc<dyn ContentionDemux>,
}

/// Downlink assignment found by PDCCH blind decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlGrant {
    pub rnti_type: RntiType,
    pub rnti: Rnti,
    pub tti: Tti,
    /// Transport block size in bytes
    pub tbs_bytes: usize,
    /// Redundancy version, 0 to 3
    pub rv: u8,
}

/// Identifies the reception a decoded transport block belongs to. Returned to
/// RaProc::tb_decoded_ok so that blocks from a closed window are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket {
    pub rnti_type: RntiType,
    pub tti: Tti,
    pub epoch: u64,
}

/// What the PHY should do with a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DlAction {
    /// Some if the transport block should be decoded
    pub decode: Option<DecodeTicket>,
    /// Clear the soft buffer before combining
    pub reset_softbuffer: bool,
}

impl DlAction {
    pub fn ignore() -> Self {
        Self::default()
    }
}
