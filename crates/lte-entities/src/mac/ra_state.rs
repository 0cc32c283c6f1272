use lte_core::{ContentionId, Rnti, Tti};
use lte_pdus::phy::prach::PrachMask;

use crate::mac::interfaces::Msg3Identity;

/// 36.321 5.1 random access procedure states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaState {
    Idle,
    Initialization,
    ResourceSelection,
    PreambleTransmission,
    PdcchSetup,
    ResponseReception,
    ResponseError,
    BackoffWait,
    ContentionResolution,
    Completion,
    RaProblem,
}

impl RaState {
    /// States the procedure only passes through within a single step
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            RaState::Initialization | RaState::ResourceSelection | RaState::PreambleTransmission | RaState::ResponseError
        )
    }
}

impl core::fmt::Display for RaState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RaState::Idle => write!(f, "Idle"),
            RaState::Initialization => write!(f, "Initialization"),
            RaState::ResourceSelection => write!(f, "ResourceSelection"),
            RaState::PreambleTransmission => write!(f, "PreambleTransmission"),
            RaState::PdcchSetup => write!(f, "PdcchSetup"),
            RaState::ResponseReception => write!(f, "ResponseReception"),
            RaState::ResponseError => write!(f, "ResponseError"),
            RaState::BackoffWait => write!(f, "BackoffWait"),
            RaState::ContentionResolution => write!(f, "ContentionResolution"),
            RaState::Completion => write!(f, "Completion"),
            RaState::RaProblem => write!(f, "RaProblem"),
        }
    }
}

/// Random Access Preambles group (36.321 5.1.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleGroup {
    A,
    B,
}

/// Per-procedure run state. Created on entry to Initialization, discarded on reset.
#[derive(Debug, Clone)]
pub struct RaRunState {
    /// Started by a PDCCH order rather than by the MAC itself
    pub pdcch_order: bool,
    /// PREAMBLE_TRANSMISSION_COUNTER, number of preambles sent so far
    pub transmission_counter: u32,
    pub preamble_index: u8,
    pub prach_mask: PrachMask,
    /// The preamble was signalled by the network rather than selected by the UE
    pub contention_free: bool,
    pub group: Option<PreambleGroup>,
    /// Group used for the attempt that sent Msg3; later attempts stick to it
    pub msg3_group: Option<PreambleGroup>,
    /// PREAMBLE_RECEIVED_TARGET_POWER of the current attempt
    pub target_power_dbm: i32,
    pub ra_rnti: Option<Rnti>,
    /// Response window, inclusive
    pub window: Option<(Tti, Tti)>,
    /// Epoch of the window for which the soft buffer was last reset
    pub softbuffer_epoch: Option<u64>,
    /// Backoff Parameter from the last RAR received
    pub backoff_param_ms: u32,
    /// Drawn backoff of the current wait
    pub backoff_interval: Option<u32>,
    pub backoff_remaining: u32,
    pub contention_id: ContentionId,
    pub msg3_identity: Option<Msg3Identity>,
    pub msg3_sent: bool,
    pub msg3_flushed: bool,
    /// The time alignment timer was started by this attempt's RAR
    pub ta_started_by_rar: bool,
    pub temp_crnti_search: bool,
}

impl RaRunState {
    pub fn new(pdcch_order: bool) -> Self {
        Self {
            pdcch_order,
            transmission_counter: 0,
            preamble_index: 0,
            prach_mask: PrachMask::All,
            contention_free: false,
            group: None,
            msg3_group: None,
            target_power_dbm: 0,
            ra_rnti: None,
            window: None,
            softbuffer_epoch: None,
            backoff_param_ms: 0,
            backoff_interval: None,
            backoff_remaining: 0,
            contention_id: 0,
            msg3_identity: None,
            msg3_sent: false,
            msg3_flushed: false,
            ta_started_by_rar: false,
            temp_crnti_search: false,
        }
    }
}

impl Default for RaRunState {
    fn default() -> Self {
        Self::new(false)
    }
}
