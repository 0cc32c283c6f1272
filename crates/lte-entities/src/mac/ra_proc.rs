//! UE random access procedure, 36.321 5.1
//!
//! `RaProc` is driven once per subframe through `step`. The PHY and the timer service report
//! decoded transport blocks, PDCCH grants and timer expiries from their own threads; those
//! reports are queued and acted upon at the next `step`. Every queued report carries the epoch
//! of the reception it belongs to, so that reports for a window that already closed are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use rand::{Rng, RngCore};

use lte_config::{RaConfig, RaConfigError, SharedConfig};
use lte_core::rnti::ra_rnti_for;
use lte_core::{CONTENTION_ID_MASK, ContentionId, Rnti, RntiType, Tti};
use lte_pdus::mac::pdus::rar_pdu::{MAX_RAR_PDU_LEN, RarPdu};
use lte_pdus::phy::prach::{PrachMask, delta_preamble_db};

use crate::mac::interfaces::{DecodeTicket, DlAction, DlGrant, Msg3Identity, RaCollaborators, TimerId};
use crate::mac::ra_state::{PreambleGroup, RaRunState, RaState};

/// Reports that may be pending between two steps
const RA_EVENT_QUEUE_LEN: usize = 32;

/// Subframes between the end of the preamble and the start of the RA response window
const RESPONSE_WINDOW_OFFSET: i32 = 3;

enum RaEvent {
    TbDecoded { ticket: DecodeTicket, payload: Vec<u8> },
    TimerExpired { id: TimerId, epoch: u64 },
    PdcchToCrnti { is_ul_grant: bool, epoch: u64 },
    Msg3Retransmitted { epoch: u64 },
}

impl RaEvent {
    fn epoch(&self) -> u64 {
        match self {
            RaEvent::TbDecoded { ticket, .. } => ticket.epoch,
            RaEvent::TimerExpired { epoch, .. } => *epoch,
            RaEvent::PdcchToCrnti { epoch, .. } => *epoch,
            RaEvent::Msg3Retransmitted { epoch } => *epoch,
        }
    }
}

impl core::fmt::Display for RaEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RaEvent::TbDecoded { ticket, payload } => {
                write!(f, "TbDecoded({} @ {}, {} bytes)", ticket.rnti_type, ticket.tti, payload.len())
            }
            RaEvent::TimerExpired { id, .. } => write!(f, "TimerExpired({})", id),
            RaEvent::PdcchToCrnti { is_ul_grant, .. } => write!(f, "PdcchToCrnti(ul: {})", is_ul_grant),
            RaEvent::Msg3Retransmitted { .. } => write!(f, "Msg3Retransmitted"),
        }
    }
}

struct RaInner {
    state: RaState,
    run: RaRunState,
    /// Snapshot taken at Initialization, fixed for the rest of the procedure
    cfg: RaConfig,
    rng: Box<dyn RngCore + Send>,
    /// TTI of the last step
    tti: Tti,
}

impl RaInner {
    fn set_state(&mut self, new_state: RaState) {
        tracing::debug!(ts = %self.tti, "{} -> {}", self.state, new_state);
        self.state = new_state;
    }
}

/// PREAMBLE_RECEIVED_TARGET_POWER for the attempt after `transmissions` preambles were sent, clipped to Pcmax
pub fn preamble_target_power(cfg: &RaConfig, group: Option<PreambleGroup>, transmissions: u32) -> i32 {
    let mut power = cfg.initial_received_target_power
        + delta_preamble_db(cfg.prach_config_index)
        + transmissions as i32 * cfg.power_ramping_step;
    if group == Some(PreambleGroup::B) {
        power += cfg.delta_preamble_msg3;
    }
    power.min(cfg.pcmax_dbm)
}

/// 36.321 5.1.2: group B if it exists, Msg3 is larger than messageSizeGroupA and the path loss
/// leaves room for messagePowerOffsetGroupB
pub fn select_preamble_group(cfg: &RaConfig, pending_msg3_bytes: usize, path_loss_db: i32) -> PreambleGroup {
    if !cfg.has_group_b() {
        return PreambleGroup::A;
    }
    let max_path_loss =
        cfg.pcmax_dbm - cfg.initial_received_target_power - cfg.delta_preamble_msg3 - cfg.message_power_offset_group_b;
    if pending_msg3_bytes * 8 > cfg.message_size_group_a && path_loss_db < max_path_loss {
        PreambleGroup::B
    } else {
        PreambleGroup::A
    }
}

pub struct RaProc {
    config: SharedConfig,
    io: RaCollaborators,
    inner: Mutex<RaInner>,
    /// Identifies the current reception window; advanced whenever one closes
    epoch: AtomicU64,
    event_sender: Sender<RaEvent>,
    event_receiver: Receiver<RaEvent>,
}

impl RaProc {
    /// Validates the random access configuration in the parameter store and creates an idle procedure
    pub fn init(config: SharedConfig, io: RaCollaborators, rng: Box<dyn RngCore + Send>) -> Result<Self, RaConfigError> {
        let cfg = config.state_read().ra.clone();
        if let Err(e) = cfg.validate() {
            tracing::error!("invalid random access configuration: {}", e);
            return Err(e);
        }

        let (event_sender, event_receiver) = bounded(RA_EVENT_QUEUE_LEN);
        Ok(Self {
            config,
            io,
            inner: Mutex::new(RaInner {
                state: RaState::Idle,
                run: RaRunState::default(),
                cfg,
                rng,
                tti: Tti::default(),
            }),
            epoch: AtomicU64::new(0),
            event_sender,
            event_receiver,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RaInner> {
        self.inner.lock().expect("RaProc mutex poisoned")
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Invalidates everything issued for the reception in progress
    fn close_window(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Start triggered by a PDCCH order. Returns false if a procedure is already ongoing.
    pub fn start_pdcch_order(&self) -> bool {
        self.start(true)
    }

    /// Start triggered by the MAC itself, e.g. for a scheduling request. Returns false if a procedure is already ongoing.
    pub fn start_mac_order(&self) -> bool {
        self.start(false)
    }

    fn start(&self, pdcch_order: bool) -> bool {
        let mut inner = self.lock();
        let origin = if pdcch_order { "PDCCH order" } else { "MAC order" };
        let ts = self.io.phy.current_tti();
        if inner.state != RaState::Idle {
            tracing::info!(ts = %ts, "ignoring {}, procedure in state {}", origin, inner.state);
            return false;
        }
        tracing::info!(ts = %ts, "starting random access procedure, {}", origin);
        inner.run = RaRunState::new(pdcch_order);
        inner.set_state(RaState::Initialization);
        true
    }

    /// Runs once per subframe: applies pending reports, then executes the current state.
    pub fn step(&self, tti: Tti) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tti = tti;

        self.process_events(inner);

        loop {
            let before = inner.state;
            match inner.state {
                RaState::Idle | RaState::ResponseReception | RaState::Completion | RaState::RaProblem => {}
                RaState::Initialization => self.initialization(inner),
                RaState::ResourceSelection => self.resource_selection(inner),
                RaState::PreambleTransmission => self.preamble_transmission(inner),
                RaState::PdcchSetup => self.pdcch_setup(inner),
                RaState::ResponseError => self.response_error(inner),
                RaState::BackoffWait => self.backoff_wait(inner),
                RaState::ContentionResolution => self.contention_resolution(inner),
            }
            if inner.state == before || !inner.state.is_transient() {
                break;
            }
        }
    }

    fn process_events(&self, inner: &mut RaInner) {
        while let Ok(event) = self.event_receiver.try_recv() {
            if event.epoch() != self.current_epoch() {
                tracing::debug!(ts = %inner.tti, "discarding stale {}", event);
                continue;
            }
            tracing::trace!(ts = %inner.tti, "processing {}", event);
            match event {
                RaEvent::TbDecoded { ticket, payload } => self.handle_tb_decoded(inner, ticket, &payload),
                RaEvent::TimerExpired { id, .. } => self.handle_timer_expired(inner, id),
                RaEvent::PdcchToCrnti { is_ul_grant, .. } => self.handle_pdcch_to_crnti(inner, is_ul_grant),
                RaEvent::Msg3Retransmitted { .. } => self.handle_msg3_retx(inner),
            }
        }
    }

    // ----------------------------------------------------------------------------------------
    // State steps
    // ----------------------------------------------------------------------------------------

    fn initialization(&self, inner: &mut RaInner) {
        let cfg = self.config.state_read().ra.clone();
        if let Err(e) = cfg.validate() {
            tracing::error!(ts = %inner.tti, "invalid random access configuration: {}", e);
            self.ra_problem(inner);
            return;
        }
        inner.cfg = cfg;

        let pdcch_order = inner.run.pdcch_order;
        inner.run = RaRunState::new(pdcch_order);
        inner.run.contention_id = match self.config.config().ue.contention_id {
            Some(id) => id,
            None => inner.rng.random::<u64>() & CONTENTION_ID_MASK,
        };
        self.config.state_write().contention_id = Some(inner.run.contention_id);
        tracing::debug!(ts = %inner.tti, "contention id {:012x}", inner.run.contention_id);

        inner.set_state(RaState::ResourceSelection);
    }

    fn resource_selection(&self, inner: &mut RaInner) {
        if let Some(preamble) = inner.cfg.dedicated_preamble {
            inner.run.contention_free = true;
            inner.run.group = None;
            inner.run.preamble_index = preamble;
            inner.run.prach_mask = PrachMask::from_index(inner.cfg.prach_mask_index).unwrap_or(PrachMask::All);
        } else {
            let group = match inner.run.msg3_group {
                Some(group) => group,
                None => select_preamble_group(&inner.cfg, self.io.mux.pending_message_len(), self.io.phy.path_loss_db()),
            };
            let nof_group_a = inner.cfg.nof_group_a_preambles;
            let nof_group_b = inner.cfg.nof_group_b_preambles();
            let preamble = match group {
                PreambleGroup::A => inner.rng.random_range(0..nof_group_a),
                PreambleGroup::B => nof_group_a + inner.rng.random_range(0..nof_group_b),
            };
            inner.run.contention_free = false;
            inner.run.group = Some(group);
            inner.run.preamble_index = preamble;
            inner.run.prach_mask = PrachMask::All;
        }

        inner.run.target_power_dbm = preamble_target_power(&inner.cfg, inner.run.group, inner.run.transmission_counter);
        tracing::debug!(
            ts = %inner.tti,
            "selected preamble {} ({}), mask {}, target power {} dBm",
            inner.run.preamble_index,
            match inner.run.group {
                Some(PreambleGroup::A) => "group A",
                Some(PreambleGroup::B) => "group B",
                None => "dedicated",
            },
            inner.run.prach_mask,
            inner.run.target_power_dbm
        );
        inner.set_state(RaState::PreambleTransmission);
    }

    fn preamble_transmission(&self, inner: &mut RaInner) {
        self.io
            .phy
            .transmit_preamble(inner.run.preamble_index, inner.run.prach_mask, inner.run.target_power_dbm);
        inner.run.transmission_counter += 1;
        inner.run.ra_rnti = None;
        inner.run.window = None;
        tracing::info!(
            ts = %inner.tti,
            "-> preamble {} at {} dBm, transmission {}/{}",
            inner.run.preamble_index,
            inner.run.target_power_dbm,
            inner.run.transmission_counter,
            inner.cfg.preamble_trans_max
        );
        inner.set_state(RaState::PdcchSetup);
    }

    fn pdcch_setup(&self, inner: &mut RaInner) {
        let Some(prach_tti) = self.io.phy.prach_tx_tti() else {
            tracing::trace!(ts = %inner.tti, "waiting for PRACH occasion");
            return;
        };

        let ra_rnti = ra_rnti_for(prach_tti);
        let start = prach_tti.add_subframes(RESPONSE_WINDOW_OFFSET);
        let end = start.add_subframes(inner.cfg.response_window_size as i32 - 1);
        self.io.phy.search_for_grant(RntiType::RaRnti, ra_rnti, Some((start, end)));

        // Expire once the last subframe of the window has passed
        let duration = (end.diff(inner.tti) + 1).max(1) as u32;
        self.io.timers.start(TimerId::ResponseWindow, duration);

        inner.run.ra_rnti = Some(ra_rnti);
        inner.run.window = Some((start, end));
        tracing::debug!(
            ts = %inner.tti,
            "preamble sent at {}, searching RA-RNTI 0x{:04x} in [{}, {}]",
            prach_tti,
            ra_rnti,
            start,
            end
        );
        inner.set_state(RaState::ResponseReception);
    }

    fn response_error(&self, inner: &mut RaInner) {
        if inner.run.transmission_counter >= inner.cfg.preamble_trans_max {
            tracing::warn!(
                ts = %inner.tti,
                "maximum number of preamble transmissions reached ({})",
                inner.cfg.preamble_trans_max
            );
            self.ra_problem(inner);
            return;
        }

        let backoff = if inner.run.backoff_param_ms > 0 {
            inner.rng.random_range(0..=inner.run.backoff_param_ms)
        } else {
            0
        };
        inner.run.backoff_interval = Some(backoff);
        // Nothing to wait for, BackoffWait would only cost a subframe
        if backoff == 0 {
            inner.set_state(RaState::ResourceSelection);
        } else {
            tracing::debug!(ts = %inner.tti, "backing off {} ms (parameter {} ms)", backoff, inner.run.backoff_param_ms);
            inner.run.backoff_remaining = backoff;
            inner.set_state(RaState::BackoffWait);
        }
    }

    fn backoff_wait(&self, inner: &mut RaInner) {
        inner.run.backoff_remaining = inner.run.backoff_remaining.saturating_sub(1);
        if inner.run.backoff_remaining == 0 {
            inner.set_state(RaState::ResourceSelection);
        }
    }

    fn contention_resolution(&self, inner: &mut RaInner) {
        if inner.run.msg3_sent {
            return;
        }

        let crnti = self.config.state_read().crnti;
        let identity = match crnti {
            Some(crnti) => Msg3Identity::Crnti(crnti),
            None => Msg3Identity::ContentionId(inner.run.contention_id),
        };
        self.io.mux.send_identity_message(identity);
        inner.run.msg3_identity = Some(identity);
        inner.run.msg3_sent = true;
        inner.run.msg3_flushed = false;
        if inner.run.msg3_group.is_none() {
            inner.run.msg3_group = inner.run.group;
        }
        self.io
            .timers
            .start(TimerId::ContentionResolution, inner.cfg.contention_resolution_timer);

        if let Msg3Identity::ContentionId(_) = identity {
            let temp_crnti = self.config.state_read().temp_crnti;
            if let Some(temp_crnti) = temp_crnti {
                self.io.phy.search_for_grant(RntiType::TempCrnti, temp_crnti, None);
                inner.run.temp_crnti_search = true;
            }
        }
        tracing::info!(ts = %inner.tti, "-> Msg3 with {}", identity);
    }

    // ----------------------------------------------------------------------------------------
    // Reports from PHY and timers
    // ----------------------------------------------------------------------------------------

    fn handle_tb_decoded(&self, inner: &mut RaInner, ticket: DecodeTicket, payload: &[u8]) {
        match (inner.state, ticket.rnti_type) {
            (RaState::ResponseReception, RntiType::RaRnti) => self.process_rar(inner, ticket, payload),
            (RaState::ContentionResolution, RntiType::TempCrnti) => self.process_contention_pdu(inner, payload),
            (state, rnti_type) => {
                tracing::debug!(ts = %inner.tti, "ignoring transport block for {} in state {}", rnti_type, state);
            }
        }
    }

    fn process_rar(&self, inner: &mut RaInner, ticket: DecodeTicket, payload: &[u8]) {
        let pdu = match RarPdu::from_bytes(payload) {
            Ok(pdu) => pdu,
            Err(e) => {
                tracing::warn!(ts = %inner.tti, "malformed RAR ({} bytes): {:?}", payload.len(), e);
                return;
            }
        };
        tracing::debug!(ts = %inner.tti, "<- {}", pdu);

        inner.run.backoff_param_ms = pdu.backoff_ms().unwrap_or(0);

        let Some(rar) = pdu.find(inner.run.preamble_index).copied() else {
            tracing::debug!(ts = %inner.tti, "RAR has no response for preamble {}", inner.run.preamble_index);
            return;
        };
        tracing::info!(
            ts = %inner.tti,
            "<- RAR for preamble {}: ta {}, temp C-RNTI 0x{:04x}, {}",
            inner.run.preamble_index,
            rar.ta_cmd,
            rar.temp_crnti,
            rar.ul_grant
        );

        self.apply_timing_advance(inner, rar.ta_cmd);
        self.io.phy.set_rar_grant(ticket.tti, rar.ul_grant);

        self.io.timers.stop(TimerId::ResponseWindow);
        self.io.phy.cancel_search(RntiType::RaRnti);
        self.close_window();

        if inner.run.contention_free {
            self.complete(inner);
        } else {
            self.config.state_write().temp_crnti = Some(rar.temp_crnti);
            inner.set_state(RaState::ContentionResolution);
        }
    }

    /// 36.321 5.2
    fn apply_timing_advance(&self, inner: &mut RaInner, ta_cmd: u16) {
        if inner.run.contention_free {
            self.io.phy.apply_timing_advance(ta_cmd);
            self.io.timers.start(TimerId::TimeAlignment, inner.cfg.time_alignment_timer);
        } else if !self.io.timers.is_running(TimerId::TimeAlignment) {
            self.io.phy.apply_timing_advance(ta_cmd);
            self.io.timers.start(TimerId::TimeAlignment, inner.cfg.time_alignment_timer);
            inner.run.ta_started_by_rar = true;
        } else {
            tracing::debug!(ts = %inner.tti, "time alignment timer running, ignoring TA command {}", ta_cmd);
        }
    }

    fn process_contention_pdu(&self, inner: &mut RaInner, payload: &[u8]) {
        let Some(Msg3Identity::ContentionId(id)) = inner.run.msg3_identity else {
            tracing::debug!(ts = %inner.tti, "ignoring Temporary C-RNTI PDU, Msg3 carried the C-RNTI");
            return;
        };

        if !self.io.demux.matches_contention_id(payload, id) {
            tracing::debug!(ts = %inner.tti, "no matching contention resolution id, waiting for timer");
            return;
        }

        tracing::info!(ts = %inner.tti, "<- contention resolution id {:012x} matches", id);
        {
            let mut state = self.config.state_write();
            if let Some(temp_crnti) = state.temp_crnti.take() {
                state.crnti = Some(temp_crnti);
            }
        }
        self.contention_resolved(inner);
    }

    fn handle_pdcch_to_crnti(&self, inner: &mut RaInner, is_ul_grant: bool) {
        if inner.state != RaState::ContentionResolution {
            tracing::trace!(ts = %inner.tti, "PDCCH for C-RNTI in state {}", inner.state);
            return;
        }
        let Some(Msg3Identity::Crnti(crnti)) = inner.run.msg3_identity else {
            tracing::debug!(ts = %inner.tti, "ignoring PDCCH for C-RNTI, Msg3 carried the contention id");
            return;
        };

        // 36.321 5.1.5: a MAC initiated procedure is only resolved by an uplink grant
        if !inner.run.pdcch_order && !is_ul_grant {
            tracing::debug!(ts = %inner.tti, "DL assignment for C-RNTI does not resolve a MAC initiated procedure");
            return;
        }

        tracing::info!(ts = %inner.tti, "<- PDCCH for C-RNTI 0x{:04x}, contention resolved", crnti);
        self.config.state_write().temp_crnti = None;
        self.contention_resolved(inner);
    }

    fn handle_timer_expired(&self, inner: &mut RaInner, id: TimerId) {
        // Expired timers leave the service, so a running one was started again after this expiry
        if self.io.timers.is_running(id) {
            tracing::debug!(ts = %inner.tti, "discarding expiry of {}, timer was restarted", id);
            return;
        }
        match (inner.state, id) {
            (RaState::ResponseReception, TimerId::ResponseWindow) => {
                tracing::info!(
                    ts = %inner.tti,
                    "response window ended without RAR for preamble {}",
                    inner.run.preamble_index
                );
                self.io.phy.cancel_search(RntiType::RaRnti);
                self.close_window();
                inner.set_state(RaState::ResponseError);
            }
            (RaState::ContentionResolution, TimerId::ContentionResolution) => self.contention_failed(inner),
            (state, id) => {
                tracing::debug!(ts = %inner.tti, "ignoring expiry of {} in state {}", id, state);
            }
        }
    }

    fn handle_msg3_retx(&self, inner: &mut RaInner) {
        if inner.state == RaState::ContentionResolution && inner.run.msg3_sent {
            tracing::debug!(ts = %inner.tti, "Msg3 retransmission, restarting contention resolution timer");
            self.io
                .timers
                .start(TimerId::ContentionResolution, inner.cfg.contention_resolution_timer);
        }
    }

    // ----------------------------------------------------------------------------------------
    // Outcomes
    // ----------------------------------------------------------------------------------------

    fn contention_resolved(&self, inner: &mut RaInner) {
        self.io.timers.stop(TimerId::ContentionResolution);
        if inner.run.temp_crnti_search {
            self.io.phy.cancel_search(RntiType::TempCrnti);
            inner.run.temp_crnti_search = false;
        }
        self.close_window();
        self.complete(inner);
    }

    fn contention_failed(&self, inner: &mut RaInner) {
        tracing::warn!(ts = %inner.tti, "contention resolution timer expired");
        self.config.state_write().temp_crnti = None;
        if inner.run.temp_crnti_search {
            self.io.phy.cancel_search(RntiType::TempCrnti);
            inner.run.temp_crnti_search = false;
        }
        self.flush_msg3(inner);
        inner.run.msg3_sent = false;
        if inner.run.ta_started_by_rar {
            self.io.timers.stop(TimerId::TimeAlignment);
            inner.run.ta_started_by_rar = false;
        }
        self.close_window();
        inner.set_state(RaState::ResponseError);
    }

    fn flush_msg3(&self, inner: &mut RaInner) {
        if inner.run.msg3_sent && !inner.run.msg3_flushed {
            self.io.mux.flush_pending_message();
            inner.run.msg3_flushed = true;
        }
    }

    fn complete(&self, inner: &mut RaInner) {
        self.flush_msg3(inner);
        inner.run.ta_started_by_rar = false;
        tracing::info!(
            ts = %inner.tti,
            "random access procedure successful after {} transmission(s)",
            inner.run.transmission_counter
        );
        inner.set_state(RaState::Completion);
    }

    fn ra_problem(&self, inner: &mut RaInner) {
        self.close_window();
        tracing::warn!(ts = %inner.tti, "random access problem");
        inner.set_state(RaState::RaProblem);
    }

    // ----------------------------------------------------------------------------------------
    // Entry points for PHY, timers and upper layers
    // ----------------------------------------------------------------------------------------

    /// Decides whether the PHY should decode a downlink grant found for one of our identities
    pub fn new_grant_dl(&self, grant: &DlGrant) -> DlAction {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let epoch = self.current_epoch();
        let ticket = DecodeTicket { rnti_type: grant.rnti_type, tti: grant.tti, epoch };

        match (inner.state, grant.rnti_type) {
            (RaState::ResponseReception, RntiType::RaRnti) => {
                if inner.run.ra_rnti != Some(grant.rnti) {
                    tracing::debug!(ts = %grant.tti, "grant for RA-RNTI 0x{:04x} is not ours", grant.rnti);
                    return DlAction::ignore();
                }
                if let Some((start, end)) = inner.run.window {
                    if !grant.tti.in_window(start, end) {
                        tracing::debug!(ts = %grant.tti, "RAR grant outside response window [{}, {}]", start, end);
                        return DlAction::ignore();
                    }
                }
                if grant.tbs_bytes > MAX_RAR_PDU_LEN {
                    tracing::warn!(
                        ts = %grant.tti,
                        "RAR grant of {} bytes exceeds buffer of {} bytes",
                        grant.tbs_bytes,
                        MAX_RAR_PDU_LEN
                    );
                    return DlAction::ignore();
                }
                let first_in_window = inner.run.softbuffer_epoch != Some(epoch);
                inner.run.softbuffer_epoch = Some(epoch);
                tracing::debug!(ts = %grant.tti, "<- RAR grant, {} bytes, rv {}", grant.tbs_bytes, grant.rv);
                DlAction { decode: Some(ticket), reset_softbuffer: grant.rv == 0 || first_in_window }
            }
            (RaState::ContentionResolution, RntiType::TempCrnti) => {
                let temp_crnti = self.config.state_read().temp_crnti;
                if temp_crnti != Some(grant.rnti) {
                    tracing::debug!(ts = %grant.tti, "grant for Temporary C-RNTI 0x{:04x} is not ours", grant.rnti);
                    return DlAction::ignore();
                }
                if !matches!(inner.run.msg3_identity, Some(Msg3Identity::ContentionId(_))) {
                    return DlAction::ignore();
                }
                tracing::debug!(ts = %grant.tti, "<- Temporary C-RNTI grant, {} bytes, rv {}", grant.tbs_bytes, grant.rv);
                DlAction { decode: Some(ticket), reset_softbuffer: grant.rv == 0 }
            }
            (state, rnti_type) => {
                tracing::trace!(ts = %grant.tti, "no decode for {} grant in state {}", rnti_type, state);
                DlAction::ignore()
            }
        }
    }

    /// A transport block decoded on a grant accepted by new_grant_dl
    pub fn tb_decoded_ok(&self, ticket: DecodeTicket, payload: Vec<u8>) {
        self.enqueue(RaEvent::TbDecoded { ticket, payload });
    }

    pub fn timer_expired(&self, id: TimerId) {
        self.enqueue(RaEvent::TimerExpired { id, epoch: self.current_epoch() });
    }

    /// PDCCH addressed to the C-RNTI was received
    pub fn pdcch_to_crnti(&self, is_ul_grant: bool) {
        self.enqueue(RaEvent::PdcchToCrnti { is_ul_grant, epoch: self.current_epoch() });
    }

    /// Msg3 HARQ retransmission took place
    pub fn msg3_retransmitted(&self) {
        self.enqueue(RaEvent::Msg3Retransmitted { epoch: self.current_epoch() });
    }

    fn enqueue(&self, event: RaEvent) {
        match self.event_sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!("random access event queue full, dropping {}", event);
            }
            Err(TrySendError::Disconnected(event)) => {
                tracing::error!("random access event queue closed, dropping {}", event);
            }
        }
    }

    /// Abort any procedure in progress and return to Idle
    pub fn reset(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.state == RaState::Idle {
            tracing::debug!("reset while idle, nothing to do");
            return;
        }

        match inner.state {
            RaState::ResponseReception => {
                self.io.timers.stop(TimerId::ResponseWindow);
                self.io.phy.cancel_search(RntiType::RaRnti);
            }
            RaState::ContentionResolution => {
                self.io.timers.stop(TimerId::ContentionResolution);
                if inner.run.temp_crnti_search {
                    self.io.phy.cancel_search(RntiType::TempCrnti);
                }
                self.flush_msg3(inner);
            }
            _ => {}
        }

        let mut dropped = 0;
        while self.event_receiver.try_recv().is_ok() {
            dropped += 1;
        }
        self.close_window();
        self.config.state_write().temp_crnti = None;

        tracing::info!(ts = %inner.tti, "random access procedure reset in state {}, {} pending events dropped", inner.state, dropped);
        inner.run = RaRunState::default();
        inner.set_state(RaState::Idle);
    }

    // ----------------------------------------------------------------------------------------
    // Predicates and inspection
    // ----------------------------------------------------------------------------------------

    pub fn state(&self) -> RaState {
        self.lock().state
    }

    pub fn is_successful(&self) -> bool {
        self.lock().state == RaState::Completion
    }

    /// The last response or contention resolution failed and the next attempt is pending
    pub fn is_response_error(&self) -> bool {
        matches!(self.lock().state, RaState::ResponseError | RaState::BackoffWait)
    }

    pub fn is_contention_resolution(&self) -> bool {
        self.lock().state == RaState::ContentionResolution
    }

    pub fn is_error(&self) -> bool {
        self.lock().state == RaState::RaProblem
    }

    pub fn in_progress(&self) -> bool {
        !matches!(self.lock().state, RaState::Idle | RaState::Completion | RaState::RaProblem)
    }

    pub fn transmission_counter(&self) -> u32 {
        self.lock().run.transmission_counter
    }

    pub fn preamble_index(&self) -> u8 {
        self.lock().run.preamble_index
    }

    pub fn preamble_group(&self) -> Option<PreambleGroup> {
        self.lock().run.group
    }

    pub fn target_power_dbm(&self) -> i32 {
        self.lock().run.target_power_dbm
    }

    pub fn ra_rnti(&self) -> Option<Rnti> {
        self.lock().run.ra_rnti
    }

    pub fn response_window(&self) -> Option<(Tti, Tti)> {
        self.lock().run.window
    }

    /// Backoff drawn after the last failed attempt, in ms
    pub fn backoff_interval(&self) -> Option<u32> {
        self.lock().run.backoff_interval
    }

    pub fn backoff_param_ms(&self) -> u32 {
        self.lock().run.backoff_param_ms
    }

    pub fn contention_id(&self) -> ContentionId {
        self.lock().run.contention_id
    }
}
