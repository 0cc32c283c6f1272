//! Minimal eNodeB for driving a UE random access procedure without radio hardware.
//! Stands in for the PHY and the Msg3 multiplexer, answers preambles with RARs and Msg3 with
//! contention resolution.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lte_config::stack_config_sim::CfgSim;
use lte_core::{ContentionId, Rnti, RntiType, Tti};
use lte_entities::RaProc;
use lte_entities::mac::interfaces::{DlGrant, Msg3Identity, Msg3Mux, RaPhy};
use lte_pdus::mac::fields::rar_ul_grant::RarUlGrant;
use lte_pdus::mac::pdus::dl_sch_pdu::DlSchPdu;
use lte_pdus::mac::pdus::rar_pdu::{MacRar, RarEntry, RarPdu};
use lte_pdus::phy::prach::PrachMask;

/// Subframes between Msg3 and the downlink PDU resolving contention
const MSG3_TO_RESOLUTION: i32 = 6;

/// Bits flipped in the contention resolution identity handed to "another" UE
const FOREIGN_UE_MASK: ContentionId = 0x00A5_5A00_0000;

#[derive(Debug, Default, Clone, Copy)]
pub struct EnbStats {
    pub preambles: u32,
    pub rars_sent: u32,
    pub rars_dropped: u32,
    pub msg3_received: u32,
    pub resolutions_lost: u32,
    pub ta_cmds: u32,
}

struct EnbState {
    now: Tti,
    rng: StdRng,
    /// PRACH occasion of the last requested preamble and the preamble itself
    prach: Option<(Tti, u8)>,
    ra_search: Option<(Rnti, (Tti, Tti))>,
    rar_answered: bool,
    temp_search: Option<Rnti>,
    msg3: Option<(Tti, Msg3Identity)>,
    stats: EnbStats,
}

/// Downlink action decided under the eNodeB lock and carried out after releasing it
enum Downlink {
    Rar { rnti: Rnti, pdu: RarPdu },
    ContentionResolution { rnti: Rnti, id: ContentionId },
    CrntiUlGrant,
}

pub struct SimEnb {
    cfg: CfgSim,
    state: Mutex<EnbState>,
}

impl SimEnb {
    pub fn new(cfg: CfgSim) -> Self {
        let rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(1));
        Self {
            cfg,
            state: Mutex::new(EnbState {
                now: Tti::default(),
                rng,
                prach: None,
                ra_search: None,
                rar_answered: false,
                temp_search: None,
                msg3: None,
                stats: EnbStats::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EnbState> {
        self.state.lock().expect("SimEnb mutex poisoned")
    }

    pub fn stats(&self) -> EnbStats {
        self.lock().stats
    }

    pub fn set_now(&self, tti: Tti) {
        self.lock().now = tti;
    }

    /// Forget everything about the current UE procedure
    pub fn reset(&self) {
        let mut state = self.lock();
        state.prach = None;
        state.ra_search = None;
        state.rar_answered = false;
        state.temp_search = None;
        state.msg3 = None;
    }

    /// Schedule the downlink for the current subframe and hand it to the UE
    pub fn run_downlink(&self, ra: &RaProc) {
        let Some(action) = self.schedule() else {
            return;
        };
        let now = self.lock().now;

        match action {
            Downlink::Rar { rnti, pdu } => {
                let payload = pdu.to_bytes();
                let grant = DlGrant {
                    rnti_type: RntiType::RaRnti,
                    rnti,
                    tti: now,
                    tbs_bytes: payload.len(),
                    rv: 0,
                };
                if let Some(ticket) = ra.new_grant_dl(&grant).decode {
                    ra.tb_decoded_ok(ticket, payload);
                }
            }
            Downlink::ContentionResolution { rnti, id } => {
                // CCCH SDU content does not matter to the MAC
                let payload = DlSchPdu::with_contention_resolution_id(id, &[0x68, 0x12, 0x98]).to_bytes();
                let grant = DlGrant {
                    rnti_type: RntiType::TempCrnti,
                    rnti,
                    tti: now,
                    tbs_bytes: payload.len(),
                    rv: 0,
                };
                if let Some(ticket) = ra.new_grant_dl(&grant).decode {
                    ra.tb_decoded_ok(ticket, payload);
                }
            }
            Downlink::CrntiUlGrant => ra.pdcch_to_crnti(true),
        }
    }

    fn schedule(&self) -> Option<Downlink> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = state.now;

        if let (Some((rnti, (start, end))), Some((_, preamble))) = (state.ra_search, state.prach) {
            let rar_tti = start.add_subframes(self.cfg.rar_delay as i32);
            if !state.rar_answered && now == rar_tti && now.in_window(start, end) {
                state.rar_answered = true;
                if state.rng.random_bool(self.cfg.rar_loss) {
                    tracing::info!(ts = %now, "eNB: not answering preamble {}", preamble);
                    state.stats.rars_dropped += 1;
                    return None;
                }
                state.stats.rars_sent += 1;
                let pdu = RarPdu {
                    backoff_indicator: self.cfg.backoff_indicator,
                    entries: vec![RarEntry {
                        rapid: preamble,
                        rar: MacRar {
                            ta_cmd: self.cfg.ta_cmd,
                            ul_grant: RarUlGrant { rb_assignment: 0x64, mcs: 4, tpc: 3, ..Default::default() },
                            temp_crnti: self.cfg.temp_crnti,
                        },
                    }],
                };
                tracing::info!(ts = %now, "eNB: -> {}", pdu);
                return Some(Downlink::Rar { rnti, pdu });
            }
        }

        if let Some((sent, identity)) = state.msg3 {
            if now.diff(sent) >= MSG3_TO_RESOLUTION {
                state.msg3 = None;
                let lost = state.rng.random_bool(self.cfg.contention_loss);
                if lost {
                    state.stats.resolutions_lost += 1;
                }
                match identity {
                    Msg3Identity::ContentionId(id) => {
                        let rnti = state.temp_search?;
                        let id = if lost { id ^ FOREIGN_UE_MASK } else { id };
                        tracing::info!(ts = %now, "eNB: -> contention resolution id {:012x}", id);
                        return Some(Downlink::ContentionResolution { rnti, id });
                    }
                    Msg3Identity::Crnti(crnti) => {
                        if lost {
                            tracing::info!(ts = %now, "eNB: not scheduling C-RNTI 0x{:04x}", crnti);
                            return None;
                        }
                        tracing::info!(ts = %now, "eNB: -> UL grant for C-RNTI 0x{:04x}", crnti);
                        return Some(Downlink::CrntiUlGrant);
                    }
                }
            }
        }
        None
    }
}

impl RaPhy for SimEnb {
    fn transmit_preamble(&self, preamble_index: u8, mask: PrachMask, target_power_dbm: i32) {
        let mut state = self.lock();
        // PRACH occasion in the next subframe
        let occasion = state.now.add_subframes(1);
        tracing::info!(
            ts = %state.now,
            "eNB: preamble {} ({}) at {} dBm due on {}",
            preamble_index,
            mask,
            target_power_dbm,
            occasion
        );
        state.prach = Some((occasion, preamble_index));
        state.rar_answered = false;
        state.stats.preambles += 1;
    }

    fn prach_tx_tti(&self) -> Option<Tti> {
        let state = self.lock();
        match state.prach {
            Some((occasion, _)) if state.now.diff(occasion) >= 0 => Some(occasion),
            _ => None,
        }
    }

    fn search_for_grant(&self, rnti_type: RntiType, rnti: Rnti, window: Option<(Tti, Tti)>) {
        let mut state = self.lock();
        match (rnti_type, window) {
            (RntiType::RaRnti, Some(window)) => state.ra_search = Some((rnti, window)),
            (RntiType::TempCrnti, _) => state.temp_search = Some(rnti),
            (rnti_type, window) => {
                tracing::warn!("eNB: unexpected search for {} 0x{:04x}, window {:?}", rnti_type, rnti, window);
            }
        }
    }

    fn cancel_search(&self, rnti_type: RntiType) {
        let mut state = self.lock();
        match rnti_type {
            RntiType::RaRnti => state.ra_search = None,
            RntiType::TempCrnti => state.temp_search = None,
            RntiType::Crnti => {}
        }
    }

    fn apply_timing_advance(&self, ta_cmd: u16) {
        let mut state = self.lock();
        tracing::debug!(ts = %state.now, "eNB: UE applied TA command {}", ta_cmd);
        state.stats.ta_cmds += 1;
    }

    fn set_rar_grant(&self, rar_tti: Tti, grant: RarUlGrant) {
        tracing::debug!("eNB: Msg3 grant from RAR on {}: {}", rar_tti, grant);
    }

    fn current_tti(&self) -> Tti {
        self.lock().now
    }

    fn path_loss_db(&self) -> i32 {
        self.cfg.path_loss_db
    }
}

impl Msg3Mux for SimEnb {
    fn send_identity_message(&self, identity: Msg3Identity) {
        let mut state = self.lock();
        tracing::info!(ts = %state.now, "eNB: <- Msg3 with {}", identity);
        state.msg3 = Some((state.now, identity));
        state.stats.msg3_received += 1;
    }

    fn flush_pending_message(&self) {
        tracing::debug!("eNB: UE flushed Msg3 buffer");
    }

    fn pending_message_len(&self) -> usize {
        self.cfg.msg3_len
    }
}
