use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use lte_config::{RaConfig, SharedConfig, StackConfig};
use lte_core::{Rnti, RntiType, Tti};
use lte_entities::RaProc;
use lte_entities::mac::demux::MacDemux;
use lte_entities::mac::interfaces::{DlAction, DlGrant, RaCollaborators};
use lte_entities::mac::timers::Timers;
use lte_pdus::mac::fields::rar_ul_grant::RarUlGrant;
use lte_pdus::mac::pdus::dl_sch_pdu::DlSchPdu;
use lte_pdus::mac::pdus::rar_pdu::{MacRar, RarEntry, RarPdu};

use super::doubles::{TestMux, TestPhy};

pub const TEST_TEMP_CRNTI: Rnti = 0x4601;
pub const TEST_TA_CMD: u16 = 31;

/// Small window and few transmissions to keep scenarios short. Can still be modified as needed
/// before passing it to the RaTest constructor
pub fn default_test_config() -> StackConfig {
    StackConfig::new(RaConfig {
        prach_config_index: 0,
        response_window_size: 5,
        preamble_trans_max: 4,
        contention_resolution_timer: 16,
        initial_received_target_power: -110,
        power_ramping_step: 4,
        ..Default::default()
    })
}

/// A RaProc wired to recording doubles, the real timer service and the real demultiplexer,
/// driven one subframe at a time
pub struct RaTest {
    pub config: SharedConfig,
    pub phy: Arc<TestPhy>,
    pub timers: Arc<Timers>,
    pub mux: Arc<TestMux>,
    pub ra: RaProc,
    pub tti: Tti,
}

impl RaTest {
    pub fn new(config: StackConfig, seed: u64) -> Self {
        let shared_config = SharedConfig::from_config(config);
        let phy = Arc::new(TestPhy::new(100));
        let timers = Arc::new(Timers::new());
        let mux = Arc::new(TestMux::new(6));
        let io = RaCollaborators {
            phy: phy.clone(),
            timers: timers.clone(),
            mux: mux.clone(),
            demux: Arc::new(MacDemux),
        };
        let rng = Box::new(StdRng::seed_from_u64(seed));
        let ra = RaProc::init(shared_config.clone(), io, rng).expect("valid config");

        let tti = Tti::from_sfn_sf(100, 0);
        phy.set_now(tti);
        Self { config: shared_config, phy, timers, mux, ra, tti }
    }

    pub fn with_ra_config(ra: RaConfig) -> Self {
        Self::new(StackConfig::new(ra), 1)
    }

    /// One subframe: run the timers, forward expiries and step the procedure
    pub fn tick(&mut self) {
        self.tti = self.tti.add_subframes(1);
        self.phy.set_now(self.tti);
        for id in self.timers.tick() {
            self.ra.timer_expired(id);
        }
        self.ra.step(self.tti);
    }

    pub fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Tick until `pred` holds, at most `max` subframes. Returns whether it did.
    pub fn run_until(&mut self, max: usize, pred: impl Fn(&RaProc) -> bool) -> bool {
        for _ in 0..max {
            if pred(&self.ra) {
                return true;
            }
            self.tick();
        }
        pred(&self.ra)
    }

    /// Tick until the current subframe lies in the response window
    pub fn advance_to_window(&mut self) {
        let (start, _) = self.ra.response_window().expect("response window set");
        while !self.tti.in_window(start, start) {
            self.tick();
        }
    }

    /// A RAR answering the preamble that was just sent
    pub fn rar_for_current_preamble(&self, backoff_indicator: Option<u8>) -> RarPdu {
        RarPdu {
            backoff_indicator,
            entries: vec![RarEntry {
                rapid: self.ra.preamble_index(),
                rar: MacRar {
                    ta_cmd: TEST_TA_CMD,
                    ul_grant: RarUlGrant { rb_assignment: 12, mcs: 3, tpc: 3, ..Default::default() },
                    temp_crnti: TEST_TEMP_CRNTI,
                },
            }],
        }
    }

    /// PHY path for a RAR: grant on the RA-RNTI, then decode of `payload`
    pub fn deliver_rar_bytes(&mut self, payload: Vec<u8>, rv: u8) -> DlAction {
        let grant = DlGrant {
            rnti_type: RntiType::RaRnti,
            rnti: self.ra.ra_rnti().expect("RA-RNTI set"),
            tti: self.tti,
            tbs_bytes: payload.len(),
            rv,
        };
        let action = self.ra.new_grant_dl(&grant);
        if let Some(ticket) = action.decode {
            self.ra.tb_decoded_ok(ticket, payload);
        }
        action
    }

    pub fn deliver_rar(&mut self, pdu: &RarPdu) -> DlAction {
        self.deliver_rar_bytes(pdu.to_bytes(), 0)
    }

    /// PHY path for a PDU on the Temporary C-RNTI carrying a contention resolution identity
    pub fn deliver_contention_id(&mut self, id: u64) -> DlAction {
        let payload = DlSchPdu::with_contention_resolution_id(id, &[0x20, 0x01, 0x02]).to_bytes();
        let grant = DlGrant {
            rnti_type: RntiType::TempCrnti,
            rnti: TEST_TEMP_CRNTI,
            tti: self.tti,
            tbs_bytes: payload.len(),
            rv: 0,
        };
        let action = self.ra.new_grant_dl(&grant);
        if let Some(ticket) = action.decode {
            self.ra.tb_decoded_ok(ticket, payload);
        }
        action
    }

    /// Start a contention based procedure and bring it to contention resolution
    pub fn run_to_contention_resolution(&mut self) {
        assert!(self.ra.start_mac_order());
        self.tick(); // preamble
        self.tick(); // window armed
        self.advance_to_window();
        let rar = self.rar_for_current_preamble(None);
        self.deliver_rar(&rar);
        self.tick();
        assert!(self.ra.is_contention_resolution());
    }
}
