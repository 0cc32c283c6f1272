use std::sync::Mutex;

use lte_core::{Rnti, RntiType, Tti};
use lte_entities::mac::interfaces::{Msg3Identity, Msg3Mux, RaPhy};
use lte_pdus::mac::fields::rar_ul_grant::RarUlGrant;
use lte_pdus::phy::prach::PrachMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentPreamble {
    pub index: u8,
    pub mask: PrachMask,
    pub power_dbm: i32,
    pub tti: Tti,
}

/// Everything the procedure asked of the PHY
#[derive(Debug, Default)]
pub struct PhyLog {
    pub preambles: Vec<SentPreamble>,
    pub searches: Vec<(RntiType, Rnti, Option<(Tti, Tti)>)>,
    pub cancelled: Vec<RntiType>,
    pub ta_cmds: Vec<u16>,
    pub rar_grants: Vec<(Tti, RarUlGrant)>,
    pub prach_tti: Option<Tti>,
    pub now: Tti,
    pub path_loss_db: i32,
}

/// PHY double with a PRACH occasion in every subframe: a requested preamble goes out immediately
#[derive(Debug, Default)]
pub struct TestPhy {
    pub log: Mutex<PhyLog>,
}

impl TestPhy {
    pub fn new(path_loss_db: i32) -> Self {
        let phy = TestPhy::default();
        phy.log.lock().unwrap().path_loss_db = path_loss_db;
        phy
    }

    pub fn set_now(&self, tti: Tti) {
        self.log.lock().unwrap().now = tti;
    }

    pub fn preambles(&self) -> Vec<SentPreamble> {
        self.log.lock().unwrap().preambles.clone()
    }

    pub fn ta_cmds(&self) -> Vec<u16> {
        self.log.lock().unwrap().ta_cmds.clone()
    }

    pub fn cancelled(&self) -> Vec<RntiType> {
        self.log.lock().unwrap().cancelled.clone()
    }

    pub fn searches(&self) -> Vec<(RntiType, Rnti, Option<(Tti, Tti)>)> {
        self.log.lock().unwrap().searches.clone()
    }

    pub fn rar_grants(&self) -> Vec<(Tti, RarUlGrant)> {
        self.log.lock().unwrap().rar_grants.clone()
    }

    /// Total number of calls into the PHY
    pub fn num_calls(&self) -> usize {
        let log = self.log.lock().unwrap();
        log.preambles.len() + log.searches.len() + log.cancelled.len() + log.ta_cmds.len() + log.rar_grants.len()
    }
}

impl RaPhy for TestPhy {
    fn transmit_preamble(&self, preamble_index: u8, mask: PrachMask, target_power_dbm: i32) {
        let mut log = self.log.lock().unwrap();
        let tti = log.now;
        log.preambles.push(SentPreamble { index: preamble_index, mask, power_dbm: target_power_dbm, tti });
        log.prach_tti = Some(tti);
    }

    fn prach_tx_tti(&self) -> Option<Tti> {
        self.log.lock().unwrap().prach_tti
    }

    fn search_for_grant(&self, rnti_type: RntiType, rnti: Rnti, window: Option<(Tti, Tti)>) {
        self.log.lock().unwrap().searches.push((rnti_type, rnti, window));
    }

    fn cancel_search(&self, rnti_type: RntiType) {
        self.log.lock().unwrap().cancelled.push(rnti_type);
    }

    fn apply_timing_advance(&self, ta_cmd: u16) {
        self.log.lock().unwrap().ta_cmds.push(ta_cmd);
    }

    fn set_rar_grant(&self, rar_tti: Tti, grant: RarUlGrant) {
        self.log.lock().unwrap().rar_grants.push((rar_tti, grant));
    }

    fn current_tti(&self) -> Tti {
        self.log.lock().unwrap().now
    }

    fn path_loss_db(&self) -> i32 {
        self.log.lock().unwrap().path_loss_db
    }
}

#[derive(Debug, Default)]
pub struct MuxLog {
    pub sent: Vec<Msg3Identity>,
    pub flushes: usize,
    pub pending_len: usize,
}

#[derive(Debug, Default)]
pub struct TestMux {
    pub log: Mutex<MuxLog>,
}

impl TestMux {
    pub fn new(pending_len: usize) -> Self {
        let mux = TestMux::default();
        mux.log.lock().unwrap().pending_len = pending_len;
        mux
    }

    pub fn set_pending_len(&self, len: usize) {
        self.log.lock().unwrap().pending_len = len;
    }

    pub fn sent(&self) -> Vec<Msg3Identity> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn flushes(&self) -> usize {
        self.log.lock().unwrap().flushes
    }
}

impl Msg3Mux for TestMux {
    fn send_identity_message(&self, identity: Msg3Identity) {
        self.log.lock().unwrap().sent.push(identity);
    }

    fn flush_pending_message(&self) {
        self.log.lock().unwrap().flushes += 1;
    }

    fn pending_message_len(&self) -> usize {
        self.log.lock().unwrap().pending_len
    }
}
