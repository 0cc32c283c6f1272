mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use lte_core::{RntiType, debug};
use lte_entities::mac::interfaces::{DlGrant, RaPhy, TimerId, TimerService};
use lte_entities::mac::ra_state::RaState;
use lte_pdus::mac::fields::rar_ul_grant::RarUlGrant;
use lte_pdus::mac::pdus::rar_pdu::{MacRar, RarEntry, RarPdu};

use common::ra_test::{TEST_TA_CMD, TEST_TEMP_CRNTI};
use common::{RaTest, default_test_config};

/// TA carried by responses that belong to an aborted attempt
const STALE_TA_CMD: u16 = 1234;
const STALE_MCS: u8 = 9;

/// A RAR answering every preamble index
fn rar_for_all_preambles(ta_cmd: u16, mcs: u8) -> RarPdu {
    RarPdu {
        backoff_indicator: None,
        entries: (0..64)
            .map(|rapid| RarEntry {
                rapid,
                rar: MacRar {
                    ta_cmd,
                    ul_grant: RarUlGrant { rb_assignment: 12, mcs, tpc: 3, ..Default::default() },
                    temp_crnti: TEST_TEMP_CRNTI,
                },
            })
            .collect(),
    }
}

#[test]
fn test_reset_racing_rar_delivery() {
    debug::setup_logging_verbose();
    let RaTest { phy, timers, ra, mut tti, .. } = RaTest::new(default_test_config(), 30);
    let done = AtomicBool::new(false);
    let resets = AtomicU32::new(0);
    let mut max_counter = 0;

    assert!(ra.start_mac_order());
    thread::scope(|s| {
        // PHY side: answers every window, aborting every other attempt between grant and decode
        s.spawn(|| {
            let mut abort_next = true;
            while !done.load(Ordering::Acquire) {
                match ra.state() {
                    RaState::ResponseReception => {
                        let Some(rnti) = ra.ra_rnti() else {
                            continue;
                        };
                        let stale = rar_for_all_preambles(STALE_TA_CMD, STALE_MCS).to_bytes();
                        let grant = DlGrant {
                            rnti_type: RntiType::RaRnti,
                            rnti,
                            tti: phy.current_tti(),
                            tbs_bytes: stale.len(),
                            rv: 0,
                        };
                        let Some(ticket) = ra.new_grant_dl(&grant).decode else {
                            thread::yield_now();
                            continue;
                        };
                        if abort_next {
                            ra.reset();
                            resets.fetch_add(1, Ordering::AcqRel);
                            assert_eq!(ra.state(), RaState::Idle);
                            assert!(!ra.in_progress());
                            assert!(!ra.is_successful());
                            assert!(!ra.is_error());
                            assert!(!ra.is_contention_resolution());
                            ra.tb_decoded_ok(ticket, stale);
                            assert!(ra.start_mac_order());
                        } else {
                            ra.tb_decoded_ok(ticket, rar_for_all_preambles(TEST_TA_CMD, 3).to_bytes());
                            // Let this attempt reach contention resolution
                            while ra.state() == RaState::ResponseReception && !done.load(Ordering::Acquire) {
                                thread::yield_now();
                            }
                        }
                        abort_next = !abort_next;
                    }
                    RaState::Completion | RaState::RaProblem => {
                        ra.reset();
                        resets.fetch_add(1, Ordering::AcqRel);
                        assert!(ra.start_mac_order());
                    }
                    _ => {}
                }
                thread::yield_now();
            }
        });

        // MAC side: one subframe per iteration
        for _ in 0..5000 {
            if resets.load(Ordering::Acquire) >= 4 {
                break;
            }
            tti = tti.add_subframes(1);
            phy.set_now(tti);
            for id in timers.tick() {
                ra.timer_expired(id);
            }
            ra.step(tti);
            max_counter = max_counter.max(ra.transmission_counter());
            thread::sleep(Duration::from_micros(50));
        }
        done.store(true, Ordering::Release);
    });

    assert!(resets.load(Ordering::Acquire) >= 4);
    assert!(max_counter <= 4);
    assert!(!phy.ta_cmds().contains(&STALE_TA_CMD));
    assert!(phy.rar_grants().iter().all(|(_, grant)| grant.mcs != STALE_MCS));
    assert!(phy.ta_cmds().contains(&TEST_TA_CMD));
}

#[test]
fn test_concurrent_expiry_reports_for_running_timers() {
    debug::setup_logging_verbose();
    let RaTest { phy, timers, ra, mut tti, .. } = RaTest::new(default_test_config(), 31);
    let done = AtomicBool::new(false);

    assert!(ra.start_mac_order());
    thread::scope(|s| {
        // Expiry reports for timers that are still counting down, at most one per subframe
        // so the event queue never overflows
        s.spawn(|| {
            let mut last = None;
            while !done.load(Ordering::Acquire) {
                let now = phy.current_tti();
                if last != Some(now) {
                    last = Some(now);
                    for id in [TimerId::ResponseWindow, TimerId::ContentionResolution] {
                        if timers.is_running(id) {
                            ra.timer_expired(id);
                        }
                    }
                }
                thread::yield_now();
            }
        });

        for _ in 0..200 {
            if ra.is_error() {
                break;
            }
            tti = tti.add_subframes(1);
            phy.set_now(tti);
            for id in timers.tick() {
                ra.timer_expired(id);
            }
            ra.step(tti);
            thread::sleep(Duration::from_micros(50));
        }
        done.store(true, Ordering::Release);
    });

    assert!(ra.is_error());
    let preambles = phy.preambles();
    assert_eq!(preambles.len(), 4);
    // Each window runs its full length: armed one subframe after the preamble, seven subframes long
    for pair in preambles.windows(2) {
        assert_eq!(pair[1].tti.diff(pair[0].tti), 8);
    }
}
