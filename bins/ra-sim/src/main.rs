use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use lte_config::{SharedConfig, toml_config};
use lte_core::{Tti, debug};
use lte_entities::RaProc;
use lte_entities::mac::demux::MacDemux;
use lte_entities::mac::interfaces::RaCollaborators;
use lte_entities::mac::timers::Timers;

mod sim_enb;

use sim_enb::SimEnb;

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "LTE UE random access simulator",
    long_about = "Runs UE random access procedures against a simulated eNodeB using the provided TOML configuration"
)]
struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with random access and simulation parameters")]
    config: String,

    /// Override the number of subframes to run
    #[arg(long)]
    ticks: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Pace the simulation at one subframe per millisecond
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

/// Result of one random access procedure
#[derive(Debug)]
struct Outcome {
    success: bool,
    transmissions: u32,
    subframes: i32,
}

fn main() {
    eprintln!(" -> LTE UE random access simulator\n");

    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let mut sim_cfg = cfg.config().sim.clone().unwrap_or_default();
    if let Some(ticks) = args.ticks {
        sim_cfg.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        sim_cfg.seed = seed;
    }

    let enb = Arc::new(SimEnb::new(sim_cfg.clone()));
    let timers = Arc::new(Timers::new());
    let io = RaCollaborators {
        phy: enb.clone(),
        timers: timers.clone(),
        mux: enb.clone(),
        demux: Arc::new(MacDemux),
    };
    let rng = Box::new(StdRng::seed_from_u64(sim_cfg.seed));
    let ra = match RaProc::init(cfg.clone(), io, rng) {
        Ok(ra) => ra,
        Err(e) => {
            println!("Invalid random access configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    let mut tti = Tti::default();
    let mut started = tti;
    let mut outcomes: Vec<Outcome> = Vec::new();
    enb.set_now(tti);
    ra.start_mac_order();

    for _ in 0..sim_cfg.ticks {
        if !running.load(Ordering::SeqCst) {
            tracing::info!("interrupted");
            break;
        }

        tti = tti.add_subframes(1);
        enb.set_now(tti);
        for id in timers.tick() {
            ra.timer_expired(id);
        }
        enb.run_downlink(&ra);
        ra.step(tti);

        if ra.is_successful() || ra.is_error() {
            outcomes.push(Outcome {
                success: ra.is_successful(),
                transmissions: ra.transmission_counter(),
                subframes: tti.diff(started),
            });
            ra.reset();
            enb.reset();
            if outcomes.len() as u32 >= sim_cfg.attempts {
                break;
            }
            started = tti;
            ra.start_mac_order();
        }

        if args.realtime {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    let stats = enb.stats();
    let successes = outcomes.iter().filter(|o| o.success).count();
    println!("Procedures:      {} of {} finished, {} successful", outcomes.len(), sim_cfg.attempts, successes);
    for (i, o) in outcomes.iter().enumerate() {
        println!(
            "  #{:<3} {:<8} {} preamble(s), {} subframes",
            i,
            if o.success { "success" } else { "problem" },
            o.transmissions,
            o.subframes
        );
    }
    println!(
        "eNB:             {} preambles, {} RARs sent, {} dropped, {} Msg3, {} resolutions lost, {} TA commands applied",
        stats.preambles, stats.rars_sent, stats.rars_dropped, stats.msg3_received, stats.resolutions_lost, stats.ta_cmds
    );
    {
        let state = cfg.state_read();
        if let Some(crnti) = state.crnti {
            println!("C-RNTI:          0x{:04x}", crnti);
        }
    }
}
