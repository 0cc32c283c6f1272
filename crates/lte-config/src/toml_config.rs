use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::ra_config::RaConfig;
use super::stack_config::{CfgUe, SharedConfig, StackConfig, StackState};
use super::stack_config_sim::{CfgSimDto, apply_sim_patch};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.1";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref ra) = root.ra {
        if !ra.extra.is_empty() {
            return Err(format!("Unrecognized fields in ra: {:?}", sorted_keys(&ra.extra)).into());
        }
    }
    if let Some(ref ue) = root.ue {
        if !ue.extra.is_empty() {
            return Err(format!("Unrecognized fields in ue: {:?}", sorted_keys(&ue.extra)).into());
        }
    }
    if let Some(ref sim) = root.sim {
        if !sim.extra.is_empty() {
            return Err(format!("Unrecognized fields in sim: {:?}", sorted_keys(&sim.extra)).into());
        }
    }

    let mut cfg = StackConfig {
        debug_log: root.debug_log,
        ue: CfgUe::default(),
        ra: RaConfig::default(),
        sim: None,
    };

    if let Some(ra) = root.ra {
        apply_ra_patch(&mut cfg.ra, ra);
    }
    if let Some(ue) = root.ue {
        cfg.ue.crnti = ue.crnti;
        cfg.ue.contention_id = ue.contention_id;
    }
    if let Some(sim) = root.sim {
        cfg.sim = Some(apply_sim_patch(sim));
    }

    // Surface invalid values as an error here, SharedConfig::from_parts would panic on them
    cfg.validate()?;

    let state = StackState::from_config(&cfg);
    Ok(SharedConfig::from_parts(cfg, state))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_ra_patch(dst: &mut RaConfig, ra: RaDto) {
    if let Some(v) = ra.prach_config_index {
        dst.prach_config_index = v;
    }
    if let Some(v) = ra.nof_preambles {
        dst.nof_preambles = v;
        // Without an explicit partition all preambles belong to group A
        dst.nof_group_a_preambles = v;
    }
    if let Some(v) = ra.nof_group_a_preambles {
        dst.nof_group_a_preambles = v;
    }
    if let Some(v) = ra.message_power_offset_group_b {
        dst.message_power_offset_group_b = v;
    }
    if let Some(v) = ra.message_size_group_a {
        dst.message_size_group_a = v;
    }
    if let Some(v) = ra.pcmax_dbm {
        dst.pcmax_dbm = v;
    }
    if let Some(v) = ra.delta_preamble_msg3 {
        dst.delta_preamble_msg3 = v;
    }
    if let Some(v) = ra.response_window_size {
        dst.response_window_size = v;
    }
    if let Some(v) = ra.power_ramping_step {
        dst.power_ramping_step = v;
    }
    if let Some(v) = ra.preamble_trans_max {
        dst.preamble_trans_max = v;
    }
    if let Some(v) = ra.initial_received_target_power {
        dst.initial_received_target_power = v;
    }
    if let Some(v) = ra.contention_resolution_timer {
        dst.contention_resolution_timer = v;
    }
    if let Some(v) = ra.time_alignment_timer {
        dst.time_alignment_timer = v;
    }
    if let Some(v) = ra.prach_mask_index {
        dst.prach_mask_index = v;
    }
    if let Some(v) = ra.preamble_index {
        dst.dedicated_preamble = RaConfig::dedicated_preamble_from_raw(v);
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    ra: Option<RaDto>,

    #[serde(default)]
    ue: Option<UeDto>,

    #[serde(default)]
    sim: Option<CfgSimDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct RaDto {
    pub prach_config_index: Option<u8>,
    pub nof_preambles: Option<u8>,
    pub nof_group_a_preambles: Option<u8>,
    pub message_power_offset_group_b: Option<i32>,
    pub message_size_group_a: Option<usize>,
    pub pcmax_dbm: Option<i32>,
    pub delta_preamble_msg3: Option<i32>,
    pub response_window_size: Option<u32>,
    pub power_ramping_step: Option<i32>,
    pub preamble_trans_max: Option<u32>,
    pub initial_received_target_power: Option<i32>,
    pub contention_resolution_timer: Option<u32>,
    pub time_alignment_timer: Option<u32>,
    pub prach_mask_index: Option<u8>,
    /// ra-PreambleIndex as signalled; 0 selects contention based access
    pub preamble_index: Option<u8>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct UeDto {
    pub crnti: Option<u16>,
    pub contention_id: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}
