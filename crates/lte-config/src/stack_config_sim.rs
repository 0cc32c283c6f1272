use std::collections::HashMap;

use serde::Deserialize;
use toml::Value;

/// Simulated eNodeB behaviour for the ra-sim binary
#[derive(Debug, Clone)]
pub struct CfgSim {
    /// Seed for both the UE and the simulated network random sources
    pub seed: u64,
    /// Number of subframes to run
    pub ticks: u32,
    /// Number of random access procedures to run back to back
    pub attempts: u32,
    /// Probability that the eNodeB does not answer a preamble
    pub rar_loss: f64,
    /// Probability that the contention resolution identity is lost or addressed to another UE
    pub contention_loss: f64,
    /// Subframes after the response window opens before the RAR is sent
    pub rar_delay: u32,
    /// 4 bits, Backoff Indicator included in every RAR
    pub backoff_indicator: Option<u8>,
    /// Downlink path loss reported to the UE, in dB
    pub path_loss_db: i32,
    /// Size of the pending uplink message in bytes
    pub msg3_len: usize,
    /// Temporary C-RNTI handed out in RARs
    pub temp_crnti: u16,
    /// Timing advance command handed out in RARs, 11 bits
    pub ta_cmd: u16,
}

impl Default for CfgSim {
    fn default() -> Self {
        Self {
            seed: 1,
            ticks: 2000,
            attempts: 1,
            rar_loss: 0.0,
            contention_loss: 0.0,
            rar_delay: 0,
            backoff_indicator: None,
            path_loss_db: 100,
            msg3_len: 6,
            temp_crnti: 0x4601,
            ta_cmd: 31,
        }
    }
}

impl CfgSim {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.rar_loss) {
            return Err(format!("rar_loss {} not a probability", self.rar_loss));
        }
        if !(0.0..=1.0).contains(&self.contention_loss) {
            return Err(format!("contention_loss {} not a probability", self.contention_loss));
        }
        if let Some(bi) = self.backoff_indicator {
            if bi > 15 {
                return Err(format!("backoff_indicator {} exceeds 4 bits", bi));
            }
        }
        if self.ta_cmd > 0x7FF {
            return Err(format!("ta_cmd {} exceeds 11 bits", self.ta_cmd));
        }
        if self.temp_crnti == 0 {
            return Err("temp_crnti 0 is not a valid identity".to_string());
        }
        Ok(())
    }
}

#[derive(Default, Deserialize)]
pub struct CfgSimDto {
    pub seed: Option<u64>,
    pub ticks: Option<u32>,
    pub attempts: Option<u32>,
    pub rar_loss: Option<f64>,
    pub contention_loss: Option<f64>,
    pub rar_delay: Option<u32>,
    pub backoff_indicator: Option<u8>,
    pub path_loss_db: Option<i32>,
    pub msg3_len: Option<usize>,
    pub temp_crnti: Option<u16>,
    pub ta_cmd: Option<u16>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Convert a CfgSimDto (from TOML) into a CfgSim, filling in defaults
pub fn apply_sim_patch(src: CfgSimDto) -> CfgSim {
    let d = CfgSim::default();
    CfgSim {
        seed: src.seed.unwrap_or(d.seed),
        ticks: src.ticks.unwrap_or(d.ticks),
        attempts: src.attempts.unwrap_or(d.attempts),
        rar_loss: src.rar_loss.unwrap_or(d.rar_loss),
        contention_loss: src.contention_loss.unwrap_or(d.contention_loss),
        rar_delay: src.rar_delay.unwrap_or(d.rar_delay),
        backoff_indicator: src.backoff_indicator,
        path_loss_db: src.path_loss_db.unwrap_or(d.path_loss_db),
        msg3_len: src.msg3_len.unwrap_or(d.msg3_len),
        temp_crnti: src.temp_crnti.unwrap_or(d.temp_crnti),
        ta_cmd: src.ta_cmd.unwrap_or(d.ta_cmd),
    }
}
