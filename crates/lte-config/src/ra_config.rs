use thiserror::Error;

/// Highest preamble index in a cell; every cell has 64 preambles per PRACH occasion
pub const MAX_PREAMBLES: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaConfigError {
    #[error("{field} out of range: {value}, allowed {min}..={max}")]
    OutOfRange { field: &'static str, value: i64, min: i64, max: i64 },

    #[error("nof_group_a_preambles ({group_a}) exceeds nof_preambles ({total})")]
    GroupAExceedsTotal { group_a: u8, total: u8 },
}

/// Random access parameters provided by higher layers (36.321 5.1.1, 36.331 RACH-ConfigCommon).
/// Read from the parameter store when a procedure is initialized and at the start of every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RaConfig {
    /// 6 bits, PRACH configuration index. Determines the preamble format and thus DELTA_PREAMBLE
    pub prach_config_index: u8,
    /// Number of contention based preambles, 1 to 64
    pub nof_preambles: u8,
    /// Size of preamble group A. Group B consists of the remaining contention based preambles
    pub nof_group_a_preambles: u8,
    /// Extra path loss margin, in dB, a UE needs to select group B
    pub message_power_offset_group_b: i32,
    /// Msg3 size in bits above which group B is preferred (messageSizeGroupA)
    pub message_size_group_a: usize,
    /// Maximum UE transmit power, in dBm
    pub pcmax_dbm: i32,
    /// Power offset, in dB, between preamble and Msg3 applied when group B is used
    pub delta_preamble_msg3: i32,
    /// RA response window in subframes, 2 to 10
    pub response_window_size: u32,
    /// Power ramping step in dB between preamble retransmissions
    pub power_ramping_step: i32,
    /// Maximum number of preamble transmissions
    pub preamble_trans_max: u32,
    /// Initial preamble received target power, in dBm
    pub initial_received_target_power: i32,
    /// mac-ContentionResolutionTimer in subframes, 8 to 64
    pub contention_resolution_timer: u32,
    /// timeAlignmentTimer in subframes. 0 is infinity.
    pub time_alignment_timer: u32,
    /// 4 bits, ra-PRACH-MaskIndex (36.321 Table 7.3-1)
    pub prach_mask_index: u8,
    /// Preamble explicitly signalled by the network. None selects a contention based preamble.
    pub dedicated_preamble: Option<u8>,
}

impl Default for RaConfig {
    fn default() -> Self {
        Self {
            prach_config_index: 3,
            nof_preambles: 52,
            nof_group_a_preambles: 52,
            message_power_offset_group_b: 10,
            message_size_group_a: 56,
            pcmax_dbm: 23,
            delta_preamble_msg3: 6,
            response_window_size: 10,
            power_ramping_step: 4,
            preamble_trans_max: 10,
            initial_received_target_power: -104,
            contention_resolution_timer: 64,
            time_alignment_timer: 0,
            prach_mask_index: 0,
            dedicated_preamble: None,
        }
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), RaConfigError> {
    if value < min || value > max {
        return Err(RaConfigError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

impl RaConfig {
    /// Maps a signalled ra-PreambleIndex to the dedicated preamble.
    /// The value 0 requests contention based selection by the UE (36.321 5.1.1).
    pub fn dedicated_preamble_from_raw(raw: u8) -> Option<u8> {
        if raw == 0 { None } else { Some(raw) }
    }

    pub fn nof_group_b_preambles(&self) -> u8 {
        self.nof_preambles.saturating_sub(self.nof_group_a_preambles)
    }

    pub fn has_group_b(&self) -> bool {
        self.nof_group_b_preambles() > 0
    }

    pub fn is_contention_free(&self) -> bool {
        self.dedicated_preamble.is_some()
    }

    pub fn validate(&self) -> Result<(), RaConfigError> {
        check_range("prach_config_index", self.prach_config_index as i64, 0, 63)?;
        check_range("nof_preambles", self.nof_preambles as i64, 1, MAX_PREAMBLES as i64)?;
        check_range("nof_group_a_preambles", self.nof_group_a_preambles as i64, 1, MAX_PREAMBLES as i64)?;
        if self.nof_group_a_preambles > self.nof_preambles {
            return Err(RaConfigError::GroupAExceedsTotal {
                group_a: self.nof_group_a_preambles,
                total: self.nof_preambles,
            });
        }
        check_range("response_window_size", self.response_window_size as i64, 2, 10)?;
        check_range("power_ramping_step", self.power_ramping_step as i64, 0, 6)?;
        check_range("preamble_trans_max", self.preamble_trans_max as i64, 1, 200)?;
        check_range("contention_resolution_timer", self.contention_resolution_timer as i64, 8, 64)?;
        check_range("prach_mask_index", self.prach_mask_index as i64, 0, 15)?;
        if let Some(p) = self.dedicated_preamble {
            check_range("dedicated_preamble", p as i64, 1, MAX_PREAMBLES as i64 - 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = RaConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.has_group_b());
        assert!(!cfg.is_contention_free());
    }

    #[test]
    fn test_group_partition() {
        let cfg = RaConfig { nof_preambles: 52, nof_group_a_preambles: 28, ..Default::default() };
        assert_eq!(cfg.nof_group_b_preambles(), 24);
        assert!(cfg.has_group_b());

        let cfg = RaConfig { nof_preambles: 20, nof_group_a_preambles: 28, ..Default::default() };
        assert_eq!(cfg.validate(), Err(RaConfigError::GroupAExceedsTotal { group_a: 28, total: 20 }));
    }

    #[test]
    fn test_out_of_range() {
        let cfg = RaConfig { response_window_size: 11, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(RaConfigError::OutOfRange { field: "response_window_size", .. })));

        let cfg = RaConfig { preamble_trans_max: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(RaConfigError::OutOfRange { field: "preamble_trans_max", .. })));

        let cfg = RaConfig { dedicated_preamble: Some(64), ..Default::default() };
        assert!(matches!(cfg.validate(), Err(RaConfigError::OutOfRange { field: "dedicated_preamble", .. })));
    }

    #[test]
    fn test_dedicated_preamble_sentinel() {
        assert_eq!(RaConfig::dedicated_preamble_from_raw(0), None);
        assert_eq!(RaConfig::dedicated_preamble_from_raw(55), Some(55));
    }
}
