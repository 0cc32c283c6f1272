use std::sync::{Arc, RwLock};

use lte_core::{CONTENTION_ID_MASK, ContentionId, Rnti};

use crate::ra_config::RaConfig;
use crate::stack_config_sim::CfgSim;

/// UE identity configuration
#[derive(Debug, Clone, Default)]
pub struct CfgUe {
    /// C-RNTI already held by the UE. When set, Msg3 carries a C-RNTI MAC CE instead of the contention id
    pub crnti: Option<Rnti>,
    /// 48 bits. Fixed contention resolution identity; drawn at random for every attempt if not set
    pub contention_id: Option<ContentionId>,
}

#[derive(Debug, Clone, Default)]
pub struct StackConfig {
    pub debug_log: Option<String>,

    pub ue: CfgUe,

    /// Random access parameters the stack starts with. RRC may replace them in StackState later on.
    pub ra: RaConfig,

    /// Simulated eNodeB, only used by the simulator binary
    pub sim: Option<CfgSim>,
}

impl StackConfig {
    pub fn new(ra: RaConfig) -> Self {
        StackConfig {
            debug_log: None,
            ue: CfgUe::default(),
            ra,
            sim: None,
        }
    }

    /// Validate that all configuration fields hold sane values.
    pub fn validate(&self) -> Result<(), String> {
        self.ra.validate().map_err(|e| format!("ra: {}", e))?;

        if let Some(id) = self.ue.contention_id {
            if id & !CONTENTION_ID_MASK != 0 {
                return Err(format!("ue: contention_id {:#x} exceeds 48 bits", id));
            }
        }
        if let Some(crnti) = self.ue.crnti {
            if crnti == 0 {
                return Err("ue: crnti 0 is not a valid identity".to_string());
            }
        }

        if let Some(ref sim) = self.sim {
            sim.validate().map_err(|e| format!("sim: {}", e))?;
        }

        Ok(())
    }
}

/// Mutable, stack-editable state (lock-protected). This is the parameter store the
/// random access procedure reads its configuration from and writes identities to.
#[derive(Debug, Clone, Default)]
pub struct StackState {
    pub ra: RaConfig,
    pub crnti: Option<Rnti>,
    /// Assigned by a matching RAR, promoted to crnti on successful contention resolution
    pub temp_crnti: Option<Rnti>,
    /// Identity sent in Msg3 by the attempt currently in progress
    pub contention_id: Option<ContentionId>,
}

impl StackState {
    pub fn from_config(cfg: &StackConfig) -> Self {
        Self {
            ra: cfg.ra.clone(),
            crnti: cfg.ue.crnti,
            temp_crnti: None,
            contention_id: None,
        }
    }
}

/// Global shared configuration: immutable config + mutable state.
#[derive(Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<StackConfig>,
    /// Mutable state guarded with RwLock (write by the stack, read by others).
    state: Arc<RwLock<StackState>>,
}

impl SharedConfig {
    pub fn new(ra: RaConfig) -> Self {
        Self::from_config(StackConfig::new(ra))
    }

    pub fn from_config(cfg: StackConfig) -> Self {
        let state = StackState::from_config(&cfg);
        Self::from_parts(cfg, state)
    }

    pub fn from_parts(cfg: StackConfig, state: StackState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid stack configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<StackConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, StackState> {
        self.state.read().expect("StackState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, StackState> {
        self.state.write().expect("StackState RwLock blocked")
    }
}
