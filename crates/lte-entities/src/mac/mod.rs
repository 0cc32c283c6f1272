//! UE MAC entities taking part in the random access procedure

pub mod demux;
pub mod interfaces;
pub mod ra_proc;
pub mod ra_state;
pub mod timers;
