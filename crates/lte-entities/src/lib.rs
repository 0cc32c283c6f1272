pub mod mac;

pub use mac::ra_proc::RaProc;
