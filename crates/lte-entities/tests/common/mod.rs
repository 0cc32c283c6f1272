#![allow(dead_code)]

pub mod doubles;
pub mod ra_test;

pub use doubles::{TestMux, TestPhy};
pub use ra_test::{RaTest, default_test_config};
