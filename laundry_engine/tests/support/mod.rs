#![allow(dead_code)]
pub mod fixtures;
pub mod prepare_env;
pub mod stubs;
