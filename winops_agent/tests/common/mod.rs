#![allow(dead_code)]

pub mod fake_backend;
pub mod fake_hosts;
