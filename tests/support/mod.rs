#![allow(dead_code)]

pub mod boca;
pub mod socket_guard;
