#![allow(dead_code)]

pub mod assertions;
pub mod features;
pub mod harness;
