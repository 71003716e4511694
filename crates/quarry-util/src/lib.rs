#![forbid(unsafe_code)]
//! Hashing and filesystem helpers for Quarry.

pub mod error;
pub mod fs;
pub mod hash;
