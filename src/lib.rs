// src/lib.rs

//! tubecrawl: channel catalog crawler and detail backfill library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod platform;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
