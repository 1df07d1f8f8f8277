// src/lib.rs

//! MedFeeBot library
//!
//! Polls ministry and council pages, detects new documents and meetings
//! against persisted state, and posts them to Slack.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
