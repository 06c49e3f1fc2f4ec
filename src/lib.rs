//! Channel Leads Library
//!
//! Daily discovery, qualification and ranking of video channels as outreach leads

pub mod config;
pub mod contact;
pub mod discovery;
pub mod enrich;
pub mod error;
pub mod export;
pub mod filter;
pub mod keywords;
pub mod logger;
pub mod pipeline;
pub mod quota;
pub mod retry;
pub mod sorter;
pub mod storage;
pub mod types;
pub mod youtube;

pub use types::*;
