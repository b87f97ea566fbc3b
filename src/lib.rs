//! QueryPatterns - Query-pattern analysis engine for data warehouses
//!
//! This crate ingests warehouse query-history rows and derives per-table
//! usage patterns:
//! - Access frequency with time-bucketed counts
//! - "SELECT *" full-scan prevalence
//! - Ranked partition/cluster column candidates inferred from WHERE clauses

pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod predicate;
pub mod query_log;
pub mod server;
pub mod storage;
