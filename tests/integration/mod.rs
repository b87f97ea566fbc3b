//! Integration tests - Full-pipeline runs over raw rows, serialization
//! contracts, and the persistence boundary.

mod analysis_pipeline_tests;
mod store_roundtrip_tests;
