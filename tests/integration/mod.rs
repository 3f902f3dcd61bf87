//! Integration tests against a mock backend

pub mod config_test;
pub mod online_test;
pub mod reconciliation_test;
pub mod sync_service_test;
