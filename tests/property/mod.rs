//! Property-based tests

pub mod queue_proptest;
pub mod rewrite_proptest;
