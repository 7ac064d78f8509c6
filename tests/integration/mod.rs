//! Integration test modules.

mod counter_store_test;
