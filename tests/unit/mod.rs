//! Unit test modules.

mod cadence_engine_test;
mod csc_parser_test;
mod reconciler_test;
mod watchdog_test;
