//! Tests for executors
//!
//! Organized by executor flavour

mod helpers;

mod ext_tests;
mod single_tests;
