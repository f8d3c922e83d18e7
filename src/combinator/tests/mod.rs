//! Tests for the combinator library
//!
//! Organized by combinator family

mod helpers;

mod observe_tests;
mod race_tests;
