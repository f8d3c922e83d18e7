//! Tests for coroutines
//!
//! Machines are stepped directly here; executor scheduling has its own tests.

mod helpers;

mod interrupt_tests;
