//! Tests for the async bridge
//!
//! Bodies are driven by a caller-ticked executor so every assertion can name
//! the tick it expects something to happen on.

mod helpers;

mod child_tests;
mod group_tests;
mod task_tests;
