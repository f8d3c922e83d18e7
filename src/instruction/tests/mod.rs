//! Tests for primitive instructions
//!
//! Organized by instruction family
