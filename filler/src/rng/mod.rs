//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm. Every random draw made while filling an
//! event (primary selection, corrected-probability tests, final-state swings,
//! momentum repairs) goes through this module so that an event is fully
//! reproducible from its seed.

mod xorshift;

pub use xorshift::RngManager;
