//! Deterministic, pure logic shared by the fanline engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod change_set;
pub mod naming;
pub mod order;
pub mod session;
pub mod types;
