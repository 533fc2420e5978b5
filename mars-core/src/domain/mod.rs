//! Core domain types
//!
//! This module contains the core domain structures used across MARS crates.
//! They are shared between the server (which publishes them over HTTP), the
//! runner (which produces them) and the client/CLI (which display them).

pub mod job;
pub mod report;
pub mod research;
