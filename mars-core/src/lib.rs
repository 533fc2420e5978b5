//! MARS Core
//!
//! Core types shared by the MARS research service, its runner and its clients.
//!
//! This crate contains:
//! - Domain types: research requests, stage fragments, reports, job outcomes
//! - DTOs: request/response bodies of the HTTP API

pub mod domain;
pub mod dto;
