//! Data Transfer Objects for the HTTP API
//!
//! This module contains the request and response bodies exchanged between
//! the MARS server and its clients (CLI, browser front-end).

pub mod auth;
pub mod research;
