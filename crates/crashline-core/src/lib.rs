//! Crashline Core - Domain types, ports and configuration
//!
//! This crate contains the pieces every other Crashline crate agrees on:
//! - **Domain types** - `Report`, `Frame`, `Level`, `SanitizedContext`, `ReportedError`
//! - **Port definitions** - Traits for adapters: `ITransport`, `IRequest`, `IStackCapturer`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module holds plain data with no I/O. Ports define the trait
//! interfaces that the reporter consumes and that adapter crates (such as
//! `crashline-http`) implement.

pub mod config;
pub mod domain;
pub mod ports;
