//! vdrive Core - Domain types and port definitions
//!
//! This crate contains the provider-agnostic core of vdrive:
//! - **Domain types** - `RemoteFile`, the metadata record the drive API
//!   reports for every stored object
//! - **Port definitions** - the `RemoteStore` trait that adapter crates
//!   implement (HTTP client in production, fakes in tests)
//! - **Configuration** - typed YAML configuration with defaults
//!
//! # Architecture
//!
//! The filesystem adapter in `vdrive-fuse` only ever talks to the remote
//! service through the `RemoteStore` port. Endpoint URLs and credentials
//! live in configuration and are injected at construction time, never
//! embedded in the core.

pub mod config;
pub mod domain;
pub mod ports;
