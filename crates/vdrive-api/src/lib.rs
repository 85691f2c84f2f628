//! vdrive API - HTTP adapter for the drive service
//!
//! Implements the `RemoteStore` port against the drive REST gateway:
//! - [`client::DriveClient`] - authenticated HTTP client (listing,
//!   content download, metadata fetch)
//! - [`upload`] - the two upload shapes the gateway understands: a
//!   one-shot multipart upload and a resumable session whose body is
//!   streamed from a channel
//! - [`provider`] - the `RemoteStore` implementation wiring both together

pub mod client;
pub mod provider;
pub mod upload;

pub use client::DriveClient;
