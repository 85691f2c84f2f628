//! Integration tests for the drive API client.
//!
//! Runs the client against a wiremock-based mock of the gateway.

mod common;
mod test_files;
mod test_upload;
