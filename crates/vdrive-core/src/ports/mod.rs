//! Port definitions (trait interfaces implemented by adapter crates)

pub mod remote_store;

pub use remote_store::RemoteStore;
