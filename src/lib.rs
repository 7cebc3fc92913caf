//! defguard desktop client host.
//!
//! Wires the enrollment and MFA use cases to file-backed storage, the
//! proxy over HTTP and websockets, and a terminal front end.

pub mod bootstrap;
pub mod cli;
pub mod terminal;
