//! Authorization core for the gym management backend.
//!
//! The crate carries no HTTP surface of its own: the request layer hands in
//! an authenticated [`identity::Principal`] (or its absence) plus one required
//! capability, and gets back a ternary outcome it can translate to transport
//! status codes. Every decision is read-only against the role/permission
//! catalog and fails closed.

pub mod config;
pub mod error;
pub mod identity;
