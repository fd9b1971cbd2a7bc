//! Data models representing database entities and API payloads.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response types of the HTTP API.

/// Document models and the tagged finalization payload
pub mod document;
/// Payment models and lifecycle types
pub mod payment;
/// Session authentication model
pub mod session;
