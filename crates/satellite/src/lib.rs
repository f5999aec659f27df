//! Access to the Spacewalk / Satellite / SUSE Manager management API.
//!
//! [`ManagementApi`] is the seam every workflow talks to. [`SatelliteClient`]
//! implements it over XML-RPC. With the `memory` feature, `MemorySatellite`
//! provides an in-memory server for tests.

pub mod api;
pub mod client;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod version;

pub use api::{
    ApiError, ApiResult, ChannelRef, CloneDetails, CustomInfoKey, ManagementApi, SystemGroup,
    SystemId, SystemRef,
};
pub use client::{ConnectionConfig, SatelliteClient};
#[cfg(any(test, feature = "memory"))]
pub use memory::{MemorySatellite, Mutation};
pub use version::{check_api_level, SUPPORTED_API_LEVELS};
