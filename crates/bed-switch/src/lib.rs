//! Room and bed switch request workflow for multi-tenant property management.
//!
//! Tenants ask to move from their current bed to another available bed in the same
//! property; approvers review the request and, on approval, the allocation engine swaps
//! occupancy of both room/bed pairs as one logical unit.

pub mod clock;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
