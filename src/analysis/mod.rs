//! The analytics core: trajectory reconstruction and the derived
//! trip-kinematics and punctuality analyses.
//!
//! Everything in this module is synchronous and free of I/O; inputs are
//! already-materialized in-memory collections and every operation is a
//! bounded, terminating computation over them.

pub mod aggregate;
pub mod metrics;
pub mod punctuality;
pub mod speeding;
pub mod trajectory;
pub mod utility;
