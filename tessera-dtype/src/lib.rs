#![cfg(target_endian = "little")]
#![deny(missing_docs)]

//! The coordinate type system for tessera.
//!
//! An array domain is typed by exactly one [`DomainType`], one of ten scalar
//! types. All coordinate computation dispatches once per public operation via
//! the [`match_each_domain_type!`] macro family and is monomorphic over a
//! [`NativeDomainType`] from there on.

pub use coord::*;
pub use dtype::*;
pub use math::*;

mod coord;
mod dtype;
mod math;
