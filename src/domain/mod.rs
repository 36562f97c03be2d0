//! Domain types and DTOs
//!
//! These types define the records exchanged with the user API and the
//! reference data the profile form is built from.

pub mod profile;
pub mod reference;

pub use profile::{GeneralProfileUpdate, UserDto};
pub use reference::{Country, Region, Town};
