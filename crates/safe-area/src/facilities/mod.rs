//! Nearby emergency facilities, resolved best-effort from a point-of-interest source.

pub mod domain;
pub mod overpass;
mod resolver;

pub use domain::{Facility, FacilityKind, NearbyFacilities};
pub use overpass::{OverpassClient, PoiCenter, PoiElement, PoiQuery, PoiSource};
pub use resolver::FacilityResolver;
