use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Hospital,
    Police,
}

impl FacilityKind {
    pub const fn ordered() -> [Self; 2] {
        [Self::Hospital, Self::Police]
    }

    /// OpenStreetMap `amenity` tag value.
    pub const fn amenity(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Police => "police",
        }
    }

    pub fn from_amenity(raw: &str) -> Option<Self> {
        match raw.trim() {
            "hospital" => Some(Self::Hospital),
            "police" => Some(Self::Police),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: String,
    pub kind: FacilityKind,
    pub name: String,
    pub coordinate: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

/// Ranked facilities around one coordinate; both lists empty when the source failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyFacilities {
    pub hospitals: Vec<Facility>,
    pub police: Vec<Facility>,
}

impl NearbyFacilities {
    pub fn is_empty(&self) -> bool {
        self.hospitals.is_empty() && self.police.is_empty()
    }

    pub fn of_kind(&self, kind: FacilityKind) -> &[Facility] {
        match kind {
            FacilityKind::Hospital => &self.hospitals,
            FacilityKind::Police => &self.police,
        }
    }
}
