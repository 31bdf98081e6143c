use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::domain::FacilityKind;
use crate::config::FacilityConfig;
use crate::geo::Coordinate;
use crate::transport::{self, FetchError};

/// Spatial amenity lookup around a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiQuery {
    pub center: Coordinate,
    pub radius_meters: u32,
    pub amenities: Vec<FacilityKind>,
    /// Server-side evaluation budget, in seconds.
    pub timeout_secs: u64,
    /// Maximum number of elements returned.
    pub result_limit: u32,
}

impl PoiQuery {
    pub fn emergency_services(center: Coordinate, radius_meters: u32) -> Self {
        Self {
            center,
            radius_meters,
            amenities: FacilityKind::ordered().to_vec(),
            timeout_secs: 15,
            result_limit: 20,
        }
    }

    /// Renders the query as Overpass QL, covering both point and area elements.
    pub fn to_overpass_ql(&self) -> String {
        let lat = self.center.latitude();
        let lon = self.center.longitude();

        let mut ql = format!("[out:json][timeout:{}];\n(\n", self.timeout_secs);
        for kind in &self.amenities {
            for element in ["node", "way"] {
                ql.push_str(&format!(
                    "  {element}[\"amenity\"=\"{}\"](around:{},{lat},{lon});\n",
                    kind.amenity(),
                    self.radius_meters
                ));
            }
        }
        ql.push_str(&format!(");\nout center {};", self.result_limit));
        ql
    }
}

/// Center point Overpass attaches to ways and relations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoiCenter {
    pub lat: f64,
    pub lon: f64,
}

/// One element of a point-of-interest response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiElement {
    pub id: u64,
    #[serde(rename = "type", default = "default_element_type")]
    pub element_type: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<PoiCenter>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_element_type() -> String {
    "node".to_string()
}

impl PoiElement {
    /// Direct position for points, centroid for areas.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.lat, self.lon).or_else(|| {
            self.center
                .and_then(|center| Coordinate::new(center.lat, center.lon).ok())
        })
    }

    pub fn kind(&self) -> Option<FacilityKind> {
        self.tags
            .get("amenity")
            .and_then(|amenity| FacilityKind::from_amenity(amenity))
    }

    /// First non-empty of `name`, `operator`, `ref`.
    pub fn label(&self) -> Option<&str> {
        ["name", "operator", "ref"]
            .iter()
            .filter_map(|key| self.tags.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<PoiElement>,
}

/// Point-of-interest capability consumed by the facility resolver.
#[async_trait]
pub trait PoiSource: Send + Sync {
    async fn amenities_near(&self, query: &PoiQuery) -> Result<Vec<PoiElement>, FetchError>;
}

/// reqwest-backed Overpass interpreter client.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(config: &FacilityConfig) -> Result<Self, reqwest::Error> {
        let client = transport::build_client(config.timeout)?;
        Ok(Self::with_client(client, &config.source_url))
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn amenities_near(&self, query: &PoiQuery) -> Result<Vec<PoiElement>, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(query.to_overpass_ql())
            .send()
            .await?;

        let body: OverpassResponse = transport::read_json(response).await?;
        Ok(body.elements)
    }
}
