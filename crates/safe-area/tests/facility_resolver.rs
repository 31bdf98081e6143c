use async_trait::async_trait;
use safe_area::facilities::{FacilityResolver, PoiCenter, PoiElement, PoiQuery, PoiSource};
use safe_area::geo::Coordinate;
use safe_area::transport::FetchError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FixedSource {
    outcome: Result<Vec<PoiElement>, FetchError>,
    queries: Mutex<Vec<PoiQuery>>,
}

impl FixedSource {
    fn new(outcome: Result<Vec<PoiElement>, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PoiSource for FixedSource {
    async fn amenities_near(&self, query: &PoiQuery) -> Result<Vec<PoiElement>, FetchError> {
        self.queries.lock().expect("query lock").push(query.clone());
        self.outcome.clone()
    }
}

struct StalledSource;

#[async_trait]
impl PoiSource for StalledSource {
    async fn amenities_near(&self, _query: &PoiQuery) -> Result<Vec<PoiElement>, FetchError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(Vec::new())
    }
}

fn origin() -> Coordinate {
    Coordinate::new(13.0827, 80.2707).expect("valid coordinate")
}

fn poi(id: u64, amenity: &str, offset_deg: f64) -> PoiElement {
    PoiElement {
        id,
        element_type: "node".to_string(),
        lat: Some(13.0827 + offset_deg),
        lon: Some(80.2707),
        center: None,
        tags: BTreeMap::from([
            ("amenity".to_string(), amenity.to_string()),
            ("name".to_string(), format!("{amenity} {id}")),
        ]),
    }
}

#[tokio::test]
async fn keeps_five_nearest_hospitals_and_all_police() {
    let mut elements: Vec<PoiElement> = [0.007, 0.001, 0.006, 0.003, 0.002, 0.005, 0.004]
        .iter()
        .enumerate()
        .map(|(index, offset)| poi(index as u64 + 1, "hospital", *offset))
        .collect();
    elements.push(poi(20, "police", 0.004));
    elements.push(poi(21, "police", 0.002));
    elements.push(poi(30, "pharmacy", 0.0001));

    let source = FixedSource::new(Ok(elements));
    let nearby = FacilityResolver::new(source.clone()).resolve(origin(), 1_000).await;

    assert_eq!(nearby.hospitals.len(), 5);
    assert_eq!(nearby.police.len(), 2);

    let distances: Vec<f64> = nearby
        .hospitals
        .iter()
        .map(|facility| facility.distance_meters.expect("known distance"))
        .collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(nearby.hospitals[0].name, "hospital 2");
    assert_eq!(nearby.police[0].name, "police 21");

    let queries = source.queries.lock().expect("query lock");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].radius_meters, 1_000);
}

#[tokio::test]
async fn area_elements_use_their_center() {
    let area = PoiElement {
        id: 77,
        element_type: "way".to_string(),
        lat: None,
        lon: None,
        center: Some(PoiCenter {
            lat: 13.0674,
            lon: 80.2376,
        }),
        tags: BTreeMap::from([("amenity".to_string(), "hospital".to_string())]),
    };

    let nearby = FacilityResolver::new(FixedSource::new(Ok(vec![area])))
        .resolve(origin(), 5_000)
        .await;

    let hospital = &nearby.hospitals[0];
    assert_eq!(hospital.name, "hospital 77");
    assert!(hospital.coordinate.is_some());
    let distance = hospital.distance_meters.expect("distance from centroid");
    assert!((distance - 3968.3).abs() / 3968.3 < 0.005);
}

#[tokio::test]
async fn source_failures_yield_empty_lists() {
    for failure in [
        FetchError::Status(429),
        FetchError::Network("dns".into()),
        FetchError::Parse("bad body".into()),
    ] {
        let nearby = FacilityResolver::new(FixedSource::new(Err(failure)))
            .resolve(origin(), 1_000)
            .await;
        assert!(nearby.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_source_is_bounded_by_timeout() {
    let nearby = FacilityResolver::new(Arc::new(StalledSource))
        .with_timeout(Duration::from_secs(15))
        .resolve(origin(), 1_000)
        .await;
    assert!(nearby.is_empty());
}

#[tokio::test]
async fn radius_is_capped() {
    let source = FixedSource::new(Ok(Vec::new()));
    FacilityResolver::new(source.clone())
        .resolve(origin(), 50_000)
        .await;
    let queries = source.queries.lock().expect("query lock");
    assert_eq!(queries[0].radius_meters, 5_000);
}

#[tokio::test]
async fn per_kind_limit_is_configurable() {
    let elements: Vec<PoiElement> = (1..=4)
        .map(|id| poi(id, "police", id as f64 * 0.001))
        .collect();

    let nearby = FacilityResolver::new(FixedSource::new(Ok(elements)))
        .with_limit_per_kind(2)
        .resolve(origin(), 1_000)
        .await;

    let names: Vec<&str> = nearby.police.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["police 1", "police 2"]);
    assert!(nearby.hospitals.is_empty());
}
