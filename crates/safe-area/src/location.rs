//! Seed coordinate for a request: a live fix when available, else the last
//! known location, else the configured default.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::geo::Coordinate;

/// Device position capability. `None` means no fix could be obtained.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Option<Coordinate>;
}

/// Provider with a fixed answer, used when positions come from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocationProvider(pub Option<Coordinate>);

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn current_position(&self) -> Option<Coordinate> {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocationCacheError {
    #[error("location cache io failed at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("location cache is not valid JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastKnownLocation {
    pub coordinate: Coordinate,
    pub recorded_at: DateTime<Utc>,
}

pub trait LocationCache: Send + Sync {
    fn load(&self) -> Result<Option<LastKnownLocation>, LocationCacheError>;
    fn store(&self, location: &LastKnownLocation) -> Result<(), LocationCacheError>;
}

/// JSON file holding a single [`LastKnownLocation`].
#[derive(Debug, Clone)]
pub struct FileLocationCache {
    path: PathBuf,
}

impl FileLocationCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> LocationCacheError {
        LocationCacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LocationCache for FileLocationCache {
    fn load(&self) -> Result<Option<LastKnownLocation>, LocationCacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn store(&self, location: &LastKnownLocation) -> Result<(), LocationCacheError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let body = serde_json::to_string_pretty(location)?;
        fs::write(&self.path, body).map_err(|err| self.io_error(err))
    }
}

#[derive(Debug, Default)]
pub struct MemoryLocationCache {
    slot: Mutex<Option<LastKnownLocation>>,
}

impl MemoryLocationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationCache for MemoryLocationCache {
    fn load(&self) -> Result<Option<LastKnownLocation>, LocationCacheError> {
        Ok(*self.slot.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn store(&self, location: &LastKnownLocation) -> Result<(), LocationCacheError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(*location);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedOrigin {
    Live,
    Cached,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeedLocation {
    pub coordinate: Coordinate,
    pub origin: SeedOrigin,
}

/// Persists a fresh fix as the last known location.
pub fn record_fix(
    cache: &dyn LocationCache,
    coordinate: Coordinate,
) -> Result<LastKnownLocation, LocationCacheError> {
    let location = LastKnownLocation {
        coordinate,
        recorded_at: Utc::now(),
    };
    cache.store(&location)?;
    Ok(location)
}

pub async fn resolve_seed(
    provider: &dyn LocationProvider,
    cache: &dyn LocationCache,
    default: Coordinate,
    timeout: Duration,
) -> SeedLocation {
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Some(coordinate)) => {
            if let Err(err) = record_fix(cache, coordinate) {
                warn!(error = %err, "unable to persist location fix");
            }
            return SeedLocation {
                coordinate,
                origin: SeedOrigin::Live,
            };
        }
        Ok(None) => debug!("no location fix available"),
        Err(_) => debug!(?timeout, "location fix timed out"),
    }

    match cache.load() {
        Ok(Some(last)) => SeedLocation {
            coordinate: last.coordinate,
            origin: SeedOrigin::Cached,
        },
        Ok(None) => SeedLocation {
            coordinate: default,
            origin: SeedOrigin::Default,
        },
        Err(err) => {
            warn!(error = %err, "ignoring unreadable location cache");
            SeedLocation {
                coordinate: default,
                origin: SeedOrigin::Default,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chennai() -> Coordinate {
        Coordinate::new(13.0827, 80.2707).expect("valid")
    }

    fn fallback() -> Coordinate {
        Coordinate::new(37.7749, -122.4194).expect("valid")
    }

    struct SlowProvider;

    #[async_trait]
    impl LocationProvider for SlowProvider {
        async fn current_position(&self) -> Option<Coordinate> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Some(Coordinate::new(1.0, 1.0).expect("valid"))
        }
    }

    #[tokio::test]
    async fn live_fix_is_used_and_cached() {
        let cache = MemoryLocationCache::new();
        let seed = resolve_seed(
            &StaticLocationProvider(Some(chennai())),
            &cache,
            fallback(),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(seed.origin, SeedOrigin::Live);
        assert_eq!(seed.coordinate, chennai());
        let cached = cache.load().expect("memory load").expect("stored");
        assert_eq!(cached.coordinate, chennai());
    }

    #[tokio::test]
    async fn cached_fix_is_used_without_live_position() {
        let cache = MemoryLocationCache::new();
        record_fix(&cache, chennai()).expect("store");

        let seed = resolve_seed(&StaticLocationProvider(None), &cache, fallback(), Duration::from_secs(5)).await;
        assert_eq!(seed.origin, SeedOrigin::Cached);
        assert_eq!(seed.coordinate, chennai());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_falls_back_to_default() {
        let cache = MemoryLocationCache::new();
        let seed = resolve_seed(&SlowProvider, &cache, fallback(), Duration::from_secs(5)).await;
        assert_eq!(seed.origin, SeedOrigin::Default);
        assert_eq!(seed.coordinate, fallback());
    }

    #[test]
    fn file_cache_round_trips_and_creates_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FileLocationCache::new(dir.path().join("state").join("last_location.json"));

        assert!(cache.load().expect("missing file is empty").is_none());
        let stored = record_fix(&cache, chennai()).expect("store");
        let loaded = cache.load().expect("load").expect("present");
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("last_location.json");
        fs::write(&path, "{not json").expect("write");
        let cache = FileLocationCache::new(&path);

        assert!(matches!(cache.load(), Err(LocationCacheError::Encode(_))));
        let seed = resolve_seed(&StaticLocationProvider(None), &cache, fallback(), Duration::from_secs(5)).await;
        assert_eq!(seed.origin, SeedOrigin::Default);
    }
}
