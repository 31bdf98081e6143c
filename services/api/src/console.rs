use crate::infra::{build_services, optional_coordinate};
use chrono::Local;
use clap::Args;
use safe_area::config::AppConfig;
use safe_area::error::AppError;
use safe_area::facilities::{Facility, FacilityKind, NearbyFacilities};
use safe_area::location::{SeedLocation, SeedOrigin};
use safe_area::risk::Assessment;
use safe_area::telemetry;

#[derive(Args, Debug, Default)]
pub(crate) struct LookupArgs {
    /// Latitude in decimal degrees. Defaults to the last known location.
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub(crate) lat: Option<f64>,
    /// Longitude in decimal degrees. Defaults to the last known location.
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub(crate) lon: Option<f64>,
    /// Facility search radius in meters (capped by configuration)
    #[arg(long)]
    pub(crate) radius: Option<u32>,
    /// Skip the remote scoring service and use the deterministic scorer
    #[arg(long)]
    pub(crate) offline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupKind {
    Assessment,
    Facilities,
    Inspection,
}

pub(crate) async fn run_lookup(kind: LookupKind, args: LookupArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let fix = optional_coordinate(args.lat, args.lon)?;
    let services = build_services(&config, args.offline, fix)?;
    let seed = services.seed().await;
    println!("{}", render_seed(&seed));

    let pipeline = &services.pipeline;
    match kind {
        LookupKind::Assessment => {
            let token = pipeline.begin();
            let tracked = pipeline.assess(token, seed.coordinate).await;
            print!("{}", render_assessment(&tracked.value));
        }
        LookupKind::Facilities => {
            let token = pipeline.begin();
            let tracked = pipeline
                .facilities(token, seed.coordinate, args.radius)
                .await;
            print!("{}", render_facilities(&tracked.value));
        }
        LookupKind::Inspection => {
            let inspection = pipeline.inspect(seed.coordinate, args.radius).await;
            print!("{}", render_assessment(&inspection.assessment.value));
            print!("{}", render_facilities(&inspection.facilities.value));
        }
    }

    Ok(())
}

fn render_seed(seed: &SeedLocation) -> String {
    let origin = match seed.origin {
        SeedOrigin::Live => "supplied",
        SeedOrigin::Cached => "last known location",
        SeedOrigin::Default => "default location",
    };
    format!("Location {} ({origin})", seed.coordinate)
}

pub(crate) fn render_assessment(assessment: &Assessment) -> String {
    let trend: Vec<String> = assessment.trend.iter().map(u8::to_string).collect();
    let lines = [
        format!(
            "Risk: {} ({}/100) via {}",
            assessment.level,
            assessment.score,
            assessment.source.label()
        ),
        format!("- {}", assessment.description),
        format!("- Typical incident: {}", assessment.incident_type),
        format!("- Peak hours: {}", assessment.peak_hours.join(", ")),
        format!("- Trend: {}", trend.join(" > ")),
        format!(
            "- Assessed at {}",
            assessment.assessed_at.with_timezone(&Local).format("%H:%M")
        ),
    ];

    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

pub(crate) fn render_facilities(nearby: &NearbyFacilities) -> String {
    if nearby.is_empty() {
        return "No nearby facilities found.\n".to_string();
    }

    let mut out = String::new();
    for kind in FacilityKind::ordered() {
        let heading = match kind {
            FacilityKind::Hospital => "Hospitals",
            FacilityKind::Police => "Police stations",
        };
        out.push_str(&format!("{heading}:\n"));
        for facility in nearby.of_kind(kind) {
            out.push_str(&format!("  - {}\n", facility_line(facility)));
        }
    }
    out
}

fn facility_line(facility: &Facility) -> String {
    match facility.distance_meters {
        Some(meters) if meters >= 1_000.0 => format!("{} ({:.1} km)", facility.name, meters / 1_000.0),
        Some(meters) => format!("{} ({meters:.0} m)", facility.name),
        None => format!("{} (distance unknown)", facility.name),
    }
}
