//! Emergency alert hand-off to the dispatch endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::geo::Coordinate;
use crate::risk::Assessment;
use crate::transport::{self, FetchError};

pub const DEFAULT_NOTE: &str = "Emergency via app";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub lat: f64,
    pub lon: f64,
    pub note: String,
    pub risk_score: Option<u8>,
}

impl EmergencyAlert {
    /// Alert for `coordinate`, carrying the latest score when one is known.
    pub fn new(coordinate: Coordinate, note: Option<&str>, latest: Option<&Assessment>) -> Self {
        let note = note
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .unwrap_or(DEFAULT_NOTE);
        Self {
            lat: coordinate.latitude(),
            lon: coordinate.longitude(),
            note: note.to_string(),
            risk_score: latest.map(|assessment| assessment.score),
        }
    }

    /// Text relayed to responders.
    pub fn message(&self) -> String {
        format!(
            "Emergency! Location: https://maps.google.com/?q={},{}\n{}",
            self.lat, self.lon, self.note
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    pub delivered: bool,
    pub status: u16,
    pub detail: Option<String>,
}

#[async_trait]
pub trait DispatchClient: Send + Sync {
    /// `Err` only when the endpoint could not be reached or timed out.
    async fn send(&self, alert: &EmergencyAlert) -> Result<DispatchReceipt, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpDispatchClient {
    client: reqwest::Client,
    url: String,
}

impl HttpDispatchClient {
    pub fn new(config: &DispatchConfig) -> Result<Self, reqwest::Error> {
        let client = transport::build_client(config.timeout)?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct DispatchReply {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl DispatchClient for HttpDispatchClient {
    async fn send(&self, alert: &EmergencyAlert) -> Result<DispatchReceipt, FetchError> {
        let response = self.client.post(&self.url).json(alert).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let reply: DispatchReply = serde_json::from_str(&body).unwrap_or_default();

        let receipt = receipt_for(status.as_u16(), reply);
        if receipt.delivered {
            info!(lat = alert.lat, lon = alert.lon, "emergency alert dispatched");
        } else {
            warn!(status = receipt.status, detail = ?receipt.detail, "emergency dispatch rejected");
        }
        Ok(receipt)
    }
}

fn receipt_for(status: u16, reply: DispatchReply) -> DispatchReceipt {
    let delivered = (200..300).contains(&status);
    let detail = if delivered {
        reply.message.or(reply.detail)
    } else {
        Some(reply.detail.unwrap_or_else(|| "Emergency failed".to_string()))
    };
    DispatchReceipt {
        delivered,
        status,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate() -> Coordinate {
        Coordinate::new(13.0827, 80.2707).expect("valid")
    }

    #[test]
    fn blank_note_uses_default() {
        let alert = EmergencyAlert::new(coordinate(), Some("   "), None);
        assert_eq!(alert.note, DEFAULT_NOTE);
        assert_eq!(alert.risk_score, None);
    }

    #[test]
    fn message_contains_map_link() {
        let alert = EmergencyAlert::new(coordinate(), Some("help"), None);
        let message = alert.message();
        assert!(message.contains("https://maps.google.com/?q=13.0827,80.2707"));
        assert!(message.ends_with("help"));
    }

    #[test]
    fn serializes_wire_fields() {
        let alert = EmergencyAlert::new(coordinate(), None, None);
        let json = serde_json::to_value(&alert).expect("serializes");
        assert_eq!(json["lat"], 13.0827);
        assert_eq!(json["note"], DEFAULT_NOTE);
        assert!(json["risk_score"].is_null());
    }

    #[test]
    fn error_detail_is_surfaced() {
        let receipt = receipt_for(
            400,
            DispatchReply {
                detail: Some("lat and lon required".to_string()),
                message: None,
            },
        );
        assert!(!receipt.delivered);
        assert_eq!(receipt.detail.as_deref(), Some("lat and lon required"));

        let bare = receipt_for(502, DispatchReply::default());
        assert_eq!(bare.detail.as_deref(), Some("Emergency failed"));
        assert!(receipt_for(200, DispatchReply::default()).delivered);
    }
}
