//! HTTP Lookup Service
//!
//! Implements LookupService against a Kakao-style local search API:
//! `GET <api_url>?query=<address>` authenticated with `KakaoAK <key>`,
//! answering `{"documents": [{"x": "<lng>", "y": "<lat>", "address_name": ...}]}`.

use crate::domain::entities::ResolvedLocation;
use crate::domain::errors::LookupError;
use crate::domain::ports::LookupService;
use crate::domain::value_objects::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://dapi.kakao.com/v2/local/search/address.json";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    x: Option<serde_json::Value>,
    y: Option<serde_json::Value>,
    address_name: Option<String>,
}

/// Configuration for the HTTP lookup service.
#[derive(Debug, Clone)]
pub struct HttpLookupConfig {
    pub api_url: String,
    /// Caller-supplied credential, sent as `Authorization: KakaoAK <key>`
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for HttpLookupConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Lookup service backed by a remote HTTP geocoding API.
pub struct HttpLookupService {
    config: HttpLookupConfig,
    client: reqwest::Client,
}

impl HttpLookupService {
    pub fn new(config: HttpLookupConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Turn a decoded response into the first candidate's location.
    fn first_candidate(
        response: SearchResponse,
        address: &Address,
    ) -> Result<ResolvedLocation, LookupError> {
        let doc = response
            .documents
            .into_iter()
            .next()
            .ok_or(LookupError::NotFound)?;

        let lng = Self::parse_coordinate(doc.x.as_ref())
            .ok_or_else(|| LookupError::InvalidResponse("missing or malformed x".into()))?;
        let lat = Self::parse_coordinate(doc.y.as_ref())
            .ok_or_else(|| LookupError::InvalidResponse("missing or malformed y".into()))?;

        let resolved_address = doc
            .address_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| address.as_str().to_string());

        ResolvedLocation::new(lat, lng, resolved_address)
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }

    /// Coordinates arrive as decimal strings, but plain numbers are accepted too.
    fn parse_coordinate(value: Option<&serde_json::Value>) -> Option<f64> {
        match value? {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

#[async_trait]
impl LookupService for HttpLookupService {
    async fn resolve(&self, address: &Address) -> Result<ResolvedLocation, LookupError> {
        let response = self
            .client
            .get(&self.config.api_url)
            .header("Authorization", format!("KakaoAK {}", self.config.api_key))
            .query(&[
                ("query", address.as_str()),
                ("analyze_type", "similar"),
                ("size", "1"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::TransportError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::TransportError(format!("{} - {}", status, body)));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

        Self::first_candidate(data, address)
    }
}
