// IP oracle HTTP client
//
// Wraps `reqwest::Client` with the single request the rotation workflow
// needs: "what is my public address right now". The body is decoded by
// hand (text first, then JSON) so a malformed answer keeps its raw body
// for diagnostics.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default lookup service. Answers `{"ip": "...", "country": "...", "cc": "..."}`.
pub const DEFAULT_ORACLE_URL: &str = "https://api.myip.com/";

/// One observation of the caller's public address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIp {
    /// Textual address exactly as the service reported it.
    pub ip: String,
    /// Country name, when the service includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// ISO country code, when the service includes one.
    #[serde(default, rename = "cc", skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[derive(Deserialize)]
struct RawLookup {
    ip: Option<String>,
    country: Option<String>,
    cc: Option<String>,
}

/// HTTP client for a "what is my IP" service.
pub struct IpOracleClient {
    http: reqwest::Client,
    url: Url,
}

impl IpOracleClient {
    /// Create a client for `url` using the given transport settings.
    pub fn new(url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let url = Url::parse(url)?;
        let http = transport.build_client()?;
        Ok(Self { http, url })
    }

    /// Ask the service for the current public address.
    pub async fn lookup(&self) -> Result<PublicIp, Error> {
        debug!("GET {}", self.url);

        let resp = self
            .http
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_lookup(&body)
    }
}

fn parse_lookup(body: &str) -> Result<PublicIp, Error> {
    let raw: RawLookup = serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })?;

    let ip = raw
        .ip
        .map(|ip| ip.trim().to_owned())
        .filter(|ip| !ip.is_empty())
        .ok_or(Error::MissingField { field: "ip" })?;

    Ok(PublicIp {
        ip,
        country: raw.country,
        country_code: raw.cc,
    })
}
