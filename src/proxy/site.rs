// Site worker routing: a small `/api/*` surface, everything else is a static asset.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ProxyRequest, ProxyResponse};
use crate::error::EngineError;
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRouterConfig {
    #[serde(default = "default_visitor_message")]
    pub visitor_message: String,
}

fn default_visitor_message() -> String {
    "お可愛いこと".to_string()
}

impl Default for SiteRouterConfig {
    fn default() -> Self {
        SiteRouterConfig {
            visitor_message: default_visitor_message(),
        }
    }
}

/// Where a site request goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum SiteRoute {
    Api { response: ProxyResponse },
    /// The runtime serves the request from its static assets.
    Asset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorInfo {
    pub message: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
    pub cf: serde_json::Value,
}

pub fn route_site_request(
    config: &SiteRouterConfig,
    request: &ProxyRequest,
    now: Timestamp,
) -> Result<SiteRoute, EngineError> {
    let url = Url::parse(&request.url)?;

    let Some(endpoint) = url.path().strip_prefix("/api/") else {
        return Ok(SiteRoute::Asset);
    };

    let response = match endpoint {
        "visitor" => {
            let info = VisitorInfo {
                message: config.visitor_message.clone(),
                timestamp: iso_timestamp(now),
                cf: request.cf.clone().unwrap_or(serde_json::Value::Null),
            };
            ProxyResponse::json(200, &info).allow_any_origin()
        }
        other => {
            log::debug!("no api route for {other:?}");
            ProxyResponse::json(404, &serde_json::json!({ "error": "Not Found" }))
        }
    };
    Ok(SiteRoute::Api { response })
}

fn iso_timestamp(now: Timestamp) -> String {
    let millis = i64::try_from(now.as_millis()).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
