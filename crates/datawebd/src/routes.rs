//! JSONP query routes for datawebd.
//!
//! One GET endpoint in the shape dataweb screens request: a `callback`
//! token naming the JSONP wrapper function and an `Instrument` token that
//! is either a configured instrument name or the literal `ALL`.

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use dataweb_common::CacheEntry;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};
use tracing::{debug, error};

type AppStateArc = Arc<AppState>;

/// JSONP callbacks and instrument names are single word tokens.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

pub fn query_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(jsonp_query))
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    callback: Option<String>,
    #[serde(rename = "Instrument")]
    instrument: Option<String>,
}

/// Serve one JSONP query from a single cache snapshot.
///
/// `Instrument=ALL` answers with the liveness map; a specific name answers
/// with that instrument's full latest reading.
async fn jsonp_query(
    State(state): State<AppStateArc>,
    Query(params): Query<QueryParams>,
) -> Result<Response, (StatusCode, String)> {
    let callback = valid_token(params.callback.as_deref()).ok_or_else(|| {
        error!("Rejected query without a callback");
        (StatusCode::BAD_REQUEST, "No callback specified".to_string())
    })?;
    let instrument = valid_token(params.instrument.as_deref())
        .ok_or_else(|| {
            error!("Rejected query without an instrument");
            (StatusCode::BAD_REQUEST, "No instrument specified".to_string())
        })?
        .to_uppercase();

    debug!("Query for {}", instrument);

    let snapshot = state.cache.get_all().await;

    let payload = if instrument == "ALL" {
        liveness_summary(&snapshot).map_err(|e| {
            error!("Unable to serialize liveness summary: {}", e);
            (StatusCode::NOT_FOUND, e.to_string())
        })?
    } else {
        instrument_detail(&instrument, &snapshot)?
    };

    Ok((
        [(header::CONTENT_TYPE, "text/html")],
        format!("{}({})", callback, payload),
    )
        .into_response())
}

fn valid_token(value: Option<&str>) -> Option<&str> {
    value.filter(|v| TOKEN_RE.is_match(v))
}

/// `true`/`false` per instrument that has completed at least one poll.
fn liveness_summary(
    snapshot: &HashMap<String, CacheEntry>,
) -> Result<String, serde_json::Error> {
    let active: BTreeMap<&str, bool> = snapshot
        .iter()
        .map(|(name, entry)| (name.as_str(), entry.is_present()))
        .collect();
    serde_json::to_string(&active)
}

/// The latest full reading for one instrument, serialized.
fn instrument_detail(
    name: &str,
    snapshot: &HashMap<String, CacheEntry>,
) -> Result<String, (StatusCode, String)> {
    match snapshot.get(name) {
        None => {
            error!("Query for unknown instrument {}", name);
            Err((StatusCode::BAD_REQUEST, format!("{} not known", name)))
        }
        Some(CacheEntry::Unavailable) => {
            error!("Query for unavailable instrument {}", name);
            Err((
                StatusCode::BAD_REQUEST,
                "Instrument has become unavailable".to_string(),
            ))
        }
        Some(CacheEntry::Present(reading)) => serde_json::to_string(reading).map_err(|e| {
            error!("Unable to convert instrument data to JSON: {}", e);
            (
                StatusCode::NOT_FOUND,
                format!("Unable to convert instrument data to JSON: {}", e),
            )
        }),
    }
}
