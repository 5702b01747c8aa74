// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! axum handlers for the metric endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use metricstore_storage::Metric;
use serde::Deserialize;
use std::fmt::Write;
use std::sync::Arc;

use crate::error::ApiError;
use crate::service::RawMetric;
use crate::state::AppState;

/// Body of `POST /value/`
#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    /// Metric name
    pub id: String,
    /// Metric kind
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

/// POST /update/:kind/:id/:value - Apply an update given in the path
pub async fn update_path(
    Path((kind, id, value)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("POST /update/{}/{}/{}", kind, id, value);

    state
        .service
        .set_metric_value(&kind, &id, &value)
        .await
        .map_err(ApiError::Update)?;

    Ok(StatusCode::OK)
}

/// POST /update/ - Apply one JSON metric and return the stored result
pub async fn update_json(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RawMetric>, JsonRejection>,
) -> Result<Json<Metric>, ApiError> {
    let Json(raw) = body?;
    tracing::debug!("POST /update/ {} {}", raw.kind, raw.id);

    let stored = state.service.set_metric(raw).await.map_err(ApiError::Update)?;
    Ok(Json(stored))
}

/// POST /updates/ - Apply a JSON batch and return the stored results in order
pub async fn update_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<RawMetric>>, JsonRejection>,
) -> Result<Json<Vec<Metric>>, ApiError> {
    let Json(batch) = body?;
    tracing::debug!("POST /updates/ with {} metrics", batch.len());

    let stored = state
        .service
        .set_metrics(batch)
        .await
        .map_err(ApiError::Update)?;
    Ok(Json(stored))
}

/// POST /value/ - Current value of one metric as JSON
pub async fn value_json(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ValueRequest>, JsonRejection>,
) -> Result<Json<Metric>, ApiError> {
    let Json(request) = body?;

    let metric = state
        .service
        .get_metric(&request.kind, &request.id)
        .await
        .map_err(ApiError::Read)?;
    Ok(Json(metric))
}

/// GET /value/:kind/:id - Current value of one metric as plain text
pub async fn value_path(
    Path((kind, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let text = state
        .service
        .get_metric_value(&kind, &id)
        .await
        .map_err(ApiError::Read)?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

/// GET / - HTML page listing every metric
pub async fn list_metrics(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let metrics = state
        .service
        .get_all_metrics()
        .await
        .map_err(ApiError::Read)?;

    Ok(Html(render_metrics(&metrics)))
}

/// GET /ping - Backend liveness
pub async fn ping(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.service.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Ping failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn render_metrics(metrics: &[Metric]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Metrics</title></head>\n<body>\n<table>\n\
         <tr><th>Type</th><th>Name</th><th>Value</th></tr>\n",
    );

    for metric in metrics {
        let value = match (metric.delta, metric.value) {
            (Some(delta), _) => delta.to_string(),
            (None, Some(value)) => value.to_string(),
            (None, None) => String::new(),
        };
        // Writing into a String cannot fail
        let _ = writeln!(
            page,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            metric.kind,
            escape_html(&metric.id),
            value
        );
    }

    page.push_str("</table>\n</body>\n</html>\n");
    page
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
