// src/lambda/mod.rs

//! AWS Lambda handler.
//!
//! Each invocation runs one check cycle. The response follows the API
//! Gateway / function URL proxy shape so the function can be triggered by
//! a scheduler or over HTTP: `statusCode` 200 when every source succeeded,
//! 500 otherwise, with a JSON body describing the run.

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::config::load_config;
use crate::error::Result;
use crate::pipeline::{RunReport, alert_setup_failure, run_check};

/// Options accepted in the invocation payload or the proxied request body.
#[derive(Debug, Default, Deserialize)]
pub struct CheckRequest {
    /// Log notifications instead of posting them
    #[serde(default)]
    pub dry_run: bool,
}

impl CheckRequest {
    /// Read options from a direct payload or from a proxy event's `body`.
    pub fn from_event(payload: &Value) -> Self {
        let parsed = match payload.get("body") {
            Some(Value::String(body)) if !body.trim().is_empty() => serde_json::from_str(body),
            Some(_) => return Self::default(),
            None => serde_json::from_value(payload.clone()),
        };
        parsed.unwrap_or_default()
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<Value>) -> std::result::Result<Value, LambdaError> {
    let (payload, _context) = event.into_parts();
    let request = CheckRequest::from_event(&payload);
    info!("Starting check: dry_run={}", request.dry_run);

    let result = run(&request).await;
    let response = proxy_response(&result);
    match &result {
        Ok(report) if report.is_success() => info!(
            "Check completed: {} item(s) notified",
            report.notified_count()
        ),
        Ok(report) => error!("Check completed with failures: {}", report.failure_summary()),
        Err(e) => error!("Check could not start: {}", e),
    }
    Ok(response)
}

async fn run(request: &CheckRequest) -> Result<RunReport> {
    let config = load_config(None)?;
    match run_check(&config, request.dry_run).await {
        Ok(report) => Ok(report),
        Err(e) => {
            if !request.dry_run {
                alert_setup_failure(&config, &e).await;
            }
            Err(e)
        }
    }
}

/// Build the proxy response for a run result.
pub fn proxy_response(result: &Result<RunReport>) -> Value {
    let (status, body) = match result {
        Ok(report) if report.is_success() => (
            200,
            json!({ "status": "ok", "report": report }),
        ),
        Ok(report) => {
            let failed: Vec<&str> = report.failures().map(|o| o.url.as_str()).collect();
            (
                500,
                json!({ "status": "error", "failed": failed, "report": report }),
            )
        }
        Err(e) => (
            500,
            json!({ "status": "error", "error": e.to_string(), "kind": e.kind() }),
        ),
    };

    json!({
        "statusCode": status,
        "headers": { "Content-Type": "application/json" },
        "body": body.to_string(),
    })
}
