// src/lambda/mod.rs

//! AWS Lambda handler.
//!
//! SQS-triggered invocations run the analysis; every other trigger (scheduled
//! events, manual invokes) runs ingestion. The configuration location comes
//! from `CONFIG_PATH`.

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::config::{config_location_from_env, load_config};
use crate::error::Result;
use crate::pipeline;
use crate::storage::{S3Storage, Storage};
use crate::utils::retry::RetryPolicy;

/// Which pipeline an invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Ingest,
    Analyze,
}

/// Route by trigger: `Records[0].eventSource == "aws:sqs"` means analyze.
pub fn detect_run_type(event: &Value) -> RunType {
    let source = event
        .get("Records")
        .and_then(|records| records.get(0))
        .and_then(|record| record.get("eventSource"))
        .and_then(Value::as_str);

    match source {
        Some("aws:sqs") => RunType::Analyze,
        _ => RunType::Ingest,
    }
}

/// Main Lambda handler function.
///
/// Always answers with `{statusCode, body}`; failures are reported as 400
/// rather than as invocation errors, so SQS does not redeliver them.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<Value>) -> std::result::Result<Value, LambdaError> {
    let (payload, _context) = event.into_parts();
    let run_type = detect_run_type(&payload);
    info!("Trigger routed to {:?}", run_type);

    match run(run_type).await {
        Ok((config_path, details)) => {
            info!("{:?} run succeeded", run_type);
            Ok(json!({
                "statusCode": 200,
                "body": json!({
                    "message": "Lambda executed successfully",
                    "config_path": config_path,
                    "run_type": run_type,
                    "result": details,
                })
                .to_string(),
            }))
        }
        Err(e) => {
            error!("{:?} run failed: {}", run_type, e);
            Ok(json!({
                "statusCode": 400,
                "body": json!({ "error": e.to_string() }).to_string(),
            }))
        }
    }
}

async fn run(run_type: RunType) -> Result<(String, Value)> {
    let config_path = config_location_from_env()?;
    let storage = Storage::local(".").with_s3(S3Storage::client_from_env().await);
    let config = load_config(&storage, &config_path).await?;
    let storage = storage.with_retry(RetryPolicy::from_config(&config.http));

    let details = match run_type {
        RunType::Ingest => {
            serde_json::to_value(pipeline::run_ingest(&config, &storage, false).await?)?
        }
        RunType::Analyze => {
            serde_json::to_value(pipeline::run_analysis(&config, &storage).await?)?
        }
    };
    Ok((config_path, details))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqs_event_runs_analysis() {
        let event = json!({
            "Records": [{
                "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                "eventSource": "aws:sqs",
                "body": "{}"
            }]
        });
        assert_eq!(detect_run_type(&event), RunType::Analyze);
    }

    #[test]
    fn test_other_events_run_ingest() {
        let scheduled = json!({
            "source": "aws.events",
            "detail-type": "Scheduled Event"
        });
        assert_eq!(detect_run_type(&scheduled), RunType::Ingest);

        let s3_records = json!({ "Records": [{ "eventSource": "aws:s3" }] });
        assert_eq!(detect_run_type(&s3_records), RunType::Ingest);

        assert_eq!(detect_run_type(&json!({ "Records": [] })), RunType::Ingest);
        assert_eq!(detect_run_type(&Value::Null), RunType::Ingest);
    }

    #[test]
    fn test_run_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RunType::Analyze).unwrap(), "analyze");
    }
}
