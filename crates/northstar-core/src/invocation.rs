//! Results of past transformation runs, as recorded by the execution runtime.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Number of most recent invocations returned for a transformation
pub const RESULTS_LIMIT: usize = 100;

/// Raw statuses written by the runtime
pub const RUN_FINISHED: &str = "FINISHED";
pub const REPL_FAILED: &str = "REPL_FAILED";
pub const CODE_GET_FAILED: &str = "CODE_GET_FAILED";
pub const RUN_TIMED_OUT: &str = "TIMED_OUT";

/// One run of a snippet
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub id: String,
    pub snippet_id: String,
    pub created_on: DateTime<Utc>,
    /// Run time in milliseconds
    pub elapsed_time: f64,
    pub stdout: String,
    /// JSON encoded [`CellResults`], set by successful runs
    pub result: String,
    pub status: String,
    pub error_descr: String,
}

#[async_trait]
pub trait InvocationStore: Send + Sync {
    /// The newest `limit` invocations of the snippet, newest first
    async fn get_invocation_results(
        &self,
        account_id: &str,
        snippet_id: &str,
        limit: usize,
    ) -> Result<Vec<Invocation>, StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStatus {
    #[default]
    Unknown,
    Success,
    Failed,
    ExecutionTimeout,
    InternalError,
    OutOfMemory,
    Running,
}

impl OutputStatus {
    pub fn from_runtime(status: &str) -> Self {
        match status {
            RUN_FINISHED => OutputStatus::Success,
            REPL_FAILED => OutputStatus::Failed,
            CODE_GET_FAILED => OutputStatus::InternalError,
            RUN_TIMED_OUT => OutputStatus::ExecutionTimeout,
            _ => OutputStatus::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutputStatus::Unknown => "The execution failed due to an unknown condition.",
            OutputStatus::Success => "The execution has succeeded.",
            OutputStatus::Failed => "The execution has failed.",
            OutputStatus::ExecutionTimeout => {
                "The execution did not complete within the expected time."
            }
            OutputStatus::InternalError => "The execution failed due to an unexpected condition.",
            OutputStatus::OutOfMemory => "The execution failed due to insufficient memory.",
            OutputStatus::Running => "The execution is currently running.",
        }
    }
}

/// Typed content produced by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellResults {
    /// Media type, e.g. "application/json" or "text/plain"
    #[serde(rename = "type")]
    pub result_type: String,
    pub content: serde_json::Value,
}

/// Result of one transformation run as returned to clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub status: OutputStatus,
    pub status_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub execution_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<CellResults>,
    pub elapsed_time: i64,
    pub last_execution: Option<DateTime<Utc>>,
}

impl Output {
    pub fn from_invocation(invocation: &Invocation) -> Self {
        let status = OutputStatus::from_runtime(&invocation.status);
        // The runtime's own message wins, except for unrecognized statuses
        let status_description = if status != OutputStatus::Unknown && !invocation.error_descr.is_empty() {
            invocation.error_descr.clone()
        } else {
            status.description().to_string()
        };

        let mut output = Output {
            status,
            status_description,
            execution_output: invocation.stdout.clone(),
            execution_results: None,
            elapsed_time: invocation.elapsed_time as i64,
            last_execution: Some(invocation.created_on),
        };

        if status == OutputStatus::Success && !invocation.result.is_empty() {
            match serde_json::from_str::<CellResults>(&invocation.result) {
                Ok(results) => output.execution_results = Some(results),
                Err(e) => {
                    tracing::error!(invocation_id = %invocation.id, "Parse invocation results returned error: {}", e);
                    output.status = OutputStatus::InternalError;
                    output.status_description =
                        "Execution was successful but results could not be parsed.".to_string();
                }
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(status: &str, result: &str) -> Invocation {
        Invocation {
            id: "i1".to_string(),
            snippet_id: "s1".to_string(),
            created_on: Utc::now(),
            elapsed_time: 12.7,
            stdout: "hello\n".to_string(),
            result: result.to_string(),
            status: status.to_string(),
            error_descr: String::new(),
        }
    }

    #[test]
    fn test_successful_run() {
        let output = Output::from_invocation(&invocation(
            RUN_FINISHED,
            r#"{"type": "text/plain", "content": "42"}"#,
        ));
        assert_eq!(output.status, OutputStatus::Success);
        assert_eq!(output.status_description, "The execution has succeeded.");
        assert_eq!(output.execution_output, "hello\n");
        assert_eq!(output.elapsed_time, 12);
        let results = output.execution_results.unwrap();
        assert_eq!(results.result_type, "text/plain");
        assert_eq!(results.content, "42");
    }

    #[test]
    fn test_unparseable_results() {
        let output = Output::from_invocation(&invocation(RUN_FINISHED, "not json"));
        assert_eq!(output.status, OutputStatus::InternalError);
        assert!(output.execution_results.is_none());
    }

    #[test]
    fn test_runtime_statuses() {
        let mut timed_out = invocation(RUN_TIMED_OUT, "");
        timed_out.error_descr = "snippet execution deadline exceeded".to_string();
        let output = Output::from_invocation(&timed_out);
        assert_eq!(output.status, OutputStatus::ExecutionTimeout);
        assert_eq!(output.status_description, "snippet execution deadline exceeded");

        let output = Output::from_invocation(&invocation(REPL_FAILED, "ignored"));
        assert_eq!(output.status, OutputStatus::Failed);
        assert!(output.execution_results.is_none());

        let mut strange = invocation("EXPLODED", "");
        strange.error_descr = "boom".to_string();
        let output = Output::from_invocation(&strange);
        assert_eq!(output.status, OutputStatus::Unknown);
        assert_eq!(output.status_description, OutputStatus::Unknown.description());
    }

    #[test]
    fn test_output_wire_format() {
        let value = serde_json::to_value(Output::from_invocation(&invocation(CODE_GET_FAILED, ""))).unwrap();
        assert_eq!(value["status"], "InternalError");
        assert_eq!(value["executionOutput"], "hello\n");
        assert!(value.get("executionResults").is_none());
        assert!(value["lastExecution"].is_string());
    }
}
