//! Client for a Judge0-compatible remote judging service.

use crate::error::ExecError;
use crate::normalize::RawJudgeResult;
use crate::result::ExecutionResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transport encoding of `source_code`, `stdin` and the output fields.
/// Chosen once per deployment; the endpoint URL is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
    Base64,
    Plain,
}

impl Encoding {
    fn query_flag(self) -> &'static str {
        match self {
            Encoding::Base64 => "true",
            Encoding::Plain => "false",
        }
    }

    fn encode(self, text: &str) -> String {
        match self {
            Encoding::Base64 => STANDARD.encode(text.as_bytes()),
            Encoding::Plain => text.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmissionBody {
    language_id: u32,
    source_code: String,
    stdin: String,
}

/// What came back from one submission.
#[derive(Debug)]
pub enum JudgeReply {
    /// The judge ran the code; fields still need normalizing.
    Completed {
        result: RawJudgeResult,
        body: serde_json::Value,
    },
    /// Timeout or transport fault, already in result form.
    Failed(ExecutionResult),
}

#[derive(Debug, Clone)]
pub struct JudgeClient {
    http: reqwest::Client,
    endpoint: String,
    encoding: Encoding,
}

impl JudgeClient {
    pub fn new(base_url: &str, encoding: Encoding) -> Self {
        let endpoint = format!(
            "{}/submissions/?base64_encoded={}&wait=true",
            base_url.trim_end_matches('/'),
            encoding.query_flag()
        );
        Self {
            http: reqwest::Client::new(),
            endpoint,
            encoding,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// POST one submission and wait for the verdict, bounded by `timeout`.
    /// Only a non-2xx answer is an `Err`.
    pub async fn submit(
        &self,
        language_id: u32,
        source: &str,
        stdin: &str,
        timeout: Duration,
    ) -> Result<JudgeReply, ExecError> {
        let body = SubmissionBody {
            language_id,
            source_code: self.encoding.encode(source),
            stdin: self.encoding.encode(stdin),
        };
        info!(language_id, endpoint = %self.endpoint, "Submitting to judge");
        debug!(source_len = source.len(), stdin_len = stdin.len(), "Submission sizes");

        let res = match self
            .http
            .post(&self.endpoint)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => return Ok(JudgeReply::Failed(transport_failure(e))),
        };

        let status = res.status();
        if !status.is_success() {
            let body = match res.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to read judge error body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), "Judge rejected submission");
            return Err(ExecError::JudgeStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = match res.json().await {
            Ok(body) => body,
            Err(e) => return Ok(JudgeReply::Failed(transport_failure(e))),
        };
        let result: RawJudgeResult = match serde_json::from_value(body.clone()) {
            Ok(result) => result,
            Err(e) => return Ok(JudgeReply::Failed(ExecutionResult::execution_failed(e))),
        };
        if let Some(s) = &result.status {
            info!(status_id = s.id, status = %s.description, "Judge finished");
        }

        Ok(JudgeReply::Completed { result, body })
    }
}

fn transport_failure(e: reqwest::Error) -> ExecutionResult {
    if e.is_timeout() {
        warn!("Judge request timed out");
        ExecutionResult::timed_out()
    } else {
        warn!(error = %e, "Judge request failed");
        ExecutionResult::execution_failed(e)
    }
}
