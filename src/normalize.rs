//! Reduces raw judge responses to an `ExecutionResult`.

use crate::judge::Encoding;
use crate::result::ExecutionResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

/// Judge0 submission status. Informational only: it never decides `success`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JudgeStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

/// The fields of a Judge0 response this service reads.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawJudgeResult {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub status: Option<JudgeStatus>,
}

pub fn normalize(raw: &RawJudgeResult, encoding: Encoding) -> ExecutionResult {
    let output = decode_field("stdout", raw.stdout.as_deref(), encoding);
    let stderr = decode_field("stderr", raw.stderr.as_deref(), encoding);

    let error = if !stderr.is_empty() {
        stderr
    } else {
        decode_field("compile_output", raw.compile_output.as_deref(), encoding)
    };

    ExecutionResult::from_streams(output, error)
}

/// Absent and empty fields are empty strings. A field that fails to decode
/// is replaced by a marker without failing the others.
pub fn decode_field(field: &str, value: Option<&str>, encoding: Encoding) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return String::new(),
    };

    match encoding {
        Encoding::Plain => value.to_string(),
        Encoding::Base64 => {
            // Judge0 wraps base64 output at 60 columns
            let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            match STANDARD.decode(compact) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => format!("<failed to decode {}>", field),
            }
        }
    }
}
