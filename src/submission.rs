//! Inbound request shape and the validated submission built from it.

use crate::error::ExecError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// JSON object of name -> string that keeps the payload's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedMap(pub Vec<(String, String)>);

impl<'de> Deserialize<'de> for OrderedMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor;

        impl<'de> Visitor<'de> for OrderedMapVisitor {
            type Value = OrderedMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping names to strings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, String)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, String>()? {
                    if entries.iter().any(|(existing, _)| *existing == name) {
                        return Err(de::Error::custom(format!("duplicate name `{}`", name)));
                    }
                    entries.push((name, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor)
    }
}

/// Body of `POST /run`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub language: String,
    pub entrypoint: String,
    pub files: OrderedMap,
    /// Archive name -> base64 content
    #[serde(default)]
    pub jars: Option<OrderedMap>,
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Auxiliary binary dependency, already decoded from base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A request that passed boundary validation. Downstream code does not
/// re-check these invariants.
#[derive(Debug, Clone)]
pub struct Submission {
    pub language: String,
    pub entrypoint: String,
    /// Non-empty, unique names, request order
    pub files: Vec<SourceFile>,
    pub jars: Vec<Artifact>,
    pub stdin: String,
    pub timeout: Duration,
}

impl RunRequest {
    pub fn validate(self) -> Result<Submission, ExecError> {
        if self.files.0.is_empty() {
            return Err(ExecError::invalid("`files` must contain at least one file"));
        }

        let timeout_secs = self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ExecError::invalid("`timeout_seconds` must be positive"));
        }

        let jars = self
            .jars
            .unwrap_or_default()
            .0
            .into_iter()
            .map(|(name, encoded)| -> Result<Artifact, ExecError> {
                let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                    ExecError::invalid(format!("jar `{}` is not valid base64: {}", name, e))
                })?;
                Ok(Artifact { name, bytes })
            })
            .collect::<Result<Vec<_>, ExecError>>()?;

        let files = self
            .files
            .0
            .into_iter()
            .map(|(name, content)| SourceFile { name, content })
            .collect();

        Ok(Submission {
            language: self.language,
            entrypoint: self.entrypoint,
            files,
            jars,
            stdin: self.stdin.unwrap_or_default(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Submission {
    pub fn has_dependencies(&self) -> bool {
        !self.jars.is_empty()
    }
}
