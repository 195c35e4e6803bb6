//! Supported languages and the local/remote routing decision.

use crate::error::ExecError;
use serde::Serialize;

/// Static description of one supported language.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageDescriptor {
    pub id: &'static str,
    /// Judge0 `language_id`
    pub judge_id: u32,
    /// Line comment token used for file boundary markers
    pub comment: &'static str,
    /// Needs externally supplied archives on the compile/run classpath
    pub requires_local_sandbox: bool,
    pub source_extension: &'static str,
}

/// Where a submission gets executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Remote,
}

/// Fixed language table. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    languages: Vec<LanguageDescriptor>,
}

const fn lang(
    id: &'static str,
    judge_id: u32,
    comment: &'static str,
    requires_local_sandbox: bool,
    source_extension: &'static str,
) -> LanguageDescriptor {
    LanguageDescriptor {
        id,
        judge_id,
        comment,
        requires_local_sandbox,
        source_extension,
    }
}

const BUILTIN: [LanguageDescriptor; 8] = [
    lang("c", 50, "//", false, ".c"),
    lang("cpp", 54, "//", false, ".cpp"),
    lang("java", 62, "//", true, ".java"),
    lang("python", 71, "#", false, ".py"),
    lang("javascript", 63, "//", false, ".js"),
    lang("ruby", 72, "#", false, ".rb"),
    lang("go", 60, "//", false, ".go"),
    lang("bash", 46, "#", false, ".sh"),
];

impl LanguageTable {
    pub fn builtin() -> Self {
        Self {
            languages: BUILTIN.to_vec(),
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, language: &str) -> Option<&LanguageDescriptor> {
        self.languages
            .iter()
            .find(|l| l.id.eq_ignore_ascii_case(language.trim()))
    }

    pub fn resolve(&self, language: &str) -> Result<&LanguageDescriptor, ExecError> {
        self.get(language)
            .ok_or_else(|| ExecError::UnsupportedLanguage(language.to_string()))
    }

    /// Local only when the language needs external archives AND the
    /// submission actually brings some; everything else goes to the judge.
    pub fn route(
        &self,
        language: &str,
        has_dependencies: bool,
    ) -> Result<(&LanguageDescriptor, Backend), ExecError> {
        let descriptor = self.resolve(language)?;
        let backend = if descriptor.requires_local_sandbox && has_dependencies {
            Backend::Local
        } else {
            Backend::Remote
        };
        Ok((descriptor, backend))
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.languages.iter().map(|l| l.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageDescriptor> {
        self.languages.iter()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}
