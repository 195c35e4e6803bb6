//! Service configuration, from flags or environment.

use crate::judge::Encoding;
use crate::local::{LocalConfig, Program};
use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_JUDGE_URL: &str = "https://ce.judge0.com";

/// Options shared by `serve` and `run`.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Base URL of the Judge0-compatible service
    #[arg(long, env = "JUDGE_URL", default_value = DEFAULT_JUDGE_URL, global = true)]
    pub judge_url: String,

    /// Encoding the judge endpoint is called with
    #[arg(long, env = "JUDGE_ENCODING", value_enum, default_value = "base64", global = true)]
    pub judge_encoding: Encoding,

    /// Directory holding per-request workspaces [default: <tmp>/coderun]
    #[arg(long, env = "SANDBOX_ROOT", global = true)]
    pub sandbox_root: Option<PathBuf>,

    /// Compiler command for local runs
    #[arg(long, env = "JAVA_COMPILER", default_value = "javac", global = true)]
    pub compiler: String,

    /// Runtime command for local runs
    #[arg(long, env = "JAVA_RUNTIME", default_value = "java", global = true)]
    pub runtime: String,

    /// Maximum file size a local child may write, in KB (0 = unlimited)
    #[arg(long, env = "SANDBOX_FSIZE_KB", default_value = "10240", global = true)]
    pub fsize_kb: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub judge_url: String,
    pub judge_encoding: Encoding,
    pub local: LocalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            judge_url: DEFAULT_JUDGE_URL.to_string(),
            judge_encoding: Encoding::Base64,
            local: LocalConfig::default(),
        }
    }
}

impl ConfigArgs {
    pub fn into_config(self) -> Result<Config, String> {
        let defaults = LocalConfig::default();
        let compiler = Program::parse(&self.compiler)
            .ok_or_else(|| "--compiler must not be empty".to_string())?;
        let runtime = Program::parse(&self.runtime)
            .ok_or_else(|| "--runtime must not be empty".to_string())?;

        Ok(Config {
            judge_url: self.judge_url,
            judge_encoding: self.judge_encoding,
            local: LocalConfig {
                sandbox_root: self.sandbox_root.unwrap_or(defaults.sandbox_root),
                compiler,
                runtime,
                fsize_kb: self.fsize_kb,
            },
        })
    }
}
