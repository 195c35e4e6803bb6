//! Request orchestration: validate, route, execute, normalize.

use crate::assembler::assemble;
use crate::config::Config;
use crate::error::ExecError;
use crate::judge::{JudgeClient, JudgeReply};
use crate::language::{Backend, LanguageDescriptor, LanguageTable};
use crate::local::LocalExecutor;
use crate::normalize::normalize;
use crate::result::ExecutionResult;
use crate::submission::{RunRequest, Submission};
use std::sync::Arc;
use tracing::info;

pub struct Dispatcher {
    languages: Arc<LanguageTable>,
    local: LocalExecutor,
    judge: JudgeClient,
}

impl Dispatcher {
    pub fn new(languages: Arc<LanguageTable>, local: LocalExecutor, judge: JudgeClient) -> Self {
        Self {
            languages,
            local,
            judge,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(LanguageTable::builtin()),
            LocalExecutor::new(config.local.clone()),
            JudgeClient::new(&config.judge_url, config.judge_encoding),
        )
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    /// Execute one request. `include_raw` keeps the unprocessed backend
    /// response on the result.
    pub async fn run(
        &self,
        request: RunRequest,
        include_raw: bool,
    ) -> Result<ExecutionResult, ExecError> {
        // Unknown languages never reach validation, disk or network
        self.languages.resolve(&request.language)?;
        let submission = request.validate()?;
        let (language, backend) = self
            .languages
            .route(&submission.language, submission.has_dependencies())?;

        info!(
            language = language.id,
            backend = ?backend,
            files = submission.files.len(),
            timeout_secs = submission.timeout.as_secs(),
            "Dispatching submission"
        );

        let result = match backend {
            Backend::Local => self.local.execute(&submission, language).await?,
            Backend::Remote => self.run_remote(&submission, language).await?,
        };
        info!(success = result.success, "Submission finished");

        if include_raw {
            Ok(result)
        } else {
            Ok(ExecutionResult { raw: None, ..result })
        }
    }

    async fn run_remote(
        &self,
        submission: &Submission,
        language: &LanguageDescriptor,
    ) -> Result<ExecutionResult, ExecError> {
        let source = assemble(&submission.files, &submission.jars, language.comment);
        let reply = self
            .judge
            .submit(language.judge_id, &source, &submission.stdin, submission.timeout)
            .await?;

        Ok(match reply {
            JudgeReply::Completed { result, body } => {
                normalize(&result, self.judge.encoding()).with_raw(body)
            }
            JudgeReply::Failed(result) => result,
        })
    }
}
