//! coderun - run multi-file submissions on a remote Judge0 instance, or
//! locally when a Java submission brings its own JAR dependencies.

pub mod assembler;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http_server;
pub mod judge;
pub mod language;
pub mod local;
pub mod normalize;
pub mod result;
pub mod state;
pub mod submission;
pub mod workspace;

pub use dispatch::Dispatcher;
pub use error::ExecError;
pub use result::ExecutionResult;
pub use submission::{RunRequest, Submission};
