//! Errors from adapter processing
//!
//! Every variant except `Cancelled` carries enough context (raw line,
//! sentence) to diagnose the failing tool output. Any error aborts the
//! current adapter invocation; the document it was writing is unusable.

use crate::graph::{GraphError, SentenceId};
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed line{}: {reason}: {line:?}", fmt_sentence(.sentence))]
    MalformedLine {
        line: String,
        sentence: Option<SentenceId>,
        reason: String,
    },

    #[error("unknown tag {tag:?} ({context})")]
    UnknownTag { tag: String, context: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("no response while waiting for {waiting_for} after {after:?}")]
    ProtocolTimeout {
        waiting_for: String,
        after: Duration,
    },

    #[error("sentence {sentence}: tool returned {found} tokens, document has {expected}")]
    TokenCountMismatch {
        sentence: SentenceId,
        expected: usize,
        found: usize,
    },

    #[error("collaborator failed to start: {0}")]
    Startup(String),

    #[error("{tool} exited unsuccessfully ({status})")]
    ToolFailed { tool: String, status: ExitStatus },

    #[error("adapter cancelled")]
    Cancelled,

    #[error("adapter error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    pub(crate) fn malformed(
        line: impl Into<String>,
        sentence: Option<SentenceId>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedLine {
            line: line.into(),
            sentence,
            reason: reason.into(),
        }
    }

    pub(crate) fn timeout(waiting_for: impl Into<String>, after: Duration) -> Self {
        Self::ProtocolTimeout {
            waiting_for: waiting_for.into(),
            after,
        }
    }
}

fn fmt_sentence(sentence: &Option<SentenceId>) -> String {
    match sentence {
        Some(id) => format!(" in sentence {}", id),
        None => String::new(),
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
