//! Adapter trait: the contract every tool adapter implements
//!
//! An adapter turns one external tool's output into document mutations.
//! Adapters run one after another against the same document.

use super::cancel::CancellationToken;
use super::error::AdapterError;
use crate::graph::Document;
use async_trait::async_trait;

/// The input envelope the pipeline hands to an adapter.
#[derive(Debug, Clone)]
pub struct AdapterInput {
    /// Raw document text
    pub text: String,
    /// Checked between lines or records; a cancelled adapter returns `Cancelled`
    pub cancel: CancellationToken,
}

impl AdapterInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fail fast if the caller has cancelled.
    pub fn check_cancelled(&self) -> Result<(), AdapterError> {
        if self.cancel.is_cancelled() {
            Err(AdapterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The contract adapters implement.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Unique identifier for this adapter
    fn id(&self) -> &str;

    /// Write this adapter's annotations into `doc`.
    ///
    /// On error the document may be half-written and must be discarded.
    async fn annotate(&self, input: &AdapterInput, doc: &mut Document) -> Result<(), AdapterError>;
}
