//! Dependency edges between terms of one sentence

use super::term::TermId;
use serde::{Deserialize, Serialize};

/// A labeled syntactic relation
///
/// `from` is the dependent and `to` is its governor. Labels are whatever
/// vocabulary the producing adapter uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub from: TermId,
    pub to: TermId,
    pub relation: String,
}

impl Dependency {
    pub fn new(from: TermId, to: TermId, relation: impl Into<String>) -> Self {
        Self {
            from,
            to,
            relation: relation.into(),
        }
    }
}
