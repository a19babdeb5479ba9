/*!
 * Session-specific models and DTOs.
 *
 * These structures describe what a translation run did, for display and
 * for callers that need to act on partial results.
 */

use crate::document::{DocumentSummary, TranslationItem};

use super::apply::ApplyReport;
use super::flags::ItemFlags;
use super::recovery::ResumeOutcome;

/// Result of `SessionManager::translate_document`
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationReport {
    /// A new job was submitted and its results applied
    Submitted {
        job_id: String,
        /// Number of items sent in the job
        submitted: usize,
        report: ApplyReport,
    },
    /// Unfinished jobs were resumed instead of submitting a new one
    Resumed(Vec<ResumeOutcome>),
    /// The user chose to leave unfinished jobs alone
    Cancelled {
        /// Number of unfinished jobs left in place
        pending_jobs: usize,
    },
}

impl TranslationReport {
    /// Item ids that received a translation
    pub fn applied(&self) -> Vec<String> {
        match self {
            Self::Submitted { report, .. } => report.applied.clone(),
            Self::Resumed(outcomes) => outcomes
                .iter()
                .filter_map(|outcome| match outcome {
                    ResumeOutcome::Applied { report, .. } => Some(report.applied.clone()),
                    _ => None,
                })
                .flatten()
                .collect(),
            Self::Cancelled { .. } => Vec::new(),
        }
    }
}

/// An item together with its batch flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item: TranslationItem,
    pub flags: ItemFlags,
}

/// Document listing entry with flag counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    pub summary: DocumentSummary,
    /// Items submitted and still waiting for a result
    pub in_flight: usize,
    /// Items whose translation was applied
    pub completed: usize,
}
