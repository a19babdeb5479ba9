/*!
 * Batch job bookkeeping and recovery.
 *
 * This module provides:
 * - Durable per-item flags recording which job an item belongs to
 * - The in-process registry of jobs being polled
 * - Discovery, resumption and abandonment of unfinished jobs
 * - The document translation workflow tying these together
 */

pub mod apply;
pub mod flags;
pub mod manager;
pub mod models;
pub mod recovery;
pub mod registry;

// Re-export main types
pub use apply::{ApplyOptions, ApplyReport, ApplyWarning};
pub use flags::{ItemFlagStore, ItemFlags};
pub use manager::SessionManager;
pub use models::{DocumentStatus, ItemView, TranslationReport};
pub use recovery::{FixedChoice, PendingItem, PendingJob, RecoveryChoice, RecoveryCoordinator, RecoveryPrompt, ResumeOutcome};
pub use registry::{ActiveJobGuard, ActiveJobRegistry};
