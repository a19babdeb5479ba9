/*!
 * Writing translated text back to items.
 */

use log::{info, warn};

use crate::document::{ApplyMode, Document, DocumentStore, TranslationItem};

use super::flags::ItemFlagStore;

/// How results are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    pub mode: ApplyMode,
    /// Used to name the sibling document in `NewDocument` mode
    pub target_language: String,
}

/// An item whose result was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyWarning {
    pub item_id: String,
    pub reason: String,
}

/// What `apply_results` did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Items that received their translation and are now completed
    pub applied: Vec<String>,
    pub warnings: Vec<ApplyWarning>,
    /// Sibling document created in `NewDocument` mode
    pub new_document_id: Option<String>,
}

impl ApplyReport {
    pub(crate) fn warn(&mut self, item_id: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Item {} not updated: {}", item_id, reason);
        self.warnings.push(ApplyWarning {
            item_id: item_id.to_string(),
            reason,
        });
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: ApplyReport) {
        self.applied.extend(other.applied);
        self.warnings.extend(other.warnings);
        if self.new_document_id.is_none() {
            self.new_document_id = other.new_document_id;
        }
    }
}

/// Name of the sibling document holding translations
pub fn translated_document_name(source_name: &str, target_language: &str) -> String {
    format!("{} ({})", source_name, target_language)
}

/// Apply `(item, translation)` pairs and mark applied items completed
///
/// Blank translations are reported and skipped; their items keep their
/// queued flags. A failure on one item never stops the others.
pub async fn apply_results(
    store: &dyn DocumentStore,
    flags: &ItemFlagStore,
    source: &Document,
    pairs: Vec<(TranslationItem, String)>,
    options: &ApplyOptions,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut sibling: Option<Document> = None;

    for (item, text) in pairs {
        if text.trim().is_empty() {
            report.warn(&item.id, "empty translation");
            continue;
        }

        let written = match options.mode.placement() {
            Some(placement) => store.apply_content(&item.id, &text, placement).await,
            None => {
                if sibling.is_none() {
                    let name = translated_document_name(&source.name, &options.target_language);
                    match store.create_document(&name, &[]).await {
                        Ok(document) => {
                            info!("Created document '{}' for translations", name);
                            report.new_document_id = Some(document.id.clone());
                            sibling = Some(document);
                        }
                        Err(e) => {
                            report.warn(&item.id, format!("could not create translated document: {:#}", e));
                            continue;
                        }
                    }
                }

                match &sibling {
                    Some(document) => store
                        .add_item(&document.id, item.position, &text)
                        .await
                        .map(|_| ()),
                    None => continue,
                }
            }
        };

        if let Err(e) = written {
            report.warn(&item.id, format!("{:#}", e));
            continue;
        }

        if let Err(e) = flags.mark_completed(&item.id).await {
            report.warn(&item.id, format!("translation applied but flags not updated: {}", e));
            continue;
        }

        report.applied.push(item.id);
    }

    report
}
