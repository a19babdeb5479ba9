/*!
 * Controller workflow: import a file, translate it, inspect the result
 */

use std::sync::Arc;

use batchwai::app_config::Config;
use batchwai::app_controller::Controller;
use batchwai::document::{ApplyMode, DocumentStore};
use batchwai::providers::mock::{MockBatchProvider, MockFailure, MockStage};
use batchwai::session::{FixedChoice, RecoveryChoice, TranslationReport};

use crate::common;

fn controller(config: Config, provider: &MockBatchProvider) -> (Controller, Arc<dyn DocumentStore>) {
    let store: Arc<dyn DocumentStore> = common::memory_store();
    let controller = Controller::with_parts(config, store.clone(), Arc::new(provider.clone()));
    (controller, store)
}

fn write_source(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn test_importThenTranslate_shouldReplaceEveryParagraph() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = write_source(&temp_dir, "Good morning.\n\nSee you\ntomorrow.\n");
    let provider = MockBatchProvider::working();
    let (controller, _store) = controller(Config::default(), &provider);

    let document = controller.import_file(&path, None).await.unwrap();
    assert_eq!(document.name, "notes");

    let report = controller
        .translate(&document.id, &FixedChoice(RecoveryChoice::Cancel))
        .await
        .unwrap();
    assert!(matches!(report, TranslationReport::Submitted { submitted: 2, .. }));

    let views = controller.show_document(&document.id).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].item.content.as_deref(), Some("[TRANSLATED] Good morning."));
    assert_eq!(views[1].item.content.as_deref(), Some("[TRANSLATED] See you\ntomorrow."));
    assert!(views.iter().all(|view| view.flags.completed && !view.flags.queued));

    let statuses = controller.list_documents().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].summary.item_count, 2);
    assert_eq!(statuses[0].completed, 2);
    assert_eq!(statuses[0].in_flight, 0);
}

#[tokio::test]
async fn test_translate_inNewDocumentMode_shouldLeaveSourceUntouched() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = write_source(&temp_dir, "Hello\n\nWorld\n");
    let mut config = Config::default();
    config.apply_mode = ApplyMode::NewDocument;
    config.target_language = "de".to_string();
    let provider = MockBatchProvider::working();
    let (controller, store) = controller(config, &provider);

    let document = controller.import_file(&path, Some("Greeting".to_string())).await.unwrap();
    let report = controller
        .translate(&document.id, &FixedChoice(RecoveryChoice::Cancel))
        .await
        .unwrap();

    let TranslationReport::Submitted { report, .. } = report else {
        panic!("expected a submission");
    };
    let sibling_id = report.new_document_id.expect("a translated document should be created");

    let sibling = store.get_document(&sibling_id).await.unwrap().unwrap();
    assert_eq!(sibling.name, "Greeting (de)");

    let translated = store.list_items(&sibling_id).await.unwrap();
    let texts: Vec<_> = translated.iter().filter_map(|item| item.content.clone()).collect();
    assert_eq!(texts, vec!["[TRANSLATED] Hello", "[TRANSLATED] World"]);

    let source = store.list_items(&document.id).await.unwrap();
    assert_eq!(source[0].content.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn test_translate_twice_shouldReportNothingToTranslate() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = write_source(&temp_dir, "Only paragraph\n");
    let provider = MockBatchProvider::working();
    let (controller, _store) = controller(Config::default(), &provider);

    let document = controller.import_file(&path, None).await.unwrap();
    controller
        .translate(&document.id, &FixedChoice(RecoveryChoice::Cancel))
        .await
        .unwrap();

    let err = controller
        .translate(&document.id, &FixedChoice(RecoveryChoice::Cancel))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Nothing to translate"));
}

#[tokio::test]
async fn test_failedPoll_thenAbandon_shouldClearFlags() {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir().unwrap();
    let path = write_source(&temp_dir, "First\n\nSecond\n");
    let provider = MockBatchProvider::working()
        .failing_at(MockStage::Poll, MockFailure::Connection("offline".to_string()));
    let (controller, _store) = controller(Config::default(), &provider);

    let document = controller.import_file(&path, None).await.unwrap();
    let err = controller
        .translate(&document.id, &FixedChoice(RecoveryChoice::Cancel))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("offline"));

    let statuses = controller.list_documents().await.unwrap();
    assert_eq!(statuses[0].in_flight, 2);

    let outcomes = controller.resume(&document.id).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], batchwai::session::ResumeOutcome::Failed { .. }));

    let cleared = controller.abandon(&document.id).await.unwrap();
    assert_eq!(cleared, 2);

    let views = controller.show_document(&document.id).await.unwrap();
    assert!(views.iter().all(|view| view.flags == Default::default()));
}

#[tokio::test]
async fn test_showDocument_withUnknownId_shouldFail() {
    let provider = MockBatchProvider::working();
    let (controller, _store) = controller(Config::default(), &provider);

    let err = controller.show_document("no-such-document").await.unwrap_err();
    assert!(err.to_string().contains("Document not found"));
}
