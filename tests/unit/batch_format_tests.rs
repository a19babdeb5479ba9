/*!
 * Tests for request file construction and result parsing
 */

use batchwai::app_config::BatchConfig;
use batchwai::errors::BatchError;
use batchwai::translation::request::{custom_id, parse_custom_id, BatchRequestLine};
use batchwai::translation::results::{error_line, parse_result_stream, reassemble, success_line};
use batchwai::translation::RequestTemplate;

use crate::common;

#[test]
fn test_encode_shouldWriteOneTaggedLinePerItem() {
    let template = common::plain_template();
    let items = vec!["Hello".to_string(), "World".to_string(), "Again".to_string()];

    let payload = template.encode(&items).unwrap();
    let lines: Vec<BatchRequestLine> = payload
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    for (index, line) in lines.iter().enumerate() {
        assert_eq!(line.custom_id, format!("request-{}", index));
        assert_eq!(line.method, "POST");
        assert_eq!(line.url, "/v1/chat/completions");
        assert_eq!(line.body.model, "test-model");
        assert_eq!(line.user_text().as_deref(), Some(items[index].as_str()));
    }
}

#[test]
fn test_buildLine_fromConfig_shouldRenderPromptsForTargetLanguage() {
    let template = RequestTemplate::from_config(&BatchConfig::default(), "Spanish");
    let line = template.build_line(4, "Good morning");

    assert_eq!(line.custom_id, "request-4");
    assert_eq!(line.body.messages.len(), 2);
    assert_eq!(line.body.messages[0].role, "system");
    assert!(line.body.messages[0].content.contains("Spanish"));
    assert_eq!(
        line.user_text().unwrap(),
        "Translate the following text to Spanish.\n\nGood morning"
    );
}

#[test]
fn test_customId_shouldParseBackOnlyWellFormedTags() {
    assert_eq!(parse_custom_id(&custom_id(12)), Some(12));
    assert_eq!(parse_custom_id("request-"), None);
    assert_eq!(parse_custom_id("request-abc"), None);
    assert_eq!(parse_custom_id("item-3"), None);
}

#[test]
fn test_parseResultStream_withShuffledLines_shouldKeyByTag() {
    let content = common::result_file(&[(2, "trois"), (0, "un"), (1, "deux")]);

    let results = parse_result_stream(&content).unwrap();

    assert_eq!(reassemble(&results, 3), vec!["un", "deux", "trois"]);
}

#[test]
fn test_parseResultStream_shouldSkipErrorsUnknownTagsAndDuplicates() {
    let content = [
        success_line("request-0", "first"),
        error_line("request-1", "content filtered"),
        success_line("custom-9", "stray"),
        success_line("request-0", "second copy"),
        String::new(),
        success_line("request-3", "beyond"),
    ]
    .join("\n");

    let results = parse_result_stream(&content).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results.get(&0).map(String::as_str), Some("first"));
    assert!(!results.contains_key(&1));
    assert_eq!(results.get(&3).map(String::as_str), Some("beyond"));
}

#[test]
fn test_parseResultStream_withInvalidJson_shouldReportLineNumber() {
    let content = format!("{}\nnot json at all", success_line("request-0", "ok"));

    match parse_result_stream(&content) {
        Err(BatchError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_reassemble_shouldFillMissingAndDropOutOfRange() {
    let content = common::result_file(&[(1, "middle"), (7, "out of range")]);
    let results = parse_result_stream(&content).unwrap();

    assert_eq!(reassemble(&results, 3), vec!["", "middle", ""]);
    assert!(reassemble(&results, 0).is_empty());
}
