/*!
 * Tests for the active job registry
 */

use batchwai::session::ActiveJobRegistry;

#[test]
fn test_enqueue_shouldRejectDuplicatesAndKeepOrder() {
    let registry = ActiveJobRegistry::new();

    assert!(registry.enqueue("batch_a"));
    assert!(registry.enqueue("batch_b"));
    assert!(!registry.enqueue("batch_a"));

    assert_eq!(registry.list_active(), vec!["batch_a", "batch_b"]);
}

#[test]
fn test_dequeue_withUnknownId_shouldBeIgnored() {
    let registry = ActiveJobRegistry::new();
    registry.enqueue("batch_a");

    registry.dequeue("batch_missing");
    registry.dequeue("batch_a");
    registry.dequeue("batch_a");

    assert!(registry.list_active().is_empty());
}

#[test]
fn test_clones_shouldShareActiveJobs() {
    let registry = ActiveJobRegistry::new();
    let other = registry.clone();

    registry.enqueue("batch_a");

    assert!(other.contains("batch_a"));
    assert!(!other.enqueue("batch_a"));
}

#[test]
fn test_guard_shouldHoldJobUntilDropped() {
    let registry = ActiveJobRegistry::new();

    let guard = registry.guard("batch_a").expect("first guard should be granted");
    assert_eq!(guard.job_id(), "batch_a");
    assert!(registry.guard("batch_a").is_none());

    drop(guard);
    assert!(!registry.contains("batch_a"));
    assert!(registry.guard("batch_a").is_some());
}

#[test]
fn test_concurrentEnqueue_shouldGrantExactlyOneWinner() {
    let registry = ActiveJobRegistry::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || registry.enqueue("batch_shared"))
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(registry.list_active(), vec!["batch_shared"]);
}
