//! Batch runner behaviour against an in-memory mailbox.

#![allow(clippy::unwrap_used)]

mod common;

use common::{ListFailure, MockMailbox, message};
use chrono::Utc;
use inbox_sanitizer_core::triage::evaluate;
use inbox_sanitizer_core::{Action, BatchRunner, RuleConfig, TriageEngine};

fn rules() -> RuleConfig {
    RuleConfig {
        whitelist: vec!["@safe.com".into()],
        blacklist: vec!["@spam.com".into()],
        ..RuleConfig::default()
    }
}

fn mixed_mailbox() -> MockMailbox {
    MockMailbox::with_messages(vec![
        message("m1", "ads@spam.com", "Huge discounts"),
        message("m2", "newsletter@safe.com", "Weekly newsletter"),
        message("m3", "bot@shop.com", "Your weekly digest is here"),
        message("m4", "friend@example.com", "lunch?"),
    ])
}

fn runner(mailbox: &MockMailbox, config: RuleConfig) -> BatchRunner<MockMailbox> {
    BatchRunner::new(mailbox.clone(), TriageEngine::new(config))
}

#[tokio::test]
async fn test_archives_matching_messages() {
    let mailbox = mixed_mailbox();
    let mut runner = runner(&mailbox, rules());

    let result = runner.run_once(100, false).await.unwrap();

    assert_eq!(result.processed, 4);
    assert_eq!(result.removed, 2);
    assert_eq!(result.kept, 2);
    assert!(!result.dry_run);
    assert_eq!(
        mailbox.dispositions(),
        vec![
            ("m1".to_string(), Action::Archive),
            ("m3".to_string(), Action::Archive)
        ]
    );
    assert_eq!(mailbox.inbox(), vec!["m2", "m4"]);
}

#[tokio::test]
async fn test_dry_run_matches_real_run_without_dispositions() {
    let dry_box = mixed_mailbox();
    let real_box = mixed_mailbox();

    let dry = runner(&dry_box, rules()).run_once(100, true).await.unwrap();
    let real = runner(&real_box, rules()).run_once(100, false).await.unwrap();

    assert!(dry.dry_run);
    assert_eq!(dry.processed, real.processed);
    assert_eq!(dry.removed, real.removed);
    assert_eq!(dry.kept, real.kept);
    assert!(dry_box.dispositions().is_empty());
    assert_eq!(dry_box.inbox().len(), 4);

    // Same decision and reason text per message in both modes.
    assert_eq!(dry.decisions, real.decisions);
    let now = Utc::now().fixed_offset();
    let config = rules();
    for (summary, (id, decision)) in dry_box.messages().iter().zip(&dry.decisions) {
        assert_eq!(&summary.id, id);
        assert_eq!(decision, &evaluate(&config, summary, now));
    }
    let reasons: Vec<String> = real
        .decisions
        .iter()
        .map(|(_, d)| d.reason().to_string())
        .collect();
    let dry_reasons: Vec<String> = dry
        .decisions
        .iter()
        .map(|(_, d)| d.reason().to_string())
        .collect();
    assert_eq!(reasons, dry_reasons);
}

#[tokio::test]
async fn test_respects_max_and_scope() {
    let messages = (0..10)
        .map(|i| message(&format!("m{i}"), "x@spam.com", "offer"))
        .collect();
    let mailbox = MockMailbox::with_messages(messages);
    let mut runner = runner(&mailbox, rules()).with_scope("in:inbox -is:starred");

    let result = runner.run_once(3, false).await.unwrap();

    assert_eq!(result.processed, 3);
    assert_eq!(result.processed, result.removed + result.kept);
    assert_eq!(
        mailbox.list_requests(),
        vec![("in:inbox -is:starred".to_string(), 3)]
    );
    assert_eq!(runner.scope(), "in:inbox -is:starred");
}

#[tokio::test]
async fn test_fetch_failures_are_skipped() {
    let mailbox = mixed_mailbox();
    mailbox.vanish("m1");
    mailbox.break_fetch("m3");
    let mut runner = runner(&mailbox, rules());

    let result = runner.run_once(100, false).await.unwrap();

    assert_eq!(result.skipped, 2);
    assert_eq!(result.processed, 2);
    assert_eq!(result.removed, 0);
    assert_eq!(result.kept, 2);
    assert!(mailbox.dispositions().is_empty());
}

#[tokio::test]
async fn test_failed_disposition_counts_as_kept_and_continues() {
    let mailbox = mixed_mailbox();
    mailbox.break_disposition("m1");
    let mut runner = runner(&mailbox, rules());

    let result = runner.run_once(100, false).await.unwrap();

    assert_eq!(result.processed, 4);
    assert_eq!(result.removed, 1);
    assert_eq!(result.kept, 3);
    assert_eq!(result.failed, 1);
    assert_eq!(
        mailbox.dispositions(),
        vec![("m3".to_string(), Action::Archive)]
    );
}

#[tokio::test]
async fn test_listing_failure_is_an_empty_batch() {
    let mailbox = mixed_mailbox();
    mailbox.fail_next_list(ListFailure::Unavailable);
    let mut runner = runner(&mailbox, rules());

    let result = runner.run_once(100, false).await.unwrap();

    assert_eq!(result.processed, 0);
    assert_eq!(mailbox.inbox().len(), 4);
}

#[tokio::test]
async fn test_rejected_credential_fails_the_batch() {
    let mailbox = mixed_mailbox();
    mailbox.fail_next_list(ListFailure::Unauthorized);
    let mut runner = runner(&mailbox, rules());

    let err = runner.run_once(100, false).await.unwrap_err();

    assert!(err.is_credential());
    assert!(mailbox.dispositions().is_empty());
}

#[tokio::test]
async fn test_second_run_finds_nothing_left_to_remove() {
    let mailbox = mixed_mailbox();
    let mut runner = runner(&mailbox, rules());

    runner.run_once(100, false).await.unwrap();
    let second = runner.run_once(100, false).await.unwrap();

    assert_eq!(second.processed, 2);
    assert_eq!(second.removed, 0);
    assert_eq!(mailbox.dispositions().len(), 2);
}

#[tokio::test]
async fn test_delete_action() {
    let config = RuleConfig {
        action: Action::Delete,
        ..rules()
    };
    let mailbox = mixed_mailbox();
    let mut runner = runner(&mailbox, config);

    let result = runner.run_once(100, false).await.unwrap();

    assert_eq!(result.removed, 2);
    assert!(
        mailbox
            .dispositions()
            .iter()
            .all(|(_, action)| *action == Action::Delete)
    );
}

#[tokio::test]
async fn test_engine_counts_every_processed_message() {
    let mailbox = mixed_mailbox();
    mailbox.vanish("m4");
    let mut runner = runner(&mailbox, rules());

    let result = runner.run_once(100, true).await.unwrap();
    let stats = runner.engine().stats();

    assert_eq!(stats.checked, result.processed);
    assert_eq!(stats.removed, result.removed);
    assert_eq!(stats.kept, result.kept);

    runner.engine_mut().reset_stats();
    assert_eq!(runner.engine().stats().checked, 0);
}

#[tokio::test]
async fn test_empty_mailbox() {
    let mailbox = MockMailbox::default();
    let mut runner = runner(&mailbox, RuleConfig::default());

    let result = runner.run_once(100, false).await.unwrap();

    assert_eq!(result.processed, 0);
    assert_eq!(result.removed, 0);
    assert_eq!(result.kept, 0);
}
