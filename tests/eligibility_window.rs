// tests/eligibility_window.rs
mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use frontpage_watch::extract::Eligibility;
use frontpage_watch::Ledger;

#[test]
fn boundaries_are_half_open() {
    let now = fixed_now();
    let x = extractor();
    let ledger = Ledger::new();
    let seen = HashSet::new();

    let cases = [(29.9, false), (30.0, true), (34.9, true), (35.0, false)];
    for (age, eligible) in cases {
        let it = item("p", "DD", age, 10, now);
        let got = x.check(&it, now, &ledger, &seen);
        assert_eq!(
            matches!(got, Eligibility::Eligible { .. }),
            eligible,
            "age {age} → {got:?}"
        );
    }
}

#[test]
fn flair_must_match_exactly() {
    let now = fixed_now();
    let x = extractor();
    let ledger = Ledger::new();
    let seen = HashSet::new();

    for flair in ["dd", "DD ", "Discussion"] {
        let it = item("p", flair, 31.0, 10, now);
        assert_eq!(x.check(&it, now, &ledger, &seen), Eligibility::WrongFlair);
    }
    let mut untagged = item("p", "DD", 31.0, 10, now);
    untagged.flair = None;
    assert_eq!(x.check(&untagged, now, &ledger, &seen), Eligibility::WrongFlair);
}

#[tokio::test]
async fn only_window_items_reach_the_ledger() {
    let now = fixed_now();
    let batch = vec![
        item("early", "DD", 29.9, 10, now),
        item("lo", "DD", 30.0, 10, now),
        item("hi", "DD", 34.9, 10, now),
        item("late", "DD", 35.0, 10, now),
    ];
    let feed = Arc::new(MockFeed::new(batch, vec![]));
    let notifier = Arc::new(RecordingNotifier::default());
    let mut orch = orchestrator(feed, notifier, classifier(0.1));

    let report = orch.run_cycle_at(now).await.unwrap();

    assert_eq!(report.ingested, 2);
    assert_eq!(report.skipped_window, 2);
    let ledger = orch.session().ledger();
    assert!(ledger.contains(&url("lo")));
    assert!(ledger.contains(&url("hi")));
    assert!(!ledger.contains(&url("early")));
    assert!(!ledger.contains(&url("late")));
}

#[tokio::test]
async fn deleted_author_leaves_karma_empty() {
    let now = fixed_now();
    let mut gone = item("g", "DD", 31.0, 10, now);
    gone.author = Some("gone_user".into());
    let mut deleted = item("d", "DD", 31.0, 10, now);
    deleted.author = None;
    let feed = Arc::new(MockFeed::new(vec![gone, deleted], vec![]));
    let notifier = Arc::new(RecordingNotifier::default());
    let mut orch = orchestrator(feed, notifier, classifier(0.1));

    orch.run_cycle_at(now).await.unwrap();

    for id in ["g", "d"] {
        let r = orch.session().ledger().get(&url(id)).unwrap();
        assert_eq!(r.author_link_karma, None);
        assert_eq!(r.author_comment_karma, None);
    }
}
