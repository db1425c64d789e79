//! Promotional events and the cached leaderboard, end to end.

mod common;

use chrono::{Duration, Utc};
use mallpoints::economy::{MallEvent, StoreCategory};
use mallpoints::engine::LeaderboardMetric;

use common::{register_member, test_engine};

#[test]
fn event_window_multiplies_receipts_inside_it_only() {
    let (_dir, engine) = test_engine();
    let user = register_member(&engine, "alice");
    let now = Utc::now();

    engine
        .schedule_event(MallEvent::new(
            "anniversary",
            "Anniversary Weekend",
            1.5,
            now + Duration::days(1),
            now + Duration::days(3),
        ))
        .expect("schedule");

    let before = engine
        .process_receipt(&user, "Cafe Nine", StoreCategory::Dining, 1000, now)
        .expect("receipt");
    assert_eq!(before.breakdown.event_mult, 1.0);

    let during = engine
        .process_receipt(&user, "Cafe Nine", StoreCategory::Dining, 1000, now + Duration::days(2))
        .expect("receipt");
    assert_eq!(during.breakdown.event_mult, 1.5);

    let after = engine
        .process_receipt(&user, "Cafe Nine", StoreCategory::Dining, 1000, now + Duration::days(4))
        .expect("receipt");
    assert_eq!(after.breakdown.event_mult, 1.0);
}

#[test]
fn overlapping_events_do_not_stack() {
    let (_dir, engine) = test_engine();
    let now = Utc::now();
    for (id, mult) in [("a", 1.3), ("b", 2.0), ("c", 1.6)] {
        engine
            .schedule_event(MallEvent::new(
                id,
                id,
                mult,
                now - Duration::hours(1),
                now + Duration::hours(1),
            ))
            .expect("schedule");
    }
    assert_eq!(engine.active_event_multiplier(now).expect("multiplier"), 2.0);
}

#[test]
fn leaderboard_orders_members_and_tracks_writes() {
    let (_dir, engine) = test_engine();
    let alice = register_member(&engine, "alice");
    let bob = register_member(&engine, "bob");
    register_member(&engine, "carol");
    let now = Utc::now();

    engine
        .process_receipt(&alice, "Gadget Grove", StoreCategory::Electronics, 3000, now)
        .expect("receipt");
    engine
        .process_receipt(&bob, "Cafe Nine", StoreCategory::Dining, 500, now)
        .expect("receipt");

    let rows = engine
        .leaderboard(LeaderboardMetric::Coins, now)
        .expect("leaderboard");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].username, "alice");
    assert_eq!(rows[1].username, "bob");
    assert_eq!(rows[2].username, "carol");
    assert_eq!(rows[0].rank, 1);
    assert!(rows[0].score > rows[1].score);

    // A new receipt invalidates the cached ranking.
    engine
        .process_receipt(&bob, "Gadget Grove", StoreCategory::Electronics, 9000, now)
        .expect("receipt");
    let rows = engine
        .leaderboard(LeaderboardMetric::Coins, now)
        .expect("leaderboard");
    assert_eq!(rows[0].username, "bob");
}

#[test]
fn repeated_leaderboard_reads_hit_the_cache() {
    let (_dir, engine) = test_engine();
    let user = register_member(&engine, "alice");
    let now = Utc::now();
    engine
        .process_receipt(&user, "Cafe Nine", StoreCategory::Dining, 500, now)
        .expect("receipt");

    engine
        .leaderboard(LeaderboardMetric::Xp, now)
        .expect("first read");
    let misses_after_first = engine.cache().stats().misses;
    engine
        .leaderboard(LeaderboardMetric::Xp, now)
        .expect("second read");

    let stats = engine.cache().stats();
    assert_eq!(stats.misses, misses_after_first);
    assert!(stats.memory_hits >= 1);
}
