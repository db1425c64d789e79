//! Companion care through the engine, including passive XP and upkeep.

mod common;

use chrono::{Duration, Utc};
use mallpoints::economy::{CompanionSpecies, CompanionStat, EconomyError, StoreCategory};

use common::{register_member, test_engine};

#[test]
fn adopted_companion_levels_from_receipts() {
    let (_dir, engine) = test_engine();
    let user = register_member(&engine, "alice");
    engine
        .adopt_companion(&user, "Sparky", CompanionSpecies::Dragon)
        .expect("adopt");

    let now = Utc::now();
    for i in 0..12 {
        engine
            .process_receipt(&user, &format!("Store {}", i), StoreCategory::Electronics, 5000, now)
            .expect("receipt");
    }

    let profile = engine.profile(&user).expect("profile");
    let pet = profile.companion.as_ref().expect("companion");
    assert!(pet.xp > 0);
    assert!(pet.level >= 2, "pet should level from sustained activity");
}

#[test]
fn feeding_and_training_spend_coins() {
    let (_dir, engine) = test_engine();
    let user = register_member(&engine, "alice");
    engine
        .adopt_companion(&user, "Pixel", CompanionSpecies::Kitten)
        .expect("adopt");
    engine
        .process_receipt(&user, "Cafe Nine", StoreCategory::Dining, 2000, Utc::now())
        .expect("receipt");

    let coins_before = engine.profile(&user).expect("profile").coins;
    engine.feed_companion(&user).expect("feed");
    engine
        .train_companion(&user, CompanionStat::Speed)
        .expect("train");

    let profile = engine.profile(&user).expect("profile");
    assert!(profile.coins < coins_before);
    let pet = profile.companion.as_ref().expect("companion");
    assert_eq!(pet.speed, 2);
}

#[test]
fn care_without_a_companion_fails() {
    let (_dir, engine) = test_engine();
    let user = register_member(&engine, "alice");
    engine
        .process_receipt(&user, "Cafe Nine", StoreCategory::Dining, 2000, Utc::now())
        .expect("receipt");

    assert!(matches!(
        engine.feed_companion(&user),
        Err(EconomyError::NoCompanion)
    ));
    assert!(matches!(
        engine.companion_status(&user),
        Err(EconomyError::NoCompanion)
    ));
}

#[test]
fn neglect_builds_hunger_through_the_sweep() {
    let (_dir, engine) = test_engine();
    let user = register_member(&engine, "alice");
    engine
        .adopt_companion(&user, "Mopey", CompanionSpecies::Pup)
        .expect("adopt");

    let hunger_at_adoption = engine
        .profile(&user)
        .expect("profile")
        .companion
        .as_ref()
        .expect("companion")
        .hunger;

    let later = Utc::now() + Duration::days(4);
    let report = engine.run_maintenance(later).expect("sweep");
    assert_eq!(report.companion_decay_days, 4);

    let profile = engine.profile(&user).expect("profile");
    let pet = profile.companion.as_ref().expect("companion");
    assert!(pet.hunger > hunger_at_adoption);
    assert!(pet.needs_feeding());

    let status = engine.companion_status(&user).expect("status");
    assert!(status.contains("Needs feeding!"));
}
