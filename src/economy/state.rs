//! Seed data for freshly-initialized stores: the achievement catalog and the
//! mission template roster.

use chrono::Duration;

use crate::economy::missions::MissionTemplate;
use crate::economy::types::{AchievementRecord, AchievementTrigger, ObjectiveKind, StoreCategory};

/// Achievement ids seeded into every new store.
pub const DEFAULT_ACHIEVEMENT_IDS: &[&str] = &[
    "first_receipt",
    "big_spender",
    "regular",
    "week_streak",
    "month_streak",
    "mission_runner",
    "best_friend",
];

pub fn default_achievement_catalog() -> Vec<AchievementRecord> {
    vec![
        AchievementRecord::new(
            "first_receipt",
            "First Steps",
            "Submit your first receipt",
            AchievementTrigger::FirstReceipt,
            25,
            10,
        ),
        AchievementRecord::new(
            "big_spender",
            "Big Spender",
            "Reach 10,000 in lifetime spend",
            AchievementTrigger::LifetimeSpend(10_000),
            500,
            250,
        ),
        AchievementRecord::new(
            "regular",
            "Mall Regular",
            "Reach 1,000 in lifetime spend",
            AchievementTrigger::LifetimeSpend(1_000),
            100,
            50,
        ),
        AchievementRecord::new(
            "week_streak",
            "Seven in a Row",
            "Log in seven days in a row",
            AchievementTrigger::StreakDays(7),
            75,
            40,
        ),
        AchievementRecord::new(
            "month_streak",
            "Dedicated",
            "Log in thirty days in a row",
            AchievementTrigger::StreakDays(30),
            400,
            200,
        ),
        AchievementRecord::new(
            "mission_runner",
            "Mission Runner",
            "Complete ten missions",
            AchievementTrigger::MissionsCompleted(10),
            150,
            100,
        ),
        AchievementRecord::new(
            "best_friend",
            "Best Friend",
            "Raise a companion to level 5",
            AchievementTrigger::CompanionLevel(5),
            200,
            120,
        ),
    ]
}

/// The built-in mission template roster. Weights are relative; the generator
/// boosts templates matching the member's recent purchase categories and
/// drops templates above the member's level.
pub fn default_mission_templates() -> Vec<MissionTemplate> {
    vec![
        MissionTemplate {
            id: "spend_any".into(),
            text: "Spend {target} at any store".into(),
            kind: ObjectiveKind::SpendAmount { category: None },
            target_range: (100, 500),
            reward_range: (30, 120),
            weight: 30,
            min_level: 1,
            validity: Duration::days(7),
        },
        MissionTemplate {
            id: "spend_fashion".into(),
            text: "Spend {target} at fashion stores".into(),
            kind: ObjectiveKind::SpendAmount {
                category: Some(StoreCategory::Fashion),
            },
            target_range: (150, 600),
            reward_range: (50, 180),
            weight: 15,
            min_level: 2,
            validity: Duration::days(7),
        },
        MissionTemplate {
            id: "spend_dining".into(),
            text: "Spend {target} at restaurants and cafes".into(),
            kind: ObjectiveKind::SpendAmount {
                category: Some(StoreCategory::Dining),
            },
            target_range: (50, 250),
            reward_range: (25, 90),
            weight: 15,
            min_level: 1,
            validity: Duration::days(5),
        },
        MissionTemplate {
            id: "spend_electronics".into(),
            text: "Spend {target} at electronics stores".into(),
            kind: ObjectiveKind::SpendAmount {
                category: Some(StoreCategory::Electronics),
            },
            target_range: (300, 1500),
            reward_range: (100, 400),
            weight: 8,
            min_level: 5,
            validity: Duration::days(10),
        },
        MissionTemplate {
            id: "submit_receipts".into(),
            text: "Submit {target} receipts this week".into(),
            kind: ObjectiveKind::SubmitReceipts,
            target_range: (3, 8),
            reward_range: (40, 150),
            weight: 20,
            min_level: 1,
            validity: Duration::days(7),
        },
        MissionTemplate {
            id: "visit_stores".into(),
            text: "Shop at {target} different stores".into(),
            kind: ObjectiveKind::VisitStores,
            target_range: (2, 6),
            reward_range: (35, 130),
            weight: 12,
            min_level: 3,
            validity: Duration::days(7),
        },
    ]
}
