//! The economy core: accounts, receipts, rewards, missions, companions,
//! achievements, and their sled-backed store.

pub mod achievements;
pub mod companion;
pub mod errors;
pub mod missions;
pub mod rewards;
pub mod state;
pub mod storage;
pub mod types;

pub use errors::EconomyError;
pub use missions::{receipt_progress, MissionGenerator, MissionTemplate};
pub use rewards::{streak_multiplier, RewardCalculator, RewardProfile};
pub use storage::{MallStore, MallStoreBuilder};
pub use types::{
    level_for_xp, AchievementRecord, AchievementTrigger, CompanionRecord, CompanionSpecies,
    CompanionStat, EarnedAchievement, MallEvent, MissionRecord, MissionState, ObjectiveKind,
    ReceiptRecord, RewardBreakdown, Role, StoreCategory, StreakOutcome, TimeOfDay, UserRecord,
    VipTier,
};
