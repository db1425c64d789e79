//! Reward multiplier calculator.
//!
//! Coins for a purchase are `base * category * vip * time-of-day * streak *
//! event`, every factor looked up from a fixed table, with the product
//! truncated to whole coins. The full per-factor breakdown is returned so it
//! can be persisted on the receipt.

use crate::economy::errors::EconomyError;
use crate::economy::types::{RewardBreakdown, StoreCategory, TimeOfDay, VipTier};

/// Streak brackets and their multipliers. Strictly increasing by bracket.
const STREAK_BRACKETS: [(u32, f64); 5] = [
    (30, 1.6),
    (14, 1.4),
    (7, 1.25),
    (3, 1.1),
    (0, 1.0),
];

/// Multiplier for a login streak of `days`.
pub fn streak_multiplier(days: u32) -> f64 {
    for (min_days, mult) in STREAK_BRACKETS {
        if days >= min_days {
            return mult;
        }
    }
    1.0
}

/// Which streak bracket `days` falls in (0 = no bonus).
pub fn streak_bracket(days: u32) -> usize {
    let len = STREAK_BRACKETS.len();
    for (idx, (min_days, _)) in STREAK_BRACKETS.iter().enumerate() {
        if days >= *min_days {
            return len - 1 - idx;
        }
    }
    0
}

/// The slice of a member's account the calculator needs.
#[derive(Debug, Clone, Copy)]
pub struct RewardProfile {
    pub vip_tier: VipTier,
    pub login_streak: u32,
}

/// Stateless reward calculator. Divisors come from `[economy]` config.
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    /// Currency units per base coin (default 10: a 500 purchase is 50 coins).
    pub coin_divisor: u64,
    /// Coins per XP point (default 2).
    pub xp_divisor: u64,
}

impl Default for RewardCalculator {
    fn default() -> Self {
        Self {
            coin_divisor: 10,
            xp_divisor: 2,
        }
    }
}

impl RewardCalculator {
    pub fn new(coin_divisor: u64, xp_divisor: u64) -> Self {
        Self {
            coin_divisor: coin_divisor.max(1),
            xp_divisor: xp_divisor.max(1),
        }
    }

    /// Calculate the reward for a purchase. `time_of_day` and
    /// `event_multiplier` are passed in so results are deterministic.
    pub fn calculate(
        &self,
        amount: u64,
        category: StoreCategory,
        profile: &RewardProfile,
        time_of_day: TimeOfDay,
        event_multiplier: f64,
    ) -> Result<RewardBreakdown, EconomyError> {
        if amount == 0 {
            return Err(EconomyError::InvalidAmount(
                "receipt amount must be positive".to_string(),
            ));
        }
        let event_mult = if event_multiplier < 1.0 { 1.0 } else { event_multiplier };

        let base_coins = amount / self.coin_divisor;
        let category_mult = category.multiplier();
        let vip_mult = profile.vip_tier.multiplier();
        let time_mult = time_of_day.multiplier();
        let streak_mult = streak_multiplier(profile.login_streak);

        let total = base_coins as f64
            * category_mult
            * vip_mult
            * time_mult
            * streak_mult
            * event_mult;
        let total_coins = total.trunc() as u64;
        let total_xp = (total_coins / self.xp_divisor).max(1);

        Ok(RewardBreakdown {
            base_coins,
            category_mult,
            vip_mult,
            time_mult,
            streak_mult,
            event_mult,
            total_coins,
            total_xp,
        })
    }
}
