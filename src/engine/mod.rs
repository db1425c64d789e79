//! The engine ties the economy core, auth, and cache together behind one
//! facade. Every externally visible operation (receipt submission, mission
//! assignment and claiming, companion care, rankings) goes through here so
//! ordering rules hold in one place: the receipt is durably stored before any
//! coins move, and score changes invalidate the cached rankings.

pub mod events;
pub mod leaderboard;
pub mod maintenance;

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthManager, AuthError, LoginOutcome, LoginRateLimiter, TokenIdentity, TokenService};
use crate::cache::TieredCache;
use crate::config::Config;
use crate::economy::{
    achievements, companion, receipt_progress, CompanionSpecies, CompanionStat, EconomyError,
    MallEvent, MallStore, MallStoreBuilder, MissionRecord, ReceiptRecord, RewardCalculator,
    RewardProfile, Role, TimeOfDay, UserRecord, VipTier,
};
use crate::logutil::{escape_log, store_preview};
use crate::validation::sanitize_store_name;

pub use leaderboard::{LeaderboardEntry, LeaderboardMetric};
pub use maintenance::MaintenanceReport;

const LEADERBOARD_LIMIT: usize = 10;

/// Everything a client needs to show after a processed receipt.
#[derive(Debug, Clone)]
pub struct ReceiptSummary {
    pub receipt_id: Uuid,
    pub breakdown: crate::economy::RewardBreakdown,
    pub levels_gained: u32,
    pub new_level: u32,
    pub vip_tier: VipTier,
    /// Descriptions of missions that became claimable from this receipt.
    pub missions_ready: Vec<String>,
    /// Names of achievements earned from this receipt.
    pub achievements: Vec<String>,
}

/// Result of claiming a ready mission.
#[derive(Debug, Clone)]
pub struct MissionClaim {
    pub reward_coins: u64,
    pub reward_xp: u64,
    pub levels_gained: u32,
    pub achievements: Vec<String>,
}

/// Central service facade.
pub struct GamificationEngine {
    config: Config,
    store: Arc<MallStore>,
    auth: AuthManager,
    cache: TieredCache,
    calculator: RewardCalculator,
    generator: crate::economy::MissionGenerator,
}

impl GamificationEngine {
    /// Open the store at the configured data directory and wire everything
    /// up from config.
    pub fn open(config: Config) -> Result<Self, EconomyError> {
        let store = Arc::new(MallStoreBuilder::new(&config.storage.data_dir).open()?);
        Ok(Self::from_parts(config, store))
    }

    /// Build the engine around an already open store. Used by tests and the
    /// CLI, which sometimes opens the store first for inspection.
    pub fn from_parts(config: Config, store: Arc<MallStore>) -> Self {
        let tokens = TokenService::new(
            config.security.jwt_secret.as_bytes(),
            config.security.token_ttl_minutes,
        );
        let limiter = LoginRateLimiter::new(
            config.security.max_login_attempts,
            config.security.login_window_secs,
            config.security.lockout_secs,
        );
        let auth = AuthManager::new(tokens, limiter);

        #[allow(unused_mut)]
        let mut cache = TieredCache::new(
            store.clone(),
            config.cache.memory_capacity,
            config.cache.ttl_secs,
        );
        #[cfg(feature = "redis-cache")]
        if let Some(url) = &config.cache.redis_url {
            match crate::cache::redis_tier::RedisTier::connect(url) {
                Ok(tier) => {
                    info!("redis cache tier attached");
                    cache = cache.with_redis(tier);
                }
                // The sled fallback covers for an unreachable Redis.
                Err(e) => warn!("redis unavailable, continuing without it: {}", e),
            }
        }

        let calculator = RewardCalculator::new(
            config.economy.coin_divisor,
            config.economy.xp_divisor,
        );

        Self {
            config,
            store,
            auth,
            cache,
            calculator,
            generator: crate::economy::MissionGenerator::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<MallStore> {
        &self.store
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    // --- accounts ---

    pub fn register(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        self.auth.register(&self.store, username, display_name, password)
    }

    pub fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        self.auth.login(&self.store, username, password, now)
    }

    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.auth.logout(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        self.auth.validate_token(token)
    }

    pub fn profile(&self, username: &str) -> Result<UserRecord, EconomyError> {
        self.store.get_user(username)
    }

    // --- receipts ---

    /// The time-of-day bucket for `now` in the mall's local time.
    fn local_time_of_day(&self, now: DateTime<Utc>) -> TimeOfDay {
        let local = now + chrono::Duration::hours(self.config.mall.timezone_offset_hours as i64);
        TimeOfDay::from_hour(local.hour())
    }

    /// Process a purchase receipt: calculate the reward, persist the receipt,
    /// then credit the account. The receipt is written first; a crash between
    /// the two writes leaves an uncredited receipt rather than unbacked coins.
    pub fn process_receipt(
        &self,
        username: &str,
        store_name: &str,
        category: crate::economy::StoreCategory,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<ReceiptSummary, EconomyError> {
        let store_name = sanitize_store_name(store_name);
        let mut user = self.store.get_user(username)?;

        let time_of_day = self.local_time_of_day(now);
        let event_mult = events::active_multiplier(&self.store, now)?;
        let profile = RewardProfile {
            vip_tier: user.vip_tier,
            login_streak: user.login_streak,
        };
        let breakdown = self
            .calculator
            .calculate(amount, category, &profile, time_of_day, event_mult)?;

        let is_new_store = !self
            .store
            .list_receipts(username)?
            .iter()
            .any(|r| r.store.eq_ignore_ascii_case(&store_name));

        let receipt = ReceiptRecord::new(username, &store_name, category, amount, breakdown.clone());
        let receipt_id = receipt.id;
        self.store.put_receipt(receipt)?;

        // The receipt is durable; now the grant.
        let levels_gained = user.add_xp(breakdown.total_xp);
        user.credit_coins(breakdown.total_coins);
        user.add_vip_progress(amount);
        user.remember_category(category);

        let mut missions_ready = Vec::new();
        for mission in user.missions.iter_mut() {
            if !mission.is_active() {
                continue;
            }
            if mission.is_past_expiry(now) {
                mission.mark_expired(now);
                continue;
            }
            let units = receipt_progress(&mission.kind, category, amount, is_new_store);
            if units > 0 && mission.record_progress(units) {
                missions_ready.push(mission.description.clone());
            }
        }

        if let Some(companion) = user.companion.as_mut() {
            // Pets level from account activity at a fifth of the member rate.
            companion.gain_xp((breakdown.total_xp / 5).max(1));
        }

        let achievements = achievements::check_and_award(&self.store, &mut user, now)?
            .into_iter()
            .map(|a| a.name)
            .collect();

        let new_level = user.level;
        let vip_tier = user.vip_tier;
        self.store.put_user(user)?;

        self.store.append_audit(&format!(
            "receipt {} user={} store={} amount={} coins={}",
            receipt_id,
            escape_log(username),
            store_preview(&store_name),
            amount,
            breakdown.total_coins
        ))?;
        self.invalidate_rankings();

        info!(
            "receipt {} for {}: {} coins, {} xp",
            receipt_id,
            escape_log(username),
            breakdown.total_coins,
            breakdown.total_xp
        );
        Ok(ReceiptSummary {
            receipt_id,
            breakdown,
            levels_gained,
            new_level,
            vip_tier,
            missions_ready,
            achievements,
        })
    }

    /// Void a receipt and claw back its coins (clamped at zero; the member
    /// may have spent part of the grant). Admin only. Returns the coins
    /// actually reversed.
    pub fn void_receipt(
        &self,
        actor: &TokenIdentity,
        username: &str,
        receipt_id: &Uuid,
    ) -> Result<u64, EconomyError> {
        if !actor.role.can_void_receipts() {
            return Err(EconomyError::PermissionDenied(format!(
                "{} may not void receipts",
                actor.role.as_str()
            )));
        }
        let mut receipt = self.store.get_receipt(username, receipt_id)?;
        if receipt.voided {
            return Err(EconomyError::AlreadyVoided(receipt_id.to_string()));
        }
        receipt.voided = true;
        let granted = receipt.breakdown.total_coins;
        self.store.put_receipt(receipt)?;

        let mut user = self.store.get_user(username)?;
        let reversed = granted.min(user.coins);
        user.reverse_coins(granted);
        self.store.put_user(user)?;

        self.store.append_audit(&format!(
            "void {} user={} by={} reversed={}",
            receipt_id,
            escape_log(username),
            escape_log(&actor.username),
            reversed
        ))?;
        self.invalidate_rankings();
        warn!(
            "receipt {} voided by {} ({} coins reversed)",
            receipt_id,
            escape_log(&actor.username),
            reversed
        );
        Ok(reversed)
    }

    pub fn receipts_for(&self, username: &str) -> Result<Vec<ReceiptRecord>, EconomyError> {
        self.store.list_receipts(username)
    }

    // --- missions ---

    /// Generate and assign a new mission, respecting the active-mission cap.
    /// Overdue missions are expired first so a stale board can't block a
    /// fresh assignment.
    pub fn assign_mission(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<MissionRecord, EconomyError> {
        let mut user = self.store.get_user(username)?;
        for mission in user.missions.iter_mut() {
            if mission.is_active() && mission.is_past_expiry(now) {
                mission.mark_expired(now);
            }
        }

        let cap = self.config.economy.max_active_missions;
        if user.active_missions().count() >= cap {
            return Err(EconomyError::TooManyActiveMissions(cap));
        }

        let mission = self.generator.generate(&user, now, &mut rand::thread_rng())?;
        user.missions.push(mission.clone());
        self.store.put_user(user)?;
        info!(
            "mission {} assigned to {}",
            mission.template_id,
            escape_log(username)
        );
        Ok(mission)
    }

    /// Claim a ready mission's reward.
    pub fn claim_mission(
        &self,
        username: &str,
        mission_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<MissionClaim, EconomyError> {
        let mut user = self.store.get_user(username)?;
        let idx = user
            .missions
            .iter()
            .position(|m| m.id == *mission_id)
            .ok_or_else(|| EconomyError::NotFound(format!("mission: {}", mission_id)))?;

        if user.missions[idx].is_active() && user.missions[idx].is_past_expiry(now) {
            user.missions[idx].mark_expired(now);
            self.store.put_user(user)?;
            return Err(EconomyError::MissionExpired(mission_id.to_string()));
        }
        if !user.missions[idx].is_ready() {
            return Err(EconomyError::InvalidMissionState(format!(
                "mission {} is not ready to claim",
                mission_id
            )));
        }

        user.missions[idx].mark_completed(now);
        let reward_coins = user.missions[idx].reward_coins;
        let reward_xp = user.missions[idx].reward_xp;

        user.missions_completed += 1;
        user.credit_coins(reward_coins);
        let levels_gained = user.add_xp(reward_xp);
        if let Some(companion) = user.companion.as_mut() {
            companion.gain_xp((reward_xp / 2).max(1));
        }

        let achievements = achievements::check_and_award(&self.store, &mut user, now)?
            .into_iter()
            .map(|a| a.name)
            .collect();
        self.store.put_user(user)?;

        self.store.append_audit(&format!(
            "mission-claim {} user={} coins={}",
            mission_id,
            escape_log(username),
            reward_coins
        ))?;
        self.invalidate_rankings();
        Ok(MissionClaim {
            reward_coins,
            reward_xp,
            levels_gained,
            achievements,
        })
    }

    // --- companions ---

    pub fn adopt_companion(
        &self,
        username: &str,
        name: &str,
        species: CompanionSpecies,
    ) -> Result<crate::economy::CompanionRecord, EconomyError> {
        companion::adopt_companion(&self.store, username, name, species)
    }

    pub fn feed_companion(&self, username: &str) -> Result<u8, EconomyError> {
        companion::feed_companion(&self.store, username)
    }

    pub fn play_with_companion(&self, username: &str) -> Result<u8, EconomyError> {
        companion::play_with_companion(&self.store, username)
    }

    pub fn train_companion(
        &self,
        username: &str,
        stat: CompanionStat,
    ) -> Result<u32, EconomyError> {
        companion::train_companion(&self.store, username, stat)
    }

    pub fn companion_status(&self, username: &str) -> Result<String, EconomyError> {
        let user = self.store.get_user(username)?;
        let pet = user.companion.as_ref().ok_or(EconomyError::NoCompanion)?;
        Ok(companion::format_companion_status(pet))
    }

    // --- events ---

    pub fn schedule_event(&self, event: MallEvent) -> Result<(), EconomyError> {
        self.store.append_audit(&format!("event-scheduled {}", escape_log(&event.id)))?;
        events::schedule_event(&self.store, event)
    }

    pub fn active_event_multiplier(&self, now: DateTime<Utc>) -> Result<f64, EconomyError> {
        events::active_multiplier(&self.store, now)
    }

    // --- rankings ---

    pub fn leaderboard(
        &self,
        metric: LeaderboardMetric,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, crate::cache::CacheError> {
        leaderboard::top(&self.store, &self.cache, metric, LEADERBOARD_LIMIT, now)
    }

    /// Cached rankings go stale on any score change. A failed invalidation
    /// only delays a refresh, so it is logged rather than propagated.
    fn invalidate_rankings(&self) {
        if let Err(e) = leaderboard::invalidate(&self.cache, LEADERBOARD_LIMIT) {
            warn!("leaderboard invalidation failed: {}", e);
        }
    }

    // --- admin ---

    /// Promote or demote an account. Admin only.
    pub fn set_role(
        &self,
        actor: &TokenIdentity,
        username: &str,
        role: Role,
    ) -> Result<(), EconomyError> {
        if actor.role != Role::Admin {
            return Err(EconomyError::PermissionDenied(
                "only admins may change roles".to_string(),
            ));
        }
        let mut user = self.store.get_user(username)?;
        user.role = role;
        self.store.put_user(user)?;
        self.store.append_audit(&format!(
            "role-change user={} role={} by={}",
            escape_log(username),
            role.as_str(),
            escape_log(&actor.username)
        ))?;
        Ok(())
    }

    /// One maintenance sweep. Also runs from the periodic loop.
    pub fn run_maintenance(&self, now: DateTime<Utc>) -> Result<MaintenanceReport, EconomyError> {
        maintenance::sweep(&self.store, &self.auth, now)
    }
}
