//! Mall-wide rankings, served through the tiered cache.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, TieredCache};
use crate::economy::{MallStore, VipTier};
use chrono::{DateTime, Utc};

/// What a leaderboard ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderboardMetric {
    Coins,
    Xp,
    Streak,
}

impl LeaderboardMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardMetric::Coins => "coins",
            LeaderboardMetric::Xp => "xp",
            LeaderboardMetric::Streak => "streak",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "coins" => Some(LeaderboardMetric::Coins),
            "xp" => Some(LeaderboardMetric::Xp),
            "streak" => Some(LeaderboardMetric::Streak),
            _ => None,
        }
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub display_name: String,
    pub vip_tier: VipTier,
    pub score: u64,
}

fn cache_key(metric: LeaderboardMetric, limit: usize) -> String {
    format!("leaderboard:{}:{}", metric.as_str(), limit)
}

/// Rank every account by `metric`, highest first, ties broken by username so
/// the ordering is stable. Full scan of the user tree; callers go through the
/// cached variant in normal operation.
pub fn compute(
    store: &MallStore,
    metric: LeaderboardMetric,
    limit: usize,
) -> Result<Vec<LeaderboardEntry>, CacheError> {
    let mut scored: Vec<(u64, String, String, VipTier)> = store
        .all_users()?
        .into_iter()
        .map(|user| {
            let score = match metric {
                LeaderboardMetric::Coins => user.coins,
                LeaderboardMetric::Xp => user.xp,
                LeaderboardMetric::Streak => user.login_streak as u64,
            };
            (score, user.username, user.display_name, user.vip_tier)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    Ok(scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (score, username, display_name, vip_tier))| LeaderboardEntry {
            rank: i + 1,
            username,
            display_name,
            vip_tier,
            score,
        })
        .collect())
}

/// Cached ranking lookup. Misses recompute from the store and populate the
/// cache; writes that change scores call [`invalidate`] to force a refresh.
pub fn top(
    store: &MallStore,
    cache: &TieredCache,
    metric: LeaderboardMetric,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<LeaderboardEntry>, CacheError> {
    let key = cache_key(metric, limit);
    if let Some(entries) = cache.get_value::<Vec<LeaderboardEntry>>(&key, now)? {
        return Ok(entries);
    }
    let entries = compute(store, metric, limit)?;
    cache.put_value(&key, &entries, now)?;
    Ok(entries)
}

/// Drop every cached ranking. Called after any write that moves a score.
pub fn invalidate(cache: &TieredCache, limit: usize) -> Result<(), CacheError> {
    for metric in [
        LeaderboardMetric::Coins,
        LeaderboardMetric::Xp,
        LeaderboardMetric::Streak,
    ] {
        cache.invalidate(&cache_key(metric, limit))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::{MallStoreBuilder, UserRecord};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, Arc<MallStore>) {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(MallStoreBuilder::new(dir.path()).open().expect("store"));
        for (name, coins, xp, streak) in [
            ("alice", 500u64, 1200u64, 3u32),
            ("bob", 900, 400, 14),
            ("carol", 900, 2500, 1),
        ] {
            let mut user = UserRecord::new(name, name, "hash");
            user.coins = coins;
            user.xp = xp;
            user.login_streak = streak;
            store.put_user(user).expect("put user");
        }
        (dir, store)
    }

    #[test]
    fn ranks_by_metric_with_stable_ties() {
        let (_dir, store) = seeded_store();
        let rows = compute(&store, LeaderboardMetric::Coins, 10).expect("compute");
        assert_eq!(rows.len(), 3);
        // bob and carol tie on coins; username breaks the tie.
        assert_eq!(rows[0].username, "bob");
        assert_eq!(rows[1].username, "carol");
        assert_eq!(rows[2].username, "alice");
        assert_eq!(rows[0].rank, 1);

        let rows = compute(&store, LeaderboardMetric::Xp, 10).expect("compute");
        assert_eq!(rows[0].username, "carol");

        let rows = compute(&store, LeaderboardMetric::Streak, 2).expect("compute");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "bob");
    }

    #[test]
    fn cached_lookup_reuses_stale_rankings_until_invalidated() {
        let (_dir, store) = seeded_store();
        let cache = TieredCache::new(store.clone(), 16, 300);
        let now = Utc::now();

        let first = top(&store, &cache, LeaderboardMetric::Coins, 10, now).expect("top");
        assert_eq!(first[0].username, "bob");

        // A score change is invisible until the cache is invalidated.
        let mut alice = store.get_user("alice").expect("alice");
        alice.coins = 5_000;
        store.put_user(alice).expect("put");

        let stale = top(&store, &cache, LeaderboardMetric::Coins, 10, now).expect("top");
        assert_eq!(stale[0].username, "bob");

        invalidate(&cache, 10).expect("invalidate");
        let fresh = top(&store, &cache, LeaderboardMetric::Coins, 10, now).expect("top");
        assert_eq!(fresh[0].username, "alice");
    }
}
