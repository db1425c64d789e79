//! Background upkeep: mission expiry, companion hunger, session pruning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::auth::AuthManager;
use crate::economy::{EconomyError, MallStore};

use super::GamificationEngine;

/// Counters from one maintenance pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaintenanceReport {
    pub users_scanned: usize,
    pub missions_expired: usize,
    pub companion_decay_days: u64,
    pub sessions_pruned: usize,
}

impl MaintenanceReport {
    pub fn is_noop(&self) -> bool {
        self.missions_expired == 0 && self.companion_decay_days == 0 && self.sessions_pruned == 0
    }
}

/// One full sweep over every account. Expires overdue missions, applies
/// daily companion upkeep, and prunes dead auth state. Each changed record
/// is written back individually so a crash mid-sweep loses nothing.
pub fn sweep(
    store: &MallStore,
    auth: &AuthManager,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport, EconomyError> {
    let mut report = MaintenanceReport::default();

    for mut user in store.all_users()? {
        report.users_scanned += 1;
        let mut dirty = false;

        for mission in user.missions.iter_mut() {
            if mission.is_active() && mission.is_past_expiry(now) {
                mission.mark_expired(now);
                report.missions_expired += 1;
                dirty = true;
            }
        }

        if let Some(companion) = user.companion.as_mut() {
            let days = companion.apply_decay(now);
            if days > 0 {
                report.companion_decay_days += days as u64;
                dirty = true;
            }
        }

        if dirty {
            debug!("maintenance touched account {}", user.username);
            store.put_user(user)?;
        }
    }

    report.sessions_pruned = auth.sweep(now);

    if !report.is_noop() {
        info!(
            "maintenance: {} missions expired, {} companion decay days, {} sessions pruned across {} accounts",
            report.missions_expired,
            report.companion_decay_days,
            report.sessions_pruned,
            report.users_scanned
        );
    }
    Ok(report)
}

/// Run the sweep on a fixed interval until `shutdown` flips. Errors are
/// logged and the loop keeps going; a bad pass must not kill the service.
pub async fn run_periodic(
    engine: Arc<GamificationEngine>,
    interval_secs: u64,
    shutdown: Arc<AtomicBool>,
) {
    let period = std::time::Duration::from_secs(interval_secs.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if shutdown.load(Ordering::Relaxed) {
            info!("maintenance loop stopping");
            return;
        }
        if let Err(e) = engine.run_maintenance(Utc::now()) {
            log::error!("maintenance sweep failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LoginRateLimiter, TokenService};
    use crate::economy::{
        CompanionRecord, CompanionSpecies, MallStoreBuilder, MissionRecord, MissionState,
        ObjectiveKind, UserRecord,
    };
    use chrono::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn setup() -> (TempDir, MallStore, AuthManager) {
        let dir = TempDir::new().expect("tempdir");
        let store = MallStoreBuilder::new(dir.path()).open().expect("store");
        let auth = AuthManager::new(
            TokenService::new(b"maintenance-test-secret", 60),
            LoginRateLimiter::new(5, 300, 900),
        );
        (dir, store, auth)
    }

    fn mission_expiring(created: DateTime<Utc>, validity_hours: i64) -> MissionRecord {
        MissionRecord {
            id: Uuid::new_v4(),
            template_id: "spend_any".to_string(),
            description: "Spend 500 coins worth anywhere in the mall".to_string(),
            kind: ObjectiveKind::SpendAmount { category: None },
            target: 500,
            progress: 120,
            reward_coins: 40,
            reward_xp: 20,
            state: MissionState::Active,
            created_at: created,
            expires_at: created + Duration::hours(validity_hours),
        }
    }

    #[test]
    fn sweep_expires_overdue_missions_only() {
        let (_dir, store, auth) = setup();
        let now = Utc::now();

        let mut user = UserRecord::new("alice", "Alice", "hash");
        user.missions.push(mission_expiring(now - Duration::days(3), 24));
        user.missions.push(mission_expiring(now, 24));
        store.put_user(user).expect("put");

        let report = sweep(&store, &auth, now).expect("sweep");
        assert_eq!(report.missions_expired, 1);

        let user = store.get_user("alice").expect("get");
        assert!(matches!(user.missions[0].state, MissionState::Expired { .. }));
        assert!(user.missions[1].is_active());
    }

    #[test]
    fn sweep_applies_companion_decay_per_elapsed_day() {
        let (_dir, store, auth) = setup();
        let now = Utc::now();

        let mut user = UserRecord::new("bob", "Bob", "hash");
        let mut companion = CompanionRecord::new("Rex", CompanionSpecies::Pup);
        companion.last_decay = now - Duration::days(2);
        let hunger_before = companion.hunger;
        user.companion = Some(companion);
        store.put_user(user).expect("put");

        let report = sweep(&store, &auth, now).expect("sweep");
        assert_eq!(report.companion_decay_days, 2);

        let user = store.get_user("bob").expect("get");
        let companion = user.companion.expect("companion");
        assert!(companion.hunger > hunger_before);

        // A second sweep the same day is a no-op.
        let report = sweep(&store, &auth, now).expect("sweep again");
        assert_eq!(report.companion_decay_days, 0);
        assert!(report.is_noop());
    }

    #[test]
    fn sweep_with_clean_state_is_noop() {
        let (_dir, store, auth) = setup();
        let mut user = UserRecord::new("carol", "Carol", "hash");
        user.missions.push(mission_expiring(Utc::now(), 48));
        store.put_user(user).expect("put");

        let report = sweep(&store, &auth, Utc::now()).expect("sweep");
        assert_eq!(report.users_scanned, 1);
        assert!(report.is_noop());
    }
}
