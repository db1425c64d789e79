//! Promotional event windows and their reward multiplier.

use chrono::{DateTime, Utc};

use crate::economy::{EconomyError, MallEvent, MallStore};

/// Register (or update) a promotional event.
pub fn schedule_event(store: &MallStore, event: MallEvent) -> Result<(), EconomyError> {
    if event.multiplier < 1.0 {
        return Err(EconomyError::InvalidAmount(
            "event multiplier must be at least 1.0".to_string(),
        ));
    }
    if event.ends <= event.starts {
        return Err(EconomyError::InvalidAmount(
            "event must end after it starts".to_string(),
        ));
    }
    store.put_event(event)
}

/// Events currently running at `now`.
pub fn active_events(store: &MallStore, now: DateTime<Utc>) -> Result<Vec<MallEvent>, EconomyError> {
    Ok(store
        .list_events()?
        .into_iter()
        .filter(|e| e.is_active(now))
        .collect())
}

/// The multiplier in force at `now`: the best active event, or 1.0 when the
/// calendar is quiet. Overlapping events don't stack.
pub fn active_multiplier(store: &MallStore, now: DateTime<Utc>) -> Result<f64, EconomyError> {
    let best = active_events(store, now)?
        .into_iter()
        .map(|e| e.multiplier)
        .fold(1.0_f64, f64::max);
    Ok(best)
}
