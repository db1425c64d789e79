//! Companion care and interaction logic.
//!
//! One pet per account, embedded in the user record. Feeding and training
//! cost coins, which keeps the pet a coin sink rather than pure flavor.

use crate::economy::errors::EconomyError;
use crate::economy::storage::MallStore;
use crate::economy::types::{CompanionRecord, CompanionSpecies, CompanionStat, UserRecord};

/// Coin cost to feed a companion.
pub const FEED_COST: u64 = 10;

/// Coin cost per training session.
pub const TRAIN_COST: u64 = 25;

fn companion_mut(user: &mut UserRecord) -> Result<&mut CompanionRecord, EconomyError> {
    user.companion.as_mut().ok_or(EconomyError::NoCompanion)
}

/// Adopt a starter companion. One per account.
pub fn adopt_companion(
    store: &MallStore,
    username: &str,
    name: &str,
    species: CompanionSpecies,
) -> Result<CompanionRecord, EconomyError> {
    let mut user = store.get_user(username)?;
    if user.companion.is_some() {
        return Err(EconomyError::Internal(
            "account already has a companion".to_string(),
        ));
    }
    let companion = CompanionRecord::new(name, species);
    user.companion = Some(companion.clone());
    store.put_user(user)?;
    Ok(companion)
}

/// Feed the companion. Costs [`FEED_COST`] coins; returns the happiness gained.
pub fn feed_companion(store: &MallStore, username: &str) -> Result<u8, EconomyError> {
    let mut user = store.get_user(username)?;
    if !user.try_spend_coins(FEED_COST) {
        return Err(EconomyError::InsufficientCoins {
            have: user.coins,
            need: FEED_COST,
        });
    }
    let gain = companion_mut(&mut user)?.feed();
    store.put_user(user)?;
    Ok(gain)
}

/// Play with the companion. Free; returns the happiness gained.
pub fn play_with_companion(store: &MallStore, username: &str) -> Result<u8, EconomyError> {
    let mut user = store.get_user(username)?;
    let gain = companion_mut(&mut user)?.play();
    store.put_user(user)?;
    Ok(gain)
}

/// Train one stat. Costs [`TRAIN_COST`] coins and grants companion XP.
/// Returns levels gained (usually zero).
pub fn train_companion(
    store: &MallStore,
    username: &str,
    stat: CompanionStat,
) -> Result<u32, EconomyError> {
    let mut user = store.get_user(username)?;
    if !user.try_spend_coins(TRAIN_COST) {
        return Err(EconomyError::InsufficientCoins {
            have: user.coins,
            need: TRAIN_COST,
        });
    }
    let companion = companion_mut(&mut user)?;
    companion.train(stat);
    let levels = companion.gain_xp(20);
    store.put_user(user)?;
    Ok(levels)
}

/// Format companion status for display.
pub fn format_companion_status(companion: &CompanionRecord) -> String {
    let mut output = format!(
        "=== {} ===\n{} (Lv{})\nPower: {}  Speed: {}  Intelligence: {}\n",
        companion.name,
        companion.species.name(),
        companion.level,
        companion.power,
        companion.speed,
        companion.intelligence
    );
    output.push_str(&format!("Happiness: {}/100\n", companion.happiness));
    output.push_str(&format!("Hunger: {}/100\n", companion.hunger));
    if companion.needs_feeding() {
        output.push_str("Needs feeding!\n");
    }
    output
}
