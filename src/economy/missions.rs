//! Procedural mission generation.
//!
//! Missions are filled-in templates: a weighted pick from the template
//! roster, with target and reward drawn from the template's declared ranges
//! and scaled by the member's level and spending habits.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use uuid::Uuid;

use crate::economy::errors::EconomyError;
use crate::economy::state::default_mission_templates;
use crate::economy::types::{
    MissionRecord, MissionState, ObjectiveKind, StoreCategory, UserRecord,
};

/// A mission blueprint. `text` carries a `{target}` placeholder.
#[derive(Debug, Clone)]
pub struct MissionTemplate {
    pub id: String,
    pub text: String,
    pub kind: ObjectiveKind,
    pub target_range: (u64, u64),
    pub reward_range: (u64, u64),
    pub weight: u32,
    pub min_level: u32,
    pub validity: Duration,
}

impl MissionTemplate {
    /// Upper bound on a generated reward once scaling is applied.
    pub fn max_scaled_reward(&self, scale: f64) -> u64 {
        (self.reward_range.1 as f64 * scale).ceil() as u64
    }
}

/// Template-driven mission generator.
pub struct MissionGenerator {
    templates: Vec<MissionTemplate>,
}

impl Default for MissionGenerator {
    fn default() -> Self {
        Self {
            templates: default_mission_templates(),
        }
    }
}

impl MissionGenerator {
    pub fn new(templates: Vec<MissionTemplate>) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &[MissionTemplate] {
        &self.templates
    }

    /// Combined level/spending scale factor for a member. Level adds 5% per
    /// level; a high average receipt adds up to 50% more.
    pub fn scale_for(user: &UserRecord) -> f64 {
        let level_factor = 1.0 + user.level as f64 / 20.0;
        let avg_receipt = if user.receipt_count > 0 {
            user.lifetime_spend as f64 / user.receipt_count as f64
        } else {
            0.0
        };
        let spend_factor = 1.0 + (avg_receipt / 1000.0).min(1.0) * 0.5;
        level_factor * spend_factor
    }

    /// Weight of a template for this member: zero below the level gate,
    /// doubled when the member has been shopping the template's category.
    fn effective_weight(&self, template: &MissionTemplate, user: &UserRecord) -> u32 {
        if user.level < template.min_level {
            return 0;
        }
        let mut weight = template.weight;
        if let ObjectiveKind::SpendAmount {
            category: Some(category),
        } = &template.kind
        {
            if user.recent_categories.contains(category) {
                weight = weight.saturating_mul(2);
            }
        }
        weight
    }

    /// Generate a mission for the member. Deterministic given the RNG.
    pub fn generate<R: Rng>(
        &self,
        user: &UserRecord,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<MissionRecord, EconomyError> {
        if self.templates.is_empty() {
            return Err(EconomyError::Internal("no mission templates".to_string()));
        }
        let weights: Vec<u32> = self
            .templates
            .iter()
            .map(|t| self.effective_weight(t, user))
            .collect();
        let dist = WeightedIndex::new(&weights).map_err(|_| {
            EconomyError::Internal("no mission template eligible at this level".to_string())
        })?;
        let template = &self.templates[dist.sample(rng)];

        let scale = Self::scale_for(user);
        let (target_lo, target_hi) = template.target_range;
        let (reward_lo, reward_hi) = template.reward_range;

        let target_raw = rng.gen_range(target_lo..=target_hi);
        let reward_raw = rng.gen_range(reward_lo..=reward_hi);

        let target = ((target_raw as f64 * scale).round() as u64).max(1);
        let reward_coins = ((reward_raw as f64 * scale).round() as u64)
            .clamp(reward_lo, template.max_scaled_reward(scale))
            .max(1);
        let reward_xp = (reward_coins / 2).max(1);

        Ok(MissionRecord {
            id: Uuid::new_v4(),
            template_id: template.id.clone(),
            description: template.text.replace("{target}", &target.to_string()),
            kind: template.kind.clone(),
            target,
            progress: 0,
            reward_coins,
            reward_xp,
            state: MissionState::Active,
            created_at: now,
            expires_at: now + template.validity,
        })
    }
}

/// Progress units a receipt contributes toward a mission objective.
/// `is_new_store` marks the member's first receipt from that store.
pub fn receipt_progress(
    kind: &ObjectiveKind,
    category: StoreCategory,
    amount: u64,
    is_new_store: bool,
) -> u64 {
    match kind {
        ObjectiveKind::SpendAmount { category: None } => amount,
        ObjectiveKind::SpendAmount {
            category: Some(wanted),
        } => {
            if *wanted == category {
                amount
            } else {
                0
            }
        }
        ObjectiveKind::SubmitReceipts => 1,
        ObjectiveKind::VisitStores => {
            if is_new_store {
                1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_user(level_xp: u64) -> UserRecord {
        let mut user = UserRecord::new("alice", "Alice", "hash");
        user.add_xp(level_xp);
        user
    }

    #[test]
    fn generated_mission_has_positive_scaled_values() {
        let gen = MissionGenerator::default();
        let user = test_user(0);
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();

        for _ in 0..200 {
            let mission = gen.generate(&user, now, &mut rng).expect("generate");
            assert!(mission.target >= 1);
            assert!(mission.reward_coins >= 1);
            assert!(mission.reward_xp >= 1);
            assert!(mission.expires_at > now);
            assert!(mission.is_active());

            let template = gen
                .templates()
                .iter()
                .find(|t| t.id == mission.template_id)
                .expect("template exists");
            let scale = MissionGenerator::scale_for(&user);
            assert!(mission.reward_coins >= template.reward_range.0);
            assert!(mission.reward_coins <= template.max_scaled_reward(scale));
        }
    }

    #[test]
    fn level_gate_excludes_high_templates() {
        let gen = MissionGenerator::default();
        let user = test_user(0); // level 1
        let mut rng = StdRng::seed_from_u64(42);
        let now = Utc::now();

        for _ in 0..200 {
            let mission = gen.generate(&user, now, &mut rng).expect("generate");
            let template = gen
                .templates()
                .iter()
                .find(|t| t.id == mission.template_id)
                .unwrap();
            assert!(template.min_level <= 1);
        }
    }

    #[test]
    fn category_affinity_boosts_matching_templates() {
        let gen = MissionGenerator::default();
        let mut user = test_user(500); // level 6, everything unlocked
        for _ in 0..5 {
            user.remember_category(StoreCategory::Fashion);
        }
        let mut rng = StdRng::seed_from_u64(99);
        let now = Utc::now();

        let mut fashion_hits = 0;
        let trials = 500;
        for _ in 0..trials {
            let mission = gen.generate(&user, now, &mut rng).expect("generate");
            if mission.template_id == "spend_fashion" {
                fashion_hits += 1;
            }
        }
        // Base weight 15 doubled to 30 out of ~115 total; expect well above
        // the un-boosted ~14% rate.
        assert!(
            fashion_hits * 100 / trials > 18,
            "expected boosted fashion rate, got {}/{}",
            fashion_hits,
            trials
        );
    }

    #[test]
    fn description_embeds_target() {
        let gen = MissionGenerator::default();
        let user = test_user(0);
        let mut rng = StdRng::seed_from_u64(3);
        let mission = gen.generate(&user, Utc::now(), &mut rng).expect("generate");
        assert!(mission.description.contains(&mission.target.to_string()));
    }

    #[test]
    fn receipt_progress_by_objective_kind() {
        assert_eq!(
            receipt_progress(
                &ObjectiveKind::SpendAmount { category: None },
                StoreCategory::Dining,
                250,
                false
            ),
            250
        );
        assert_eq!(
            receipt_progress(
                &ObjectiveKind::SpendAmount {
                    category: Some(StoreCategory::Fashion)
                },
                StoreCategory::Dining,
                250,
                false
            ),
            0
        );
        assert_eq!(
            receipt_progress(&ObjectiveKind::SubmitReceipts, StoreCategory::Other, 10, false),
            1
        );
        assert_eq!(
            receipt_progress(&ObjectiveKind::VisitStores, StoreCategory::Other, 10, true),
            1
        );
        assert_eq!(
            receipt_progress(&ObjectiveKind::VisitStores, StoreCategory::Other, 10, false),
            0
        );
    }
}
