//! Ranking of users by their planted trees.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::growth::{self, DAYS_PER_YEAR};
use crate::models::{Adoption, SpeciesId, TreeSpecies, User, UserId};

pub const LEADERBOARD_SIZE: usize = 5;

/// Tier earned by the age of a user's oldest planted tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Badge {
    Gold,
    Silver,
    Bronze,
}

impl Badge {
    pub fn for_age_years(years: f64) -> Option<Badge> {
        if years > 3.0 {
            Some(Badge::Gold)
        } else if years > 2.0 {
            Some(Badge::Silver)
        } else if years > 1.0 {
            Some(Badge::Bronze)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub name: String,
    pub total_trees: usize,
    /// kg, rounded to 2 decimals.
    pub total_co2_offset: f64,
    pub badge: Option<Badge>,
}

struct Tally {
    trees: usize,
    co2: f64,
    max_age_days: i64,
}

/// Top entries by tree count, then CO2 offset. Only active adoptions count;
/// users without any are left out. Ties fall back to the lower user id.
pub fn rank(
    users: &[User],
    adoptions: &[Adoption],
    species: &HashMap<SpeciesId, TreeSpecies>,
    now: DateTime<Utc>,
) -> Vec<LeaderboardEntry> {
    let mut tallies: BTreeMap<UserId, Tally> = BTreeMap::new();

    for adoption in adoptions.iter().filter(|a| a.is_active()) {
        let sp = adoption.species_id.and_then(|id| species.get(&id));
        let tally = tallies.entry(adoption.user_id).or_insert(Tally {
            trees: 0,
            co2: 0.0,
            max_age_days: 0,
        });
        tally.trees += 1;
        tally.co2 += growth::carbon_offset(adoption, sp, now);
        tally.max_age_days = tally.max_age_days.max(adoption.age_days(now));
    }

    let names: HashMap<UserId, &str> = users.iter().map(|u| (u.id, u.name.as_str())).collect();

    let mut ranked: Vec<(UserId, Tally)> = tallies.into_iter().collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| {
        b.trees
            .cmp(&a.trees)
            .then_with(|| b.co2.total_cmp(&a.co2))
            .then_with(|| a_id.cmp(b_id))
    });

    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|(user_id, tally)| LeaderboardEntry {
            user_id,
            name: names
                .get(&user_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("user {user_id}")),
            total_trees: tally.trees,
            total_co2_offset: growth::round2(tally.co2),
            badge: Badge::for_age_years(tally.max_age_days as f64 / DAYS_PER_YEAR),
        })
        .collect()
}
