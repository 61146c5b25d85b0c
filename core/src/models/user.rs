use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, UserId};
use crate::error::{GroveError, GroveResult};

/// Someone who adopts trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

/// Registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// A registration that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidUser {
    pub name: String,
    pub email: String,
    pub region: String,
}

impl NewUser {
    pub fn validate(self) -> GroveResult<ValidUser> {
        let (Some(name), Some(email), Some(region)) =
            (clean(self.name), clean(self.email), clean(self.region))
        else {
            return Err(GroveError::validation("name, email and region are required"));
        };
        if !email.contains('@') {
            return Err(GroveError::Validation(format!("invalid email: {email}")));
        }
        Ok(ValidUser {
            name,
            email: email.to_lowercase(),
            region,
        })
    }
}

impl ValidUser {
    pub fn into_user(self, id: UserId, created_at: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            region: self.region,
            created_at,
        }
    }
}

/// Per-user totals over non-deleted adoptions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub user_id: UserId,
    pub name: String,
    pub tree_count: usize,
    pub active_trees: usize,
    pub total_co2_offset: f64,
}
