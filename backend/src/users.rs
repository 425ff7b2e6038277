use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::validation::address_key;

const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Username must be between 1 and {MAX_USERNAME_LEN} characters")]
    InvalidUsername,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub notifications: bool,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub address: String,
    pub username: String,
    pub total_value: Decimal,
    pub join_date: NaiveDate,
    pub last_active: DateTime<Utc>,
    pub preferences: Preferences,
}

#[derive(Debug, Default)]
pub struct UserDirectory {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(address_key(&profile.address), profile);
    }

    pub async fn profile(&self, address: &str) -> Result<UserProfile, ProfileError> {
        self.profiles
            .read()
            .await
            .get(&address_key(address))
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(address.to_string()))
    }

    /// Updates the given fields and stamps `last_active`. Absent fields keep
    /// their current value.
    pub async fn update(
        &self,
        address: &str,
        username: Option<String>,
        preferences: Option<Preferences>,
    ) -> Result<UserProfile, ProfileError> {
        if let Some(name) = &username {
            let len = name.chars().count();
            if len == 0 || len > MAX_USERNAME_LEN {
                return Err(ProfileError::InvalidUsername);
            }
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&address_key(address))
            .ok_or_else(|| ProfileError::NotFound(address.to_string()))?;
        if let Some(username) = username {
            profile.username = username;
        }
        if let Some(preferences) = preferences {
            profile.preferences = preferences;
        }
        profile.last_active = Utc::now();

        tracing::info!(address = %profile.address, "user profile updated");
        Ok(profile.clone())
    }

    /// Profiles ordered by total value, largest first.
    pub async fn top(&self, limit: usize) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> =
            self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| {
            b.total_value
                .cmp(&a.total_value)
                .then_with(|| a.address.cmp(&b.address))
        });
        profiles.truncate(limit);
        profiles
    }

    pub async fn seed_demo(&self) {
        let last_active = Utc
            .with_ymd_and_hms(2024, 1, 5, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let demo = [
            (
                "0x1234567890123456789012345678901234567890",
                "alice",
                50_000,
                NaiveDate::from_ymd_opt(2024, 1, 1),
                Preferences {
                    notifications: true,
                    theme: Theme::Dark,
                },
            ),
            (
                "0x0987654321098765432109876543210987654321",
                "bob",
                75_000,
                NaiveDate::from_ymd_opt(2024, 1, 2),
                Preferences {
                    notifications: false,
                    theme: Theme::Light,
                },
            ),
        ];

        for (address, username, total_value, join_date, preferences) in demo {
            self.insert(UserProfile {
                address: address.to_string(),
                username: username.to_string(),
                total_value: Decimal::new(total_value, 0),
                join_date: join_date.unwrap_or_default(),
                last_active,
                preferences,
            })
            .await;
        }
    }
}
