// SPDX-License-Identifier: BUSL-1.1
//! In-memory user and token storage using DashMap.
//!
//! Users are keyed by lower-cased email so signing in twice yields the same
//! user id. Tokens map to the user they were issued for.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: &'static str,
    pub created_at: DateTime<Utc>,
}

struct Inner {
    users: DashMap<String, User>,
    tokens: DashMap<String, Uuid>,
}

/// Shared application state. Clones share the same data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                users: DashMap::new(),
                tokens: DashMap::new(),
            }),
        }
    }

    /// Sign a user in, creating the user on first use, and issue a new token.
    pub fn issue_token(&self, email: &str) -> (String, User) {
        let key = email.trim().to_lowercase();
        let user = self
            .inner
            .users
            .entry(key.clone())
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                email: key,
                role: "authenticated",
                created_at: Utc::now(),
            })
            .clone();

        let token = format!("stub-{}", Uuid::new_v4().simple());
        self.inner.tokens.insert(token.clone(), user.id);
        (token, user)
    }

    pub fn user_for_token(&self, token: &str) -> Option<User> {
        let user_id = *self.inner.tokens.get(token)?;
        self.inner
            .users
            .iter()
            .find(|entry| entry.value().id == user_id)
            .map(|entry| entry.value().clone())
    }

    /// Returns whether the token existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.inner.tokens.remove(token).is_some()
    }

    pub fn active_tokens(&self) -> usize {
        self.inner.tokens.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
