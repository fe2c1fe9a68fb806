//! User management collaborator and its in-memory implementation.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use scrypt::Params;

use super::password::{hash_password, validate_password_strength, verify_password};
use super::user::{normalize_email, IdentityError, NewUser, User, ADMIN_ROLE};
use crate::config::{AuthSettings, PasswordRequirements};
use crate::validation;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserManager: Send + Sync {
    /// Create an account. Every reason for refusal is reported.
    async fn create_user(&self, user: NewUser, password: &str) -> Result<User, Vec<IdentityError>>;
    async fn find_by_email(&self, email: &str) -> Option<User>;
    async fn check_password(&self, user: &User, password: &str) -> bool;
}

/// Users held in a concurrent map keyed by normalized email
pub struct InMemoryUserManager {
    users: DashMap<String, User>,
    requirements: PasswordRequirements,
    params: Params,
    admin_emails: Vec<String>,
}

impl InMemoryUserManager {
    pub fn new(requirements: PasswordRequirements, params: Params, admin_emails: Vec<String>) -> Self {
        Self {
            users: DashMap::new(),
            requirements,
            params,
            admin_emails: admin_emails.iter().map(|e| normalize_email(e)).collect(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self, crate::error::AppError> {
        let params = super::password::scrypt_params(&settings.hashing)?;
        Ok(Self::new(
            settings.password_requirements.clone(),
            params,
            settings.admin_emails.clone(),
        ))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserManager for InMemoryUserManager {
    async fn create_user(&self, user: NewUser, password: &str) -> Result<User, Vec<IdentityError>> {
        let mut errors = Vec::new();
        if !validation::is_valid_email(&user.email) {
            errors.push(IdentityError::invalid_email(&user.email));
        }
        errors.extend(validate_password_strength(password, &self.requirements));

        let normalized = normalize_email(&user.email);
        if self.users.contains_key(&normalized) {
            errors.push(IdentityError::duplicate_user_name(&user.email));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let params = self.params.clone();
        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain, params))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing task failed");
                vec![IdentityError::default_error()]
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing failed");
                vec![IdentityError::default_error()]
            })?;

        let mut created = User::new(user.email.trim(), password_hash);
        if self.admin_emails.contains(&normalized) {
            created = created.with_role(ADMIN_ROLE);
        }

        // Re-check under the entry lock, a concurrent registration may have won
        match self.users.entry(normalized) {
            Entry::Occupied(_) => Err(vec![IdentityError::duplicate_user_name(&user.email)]),
            Entry::Vacant(slot) => {
                slot.insert(created.clone());
                tracing::info!(user_id = %created.id, roles = ?created.roles, "user created");
                Ok(created)
            },
        }
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .get(&normalize_email(email))
            .map(|entry| entry.value().clone())
    }

    async fn check_password(&self, user: &User, password: &str) -> bool {
        let hash = user.password_hash.clone();
        let plain = password.to_string();
        tokio::task::spawn_blocking(move || verify_password(&hash, &plain))
            .await
            .unwrap_or(false)
    }
}
