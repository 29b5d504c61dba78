//! Backend seams: authentication and the three tables the site touches.
//!
//! The web layer only sees these traits. Implementations:
//! - [`sql::SqlBackend`]: local database via sqlx (SQLite or PostgreSQL)
//! - [`hosted::HostedBackend`]: hosted PostgREST + GoTrue service
//! - `memory::MemoryBackend`: in-process fake for tests, behind the
//!   `test-util` feature

pub mod hosted;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod sql;

use crate::model::{AppRole, AuthUser, ContactSubmission, NewSubmission, Project, SessionGrant};
use async_trait::async_trait;
use std::sync::Arc;

/// Errors raised by a backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered but refused the request.
    #[error("backend rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("invalid stored data: {0}")]
    Corrupt(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in.
    SignedIn(SessionGrant),
    /// Account created; the backend wants the address confirmed first.
    ConfirmationRequired,
}

/// The authentication service.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Check credentials and open a session. `None` for bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Option<SessionGrant>>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> StoreResult<SignUpOutcome>;

    /// Resolve a session token. `None` when unknown or expired.
    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>>;

    async fn sign_out(&self, token: &str) -> StoreResult<()>;
}

/// The `contact_submissions` table.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Insert one row. Not idempotent.
    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<()>;

    /// Newest submissions first.
    async fn recent_submissions(
        &self,
        viewer: &AuthUser,
        limit: usize,
    ) -> StoreResult<Vec<ContactSubmission>>;
}

/// The `projects` table.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Newest projects first, optionally only those of one client.
    async fn list_projects(
        &self,
        viewer: &AuthUser,
        client_id: Option<&str>,
    ) -> StoreResult<Vec<Project>>;
}

/// The `user_roles` table.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Whether `viewer` holds `role`. A missing row is `Ok(false)`.
    async fn has_role(&self, viewer: &AuthUser, role: AppRole) -> StoreResult<bool>;
}

/// Everything the web layer needs from a backend.
pub trait Backend: SessionProvider + ContactRepository + ProjectRepository + RoleRepository {}

impl<T> Backend for T where T: SessionProvider + ContactRepository + ProjectRepository + RoleRepository {}

pub type SharedBackend = Arc<dyn Backend>;
