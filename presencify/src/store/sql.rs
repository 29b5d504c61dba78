//! SQL backend: accounts, sessions, roles, submissions and projects in a
//! local database.
//!
//! Handles password hashing (argon2), session creation/validation, and the
//! management operations used by the CLI.

use super::{
    ContactRepository, ProjectRepository, RoleRepository, SessionProvider, SignUpOutcome,
    StoreError, StoreResult,
};
use crate::db::{DbPool, DbRow};
use crate::model::{
    AppRole, AuthUser, ContactSubmission, NewSubmission, Project, ProjectStatus, STATUS_NEW,
    SessionGrant, parse_timestamp, timestamp,
};
use crate::sql;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

/// Account record
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields for a project created from the CLI.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub client_id: String,
}

/// Database-backed implementation of every backend trait.
pub struct SqlBackend {
    pool: DbPool,
    session_timeout_secs: u64,
}

impl SqlBackend {
    pub fn new(pool: DbPool, session_timeout_secs: u64) -> Self {
        Self {
            pool,
            session_timeout_secs,
        }
    }

    /// Hash a password using Argon2id.
    pub fn hash_password(password: &str) -> StoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StoreError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Generate a cryptographically secure session ID.
    fn generate_session_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    }

    /// Create an account and return its id.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> StoreResult<String> {
        let email = email.trim().to_lowercase();
        if self.find_account(&email).await?.is_some() {
            return Err(StoreError::Conflict(email));
        }

        let id = Uuid::new_v4().to_string();
        let password_hash = Self::hash_password(password)?;

        sqlx::query(sql::INSERT_ACCOUNT)
            .bind(&id)
            .bind(&email)
            .bind(&password_hash)
            .bind(full_name)
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        info!(%email, "Created account");
        Ok(id)
    }

    /// Look up an account by email.
    pub async fn find_account(&self, email: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query(sql::SELECT_ACCOUNT_BY_EMAIL)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| account_from_row(&row)).transpose()
    }

    pub async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(sql::SELECT_ALL_ACCOUNTS)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(account_from_row).collect()
    }

    /// Grant a role. Granting twice is a no-op.
    pub async fn grant_role(&self, user_id: &str, role: AppRole) -> StoreResult<()> {
        sqlx::query(sql::INSERT_ROLE)
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_project(&self, project: &NewProject) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(sql::INSERT_PROJECT)
            .bind(&id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(project.status.as_str())
            .bind(project.budget.map(i64::from))
            .bind(project.start_date.map(|d| d.to_string()))
            .bind(project.end_date.map(|d| d.to_string()))
            .bind(&project.client_id)
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    /// Newest submissions first. Local access needs no viewer.
    pub async fn list_submissions(&self, limit: usize) -> StoreResult<Vec<ContactSubmission>> {
        let rows = sqlx::query(sql::SELECT_RECENT_SUBMISSIONS)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(submission_from_row).collect()
    }

    /// Delete all expired sessions (background cleanup task).
    pub async fn cleanup_expired_sessions(&self) -> StoreResult<u64> {
        let result = sqlx::query(sql::DELETE_EXPIRED_SESSIONS)
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn open_session(&self, user_id: &str) -> StoreResult<SessionGrant> {
        let session_id = Self::generate_session_id();
        let now = Utc::now();
        let expires_at = i64::try_from(self.session_timeout_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "session timeout of {}s is out of range",
                    self.session_timeout_secs
                ))
            })?;

        sqlx::query(sql::INSERT_SESSION)
            .bind(&session_id)
            .bind(user_id)
            .bind(timestamp(now))
            .bind(timestamp(expires_at))
            .execute(&self.pool)
            .await?;

        // Don't fail the sign-in if this doesn't work
        sqlx::query(sql::UPDATE_ACCOUNT_LAST_LOGIN)
            .bind(timestamp(now))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .ok();

        Ok(SessionGrant {
            token: session_id,
            user_id: user_id.to_string(),
        })
    }
}

fn parse_required_timestamp(row: &DbRow, column: &str) -> StoreResult<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    parse_timestamp(&raw).ok_or_else(|| StoreError::Corrupt(format!("invalid {column}: {raw}")))
}

fn parse_optional_date(row: &DbRow, column: &str) -> StoreResult<Option<NaiveDate>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        s.parse::<NaiveDate>()
            .map_err(|e| StoreError::Corrupt(format!("invalid {column} '{s}': {e}")))
    })
    .transpose()
}

fn parse_amount(row: &DbRow, column: &str) -> StoreResult<Option<u32>> {
    let raw: Option<i64> = row.try_get(column)?;
    raw.map(|v| u32::try_from(v).map_err(|_| StoreError::Corrupt(format!("invalid {column}: {v}"))))
        .transpose()
}

fn account_from_row(row: &DbRow) -> StoreResult<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        created_at: parse_required_timestamp(row, "created_at")?,
        last_login: row
            .try_get::<Option<String>, _>("last_login")?
            .and_then(|s| parse_timestamp(&s)),
    })
}

fn submission_from_row(row: &DbRow) -> StoreResult<ContactSubmission> {
    let selected_addons = row
        .try_get::<Option<String>, _>("selected_addons")?
        .map(|json| {
            serde_json::from_str::<Vec<String>>(&json)
                .map_err(|e| StoreError::Corrupt(format!("invalid selected_addons: {e}")))
        })
        .transpose()?;

    Ok(ContactSubmission {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        company: row.try_get("company")?,
        message: row.try_get("message")?,
        status: row.try_get("status")?,
        created_at: parse_required_timestamp(row, "created_at")?,
        selected_package: row.try_get("selected_package")?,
        selected_addons,
        estimated_total: parse_amount(row, "estimated_total")?,
    })
}

fn project_from_row(row: &DbRow) -> StoreResult<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: ProjectStatus::parse_lenient(&row.try_get::<String, _>("status")?),
        budget: parse_amount(row, "budget")?,
        start_date: parse_optional_date(row, "start_date")?,
        end_date: parse_optional_date(row, "end_date")?,
        client_id: row.try_get("client_id")?,
        created_at: parse_required_timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl SessionProvider for SqlBackend {
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Option<SessionGrant>> {
        let account = match self.find_account(email).await? {
            Some(a) => a,
            None => return Ok(None),
        };

        if !Self::verify_password(password, &account.password_hash) {
            return Ok(None);
        }

        self.open_session(&account.id).await.map(Some)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> StoreResult<SignUpOutcome> {
        let user_id = self.create_account(email, password, full_name).await?;
        self.grant_role(&user_id, AppRole::Client).await?;
        let grant = self.open_session(&user_id).await?;
        Ok(SignUpOutcome::SignedIn(grant))
    }

    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>> {
        let row = sqlx::query(sql::SELECT_SESSION_USER)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at = parse_required_timestamp(&row, "expires_at")?;
        if expires_at < Utc::now() {
            debug!("Session expired, deleting");
            self.sign_out(token).await.ok();
            return Ok(None);
        }

        Ok(Some(AuthUser {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            access_token: token.to_string(),
        }))
    }

    async fn sign_out(&self, token: &str) -> StoreResult<()> {
        sqlx::query(sql::DELETE_SESSION)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for SqlBackend {
    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<()> {
        let addons_json = submission
            .selected_addons
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        sqlx::query(sql::INSERT_SUBMISSION)
            .bind(Uuid::new_v4().to_string())
            .bind(&submission.name)
            .bind(&submission.email)
            .bind(&submission.phone)
            .bind(&submission.company)
            .bind(&submission.message)
            .bind(STATUS_NEW)
            .bind(timestamp(Utc::now()))
            .bind(&submission.selected_package)
            .bind(addons_json)
            .bind(submission.estimated_total.map(i64::from))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn recent_submissions(
        &self,
        _viewer: &AuthUser,
        limit: usize,
    ) -> StoreResult<Vec<ContactSubmission>> {
        self.list_submissions(limit).await
    }
}

#[async_trait]
impl ProjectRepository for SqlBackend {
    async fn list_projects(
        &self,
        _viewer: &AuthUser,
        client_id: Option<&str>,
    ) -> StoreResult<Vec<Project>> {
        let rows = match client_id {
            Some(id) => {
                sqlx::query(sql::SELECT_CLIENT_PROJECTS)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(sql::SELECT_ALL_PROJECTS)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(project_from_row).collect()
    }
}

#[async_trait]
impl RoleRepository for SqlBackend {
    async fn has_role(&self, viewer: &AuthUser, role: AppRole) -> StoreResult<bool> {
        let row = sqlx::query(sql::SELECT_ROLE)
            .bind(&viewer.id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::Database;
    use tempfile::TempDir;

    async fn backend(temp: &TempDir) -> SqlBackend {
        let db = Database::new(&DatabaseConfig::default(), temp.path())
            .await
            .unwrap();
        SqlBackend::new(db.pool(), 3600)
    }

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = SqlBackend::hash_password(password).unwrap();

        // Hash should be different from password
        assert_ne!(hash, password);

        // Should verify correctly
        assert!(SqlBackend::verify_password(password, &hash));

        // Wrong password should fail
        assert!(!SqlBackend::verify_password("wrong_password", &hash));
    }

    #[tokio::test]
    async fn test_sign_up_sign_in_sign_out() {
        let temp = TempDir::new().unwrap();
        let backend = backend(&temp).await;

        let outcome = backend
            .sign_up("Client@Example.com", "hunter22", Some("Casey Client"))
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));

        assert!(backend.sign_in("client@example.com", "wrong").await.unwrap().is_none());
        let grant = backend
            .sign_in("client@example.com", "hunter22")
            .await
            .unwrap()
            .unwrap();

        let user = backend.current_user(&grant.token).await.unwrap().unwrap();
        assert_eq!(user.email, "client@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Casey Client"));
        assert!(backend.has_role(&user, AppRole::Client).await.unwrap());
        assert!(!backend.has_role(&user, AppRole::Admin).await.unwrap());

        backend.sign_out(&grant.token).await.unwrap();
        assert!(backend.current_user(&grant.token).await.unwrap().is_none());

        let err = backend
            .sign_up("client@example.com", "another1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&DatabaseConfig::default(), temp.path())
            .await
            .unwrap();
        let backend = SqlBackend::new(db.pool(), 0);
        backend.create_account("a@example.com", "pw123456", None).await.unwrap();
        let grant = backend.sign_in("a@example.com", "pw123456").await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(backend.current_user(&grant.token).await.unwrap().is_none());
        assert_eq!(backend.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_timeout_fails_sign_in() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&DatabaseConfig::default(), temp.path())
            .await
            .unwrap();
        let backend = SqlBackend::new(db.pool(), u64::MAX / 2);
        backend.create_account("a@example.com", "pw123456", None).await.unwrap();

        let err = backend.sign_in("a@example.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        let err = backend.sign_up("b@example.com", "pw123456", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_submissions_roundtrip_newest_first() {
        let temp = TempDir::new().unwrap();
        let backend = backend(&temp).await;
        let admin_id = backend.create_account("admin@example.com", "pw123456", None).await.unwrap();
        backend.grant_role(&admin_id, AppRole::Admin).await.unwrap();
        backend.grant_role(&admin_id, AppRole::Admin).await.unwrap();
        let grant = backend.sign_in("admin@example.com", "pw123456").await.unwrap().unwrap();
        let admin = backend.current_user(&grant.token).await.unwrap().unwrap();
        assert!(backend.has_role(&admin, AppRole::Admin).await.unwrap());

        for i in 0..12u32 {
            let with_selection = i % 2 == 0;
            backend
                .insert_submission(&NewSubmission {
                    name: format!("Visitor {i}"),
                    email: format!("v{i}@example.com"),
                    phone: None,
                    company: Some("Acme".into()),
                    message: "Please build us a site".into(),
                    selected_package: with_selection.then(|| "Professional Website".to_string()),
                    selected_addons: with_selection.then(|| vec!["CMS Integration".to_string()]),
                    estimated_total: with_selection.then_some(5199),
                })
                .await
                .unwrap();
        }

        let recent = backend.recent_submissions(&admin, 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].name, "Visitor 11");
        assert_eq!(recent[1].name, "Visitor 10");
        assert_eq!(recent[1].selected_addons, Some(vec!["CMS Integration".to_string()]));
        assert_eq!(recent[1].estimated_total, Some(5199));
        assert_eq!(recent[0].selected_package, None);
        assert!(recent.iter().all(|s| s.status == "new"));
    }

    #[tokio::test]
    async fn test_projects_by_client() {
        let temp = TempDir::new().unwrap();
        let backend = backend(&temp).await;
        let client_id = backend.create_account("c@example.com", "pw123456", None).await.unwrap();
        let grant = backend.sign_in("c@example.com", "pw123456").await.unwrap().unwrap();
        let client = backend.current_user(&grant.token).await.unwrap().unwrap();

        let mut project = NewProject {
            title: "Bakery site".into(),
            description: Some("Online ordering".into()),
            status: ProjectStatus::InProgress,
            budget: Some(7700),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: None,
            client_id: client_id.clone(),
        };
        backend.create_project(&project).await.unwrap();
        project.title = "Someone else's".into();
        project.client_id = "other".into();
        backend.create_project(&project).await.unwrap();

        let mine = backend.list_projects(&client, Some(&client_id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Bakery site");
        assert_eq!(mine[0].status, ProjectStatus::InProgress);
        assert_eq!(mine[0].budget, Some(7700));
        assert_eq!(mine[0].start_date, NaiveDate::from_ymd_opt(2026, 3, 1));

        let all = backend.list_projects(&client, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Someone else's");
    }
}
