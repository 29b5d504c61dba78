//! In-process backend.
//!
//! Keeps everything in memory and can be told to fail individual
//! operations, which makes it the fake used by the router tests. Passwords
//! are kept as given; never point real traffic at it.

use super::{
    ContactRepository, ProjectRepository, RoleRepository, SessionProvider, SignUpOutcome,
    StoreError, StoreResult,
};
use crate::model::{
    AppRole, AuthUser, ContactSubmission, NewSubmission, Project, STATUS_NEW, SessionGrant,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SignIn,
    SignUp,
    CurrentUser,
    InsertSubmission,
    RecentSubmissions,
    ListProjects,
    HasRole,
}

#[derive(Debug, Clone)]
struct MemoryUser {
    id: String,
    email: String,
    password: String,
    full_name: Option<String>,
}

#[derive(Default)]
struct Tables {
    users: Vec<MemoryUser>,
    sessions: HashMap<String, String>,
    roles: Vec<(String, AppRole)>,
    submissions: Vec<ContactSubmission>,
    projects: Vec<Project>,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<Operation>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail until [`MemoryBackend::recover`] is called.
    pub async fn fail(&self, op: Operation) {
        self.failing.write().await.insert(op);
    }

    pub async fn recover(&self, op: Operation) {
        self.failing.write().await.remove(&op);
    }

    async fn check(&self, op: Operation) -> StoreResult<()> {
        if self.failing.read().await.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} is failing")));
        }
        Ok(())
    }

    /// Create a user and return its id.
    pub async fn add_user(&self, email: &str, password: &str, full_name: Option<&str>) -> String {
        let id = Uuid::new_v4().to_string();
        self.tables.write().await.users.push(MemoryUser {
            id: id.clone(),
            email: email.to_lowercase(),
            password: password.to_string(),
            full_name: full_name.map(str::to_string),
        });
        id
    }

    pub async fn grant_role(&self, user_id: &str, role: AppRole) {
        self.tables
            .write()
            .await
            .roles
            .push((user_id.to_string(), role));
    }

    pub async fn add_project(&self, project: Project) {
        self.tables.write().await.projects.push(project);
    }

    /// Stored submissions in insertion order.
    pub async fn submissions(&self) -> Vec<ContactSubmission> {
        self.tables.read().await.submissions.clone()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    fn open_session(tables: &mut Tables, user_id: &str) -> SessionGrant {
        let token = Uuid::new_v4().simple().to_string();
        tables.sessions.insert(token.clone(), user_id.to_string());
        SessionGrant {
            token,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl SessionProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Option<SessionGrant>> {
        self.check(Operation::SignIn).await?;
        let mut tables = self.tables.write().await;
        let email = email.to_lowercase();
        let Some(user) = tables
            .users
            .iter()
            .find(|u| u.email == email && u.password == password)
            .cloned()
        else {
            return Ok(None);
        };
        Ok(Some(Self::open_session(&mut tables, &user.id)))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> StoreResult<SignUpOutcome> {
        self.check(Operation::SignUp).await?;
        let email = email.to_lowercase();
        if self.tables.read().await.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict(email));
        }
        let id = self.add_user(&email, password, full_name).await;
        self.grant_role(&id, AppRole::Client).await;
        let mut tables = self.tables.write().await;
        Ok(SignUpOutcome::SignedIn(Self::open_session(&mut tables, &id)))
    }

    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>> {
        self.check(Operation::CurrentUser).await?;
        let tables = self.tables.read().await;
        let user = tables
            .sessions
            .get(token)
            .and_then(|user_id| tables.users.iter().find(|u| &u.id == user_id))
            .map(|u| AuthUser {
                id: u.id.clone(),
                email: u.email.clone(),
                full_name: u.full_name.clone(),
                access_token: token.to_string(),
            });
        Ok(user)
    }

    async fn sign_out(&self, token: &str) -> StoreResult<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for MemoryBackend {
    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<()> {
        self.check(Operation::InsertSubmission).await?;
        self.tables
            .write()
            .await
            .submissions
            .push(ContactSubmission {
                id: Uuid::new_v4().to_string(),
                name: submission.name.clone(),
                email: submission.email.clone(),
                phone: submission.phone.clone(),
                company: submission.company.clone(),
                message: submission.message.clone(),
                status: STATUS_NEW.to_string(),
                created_at: Utc::now(),
                selected_package: submission.selected_package.clone(),
                selected_addons: submission.selected_addons.clone(),
                estimated_total: submission.estimated_total,
            });
        Ok(())
    }

    async fn recent_submissions(
        &self,
        _viewer: &AuthUser,
        limit: usize,
    ) -> StoreResult<Vec<ContactSubmission>> {
        self.check(Operation::RecentSubmissions).await?;
        let mut rows = self.tables.read().await.submissions.clone();
        // Stable sort keeps later inserts first among equal timestamps.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl ProjectRepository for MemoryBackend {
    async fn list_projects(
        &self,
        _viewer: &AuthUser,
        client_id: Option<&str>,
    ) -> StoreResult<Vec<Project>> {
        self.check(Operation::ListProjects).await?;
        let mut rows: Vec<Project> = self
            .tables
            .read()
            .await
            .projects
            .iter()
            .filter(|p| client_id.is_none_or(|id| p.client_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl RoleRepository for MemoryBackend {
    async fn has_role(&self, viewer: &AuthUser, role: AppRole) -> StoreResult<bool> {
        self.check(Operation::HasRole).await?;
        Ok(self
            .tables
            .read()
            .await
            .roles
            .iter()
            .any(|(user_id, r)| *user_id == viewer.id && *r == role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectStatus;
    use chrono::Duration;

    async fn signed_in(backend: &MemoryBackend, email: &str) -> AuthUser {
        let grant = backend.sign_in(email, "secret-pw").await.unwrap().unwrap();
        backend.current_user(&grant.token).await.unwrap().unwrap()
    }

    fn project(title: &str, client_id: &str, age_days: i64) -> Project {
        Project {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: None,
            status: ProjectStatus::InProgress,
            budget: None,
            start_date: None,
            end_date: None,
            client_id: client_id.to_string(),
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let backend = MemoryBackend::new();
        backend.add_user("ada@example.com", "secret-pw", Some("Ada")).await;

        assert!(backend.sign_in("ada@example.com", "nope").await.unwrap().is_none());
        let grant = backend.sign_in("ADA@example.com", "secret-pw").await.unwrap().unwrap();
        let user = backend.current_user(&grant.token).await.unwrap().unwrap();
        assert_eq!(user.full_name.as_deref(), Some("Ada"));

        backend.sign_out(&grant.token).await.unwrap();
        assert!(backend.current_user(&grant.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_conflict_and_client_role() {
        let backend = MemoryBackend::new();
        let outcome = backend.sign_up("new@example.com", "secret-pw", None).await.unwrap();
        let SignUpOutcome::SignedIn(grant) = outcome else {
            panic!("expected a session");
        };
        let user = backend.current_user(&grant.token).await.unwrap().unwrap();
        assert!(backend.has_role(&user, AppRole::Client).await.unwrap());
        assert!(!backend.has_role(&user, AppRole::Admin).await.unwrap());

        let err = backend.sign_up("new@example.com", "other-pw", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_projects_filtered_and_newest_first() {
        let backend = MemoryBackend::new();
        let id = backend.add_user("c@example.com", "secret-pw", None).await;
        backend.add_project(project("Old", &id, 10)).await;
        backend.add_project(project("New", &id, 1)).await;
        backend.add_project(project("Other", "someone-else", 0)).await;
        let user = signed_in(&backend, "c@example.com").await;

        let mine = backend.list_projects(&user, Some(&id)).await.unwrap();
        let titles: Vec<_> = mine.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old"]);

        let all = backend.list_projects(&user, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Other");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.add_user("x@example.com", "secret-pw", None).await;
        let user = signed_in(&backend, "x@example.com").await;

        backend.fail(Operation::HasRole).await;
        assert!(matches!(
            backend.has_role(&user, AppRole::Admin).await,
            Err(StoreError::Unavailable(_))
        ));
        backend.recover(Operation::HasRole).await;
        assert!(!backend.has_role(&user, AppRole::Admin).await.unwrap());
    }
}
