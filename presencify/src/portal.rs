//! Access decisions and data loading for the client and admin portals.
//!
//! Every portal request walks the same small state machine: resolve the
//! session, (admin only) check role membership once, then fetch. The web
//! layer maps each [`PortalAccess`] outcome to a redirect or a page.

use crate::model::{AppRole, AuthUser, ContactSubmission, Project, ProjectStatus, STATUS_NEW};
use crate::store::{Backend, StoreResult};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Submissions shown on the admin dashboard.
pub const RECENT_SUBMISSIONS: usize = 10;

/// Outcome of the access check for one portal request.
#[derive(Debug, Clone, PartialEq)]
pub enum PortalAccess {
    /// No session, or the session is unknown or expired.
    Unauthenticated,
    /// Signed in but without the required role.
    Denied(AuthUser),
    /// The role lookup itself failed; membership is unknown.
    RoleCheckFailed(AuthUser),
    Authorized(AuthUser),
}

/// Resolve the signed-in user for a session token.
///
/// A backend failure here is logged and treated as signed out.
pub async fn current_user(backend: &dyn Backend, token: Option<&str>) -> Option<AuthUser> {
    let token = token?;
    match backend.current_user(token).await {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to resolve session: {}", e);
            None
        }
    }
}

/// Any signed-in user may enter the client portal.
pub async fn resolve_client(backend: &dyn Backend, token: Option<&str>) -> PortalAccess {
    match current_user(backend, token).await {
        Some(user) => PortalAccess::Authorized(user),
        None => PortalAccess::Unauthenticated,
    }
}

/// The admin portal additionally needs the `admin` role.
pub async fn resolve_admin(backend: &dyn Backend, token: Option<&str>) -> PortalAccess {
    let Some(user) = current_user(backend, token).await else {
        return PortalAccess::Unauthenticated;
    };

    match backend.has_role(&user, AppRole::Admin).await {
        Ok(true) => PortalAccess::Authorized(user),
        Ok(false) => {
            info!(user_id = %user.id, "Admin access denied");
            PortalAccess::Denied(user)
        }
        Err(e) => {
            warn!(user_id = %user.id, "Admin role check failed: {}", e);
            PortalAccess::RoleCheckFailed(user)
        }
    }
}

/// Projects belonging to one client.
#[derive(Debug, Clone, Default)]
pub struct ClientDashboard {
    pub projects: Vec<Project>,
}

impl ClientDashboard {
    pub async fn load(backend: &dyn Backend, user: &AuthUser) -> StoreResult<Self> {
        let projects = backend.list_projects(user, Some(&user.id)).await?;
        Ok(Self { projects })
    }

    pub fn total(&self) -> usize {
        self.projects.len()
    }

    pub fn in_progress(&self) -> usize {
        count_status(&self.projects, ProjectStatus::InProgress)
    }

    pub fn completed(&self) -> usize {
        count_status(&self.projects, ProjectStatus::Completed)
    }
}

/// Recent submissions and every project.
#[derive(Debug, Clone, Default)]
pub struct AdminDashboard {
    pub submissions: Vec<ContactSubmission>,
    pub projects: Vec<Project>,
}

impl AdminDashboard {
    /// Both lists are fetched concurrently and both must succeed.
    pub async fn load(backend: &dyn Backend, user: &AuthUser) -> StoreResult<Self> {
        let (submissions, projects) = tokio::try_join!(
            backend.recent_submissions(user, RECENT_SUBMISSIONS),
            backend.list_projects(user, None),
        )?;
        Ok(Self {
            submissions,
            projects,
        })
    }

    pub fn new_contacts(&self) -> usize {
        self.submissions
            .iter()
            .filter(|s| s.status == STATUS_NEW)
            .count()
    }

    pub fn total_projects(&self) -> usize {
        self.projects.len()
    }

    pub fn active_projects(&self) -> usize {
        count_status(&self.projects, ProjectStatus::InProgress)
    }

    pub fn distinct_clients(&self) -> usize {
        self.projects
            .iter()
            .map(|p| p.client_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

fn count_status(projects: &[Project], status: ProjectStatus) -> usize {
    projects.iter().filter(|p| p.status == status).count()
}
