//! Client and admin portal handlers.

use crate::portal::{AdminDashboard, ClientDashboard, PortalAccess, resolve_admin, resolve_client};
use crate::web::AppState;
use crate::web::session::{
    Notice, SetCookies, clear_session_cookie, notice_cookie, page, pending_notice, see_other,
    session_token,
};
use crate::web::templates::{
    AdminTemplate, ClientTemplate, Layout, MessageTemplate, ProjectSummary, SubmissionSummary,
    render,
};
use axum::{extract::State, http::StatusCode, response::Response};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::error;

/// Send a signed-out visitor to the auth page, dropping a dead session cookie.
fn to_auth(state: &AppState, had_token: bool) -> Response {
    let mut cookies = SetCookies::new();
    if had_token {
        cookies.push(clear_session_cookie(state.secure_cookies));
    }
    see_other("/auth", cookies)
}

pub async fn client(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let token = session_token(&jar);
    let user = match resolve_client(state.backend.as_ref(), token.as_deref()).await {
        PortalAccess::Authorized(user) => user,
        _ => return to_auth(&state, token.is_some()),
    };

    let mut notice = pending_notice(&jar);
    let (dashboard, failed) = match ClientDashboard::load(state.backend.as_ref(), &user).await {
        Ok(dashboard) => (dashboard, false),
        Err(e) => {
            error!(user_id = %user.id, "Failed to load client projects: {}", e);
            notice = Some(Notice::ProjectsLoadFailed);
            (ClientDashboard::default(), true)
        }
    };

    let template = ClientTemplate {
        layout: Layout::new("/client", "Client Portal")
            .with_notice(notice)
            .signed_in(),
        greeting: user.email.clone(),
        failed,
        projects: dashboard.projects.iter().map(ProjectSummary::from).collect(),
        total: dashboard.total(),
        in_progress: dashboard.in_progress(),
        completed: dashboard.completed(),
    };
    page(
        StatusCode::OK,
        render(&template),
        SetCookies::new().consume_notice(&jar),
    )
}

pub async fn admin(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let token = session_token(&jar);
    let user = match resolve_admin(state.backend.as_ref(), token.as_deref()).await {
        PortalAccess::Authorized(user) => user,
        PortalAccess::Unauthenticated => return to_auth(&state, token.is_some()),
        PortalAccess::Denied(_) => {
            return see_other(
                "/client",
                SetCookies::new().with(notice_cookie(Notice::AccessDenied)),
            );
        }
        PortalAccess::RoleCheckFailed(_) => {
            let template = MessageTemplate {
                layout: Layout::new("/admin", "Admin Portal").signed_in(),
                heading: "We couldn't verify your permissions",
                detail: "Please try again in a moment.",
                link_href: "/client",
                link_label: "Go to Client Portal",
            };
            return page(
                StatusCode::SERVICE_UNAVAILABLE,
                render(&template),
                SetCookies::new(),
            );
        }
    };

    let mut notice = pending_notice(&jar);
    let (dashboard, failed) = match AdminDashboard::load(state.backend.as_ref(), &user).await {
        Ok(dashboard) => (dashboard, false),
        Err(e) => {
            error!(user_id = %user.id, "Failed to load admin data: {}", e);
            notice = Some(Notice::LoadFailed);
            (AdminDashboard::default(), true)
        }
    };

    let template = AdminTemplate {
        layout: Layout::new("/admin", "Admin Portal")
            .with_notice(notice)
            .signed_in(),
        failed,
        submissions: dashboard
            .submissions
            .iter()
            .map(SubmissionSummary::from)
            .collect(),
        projects: dashboard.projects.iter().map(ProjectSummary::from).collect(),
        new_contacts: dashboard.new_contacts(),
        total_projects: dashboard.total_projects(),
        active_projects: dashboard.active_projects(),
        clients: dashboard.distinct_clients(),
    };
    page(
        StatusCode::OK,
        render(&template),
        SetCookies::new().consume_notice(&jar),
    )
}
