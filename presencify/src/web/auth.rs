//! Sign in, sign up and sign out.

use crate::contact::is_valid_email;
use crate::portal::current_user;
use crate::store::{SignUpOutcome, StoreError};
use crate::web::AppState;
use crate::web::session::{
    Notice, SetCookies, clear_session_cookie, notice_cookie, page, pending_notice, see_other,
    session_cookie, session_token,
};
use crate::web::templates::{AuthTemplate, Layout, render};
use axum::{Form, extract::State, http::StatusCode, response::Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

pub const MIN_PASSWORD_LEN: usize = 6;

const GENERIC_ERROR: &str = "An error occurred. Please try again.";

#[derive(Default)]
struct AuthView {
    error: Option<String>,
    info: Option<String>,
    email: String,
    full_name: String,
    show_signup: bool,
}

fn auth_page_response(view: AuthView, status: StatusCode, jar: &CookieJar) -> Response {
    let template = AuthTemplate {
        layout: Layout::new("/auth", "Sign In").with_notice(pending_notice(jar)),
        error: view.error,
        info: view.info,
        email: view.email,
        full_name: view.full_name,
        show_signup: view.show_signup,
    };
    page(status, render(&template), SetCookies::new().consume_notice(jar))
}

fn signed_in_redirect(state: &AppState, token: &str) -> Response {
    see_other(
        "/client",
        SetCookies::new().with(session_cookie(
            token,
            state.session_timeout_secs,
            state.secure_cookies,
        )),
    )
}

/// Sign-in and sign-up forms. Signed-in visitors go straight to their portal.
pub async fn auth_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let token = session_token(&jar);
    if current_user(state.backend.as_ref(), token.as_deref())
        .await
        .is_some()
    {
        return see_other("/client", SetCookies::new());
    }

    auth_page_response(AuthView::default(), StatusCode::OK, &jar)
}

#[derive(Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    let email = form.email.trim().to_string();

    match state.backend.sign_in(&email, &form.password).await {
        Ok(Some(grant)) => {
            info!(user_id = %grant.user_id, "User signed in");
            signed_in_redirect(&state, &grant.token)
        }
        Ok(None) => auth_page_response(
            AuthView {
                error: Some("Invalid email or password".to_string()),
                email,
                ..AuthView::default()
            },
            StatusCode::UNAUTHORIZED,
            &jar,
        ),
        Err(e) => {
            error!("Sign-in error: {}", e);
            auth_page_response(
                AuthView {
                    error: Some(GENERIC_ERROR.to_string()),
                    email,
                    ..AuthView::default()
                },
                StatusCode::SERVICE_UNAVAILABLE,
                &jar,
            )
        }
    }
}

#[derive(Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> Response {
    let email = form.email.trim().to_string();
    let full_name = form.full_name.trim().to_string();
    let failed = |error: &str, status: StatusCode| {
        auth_page_response(
            AuthView {
                error: Some(error.to_string()),
                email: email.clone(),
                full_name: full_name.clone(),
                show_signup: true,
                ..AuthView::default()
            },
            status,
            &jar,
        )
    };

    if !is_valid_email(&email) {
        return failed("Invalid email address", StatusCode::UNPROCESSABLE_ENTITY);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return failed(
            "Password must be at least 6 characters",
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }

    let name = (!full_name.is_empty()).then_some(full_name.as_str());
    match state.backend.sign_up(&email, &form.password, name).await {
        Ok(SignUpOutcome::SignedIn(grant)) => {
            info!(user_id = %grant.user_id, "Account created");
            signed_in_redirect(&state, &grant.token)
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            info!("Account created, awaiting email confirmation");
            auth_page_response(
                AuthView {
                    info: Some("Check your email to confirm your account".to_string()),
                    email: email.clone(),
                    ..AuthView::default()
                },
                StatusCode::OK,
                &jar,
            )
        }
        Err(StoreError::Conflict(_)) => failed(
            "An account with this email already exists",
            StatusCode::CONFLICT,
        ),
        Err(e) => {
            error!("Sign-up error: {}", e);
            failed(GENERIC_ERROR, StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// End the session and return to the landing page.
pub async fn sign_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(token) = session_token(&jar)
        && let Err(e) = state.backend.sign_out(&token).await
    {
        error!("Failed to end session: {}", e);
    }

    see_other(
        "/",
        SetCookies::new()
            .with(clear_session_cookie(state.secure_cookies))
            .with(notice_cookie(Notice::SignedOut)),
    )
}
