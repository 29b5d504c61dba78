//! Cookies: sign-in session and one-shot notices.

use axum::{
    http::{StatusCode, header},
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

/// Session token issued by the backend.
pub const SESSION_COOKIE: &str = "presencify_session";

/// Key of a [`Notice`] to show once on the next page.
pub const NOTICE_COOKIE: &str = "presencify_notice";

/// Session token from the request, if any.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn secure_attr(secure: bool) -> &'static str {
    if secure { "; Secure" } else { "" }
}

pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}{}",
        secure_attr(secure)
    )
}

pub fn clear_session_cookie(secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        secure_attr(secure)
    )
}

pub fn notice_cookie(notice: Notice) -> String {
    format!("{NOTICE_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", notice.key())
}

fn clear_notice_cookie() -> String {
    format!("{NOTICE_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// One-line messages shown at the top of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ContactSent,
    ContactFailed,
    AccessDenied,
    LoadFailed,
    ProjectsLoadFailed,
    SignedOut,
}

impl Notice {
    pub fn key(&self) -> &'static str {
        match self {
            Notice::ContactSent => "contact-sent",
            Notice::ContactFailed => "contact-failed",
            Notice::AccessDenied => "access-denied",
            Notice::LoadFailed => "load-failed",
            Notice::ProjectsLoadFailed => "projects-load-failed",
            Notice::SignedOut => "signed-out",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "contact-sent" => Some(Notice::ContactSent),
            "contact-failed" => Some(Notice::ContactFailed),
            "access-denied" => Some(Notice::AccessDenied),
            "load-failed" => Some(Notice::LoadFailed),
            "projects-load-failed" => Some(Notice::ProjectsLoadFailed),
            "signed-out" => Some(Notice::SignedOut),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Notice::ContactSent => "Message sent successfully!",
            Notice::ContactFailed => "Error sending message",
            Notice::AccessDenied => "Access Denied",
            Notice::LoadFailed => "Error loading data",
            Notice::ProjectsLoadFailed => "Error loading projects",
            Notice::SignedOut => "Signed out",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Notice::ContactSent => "We'll get back to you within 24 hours.",
            Notice::ContactFailed => "Please try again or email us directly.",
            Notice::AccessDenied => "You don't have admin permissions",
            Notice::LoadFailed | Notice::ProjectsLoadFailed => "Please try again later",
            Notice::SignedOut => "See you next time.",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::ContactFailed
                | Notice::AccessDenied
                | Notice::LoadFailed
                | Notice::ProjectsLoadFailed
        )
    }
}

/// Pending flash notice. Unknown keys are ignored.
pub fn pending_notice(jar: &CookieJar) -> Option<Notice> {
    jar.get(NOTICE_COOKIE)
        .and_then(|c| Notice::from_key(c.value()))
}

/// Cookie updates attached to a response.
#[derive(Debug, Default)]
pub struct SetCookies(Vec<String>);

impl SetCookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cookie: String) {
        self.0.push(cookie);
    }

    pub fn with(mut self, cookie: String) -> Self {
        self.0.push(cookie);
        self
    }

    /// Clear the flash cookie once the request carried one.
    pub fn consume_notice(mut self, jar: &CookieJar) -> Self {
        if jar.get(NOTICE_COOKIE).is_some() {
            self.0.push(clear_notice_cookie());
        }
        self
    }

    fn into_headers(self) -> Vec<(header::HeaderName, String)> {
        self.0
            .into_iter()
            .map(|c| (header::SET_COOKIE, c))
            .collect()
    }
}

/// 303 to `location`, applying `cookies`.
pub fn see_other(location: &str, cookies: SetCookies) -> Response {
    let mut headers = vec![(header::LOCATION, location.to_string())];
    headers.extend(cookies.into_headers());
    (StatusCode::SEE_OTHER, AppendHeaders(headers)).into_response()
}

/// Rendered page with a status and cookie updates.
pub fn page(status: StatusCode, html: Html<String>, cookies: SetCookies) -> Response {
    (status, AppendHeaders(cookies.into_headers()), html).into_response()
}
