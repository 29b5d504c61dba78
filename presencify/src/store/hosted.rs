//! Hosted backend-as-a-service client.
//!
//! Talks to a PostgREST data API (`/rest/v1`) and a GoTrue auth API
//! (`/auth/v1`). Row-level authorization is enforced by the hosted project:
//! queries made for a signed-in user carry that user's access token, anonymous
//! writes carry the anon key.

use super::{
    ContactRepository, ProjectRepository, RoleRepository, SessionProvider, SignUpOutcome,
    StoreError, StoreResult,
};
use crate::config::HostedConfig;
use crate::model::{AppRole, AuthUser, ContactSubmission, NewSubmission, Project, ProjectStatus, SessionGrant};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// PostgREST code for "single row requested, none (or many) found".
const NO_SINGLE_ROW: &str = "PGRST116";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub struct HostedBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct HostedUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl HostedUser {
    fn into_auth_user(self, access_token: &str) -> AuthUser {
        let full_name = self
            .user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        AuthUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
            full_name,
            access_token: access_token.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: HostedUser,
}

/// Sign-up answers with a session when confirmation is off, or with the bare
/// user when the address must be confirmed first.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<HostedUser>,
}

#[derive(Debug, Deserialize)]
struct SubmissionRow {
    id: Value,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    message: String,
    #[serde(default)]
    status: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    selected_package: Option<String>,
    #[serde(default)]
    selected_addons: Option<Vec<String>>,
    #[serde(default)]
    estimated_total: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    id: Value,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    budget: Option<f64>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    client_id: String,
    created_at: DateTime<Utc>,
}

/// Row ids may be uuids (strings) or serial integers.
fn id_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn whole_dollars(value: Option<f64>, column: &str) -> StoreResult<Option<u32>> {
    match value {
        None => Ok(None),
        Some(v) if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) => {
            Ok(Some(v.round() as u32))
        }
        Some(v) => Err(StoreError::Corrupt(format!("invalid {column}: {v}"))),
    }
}

impl TryFrom<SubmissionRow> for ContactSubmission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> StoreResult<Self> {
        Ok(ContactSubmission {
            id: id_string(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            message: row.message,
            status: row.status.unwrap_or_else(|| crate::model::STATUS_NEW.to_string()),
            created_at: row.created_at,
            selected_package: row.selected_package,
            selected_addons: row.selected_addons,
            estimated_total: whole_dollars(row.estimated_total, "estimated_total")?,
        })
    }
}

impl TryFrom<ProjectRow> for Project {
    type Error = StoreError;

    fn try_from(row: ProjectRow) -> StoreResult<Self> {
        Ok(Project {
            id: id_string(row.id),
            title: row.title,
            description: row.description,
            status: row
                .status
                .as_deref()
                .map(ProjectStatus::parse_lenient)
                .unwrap_or_default(),
            budget: whole_dollars(row.budget, "budget")?,
            start_date: row.start_date,
            end_date: row.end_date,
            client_id: row.client_id,
            created_at: row.created_at,
        })
    }
}

/// Pull the error code and message out of a PostgREST or GoTrue error body.
fn parse_error_body(body: &str) -> (Option<String>, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, body.trim().to_string());
    };
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    let code = text("code").or_else(|| text("error_code")).or_else(|| text("error"));
    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .unwrap_or_else(|| body.trim().to_string());
    (code, message)
}

impl HostedBackend {
    pub fn new(config: &HostedConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("presencify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn rest(&self, method: reqwest::Method, table: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn auth(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    /// Turn a non-success response into [`StoreError::Rejected`].
    async fn ensure_success(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let (code, message) = parse_error_body(&body);
        Err(StoreError::Rejected {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl SessionProvider for HostedBackend {
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Option<SessionGrant>> {
        let response = self
            .auth(reqwest::Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        // Bad credentials come back as 400.
        if response.status() == StatusCode::BAD_REQUEST {
            debug!("Hosted sign-in rejected credentials");
            return Ok(None);
        }

        let token: TokenResponse = Self::ensure_success(response).await?.json().await?;
        Ok(Some(SessionGrant {
            token: token.access_token,
            user_id: token.user.id,
        }))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> StoreResult<SignUpOutcome> {
        let response = self
            .auth(reqwest::Method::POST, "signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name.unwrap_or_default() },
            }))
            .send()
            .await?;

        let response = match Self::ensure_success(response).await {
            Ok(r) => r,
            Err(StoreError::Rejected { code, message, .. })
                if code.as_deref() == Some("user_already_exists")
                    || message.contains("already registered") =>
            {
                return Err(StoreError::Conflict(email.to_string()));
            }
            Err(e) => return Err(e),
        };

        let body: SignUpResponse = response.json().await?;
        match (body.access_token, body.user) {
            (Some(token), Some(user)) => Ok(SignUpOutcome::SignedIn(SessionGrant {
                token,
                user_id: user.id,
            })),
            _ => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>> {
        let response = self
            .auth(reqwest::Method::GET, "user")
            .bearer_auth(token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let user: HostedUser = Self::ensure_success(response).await?.json().await?;
        Ok(Some(user.into_auth_user(token)))
    }

    async fn sign_out(&self, token: &str) -> StoreResult<()> {
        let response = self
            .auth(reqwest::Method::POST, "logout")
            .bearer_auth(token)
            .send()
            .await?;

        // An already-invalid token is as signed out as it gets.
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Ok(());
        }
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for HostedBackend {
    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<()> {
        let response = self
            .rest(reqwest::Method::POST, "contact_submissions", &self.anon_key)
            .header("Prefer", "return=minimal")
            .json(&[submission])
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn recent_submissions(
        &self,
        viewer: &AuthUser,
        limit: usize,
    ) -> StoreResult<Vec<ContactSubmission>> {
        let limit = limit.to_string();
        let response = self
            .rest(reqwest::Method::GET, "contact_submissions", &viewer.access_token)
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let rows: Vec<SubmissionRow> = Self::ensure_success(response).await?.json().await?;
        rows.into_iter().map(ContactSubmission::try_from).collect()
    }
}

#[async_trait]
impl ProjectRepository for HostedBackend {
    async fn list_projects(
        &self,
        viewer: &AuthUser,
        client_id: Option<&str>,
    ) -> StoreResult<Vec<Project>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(id) = client_id {
            query.push(("client_id", format!("eq.{id}")));
        }

        let response = self
            .rest(reqwest::Method::GET, "projects", &viewer.access_token)
            .query(&query)
            .send()
            .await?;

        let rows: Vec<ProjectRow> = Self::ensure_success(response).await?.json().await?;
        rows.into_iter().map(Project::try_from).collect()
    }
}

#[async_trait]
impl RoleRepository for HostedBackend {
    async fn has_role(&self, viewer: &AuthUser, role: AppRole) -> StoreResult<bool> {
        let response = self
            .rest(reqwest::Method::GET, "user_roles", &viewer.access_token)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .query(&[
                ("select", "role".to_string()),
                ("user_id", format!("eq.{}", viewer.id)),
                ("role", format!("eq.{}", role.as_str())),
            ])
            .send()
            .await?;

        match Self::ensure_success(response).await {
            Ok(_) => Ok(true),
            Err(StoreError::Rejected { code, .. }) if code.as_deref() == Some(NO_SINGLE_ROW) => {
                Ok(false)
            }
            Err(e) => {
                warn!(user_id = %viewer.id, "Role lookup failed: {}", e);
                Err(e)
            }
        }
    }
}
