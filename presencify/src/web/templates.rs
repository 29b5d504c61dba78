//! Askama templates for the site.

use crate::config::SiteConfig;
use crate::contact::{ContactForm, FieldErrors};
use crate::handoff::ContactPrefill;
use crate::model::{ContactSubmission, Project, ProjectStatus};
use crate::nav::{NavItem, nav_items};
use crate::pricing::{Plan, RecurringService, format_usd};
use crate::web::session::Notice;
use askama::Template;
use axum::response::Html;

/// Render to HTML, degrading to a plain error string.
pub fn render<T: Template>(template: &T) -> Html<String> {
    Html(
        template
            .render()
            .unwrap_or_else(|e| format!("Template error: {e}")),
    )
}

/// Data shared by every page through `base.html`.
pub struct Layout {
    pub title: &'static str,
    pub nav: Vec<NavItem>,
    pub notice: Option<Notice>,
    /// Portal pages swap the sign-in buttons for a sign-out form.
    pub signed_in: bool,
}

impl Layout {
    pub fn new(path: &str, title: &'static str) -> Self {
        Self {
            title,
            nav: nav_items(path),
            notice: None,
            signed_in: false,
        }
    }

    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice;
        self
    }

    pub fn signed_in(mut self) -> Self {
        self.signed_in = true;
        self
    }
}

#[derive(Template)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub layout: Layout,
}

/// One add-on card on the pricing page.
pub struct AddonCard {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price_label: String,
    pub selected: bool,
    /// Pricing URL with this add-on toggled.
    pub toggle_href: String,
}

#[derive(Template)]
#[template(path = "pricing.html")]
pub struct PricingTemplate {
    pub layout: Layout,
    pub plans: &'static [Plan],
    pub package_name: &'static str,
    pub base_price: String,
    pub addons: Vec<AddonCard>,
    pub selected_names: Vec<&'static str>,
    pub total: String,
    /// Selected ids, posted with the quote request.
    pub addons_query: String,
    pub services: &'static [RecurringService],
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
    pub form: ContactForm,
    pub errors: FieldErrors,
    pub prefill: Option<ContactPrefill>,
    pub site: SiteConfig,
}

#[derive(Template)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub info: Option<String>,
    pub email: String,
    pub full_name: String,
    pub show_signup: bool,
}

/// Project row for the portals.
pub struct ProjectSummary {
    pub title: String,
    pub description: Option<String>,
    pub status_class: &'static str,
    pub status_label: String,
    pub budget: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub client_id: String,
    pub created: String,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            status_class: status_class(project.status),
            status_label: project.status.label(),
            budget: project.budget.map(format_usd),
            start_date: project.start_date.map(|d| d.format("%b %-d, %Y").to_string()),
            end_date: project.end_date.map(|d| d.format("%b %-d, %Y").to_string()),
            client_id: project.client_id.clone(),
            created: project.created_at.format("%b %-d, %Y").to_string(),
        }
    }
}

fn status_class(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Planning => "status-planning",
        ProjectStatus::InProgress => "status-in-progress",
        ProjectStatus::Completed => "status-completed",
        ProjectStatus::OnHold => "status-on-hold",
    }
}

/// Contact submission row for the admin portal.
pub struct SubmissionSummary {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: String,
    pub status: String,
    pub received: String,
    pub package: Option<String>,
    pub addons: Option<String>,
    pub estimate: Option<String>,
}

impl From<&ContactSubmission> for SubmissionSummary {
    fn from(s: &ContactSubmission) -> Self {
        Self {
            name: s.name.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            company: s.company.clone(),
            message: s.message.clone(),
            status: s.status.to_uppercase(),
            received: s.created_at.format("%b %-d, %Y").to_string(),
            package: s.selected_package.clone(),
            addons: s
                .selected_addons
                .as_ref()
                .filter(|a| !a.is_empty())
                .map(|a| a.join(", ")),
            estimate: s.estimated_total.map(format_usd),
        }
    }
}

#[derive(Template)]
#[template(path = "client.html")]
pub struct ClientTemplate {
    pub layout: Layout,
    pub greeting: String,
    pub failed: bool,
    pub projects: Vec<ProjectSummary>,
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub layout: Layout,
    pub failed: bool,
    pub submissions: Vec<SubmissionSummary>,
    pub projects: Vec<ProjectSummary>,
    pub new_contacts: usize,
    pub total_projects: usize,
    pub active_projects: usize,
    pub clients: usize,
}

/// Standalone message page (permission check failure, not found).
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub layout: Layout,
    pub heading: &'static str,
    pub detail: &'static str,
    pub link_href: &'static str,
    pub link_label: &'static str,
}
