//! Public pages: landing, pricing and contact.

use crate::contact::{ContactForm, FieldErrors};
use crate::handoff::{ContactPrefill, HandoffQuery, addons_param, contact_href};
use crate::pricing::{
    AddonSelector, BASE_PRICE, PACKAGE_NAME, addons, format_usd, plans, recurring_services,
};
use crate::web::AppState;
use crate::web::session::{
    Notice, SetCookies, notice_cookie, page, pending_notice, see_other,
};
use crate::web::templates::{
    AddonCard, ContactTemplate, LandingTemplate, Layout, PricingTemplate, render,
};
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn landing(jar: CookieJar) -> Response {
    let template = LandingTemplate {
        layout: Layout::new("/", "Home").with_notice(pending_notice(&jar)),
    };
    page(
        StatusCode::OK,
        render(&template),
        SetCookies::new().consume_notice(&jar),
    )
}

/// Selection posted by the pricing page's quote form.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    #[serde(default)]
    pub addons: String,
}

fn pricing_href(selector: &AddonSelector) -> String {
    if selector.is_empty() {
        "/pricing#customize".to_string()
    } else {
        format!("/pricing?addons={}#customize", selector.to_query())
    }
}

/// Pricing page. Selector state lives in `?addons=`; a repeated parameter
/// is merged rather than rejected.
pub async fn pricing(jar: CookieJar, Query(params): Query<Vec<(String, String)>>) -> Response {
    let selector = AddonSelector::from_query(&addons_param(&params).unwrap_or_default());

    let cards = addons()
        .iter()
        .map(|addon| AddonCard {
            id: addon.id,
            name: addon.name,
            description: addon.description,
            price_label: addon.price_label(),
            selected: selector.is_selected(addon.id),
            toggle_href: pricing_href(&selector.toggled(addon.id)),
        })
        .collect();

    let template = PricingTemplate {
        layout: Layout::new("/pricing", "Pricing").with_notice(pending_notice(&jar)),
        plans: plans(),
        package_name: PACKAGE_NAME,
        base_price: format_usd(BASE_PRICE),
        addons: cards,
        selected_names: selector.selected().map(|a| a.name).collect(),
        total: format_usd(selector.total()),
        addons_query: selector.to_query(),
        services: recurring_services(),
    };
    page(
        StatusCode::OK,
        render(&template),
        SetCookies::new().consume_notice(&jar),
    )
}

/// Hand the selection to the contact page. Nothing is stored; the ids ride
/// along in the redirect.
pub async fn quote(Form(form): Form<SelectionQuery>) -> Response {
    let selector = AddonSelector::from_query(&form.addons);
    info!(
        addons = %selector.to_query(),
        total = selector.total(),
        "Pricing selection handed to contact page"
    );
    see_other(&contact_href(&selector), SetCookies::new())
}

fn contact_view(
    state: &AppState,
    form: ContactForm,
    errors: FieldErrors,
    prefill: Option<ContactPrefill>,
    notice: Option<Notice>,
) -> ContactTemplate {
    ContactTemplate {
        layout: Layout::new("/contact", "Contact").with_notice(notice),
        form,
        errors,
        prefill,
        site: state.site.clone(),
    }
}

/// Contact page. A selection from the pricing page prefills the message.
pub async fn contact_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let prefill = HandoffQuery::from_pairs(&params).prefill();
    let form = ContactForm {
        message: prefill.as_ref().map(|p| p.message()).unwrap_or_default(),
        ..ContactForm::default()
    };

    let template = contact_view(
        &state,
        form,
        FieldErrors::default(),
        prefill,
        pending_notice(&jar),
    );
    page(
        StatusCode::OK,
        render(&template),
        SetCookies::new().consume_notice(&jar),
    )
}

pub async fn contact_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ContactForm>,
) -> Response {
    let prefill = ContactPrefill::from_param(form.addons.as_deref());

    let details = match form.validate() {
        Ok(details) => details,
        Err(errors) => {
            debug!("Contact form rejected: {}", errors);
            let template = contact_view(&state, form, errors, prefill, None);
            return page(
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&template),
                SetCookies::new(),
            );
        }
    };

    let submission = details.into_submission(prefill.as_ref().map(|p| &p.selection));
    if let Err(e) = state.backend.insert_submission(&submission).await {
        error!("Failed to store contact submission: {}", e);
        let template = contact_view(
            &state,
            form,
            FieldErrors::default(),
            prefill,
            Some(Notice::ContactFailed),
        );
        return page(
            StatusCode::INTERNAL_SERVER_ERROR,
            render(&template),
            SetCookies::new(),
        );
    }

    info!(
        with_selection = prefill.is_some(),
        "Contact submission stored"
    );

    // Bare /contact: the selection does not survive a successful submit.
    see_other(
        "/contact",
        SetCookies::new().with(notice_cookie(Notice::ContactSent)),
    )
}
