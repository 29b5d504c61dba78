//! Pricing → contact handoff.
//!
//! The selection travels with the navigation itself. "Get quote" redirects
//! to `/contact?addons=<ids>` and the contact form posts the same ids back
//! in a hidden field. Nothing is kept between requests: a successful
//! submission redirects to a bare `/contact`, which shows the empty form.

use crate::pricing::{AddonSelector, PACKAGE_NAME, PricingSelection, format_usd};

/// Every `addons` value in a decoded query string, joined with commas.
///
/// `?addons=cms&addons=seo` reads the same as `?addons=cms,seo`. `None` when
/// the parameter is absent.
pub fn addons_param(pairs: &[(String, String)]) -> Option<String> {
    let values: Vec<&str> = pairs
        .iter()
        .filter(|(key, _)| key == "addons")
        .map(|(_, value)| value.as_str())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// `?addons=` on the contact page.
///
/// Absent when the visitor did not come from the pricing page. Present but
/// empty means the base package alone.
#[derive(Debug, Clone, Default)]
pub struct HandoffQuery {
    pub addons: Option<String>,
}

impl HandoffQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            addons: addons_param(pairs),
        }
    }

    pub fn prefill(&self) -> Option<ContactPrefill> {
        ContactPrefill::from_param(self.addons.as_deref())
    }
}

/// Contact page URL carrying `selector`.
pub fn contact_href(selector: &AddonSelector) -> String {
    format!("/contact?addons={}", selector.to_query())
}

/// What the contact page shows for a selection handed over from pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPrefill {
    pub selection: PricingSelection,
    /// Ids posted back by the contact form.
    pub addons_query: String,
}

impl ContactPrefill {
    pub fn from_selector(selector: &AddonSelector) -> Self {
        Self {
            selection: selector.to_selection(),
            addons_query: selector.to_query(),
        }
    }

    /// Unknown and repeated ids are dropped, as on the pricing page.
    pub fn from_param(addons: Option<&str>) -> Option<Self> {
        addons.map(|ids| Self::from_selector(&AddonSelector::from_query(ids)))
    }

    /// Message field text: package, bulleted add-ons, estimated total, and a
    /// trailing prompt for the visitor's own details.
    pub fn message(&self) -> String {
        let mut message = format!("I'm interested in the {PACKAGE_NAME} package.");
        if !self.selection.addons.is_empty() {
            message.push_str("\n\nSelected Add-ons:\n");
            let bullets: Vec<String> = self
                .selection
                .addons
                .iter()
                .map(|a| format!("- {a}"))
                .collect();
            message.push_str(&bullets.join("\n"));
            message.push_str(&format!(
                "\n\nEstimated Total: {}",
                format_usd(self.selection.total)
            ));
        }
        message.push_str("\n\nAdditional details: ");
        message
    }

    /// Page headline, e.g. `You've selected: Professional Website + 2 add-ons`.
    pub fn headline(&self) -> String {
        let count = self.selection.addons.len();
        match count {
            0 => format!("You've selected: {PACKAGE_NAME}"),
            1 => format!("You've selected: {PACKAGE_NAME} + 1 add-on"),
            n => format!("You've selected: {PACKAGE_NAME} + {n} add-ons"),
        }
    }

    pub fn base_price_label(&self) -> String {
        format_usd(self.selection.base_price)
    }

    pub fn total_label(&self) -> String {
        format_usd(self.selection.total)
    }
}
