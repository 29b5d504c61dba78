//! Contact form validation and submission payloads.

use crate::model::NewSubmission;
use crate::pricing::{PACKAGE_NAME, PricingSelection};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Raw contact form fields as posted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub message: String,
    /// Add-on ids handed over from the pricing page (hidden field).
    #[serde(default)]
    pub addons: Option<String>,
}

/// Longest email address accepted anywhere on the site.
pub const MAX_EMAIL_LEN: usize = 255;

/// Shared email rule for the contact form and sign-up.
pub fn is_valid_email(email: &str) -> bool {
    email.chars().count() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Inline messages for each field that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("invalid fields: {}", self.invalid_fields().join(", "))]
pub struct FieldErrors {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub phone: Option<&'static str>,
    pub company: Option<&'static str>,
    pub message: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.invalid_fields().is_empty()
    }

    /// Names of the failing fields, in form order.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name),
            ("email", self.email),
            ("phone", self.phone),
            ("company", self.company),
            ("message", self.message),
        ]
        .into_iter()
        .filter_map(|(field, err)| err.map(|_| field))
        .collect()
    }
}

/// Contact details that passed validation. Optional fields are `None` when
/// left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthError {
    TooShort,
    TooLong,
}

/// Character count (not bytes) within `min..=max`.
fn length_between(value: &str, min: usize, max: usize) -> Result<(), LengthError> {
    let len = value.chars().count();
    if len < min {
        Err(LengthError::TooShort)
    } else if len > max {
        Err(LengthError::TooLong)
    } else {
        Ok(())
    }
}

impl ContactForm {
    /// Trim and check every field.
    pub fn validate(&self) -> Result<ContactDetails, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        errors.name = match length_between(name, 2, 100) {
            Ok(()) => None,
            Err(LengthError::TooShort) => Some("Name must be at least 2 characters"),
            Err(LengthError::TooLong) => Some("Name must be at most 100 characters"),
        };

        let email = self.email.trim();
        errors.email = if email.chars().count() > MAX_EMAIL_LEN {
            Some("Email must be at most 255 characters")
        } else if !is_valid_email(email) {
            Some("Invalid email address")
        } else {
            None
        };

        let phone = self.phone.trim();
        if !phone.is_empty() {
            errors.phone = match length_between(phone, 10, 20) {
                Ok(()) => None,
                Err(LengthError::TooShort) => Some("Phone number must be at least 10 characters"),
                Err(LengthError::TooLong) => Some("Phone number must be at most 20 characters"),
            };
        }

        let company = self.company.trim();
        if company.chars().count() > 100 {
            errors.company = Some("Company must be at most 100 characters");
        }

        let message = self.message.trim();
        errors.message = match length_between(message, 10, 1000) {
            Ok(()) => None,
            Err(LengthError::TooShort) => Some("Message must be at least 10 characters"),
            Err(LengthError::TooLong) => Some("Message must be at most 1000 characters"),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(ContactDetails {
            name: name.to_string(),
            email: email.to_string(),
            phone: optional(phone),
            company: optional(company),
            message: message.to_string(),
        })
    }
}

impl ContactDetails {
    /// Build the row to insert, attaching the pricing selection if the
    /// visitor came from the pricing page.
    pub fn into_submission(self, selection: Option<&PricingSelection>) -> NewSubmission {
        NewSubmission {
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            message: self.message,
            selected_package: selection.map(|_| PACKAGE_NAME.to_string()),
            selected_addons: selection.map(|s| s.addons.clone()),
            estimated_total: selection.map(|s| s.total),
        }
    }
}
