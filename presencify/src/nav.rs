//! Site navigation.

/// Path of the sign-in / sign-up page targeted by the header buttons.
pub const AUTH_PATH: &str = "/auth";

const ROUTES: &[(&str, &str)] = &[("/", "Home"), ("/pricing", "Pricing"), ("/contact", "Contact")];

/// One header link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub path: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Header links with the one matching `current_path` exactly marked active.
///
/// Portal and auth pages match nothing, so no link is highlighted there.
pub fn nav_items(current_path: &str) -> Vec<NavItem> {
    ROUTES
        .iter()
        .map(|&(path, label)| NavItem {
            path,
            label,
            active: path == current_path,
        })
        .collect()
}
