//! Pricing catalog and the add-on selector.
//!
//! The selector keeps an ordered set of add-on ids and derives the running
//! total from the catalog. The ordered ids travel to the contact page,
//! which rebuilds the same [`PricingSelection`] from them.

use serde::{Deserialize, Serialize};

/// Package the add-on selector builds on.
pub const PACKAGE_NAME: &str = "Professional Website";

/// Price of [`PACKAGE_NAME`] in whole dollars.
pub const BASE_PRICE: u32 = 3999;

/// An optional priced feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addon {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Zero means "custom quote": selectable, but adds nothing to the total.
    pub price: u32,
}

impl Addon {
    pub fn is_custom_quote(&self) -> bool {
        self.price == 0
    }

    pub fn price_label(&self) -> String {
        if self.is_custom_quote() {
            "Custom quote".to_string()
        } else {
            format!("+{}", format_usd(self.price))
        }
    }
}

const ADDONS: &[Addon] = &[
    Addon {
        id: "ecommerce",
        name: "E-commerce Functionality",
        description: "Product catalog, cart and secure checkout",
        price: 2500,
    },
    Addon {
        id: "cms",
        name: "CMS Integration",
        description: "Edit pages and posts without touching code",
        price: 1200,
    },
    Addon {
        id: "seo",
        name: "Advanced SEO Package",
        description: "Technical audit, schema markup and keyword strategy",
        price: 800,
    },
    Addon {
        id: "analytics",
        name: "Analytics & Reporting",
        description: "Conversion tracking with a monthly report",
        price: 600,
    },
    Addon {
        id: "booking",
        name: "Booking & Scheduling",
        description: "Online appointments with calendar sync",
        price: 1500,
    },
    Addon {
        id: "multilingual",
        name: "Multi-language Support",
        description: "Translated content with language switching",
        price: 900,
    },
    Addon {
        id: "custom",
        name: "Custom Integrations",
        description: "Connect your CRM, ERP or internal tools",
        price: 0,
    },
];

/// All add-ons in display order.
pub fn addons() -> &'static [Addon] {
    ADDONS
}

/// Look up an add-on by id.
pub fn find_addon(id: &str) -> Option<&'static Addon> {
    ADDONS.iter().find(|a| a.id == id)
}

/// A plan card on the pricing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: &'static str,
    /// `None` for plans quoted individually.
    pub price: Option<u32>,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub cta: &'static str,
    pub popular: bool,
}

impl Plan {
    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) => format_usd(price),
            None => "Custom".to_string(),
        }
    }
}

const PLANS: &[Plan] = &[
    Plan {
        name: "Starter",
        price: Some(2999),
        description: "Perfect for small businesses and startups",
        features: &[
            "5-page responsive website",
            "Mobile-optimized design",
            "Basic SEO optimization",
            "Contact form integration",
            "2 rounds of revisions",
            "30 days support",
        ],
        cta: "Get Started",
        popular: false,
    },
    Plan {
        name: PACKAGE_NAME,
        price: Some(BASE_PRICE),
        description: "Ideal for growing businesses",
        features: &[
            "10-page responsive website",
            "Custom design & branding",
            "Advanced SEO optimization",
            "Analytics setup",
            "4 rounds of revisions",
            "90 days support",
        ],
        cta: "Get Started",
        popular: true,
    },
    Plan {
        name: "Enterprise",
        price: None,
        description: "For large-scale applications",
        features: &[
            "Unlimited pages",
            "Custom web application",
            "API integrations",
            "Database design",
            "User authentication",
            "Unlimited revisions",
            "1 year support",
            "Dedicated project manager",
        ],
        cta: "Contact Sales",
        popular: false,
    },
];

pub fn plans() -> &'static [Plan] {
    PLANS
}

/// Ongoing services billed separately from a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringService {
    pub name: &'static str,
    pub description: &'static str,
    pub rate: &'static str,
}

pub fn recurring_services() -> &'static [RecurringService] {
    &[
        RecurringService {
            name: "Website Maintenance",
            description: "Keep your website secure, updated, and running smoothly",
            rate: "Starting at $299/month",
        },
        RecurringService {
            name: "Feature Development",
            description: "Add new features and functionality to your existing website",
            rate: "Starting at $150/hour",
        },
    ]
}

/// Ordered set of selected add-ons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonSelector {
    selected: Vec<&'static str>,
}

impl AddonSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a selector from a comma-separated id list.
    ///
    /// Unknown ids and repeats are dropped; first occurrence wins.
    pub fn from_query(raw: &str) -> Self {
        let mut selector = Self::new();
        for id in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(addon) = find_addon(id)
                && !selector.is_selected(addon.id)
            {
                selector.selected.push(addon.id);
            }
        }
        selector
    }

    /// Comma-separated ids in selection order.
    pub fn to_query(&self) -> String {
        self.selected.join(",")
    }

    /// Add the add-on if absent, remove it if present.
    ///
    /// Returns false for ids not in the catalog.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(addon) = find_addon(id) else {
            return false;
        };
        if let Some(pos) = self.selected.iter().position(|s| *s == addon.id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(addon.id);
        }
        true
    }

    /// Selector state after toggling `id`, leaving `self` untouched.
    pub fn toggled(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.toggle(id);
        next
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected add-ons in selection order.
    pub fn selected(&self) -> impl Iterator<Item = &'static Addon> + '_ {
        self.selected.iter().filter_map(|id| find_addon(id))
    }

    /// Base price plus every selected add-on.
    pub fn total(&self) -> u32 {
        BASE_PRICE + self.selected().map(|a| a.price).sum::<u32>()
    }

    /// Selection record for the contact page and the stored submission.
    pub fn to_selection(&self) -> PricingSelection {
        PricingSelection {
            base_price: BASE_PRICE,
            addons: self.selected().map(|a| a.name.to_string()).collect(),
            total: self.total(),
        }
    }
}

/// A priced selection: package, add-on names in selection order, total.
///
/// The submission stores `total` as computed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSelection {
    pub base_price: u32,
    pub addons: Vec<String>,
    pub total: u32,
}

/// Format whole dollars with thousands separators, e.g. `$7,700`.
pub fn format_usd(amount: u32) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
