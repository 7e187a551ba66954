//! Profiles for the label-driven sites

use super::generic::{LabelRule, SiteProfile};
use crate::session::LabelScope;

const fn parent(field: &'static str, needles: &'static [&'static str]) -> LabelRule {
    LabelRule {
        field,
        needles,
        scope: LabelScope::Parent,
        require: &[],
    }
}

const fn own_with(
    field: &'static str,
    needles: &'static [&'static str],
    require: &'static [&'static str],
) -> LabelRule {
    LabelRule {
        field,
        needles,
        scope: LabelScope::Own,
        require,
    }
}

/// RealT serves some regions a "not available" page instead of the marketplace
pub static REALT: SiteProfile = SiteProfile {
    index_path: "marketplace",
    item_selector: "a[href*='/property'], a[href*='/token']",
    block_markers: &["not available", "blocked"],
    fallback_links: false,
    title_is_address: true,
    labels: &[
        parent("token_price", &["Token Price", "token price"]),
        own_with("yield", &["Yield", "yield", "APY"], &["%"]),
        parent("rental_income", &["Rental", "rental"]),
    ],
    summary_needles: &["Bed", "Bath", "sqft"],
    image_marker: None,
    image_limit: 5,
    description_limit: 1000,
};

/// Reental pages mix Spanish and English labels
pub static REENTAL: SiteProfile = SiteProfile {
    index_path: "",
    item_selector: "a[href*='/property'], a[href*='/proyecto'], a[href*='/project']",
    block_markers: &[],
    fallback_links: false,
    title_is_address: false,
    labels: &[
        parent("location", &["Ubicación", "Location"]),
        own_with("investment_amount", &["Inversión", "Investment"], &["$", "€"]),
        own_with("annual_return", &["Retorno", "Return", "Rentabilidad"], &["%"]),
        parent("rental_start_date", &["Inicio de rentas", "Start date"]),
    ],
    summary_needles: &[],
    image_marker: Some("reental"),
    image_limit: 5,
    description_limit: 1000,
};

/// Fraxtor's landing page does not always use item-style paths
pub static FRAXTOR: SiteProfile = SiteProfile {
    index_path: "",
    item_selector: "a[href*='/project'], a[href*='/property'], a[href*='/deal']",
    block_markers: &[],
    fallback_links: true,
    title_is_address: false,
    labels: &[
        parent("location", &["Location", "location"]),
        own_with("irr", &["IRR", "irr"], &["%"]),
        parent("holding_term", &["Holding", "Term", "Duration"]),
        own_with("investment_info", &["Investment", "Minimum"], &["$"]),
        parent("property_type", &["Property Type", "Type"]),
        parent("manager", &["Manager", "Developer"]),
        parent("cis_structure", &["CIS", "Structure"]),
    ],
    summary_needles: &[],
    image_marker: None,
    image_limit: 5,
    description_limit: 1000,
};

pub static BINARYX: SiteProfile = SiteProfile {
    index_path: "",
    item_selector: "a[href*='/property'], a[href*='/listing'], a[href*='/project']",
    block_markers: &[],
    fallback_links: false,
    title_is_address: false,
    labels: &[
        parent("location", &["Location", "location"]),
        own_with("price", &["$", "Price", "Investment"], &["$"]),
        own_with("return", &["Yield", "Return", "%"], &["%"]),
    ],
    summary_needles: &[],
    image_marker: None,
    image_limit: 5,
    description_limit: 1000,
};
