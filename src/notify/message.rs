use crate::models::Listing;
use html_escape::{encode_double_quoted_attribute, encode_text};
use crate::normalize::humanize_number;

const SNIPPET_LEN: usize = 80;

/// Rent text with a currency marker, or `None` when there is nothing to show
pub fn format_rent(rent: Option<&str>) -> Option<String> {
    let rent = rent?.trim();
    if rent.is_empty() {
        return None;
    }
    if rent.contains('€') || rent.contains("EUR") {
        Some(rent.to_string())
    } else {
        Some(format!("{} €", rent))
    }
}

fn snippet(listing: &Listing) -> String {
    let src = listing
        .title
        .as_deref()
        .or(listing.address.as_deref())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            listing
                .link
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
        });
    src.chars().take(SNIPPET_LEN).collect()
}

/// Notification body for one listing, in Telegram HTML
pub fn build_message(listing: &Listing) -> String {
    let mut lines = vec![format!(
        "🏠 <b>{}</b>: {}",
        encode_text(&listing.source),
        encode_text(&snippet(listing))
    )];

    if let Some(address) = listing.address.as_deref().filter(|a| !a.is_empty()) {
        lines.push(format!("📍 {}", encode_text(address)));
    }

    lines.push(format!(
        "🛏 {} rooms – {} m²",
        humanize_number(listing.rooms),
        humanize_number(listing.area_sqm)
    ));

    if let Some(rent) = format_rent(listing.rent.as_deref()) {
        lines.push(format!("💶 {}", encode_text(&rent)));
    }

    lines.push(format!(
        "🔗 <a href=\"{}\">Listing</a>",
        encode_double_quoted_attribute(&listing.link)
    ));
    lines.join("\n")
}
