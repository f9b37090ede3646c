use crate::models::Listing;
use crate::normalize;
use crate::scrapers::types::Criteria;

/// Whether a listing meets the source's acceptance criteria.
///
/// Rent only rejects when it is present, parses, and exceeds the cap.
pub fn accept(listing: &Listing, criteria: &Criteria) -> bool {
    if listing.rooms < criteria.min_rooms || listing.area_sqm < criteria.min_sqm {
        return false;
    }

    match (criteria.max_rent, listing.rent.as_deref()) {
        (Some(cap), Some(rent)) => match normalize::parse_amount(rent) {
            Ok(value) => value <= cap,
            Err(_) => true,
        },
        _ => true,
    }
}

/// Keep accepted listings, preserving extraction order.
pub fn retain_accepted(listings: Vec<Listing>, criteria: &Criteria) -> Vec<Listing> {
    listings
        .into_iter()
        .filter(|l| accept(l, criteria))
        .collect()
}
