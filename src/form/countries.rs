//! Country table behind the phone code picker.

use std::sync::LazyLock;

use super::values::PhoneSlot;
use crate::domain::Country;

static COUNTRIES: LazyLock<Vec<Country>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../../assets/countries.json"))
        .expect("assets/countries.json is a valid country table")
});

/// The full table, in display order.
pub fn countries() -> &'static [Country] {
    &COUNTRIES
}

/// Countries whose names (in any language) or dialing code contain `query`,
/// ignoring case.
pub fn search(query: &str) -> Vec<&'static Country> {
    let needle = query.to_lowercase();
    countries()
        .iter()
        .filter(|country| search_text(country).contains(&needle))
        .collect()
}

fn search_text(country: &Country) -> String {
    format!(
        "{} {} {} {}",
        country.label, country.label_ua, country.label_ru, country.phone_code
    )
    .to_lowercase()
}

/// Country displayed for a dialing code. Shared codes resolve to the first
/// entry of the table.
pub fn find_by_dialing_code(code: &str) -> Option<&'static Country> {
    countries().iter().find(|country| country.phone_code == code)
}

/// Country by ISO code, ignoring case.
pub fn find_by_country_code(code: &str) -> Option<&'static Country> {
    countries()
        .iter()
        .find(|country| country.country_code.eq_ignore_ascii_case(code))
}

/// Picker selection: replaces the row's dialing code, never its number.
/// Clearing the picker leaves an empty code.
pub fn apply_selection(slot: &mut PhoneSlot, country: Option<&Country>) {
    slot.phone_code = country
        .map(|country| country.phone_code.clone())
        .unwrap_or_default();
}
