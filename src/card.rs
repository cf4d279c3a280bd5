//! Card records as returned by the card API
//!
//! Records stay untyped JSON objects: the upstream schema has drifted over
//! time, so identifiers and image URLs are looked up through ordered lists of
//! candidate field names. The first non-empty match wins.

use serde_json::{Map, Value};

/// One catalog entry, stored exactly as the API returned it
pub type CardRecord = Map<String, Value>;

/// Field names that may hold the card number, in priority order
pub const CARD_NUMBER_FIELDS: [&str; 3] = ["cardnumber", "cardNumber", "id"];

/// Field names that may hold the card art URL, in priority order
pub const IMAGE_URL_FIELDS: [&str; 3] = ["image_url", "imageUrl", "image"];

/// First non-empty string (or number) among `fields`, taken verbatim so keys
/// written by earlier runs keep matching
fn first_field(record: &CardRecord, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match record.get(*field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Card number of a list entry; `None` marks the entry as unidentifiable
pub fn card_number(entry: &Value) -> Option<String> {
    first_field(entry.as_object()?, &CARD_NUMBER_FIELDS)
}

/// The record inside a detail response. `search` answers either with an
/// object or with a list whose first element is the card.
pub fn detail_entry(detail: &Value) -> Option<&CardRecord> {
    match detail {
        Value::Object(record) => Some(record),
        Value::Array(items) => items.first()?.as_object(),
        _ => None,
    }
}

/// Image URL of a stored record or detail response
pub fn image_url(detail: &Value) -> Option<String> {
    first_field(detail_entry(detail)?, &IMAGE_URL_FIELDS)
}

/// Fill `{card}` in an image URL template
pub fn image_url_from_template(template: &str, card_number: &str) -> String {
    template.replace("{card}", card_number)
}
