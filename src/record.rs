//! Post extraction from one raw JSON line. Accepts both flat exports (`author_id`,
//! `user_location`) and nested API shapes (`user.id_str`, `user.location`).

use crate::table::Cell;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

const TEXT_PATHS: [&str; 3] = ["/text", "/full_text", "/extended_tweet/full_text"];
const AUTHOR_PATHS: [&str; 5] = ["/author_id", "/user_id", "/user/id_str", "/user/id", "/author/id"];
const LOCATION_PATHS: [&str; 4] = ["/user_location", "/location", "/user/location", "/author/location"];

/// The three columns every downstream stage relies on, plus carried metadata cells.
#[derive(Clone, Debug, PartialEq)]
pub struct PostRecord {
    pub text: String,
    pub author_id: String,
    pub user_location: Option<String>,
    pub metadata: Vec<Cell>,
}

/// Why a non-blank line did not become a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Malformed,
    MissingText,
    MissingAuthor,
}

/// First non-empty string (or integer, rendered) found at any of `pointers`.
fn first_string(v: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|ptr| match v.pointer(ptr)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse one line into a `PostRecord`. `metadata_fields` are top-level keys or, when they
/// start with `/`, JSON pointers; missing ones become empty cells.
pub fn parse_post(line: &str, metadata_fields: &[String], human_timestamps: bool) -> Result<PostRecord, SkipReason> {
    let val: Value = serde_json::from_str(line).map_err(|_| SkipReason::Malformed)?;
    if !val.is_object() {
        return Err(SkipReason::Malformed);
    }

    let text = first_string(&val, &TEXT_PATHS).ok_or(SkipReason::MissingText)?;
    let author_id = first_string(&val, &AUTHOR_PATHS).ok_or(SkipReason::MissingAuthor)?;
    let user_location = first_string(&val, &LOCATION_PATHS);

    let metadata = metadata_fields
        .iter()
        .map(|field| {
            let raw = if field.starts_with('/') { val.pointer(field) } else { val.get(field) };
            let cell = raw.map(Cell::from_json).unwrap_or(Cell::Empty);
            if human_timestamps && field.trim_start_matches('/') == "created_at" {
                humanize_timestamp(cell)
            } else {
                cell
            }
        })
        .collect();

    Ok(PostRecord { text, author_id, user_location, metadata })
}

/// Render unix epochs, classic `Wed Oct 10 20:19:24 +0000 2018` and ISO strings as RFC3339.
/// Anything unparseable is returned unchanged.
pub fn humanize_timestamp(cell: Cell) -> Cell {
    let parsed = match &cell {
        Cell::Number(n) if n.fract() == 0.0 => OffsetDateTime::from_unix_timestamp(*n as i64).ok(),
        Cell::Text(s) => parse_created_at(s),
        _ => None,
    };
    match parsed.and_then(|dt| dt.format(&Rfc3339).ok()) {
        Some(s) => Cell::Text(s),
        None => cell,
    }
}

fn parse_created_at(s: &str) -> Option<OffsetDateTime> {
    let classic = format_description!(
        "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute] [year]"
    );
    let s = s.trim();
    OffsetDateTime::parse(s, classic)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
}
