//! Keyword/location filter. Both predicates are case-insensitive substring matches against
//! normalized lists, not token matches: "santiagocentro" still contains "santiago".

use crate::lists::TopicLists;
use crate::record::PostRecord;
use crate::table::PostTable;

/// `hay_lower` must already be lowercase; list entries are normalized at load time.
#[inline]
pub fn matches_any(hay_lower: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| hay_lower.contains(n.as_str()))
}

pub fn keyword_match(text: &str, lists: &TopicLists) -> bool {
    matches_any(&text.to_lowercase(), &lists.keywords)
}

/// Absent or blank locations never match.
pub fn city_match(location: Option<&str>, lists: &TopicLists) -> bool {
    match location {
        Some(loc) if !loc.trim().is_empty() => matches_any(&loc.to_lowercase(), &lists.cities),
        _ => false,
    }
}

pub fn matches_post(post: &PostRecord, lists: &TopicLists) -> bool {
    keyword_match(&post.text, lists) && city_match(post.user_location.as_deref(), lists)
}

/// Keep rows that match a keyword AND a city. Returns the number of rows removed.
pub fn filter_topic_and_city(table: &mut PostTable, lists: &TopicLists) -> usize {
    let before = table.rows.len();
    table.rows.retain(|row| matches_post(&row.post, lists));
    let removed = before - table.rows.len();
    tracing::info!(before, kept = table.rows.len(), removed, "keyword/location filter applied");
    removed
}
