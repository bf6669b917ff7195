//! Cohort assignment: ordered first-match over the three city sub-lists.

use crate::filters::matches_any;
use crate::lists::TopicLists;
use crate::table::PostTable;
use serde::Serialize;

/// Geographic cohort of a retained post.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CityGroup {
    Valparaiso = 1,
    Concepcion = 2,
    Santiago = 3,
}

impl CityGroup {
    /// Evaluation order; earlier groups win ties.
    pub const ORDER: [CityGroup; 3] = [CityGroup::Valparaiso, CityGroup::Concepcion, CityGroup::Santiago];

    pub fn number(self) -> u8 {
        self as u8
    }

    fn sub_list(self, lists: &TopicLists) -> &[String] {
        &lists.cohorts[self as usize - 1]
    }
}

/// First group (1, then 2, then 3) whose sub-list matches `location` as a
/// case-insensitive substring; `None` for empty locations or no match.
pub fn assign_group(location: Option<&str>, lists: &TopicLists) -> Option<CityGroup> {
    let loc = location?.to_lowercase();
    if loc.trim().is_empty() {
        return None;
    }
    CityGroup::ORDER
        .into_iter()
        .find(|g| matches_any(&loc, g.sub_list(lists)))
}

/// Per-group tallies; `none` counts rows that passed the city filter but fit no cohort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CohortCounts {
    pub valparaiso: usize,
    pub concepcion: usize,
    pub santiago: usize,
    pub none: usize,
}

/// Fill `city_group` on every row and append the column.
pub fn assign_cohorts(table: &mut PostTable, lists: &TopicLists) -> CohortCounts {
    let mut counts = CohortCounts::default();
    for row in table.rows.iter_mut() {
        row.city_group = assign_group(row.post.user_location.as_deref(), lists);
        match row.city_group {
            Some(CityGroup::Valparaiso) => counts.valparaiso += 1,
            Some(CityGroup::Concepcion) => counts.concepcion += 1,
            Some(CityGroup::Santiago) => counts.santiago += 1,
            None => counts.none += 1,
        }
    }
    table.stages.cohorts = true;
    tracing::info!(
        valparaiso = counts.valparaiso,
        concepcion = counts.concepcion,
        santiago = counts.santiago,
        none = counts.none,
        "cohorts assigned"
    );
    counts
}
