//! Static topical keyword and city lists used by the filter and cohort stages.
//! Built once at startup (defaults or a JSON override file) and shared read-only afterwards.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Telemedicine / teleconsultation variants (Spanish).
pub const DEFAULT_KEYWORDS: [&str; 7] = [
    "telemedicina",
    "teleconsulta",
    "telesalud",
    "tele-medicina",
    "tele-consulta",
    "tele medicina",
    "tele consulta",
];

/// Valparaíso area (cohort 1).
pub const VALPARAISO_AREA: [&str; 14] = [
    "valparaíso", "valparaiso", "viña del mar", "vina del mar", "quilpué", "quilpue",
    "villa alemana", "concón", "concon", "con con", "quillota", "limache", "casablanca",
    "san antonio",
];

/// Concepción area (cohort 2).
pub const CONCEPCION_AREA: [&str; 13] = [
    "concepción", "concepcion", "talcahuano", "chiguayante", "san pedro de la paz",
    "hualpén", "hualpen", "coronel", "penco", "tomé", "tome", "lota", "hualqui",
];

/// Santiago area (cohort 3).
pub const SANTIAGO_AREA: [&str; 28] = [
    "santiago", "providencia", "las condes", "ñuñoa", "nunoa", "maipú", "maipu",
    "puente alto", "la florida", "vitacura", "lo barnechea", "la reina", "macul",
    "peñalolén", "penalolen", "san miguel", "estación central", "estacion central",
    "recoleta", "independencia", "quilicura", "pudahuel", "san bernardo", "cerrillos",
    "la cisterna", "huechuraba", "conchalí", "conchali",
];

/// Cities that pass the allow-list but belong to no named cohort.
const OTHER_CITIES: [&str; 8] = [
    "arica", "antofagasta", "la serena", "coquimbo", "rancagua", "talca", "chillán", "chillan",
];

/// Keyword + city configuration. All entries are normalized (trimmed, lowercase).
#[derive(Clone, Debug)]
pub struct TopicLists {
    pub keywords: Vec<String>,
    pub cities: Vec<String>,
    /// Ordered cohort sub-lists: index 0 is group 1, index 2 is group 3.
    pub cohorts: [Vec<String>; 3],
}

impl Default for TopicLists {
    fn default() -> Self {
        let cities = VALPARAISO_AREA
            .iter()
            .chain(CONCEPCION_AREA.iter())
            .chain(SANTIAGO_AREA.iter())
            .chain(OTHER_CITIES.iter())
            .copied();
        Self {
            keywords: normalize_list(DEFAULT_KEYWORDS),
            cities: normalize_list(cities),
            cohorts: [
                normalize_list(VALPARAISO_AREA),
                normalize_list(CONCEPCION_AREA),
                normalize_list(SANTIAGO_AREA),
            ],
        }
    }
}

/// On-disk override; every field is optional and falls back to the defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListsFile {
    keywords: Option<Vec<String>>,
    cities: Option<Vec<String>>,
    cohorts: Option<Vec<Vec<String>>>,
}

impl TopicLists {
    /// Load a JSON override file, e.g.
    /// `{ "keywords": ["telemedicina"], "cohorts": [["valparaíso"], ["concepción"], ["santiago"]] }`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read lists file {}", path.display()))?;
        let file: ListsFile = serde_json::from_str(&raw)
            .with_context(|| format!("parse lists file {}", path.display()))?;

        let mut lists = Self::default();
        if let Some(k) = file.keywords {
            lists.keywords = normalize_list(k);
        }
        if let Some(c) = file.cities {
            lists.cities = normalize_list(c);
        }
        if let Some(groups) = file.cohorts {
            let groups: [Vec<String>; 3] = match <[Vec<String>; 3]>::try_from(groups) {
                Ok(g) => g,
                Err(v) => bail!("lists file {}: expected 3 cohort lists, got {}", path.display(), v.len()),
            };
            lists.cohorts = groups.map(|g| normalize_list(g));
        }
        lists.validate()?;
        Ok(lists)
    }

    /// Empty keyword or city lists would silently drop every row.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            bail!("keyword list is empty");
        }
        if self.cities.is_empty() {
            bail!("city list is empty");
        }
        for (i, group) in self.cohorts.iter().enumerate() {
            for city in group {
                if !self.cities.contains(city) {
                    tracing::warn!(group = i + 1, city = %city, "cohort city is not in the master city list");
                }
            }
        }
        Ok(())
    }
}

/// Trim + lowercase, drop empties, sort + dedup.
pub fn normalize_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut v: Vec<String> = items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    v.sort();
    v.dedup();
    v
}
