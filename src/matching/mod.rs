//! Country entity matching.
//!
//! The current-statistics feed identifies countries by free-text names that
//! rarely line up with the structured country list, so every stat record is
//! bound to a country record by fuzzy similarity over all of the record's
//! name-ish fields. The result is an immutable [`MatchIndex`] built once per
//! session and threaded through lookups explicitly.

use crate::models::{CountryRecord, StatRecord};
use crate::utils::similarity::similarity;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Manual correction for a stat-record name the scorer is known to get wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    /// The name covers a multi-territory area with no single owning country
    /// record; register it by name instead of matching.
    Generalized,
    /// Match against this name instead of the upstream one.
    Rename(&'static str),
}

/// Stat-feed names that need correcting before matching. Renames must spell
/// a name the country list can match perfectly.
pub fn prematch_override(name: &str) -> Option<Override> {
    match name {
        "Channel Islands" => Some(Override::Generalized),
        "Curaçao" => Some(Override::Rename("Curacao")),
        "CAR" => Some(Override::Rename("Central African Republic")),
        "St. Barth" => Some(Override::Rename("St. Barthelemy")),
        _ => None,
    }
}

/// Stat entries measured from carriers rather than countries (cruise ships).
/// Excluded from matching, though still tallied in the worldwide aggregate.
pub const EXCLUDED_CARRIERS: [&str; 2] = ["Diamond Princess", "MS Zaandam"];

/// Countries whose statistics are reported under a generalized area name.
pub fn associated_area(cca2: &str) -> Option<&'static str> {
    match cca2 {
        "je" | "gg" => Some("Channel Islands"), // Jersey, Guernsey
        _ => None,
    }
}

/// A candidate field tree walked by the confidence scorer.
///
/// Closed shape: every country record flattens into text leaves, lists and
/// nested records. Lists and records score identically; the distinction only
/// mirrors the source structure.
#[derive(Debug, Clone)]
pub enum Candidate {
    Text(String),
    List(Vec<Candidate>),
    Record(Vec<Candidate>),
}

impl From<&CountryRecord> for Candidate {
    fn from(record: &CountryRecord) -> Self {
        Candidate::Record(vec![
            Candidate::Text(record.cca2.clone()),
            Candidate::Text(record.cca3.clone()),
            Candidate::Record(vec![
                Candidate::Text(record.name.common.clone()),
                Candidate::Text(record.name.official.clone()),
            ]),
            Candidate::List(
                record
                    .alt_spellings
                    .iter()
                    .cloned()
                    .map(Candidate::Text)
                    .collect(),
            ),
        ])
    }
}

#[derive(Default)]
struct ConfidenceAccum {
    total: f64,
    examined: usize,
    confirmed: bool,
}

fn walk(candidate: &Candidate, target: &str, acc: &mut ConfidenceAccum) {
    if acc.confirmed {
        return;
    }
    match candidate {
        Candidate::Text(value) => {
            // Alternate-script spellings are unreliable, only ASCII fields
            // participate in scoring.
            if !value.is_ascii() {
                return;
            }
            let score = similarity(value, target);
            if score == 1.0 {
                acc.confirmed = true;
            }
            acc.total += score;
            acc.examined += 1;
        }
        Candidate::List(items) | Candidate::Record(items) => {
            for item in items {
                walk(item, target, acc);
                if acc.confirmed {
                    return;
                }
            }
        }
    }
}

/// Average similarity of all examined fields against `target`.
///
/// A single perfect field short-circuits to `1.0`. A candidate with zero
/// examined fields yields `NaN`, which strict `<` comparison in the argmax
/// naturally rejects.
pub fn confidence(candidate: &Candidate, target: &str) -> f64 {
    let mut acc = ConfidenceAccum::default();
    walk(candidate, target, &mut acc);
    if acc.confirmed {
        return 1.0;
    }
    acc.total / acc.examined as f64
}

/// Bidirectional country/stat index mappings, rebuilt every session.
///
/// The World sentinel and excluded carrier entries never appear as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchIndex {
    /// Country record position → stat record position.
    pub country_to_stat: FxHashMap<usize, usize>,
    /// Lowercased ISO alpha-2 code → stat record position.
    pub code2_to_stat: FxHashMap<String, usize>,
    /// Stat record position → country record position.
    pub stat_to_country: FxHashMap<usize, usize>,
    /// Generalized area name → stat record position, for areas with no
    /// owning country record.
    pub generalized_to_stat: FxHashMap<String, usize>,
}

impl MatchIndex {
    /// Stat index for an ISO alpha-2 code (input case-insensitive).
    ///
    /// Falls back to the associated generalized area for codes reported
    /// under one (e.g. Jersey under "Channel Islands").
    pub fn stat_index_for_code(&self, cca2: &str) -> Option<usize> {
        let cca2 = cca2.to_lowercase();
        if let Some(idx) = self.code2_to_stat.get(&cca2) {
            return Some(*idx);
        }
        associated_area(&cca2).and_then(|area| self.generalized_to_stat.get(area).copied())
    }
}

/// Bind every stat record to its best-matching country record.
///
/// Deterministic: identical inputs produce identical indices. Ties on
/// confidence keep the first-seen country record (strict `<` comparison),
/// matching the behavior downstream consumers were built against.
pub fn match_countries(countries: &[CountryRecord], stats: &[StatRecord]) -> MatchIndex {
    let mut index = MatchIndex::default();
    let candidates: Vec<Candidate> = countries.iter().map(Candidate::from).collect();

    for (stat_idx, stat) in stats.iter().enumerate() {
        let Some(raw_name) = stat.country_text.as_deref() else {
            continue;
        };
        if stat.is_world() {
            continue;
        }

        let mut effective = raw_name.to_string();
        match prematch_override(raw_name) {
            Some(Override::Generalized) => {
                debug!(area = %raw_name, stat_idx, "registered generalized area");
                index.generalized_to_stat.insert(raw_name.to_string(), stat_idx);
                continue;
            }
            Some(Override::Rename(corrected)) => {
                debug!(from = %raw_name, to = %corrected, "applying manual name override");
                effective = corrected.to_string();
            }
            None => {}
        }

        if EXCLUDED_CARRIERS.contains(&effective.as_str()) {
            debug!(name = %effective, "skipping non-country carrier entry");
            continue;
        }

        let mut best_idx = 0usize;
        let mut best = 0.0f64;
        for (country_idx, candidate) in candidates.iter().enumerate() {
            let score = confidence(candidate, &effective);
            if best < score {
                best = score;
                best_idx = country_idx;
                if best == 1.0 {
                    break;
                }
            }
        }

        let cca2 = countries[best_idx].cca2.to_lowercase();
        if best < 1.0 || effective != raw_name {
            debug!(
                country = %countries[best_idx].name.common,
                stat = %raw_name,
                confidence = best,
                "accepted fuzzy match"
            );
        }

        index.country_to_stat.insert(best_idx, stat_idx);
        index.code2_to_stat.insert(cca2, stat_idx);
        index.stat_to_country.insert(stat_idx, best_idx);
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryName;

    fn country(cca2: &str, cca3: &str, common: &str, official: &str, alt: &[&str]) -> CountryRecord {
        CountryRecord {
            cca2: cca2.to_string(),
            cca3: cca3.to_string(),
            name: CountryName {
                common: common.to_string(),
                official: official.to_string(),
            },
            alt_spellings: alt.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn stat(name: &str) -> StatRecord {
        StatRecord {
            country_text: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn perfect_alt_spelling_selects_country() {
        let countries = vec![
            country("um", "UMI", "United States Minor Outlying Islands", "USMOI", &[]),
            country(
                "us",
                "USA",
                "United States",
                "United States of America",
                &["US", "USA"],
            ),
        ];
        let stats = vec![stat("World"), stat("USA")];
        let index = match_countries(&countries, &stats);
        assert_eq!(index.code2_to_stat.get("us"), Some(&1));
        assert_eq!(index.stat_to_country.get(&1), Some(&1));
        assert_eq!(index.country_to_stat.get(&1), Some(&1));
    }

    #[test]
    fn short_circuit_beats_higher_average() {
        // First record averages well against "Albania" but never hits 1.0;
        // second holds one perfect alt spelling among junk fields.
        let countries = vec![
            country("xx", "XXX", "Albanya", "Albanija", &["Albaniaa"]),
            country("al", "ALB", "Shqipëria", "Republic of Albania", &["Albania", "zzzzzz"]),
        ];
        let stats = vec![stat("Albania")];
        let index = match_countries(&countries, &stats);
        assert_eq!(index.code2_to_stat.get("al"), Some(&0));
    }

    #[test]
    fn tie_break_keeps_first_seen() {
        let a = country("aa", "AAA", "Samecountry", "Samecountry", &[]);
        let b = country("bb", "BBB", "Samecountry", "Samecountry", &[]);
        let index = match_countries(&[a, b], &[stat("Samecountri")]);
        // Equal confidence everywhere, strict < keeps index 0.
        assert_eq!(index.stat_to_country.get(&0), Some(&0));
        assert!(index.code2_to_stat.contains_key("aa"));
        assert!(!index.code2_to_stat.contains_key("bb"));
    }

    #[test]
    fn world_sentinel_never_indexed() {
        let countries = vec![country("us", "USA", "United States", "USA", &[])];
        let index = match_countries(&countries, &[stat("World")]);
        assert!(index.code2_to_stat.is_empty());
        assert!(index.stat_to_country.is_empty());
        assert!(index.country_to_stat.is_empty());
    }

    #[test]
    fn excluded_carriers_never_indexed() {
        let countries = vec![country("jp", "JPN", "Japan", "Japan", &[])];
        let stats = vec![stat("Diamond Princess"), stat("MS Zaandam")];
        let index = match_countries(&countries, &stats);
        assert!(index.code2_to_stat.is_empty());
        assert!(index.generalized_to_stat.is_empty());
    }

    #[test]
    fn rename_override_forces_assignment() {
        let countries = vec![
            country("cf", "CAF", "Central African Republic", "Central African Republic", &[]),
            country("ca", "CAN", "Canada", "Canada", &["CA", "CAN"]),
        ];
        // Raw name "CAR" would fuzzily drift toward Canada's short codes;
        // the override pins it to the republic.
        let index = match_countries(&countries, &[stat("CAR")]);
        assert_eq!(index.code2_to_stat.get("cf"), Some(&0));
    }

    #[test]
    fn generalized_override_registers_by_name() {
        let countries = vec![country("gb", "GBR", "United Kingdom", "UK", &[])];
        let index = match_countries(&countries, &[stat("Channel Islands")]);
        assert_eq!(index.generalized_to_stat.get("Channel Islands"), Some(&0));
        assert!(index.code2_to_stat.is_empty());
        assert_eq!(index.stat_index_for_code("JE"), Some(0));
        assert_eq!(index.stat_index_for_code("gg"), Some(0));
        assert_eq!(index.stat_index_for_code("fr"), None);
    }

    #[test]
    fn non_ascii_fields_are_skipped() {
        let candidate = Candidate::Record(vec![
            Candidate::Text("Curaçao".to_string()),
            Candidate::Text("Curacao".to_string()),
        ]);
        assert_eq!(confidence(&candidate, "Curacao"), 1.0);
        // Only the ASCII field is examined for the average.
        let partial = Candidate::Record(vec![
            Candidate::Text("Curaçao".to_string()),
            Candidate::Text("Aruba".to_string()),
        ]);
        let score = confidence(&partial, "Curacao");
        assert!(score < 1.0 && score > 0.0);
    }

    #[test]
    fn zero_examined_fields_yield_nan() {
        let candidate = Candidate::Record(vec![Candidate::Text("Ελλάδα".to_string())]);
        assert!(confidence(&candidate, "Greece").is_nan());
    }

    #[test]
    fn nan_candidates_never_win_argmax() {
        // A record with no ASCII fields at all scores NaN; strict < must
        // reject it even when it is seen first.
        let countries = vec![
            country("ελ", "ΕΛΛ", "Ελλάδα", "Ελληνική Δημοκρατία", &[]),
            country("de", "DEU", "Germany", "Federal Republic of Germany", &[]),
        ];
        let index = match_countries(&countries, &[stat("Germany")]);
        assert_eq!(index.code2_to_stat.get("de"), Some(&0));
        assert_eq!(index.stat_to_country.get(&0), Some(&1));
    }
}
