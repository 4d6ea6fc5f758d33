//! Index advisor
//!
//! Turns the table accesses of a [`QueryProfile`] into nonclustered index
//! candidates. Key columns follow a [`KeyPriority`] policy; every other
//! column the access reads becomes an INCLUDE column. Candidates an existing
//! index already serves are reported as [`CoveredCandidate`] notes instead.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, Table};
use crate::profile::{push_unique, QueryProfile, TableAccess};

/// Where a key column comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Equality,
    Range,
    Join,
    OrderBy,
    GroupBy,
}

/// Order in which column groups fill the index key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPriority {
    pub order: Vec<KeySource>,
}

impl Default for KeyPriority {
    fn default() -> Self {
        Self {
            order: vec![
                KeySource::Equality,
                KeySource::Range,
                KeySource::Join,
                KeySource::OrderBy,
                KeySource::GroupBy,
            ],
        }
    }
}

/// What a recommended index serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Predicate,
    Join,
    GroupBy,
    OrderBy,
    Covering,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Predicate => "predicate",
            Purpose::Join => "join",
            Purpose::GroupBy => "group by",
            Purpose::OrderBy => "order by",
            Purpose::Covering => "covering",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecommendation {
    pub schema: String,
    pub table: String,
    pub key_columns: Vec<String>,
    /// Sorted case-insensitively
    pub included_columns: Vec<String>,
    pub purposes: Vec<Purpose>,
    pub name: String,
    pub create_statement: String,
}

/// A candidate an existing index (or the primary key) already serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoveredCandidate {
    pub schema: String,
    pub table: String,
    pub key_columns: Vec<String>,
    pub existing_index: String,
    /// Candidate INCLUDE columns the existing index does not carry
    pub uncovered_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdvisorReport {
    pub recommendations: Vec<IndexRecommendation>,
    pub covered: Vec<CoveredCandidate>,
}

/// Working form of a recommendation before naming
#[derive(Debug, Clone)]
struct Candidate {
    schema: String,
    table: String,
    key: Vec<String>,
    include: Vec<String>,
    purposes: Vec<Purpose>,
}

impl Candidate {
    fn same_table(&self, other: &Candidate) -> bool {
        self.schema.eq_ignore_ascii_case(&other.schema)
            && self.table.eq_ignore_ascii_case(&other.table)
    }

    /// One key is a leading prefix of the other
    fn prefix_compatible(&self, other: &Candidate) -> bool {
        self.key
            .iter()
            .zip(&other.key)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    fn absorb(&mut self, other: Candidate) {
        if other.key.len() > self.key.len() {
            self.key = other.key;
        }
        for column in other.include {
            push_unique(&mut self.include, &column);
        }
        for purpose in other.purposes {
            if !self.purposes.contains(&purpose) {
                self.purposes.push(purpose);
            }
        }
        self.normalize();
    }

    /// Fold a candidate whose key does not line up with ours; its key
    /// columns are carried as INCLUDE columns
    fn fold(&mut self, other: Candidate) {
        for column in other.key.iter().chain(&other.include) {
            push_unique(&mut self.include, column);
        }
        for purpose in other.purposes {
            if !self.purposes.contains(&purpose) {
                self.purposes.push(purpose);
            }
        }
        self.normalize();
    }

    /// Drop key columns from INCLUDE, sort includes and purposes
    fn normalize(&mut self) {
        let key = &self.key;
        self.include
            .retain(|c| !key.iter().any(|k| k.eq_ignore_ascii_case(c)));
        self.include.sort_by_key(|c| c.to_lowercase());
        self.purposes.sort();
        if self.include.is_empty() {
            self.purposes.retain(|p| *p != Purpose::Covering);
        } else if !self.purposes.contains(&Purpose::Covering) {
            self.purposes.push(Purpose::Covering);
        }
    }

    fn from_recommendation(rec: IndexRecommendation) -> Self {
        Self {
            schema: rec.schema,
            table: rec.table,
            key: rec.key_columns,
            include: rec.included_columns,
            purposes: rec.purposes,
        }
    }

    fn into_recommendation(self) -> IndexRecommendation {
        let name = format!("IX_{}_{}", self.table, self.key.join("_"));
        let mut create_statement = format!(
            "CREATE NONCLUSTERED INDEX [{}] ON [{}].[{}] ({})",
            name,
            self.schema,
            self.table,
            bracketed(&self.key)
        );
        if !self.include.is_empty() {
            create_statement.push_str(&format!(" INCLUDE ({})", bracketed(&self.include)));
        }
        create_statement.push(';');

        IndexRecommendation {
            schema: self.schema,
            table: self.table,
            key_columns: self.key,
            included_columns: self.include,
            purposes: self.purposes,
            name,
            create_statement,
        }
    }
}

fn bracketed(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("[{}]", c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn contains(list: &[String], column: &str) -> bool {
    list.iter().any(|c| c.eq_ignore_ascii_case(column))
}

/// Key columns of the clustered index; every nonclustered index carries them
fn clustered_key(table: &Table) -> Vec<String> {
    table
        .all_indexes()
        .find(|index| index.clustered)
        .map(|index| index.columns.clone())
        .unwrap_or_default()
}

/// Build the candidate for one access, `None` when nothing can be seeked or sorted
fn candidate(access: &TableAccess, table: &Table, priority: &KeyPriority) -> Option<Candidate> {
    let mut key: Vec<String> = Vec::new();
    let mut demoted: Vec<String> = Vec::new();
    let mut purposes: Vec<Purpose> = Vec::new();
    // A range column ends the seekable part of the key
    let mut sealed = false;
    let group_by_is_key = !access.has_predicates() && access.join_columns.is_empty();

    for source in &priority.order {
        let (columns, purpose) = match source {
            KeySource::Equality => (&access.equality_columns, Purpose::Predicate),
            KeySource::Range => (&access.range_columns, Purpose::Predicate),
            KeySource::Join => (&access.join_columns, Purpose::Join),
            KeySource::OrderBy => (&access.order_by_columns, Purpose::OrderBy),
            KeySource::GroupBy => (&access.group_by_columns, Purpose::GroupBy),
        };
        for column in columns {
            if contains(&key, column) {
                continue;
            }
            let keyable = !sealed && (*source != KeySource::GroupBy || group_by_is_key);
            if !keyable {
                push_unique(&mut demoted, column);
                continue;
            }
            key.push(column.clone());
            if !purposes.contains(&purpose) {
                purposes.push(purpose);
            }
            if *source == KeySource::Range {
                sealed = true;
            }
        }
    }

    if key.is_empty() {
        return None;
    }

    let mut include: Vec<String> = Vec::new();
    for column in &access.aggregate_columns {
        push_unique(&mut include, column);
    }
    if !access.uses_wildcard {
        for column in &access.projected_columns {
            push_unique(&mut include, column);
        }
    }
    for column in access.inequality_columns.iter().chain(&demoted) {
        push_unique(&mut include, column);
    }
    let clustered = clustered_key(table);
    include.retain(|c| !contains(&clustered, c));

    let mut candidate = Candidate {
        schema: table.schema.clone(),
        table: table.name.clone(),
        key,
        include,
        purposes,
    };
    candidate.normalize();
    Some(candidate)
}

/// Merge prefix-compatible candidates of the same table, keeping first-seen order
fn merge_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match merged
            .iter_mut()
            .find(|m| m.same_table(&candidate) && m.prefix_compatible(&candidate))
        {
            Some(existing) => existing.absorb(candidate),
            None => merged.push(candidate),
        }
    }
    merged
}

/// Collapse every candidate of a table into one description. The longest
/// key wins (first seen on a tie); the rest are folded into it.
fn merge_per_table(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    for candidate in merge_candidates(candidates) {
        match groups.iter_mut().find(|g| g[0].same_table(&candidate)) {
            Some(group) => group.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }

    let mut merged = Vec::with_capacity(groups.len());
    for mut group in groups {
        let mut lead = 0;
        for (i, candidate) in group.iter().enumerate() {
            if candidate.key.len() > group[lead].key.len() {
                lead = i;
            }
        }
        let mut combined = group.remove(lead);
        for other in group {
            combined.fold(other);
        }
        merged.push(combined);
    }
    merged
}

fn compare_recommendations(a: &IndexRecommendation, b: &IndexRecommendation) -> Ordering {
    let lower = |r: &IndexRecommendation| {
        (
            r.schema.to_lowercase(),
            r.table.to_lowercase(),
            r.key_columns.iter().map(|c| c.to_lowercase()).collect::<Vec<_>>(),
        )
    };
    lower(a).cmp(&lower(b))
}

/// Index recommendations for one statement profile with the default key priority
pub fn recommend(profile: &QueryProfile, catalog: &Catalog) -> AdvisorReport {
    recommend_with(profile, catalog, &KeyPriority::default())
}

pub fn recommend_with(
    profile: &QueryProfile,
    catalog: &Catalog,
    priority: &KeyPriority,
) -> AdvisorReport {
    let mut candidates = Vec::new();
    for access in &profile.accesses {
        let Some(table) = catalog.resolve_table(Some(&access.schema), &access.table) else {
            continue;
        };
        candidates.extend(candidate(access, table, priority));
    }

    let mut report = AdvisorReport::default();
    for candidate in merge_per_table(candidates) {
        let Some(table) = catalog.resolve_table(Some(&candidate.schema), &candidate.table) else {
            continue;
        };
        match catalog.indexes_covering(table, &candidate.key).first() {
            Some(existing) => {
                debug!(
                    table = %table.qualified_name(),
                    index = %existing.name,
                    "Candidate already served by existing index"
                );
                let uncovered = candidate
                    .include
                    .iter()
                    .filter(|c| !existing.covers_column(c))
                    .cloned()
                    .collect();
                report.covered.push(CoveredCandidate {
                    schema: candidate.schema,
                    table: candidate.table,
                    key_columns: candidate.key,
                    existing_index: existing.name.clone(),
                    uncovered_columns: uncovered,
                });
            }
            None => report.recommendations.push(candidate.into_recommendation()),
        }
    }

    report.recommendations.sort_by(compare_recommendations);
    report.covered.sort_by(|a, b| {
        (a.table.to_lowercase(), &a.key_columns).cmp(&(b.table.to_lowercase(), &b.key_columns))
    });
    report
}

/// Consolidate recommendations from several statements. Only
/// prefix-compatible keys are merged; different statements may need
/// differently ordered keys on the same table.
pub fn merge_recommendations(recommendations: Vec<IndexRecommendation>) -> Vec<IndexRecommendation> {
    let candidates = recommendations
        .into_iter()
        .map(Candidate::from_recommendation)
        .collect();
    let mut merged: Vec<IndexRecommendation> = merge_candidates(candidates)
        .into_iter()
        .map(Candidate::into_recommendation)
        .collect();
    merged.sort_by(compare_recommendations);
    merged
}
