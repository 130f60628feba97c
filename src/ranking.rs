use crate::records::StudentRecord;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRankEntry {
    pub name: String,
    pub roll: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub rank: u32,
    #[serde(flatten)]
    pub entry: CohortRankEntry,
}

/// Sum of obtained marks. Non-finite values count as zero.
pub fn total_obtained(record: &StudentRecord) -> f64 {
    record
        .marks
        .iter()
        .map(|m| if m.obtained.is_finite() { m.obtained } else { 0.0 })
        .sum()
}

pub fn total_full(record: &StudentRecord) -> f64 {
    record
        .marks
        .iter()
        .map(|m| if m.full.is_finite() { m.full } else { 0.0 })
        .sum()
}

pub fn in_cohort(record: &StudentRecord, class: &str, section: &str) -> bool {
    record.class == class && record.section == section
}

// Higher total first. Equal totals fall back to roll, then name, so the
// listing order never depends on declaration order.
fn standing_order(a: &CohortRankEntry, b: &CohortRankEntry) -> Ordering {
    b.total
        .partial_cmp(&a.total)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.roll.cmp(&b.roll))
        .then_with(|| a.name.cmp(&b.name))
}

/// Ranked entries of the (class, section) cohort found in `records`.
///
/// Competition ranking: tied totals share the rank of the first entry with
/// that total and the following rank skips the tied count (1, 2, 2, 4).
pub fn cohort_standings(class: &str, section: &str, records: &[StudentRecord]) -> Vec<Standing> {
    let mut entries: Vec<CohortRankEntry> = records
        .iter()
        .filter(|r| in_cohort(r, class, section))
        .map(|r| CohortRankEntry {
            name: r.name.clone(),
            roll: r.roll.clone(),
            total: total_obtained(r),
        })
        .collect();
    entries.sort_by(standing_order);

    let mut rank: u32 = 0;
    let mut prev_total: Option<f64> = None;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let drops = prev_total.map(|p| entry.total < p).unwrap_or(true);
            if drops {
                rank = i as u32 + 1;
            }
            prev_total = Some(entry.total);
            Standing { rank, entry }
        })
        .collect()
}

/// Rank of `target` inside its own cohort.
///
/// When `target` is absent from `cohort` the cohort size is returned
/// (never below 1).
pub fn rank(target: &StudentRecord, cohort: &[StudentRecord]) -> u32 {
    let standings = cohort_standings(&target.class, &target.section, cohort);
    standings
        .iter()
        .find(|s| target.same_entrant(&s.entry.name, &s.entry.roll))
        .map(|s| s.rank)
        .unwrap_or_else(|| standings.len().max(1) as u32)
}
