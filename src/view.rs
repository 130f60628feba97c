use crate::grading::{self, Letter};
use crate::ranking;
use crate::records::{Attendance, StudentRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentInfo {
    pub name: String,
    pub roll: String,
    pub class: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRow {
    pub subject: String,
    pub full: f64,
    pub obtained: f64,
    pub grade: Letter,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_full: f64,
    pub total_obtained: f64,
    pub percent: Option<f64>,
    pub grade: Letter,
    pub gpa: f64,
    pub position: u32,
    pub cohort_size: usize,
}

/// Everything the marksheet shows, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarksheetView {
    pub student: StudentInfo,
    pub rows: Vec<SubjectRow>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub position: u32,
    pub cohort_size: usize,
}

pub fn render_view(record: &StudentRecord, rank: Rank) -> MarksheetView {
    let rows = record
        .marks
        .iter()
        .map(|m| SubjectRow {
            subject: m.subject.clone(),
            full: m.full,
            obtained: m.obtained,
            grade: grading::grade(m.obtained, m.full),
            position: rank.position,
        })
        .collect();

    let total_full = ranking::total_full(record);
    let total_obtained = ranking::total_obtained(record);
    let grade = grading::grade(total_obtained, total_full);

    MarksheetView {
        student: StudentInfo {
            name: record.name.clone(),
            roll: record.roll.clone(),
            class: record.class.clone(),
            section: record.section.clone(),
        },
        rows,
        summary: Summary {
            total_full,
            total_obtained,
            percent: grading::percentage(total_obtained, total_full),
            grade,
            gpa: grade.gpa_points(),
            position: rank.position,
            cohort_size: rank.cohort_size,
        },
        attendance: record.attendance,
    }
}

/// Grades and ranks `record` against `cohort`, then renders it.
pub fn build_marksheet(record: &StudentRecord, cohort: &[StudentRecord]) -> MarksheetView {
    let cohort_size = cohort
        .iter()
        .filter(|r| ranking::in_cohort(r, &record.class, &record.section))
        .count();
    let rank = Rank {
        position: ranking::rank(record, cohort),
        cohort_size,
    };
    render_view(record, rank)
}

/// Scores print the way they were entered: `100`, `79.5`.
pub fn fmt_score(v: f64) -> String {
    format!("{}", v)
}
