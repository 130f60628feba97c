//! Page planning for the exported marksheet.
//!
//! All positions are millimetres measured from the top-left corner of the
//! page. The backend converts to its own coordinate system.

use super::text;
use crate::config::PageSize;
use crate::view::{fmt_score, MarksheetView};
use std::ops::Range;

pub const FRAME_INSET: f32 = 8.0;
pub const SIDE_MARGIN: f32 = 12.0;
pub const DIVIDER_Y: f32 = 32.0;
pub const INFO_Y: f32 = 38.0;
pub const INFO_LINE: f32 = 6.0;
/// Table top on the first page, below the student info block.
pub const FIRST_TABLE_TOP: f32 = 50.0;
/// Table top on continuation pages, just under the header divider.
pub const CONTINUED_TABLE_TOP: f32 = 38.0;
pub const HEAD_HEIGHT: f32 = 9.0;
/// Height of a single-line body or foot row.
pub const ROW_HEIGHT: f32 = 8.5;
/// Extra height per wrapped line inside a cell.
pub const LINE_PITCH: f32 = 4.8;
pub const CELL_PAD: f32 = 2.0;
pub const TABLE_FONT_PT: f32 = 11.0;
/// Lowest point the table or closing block may reach, from the page bottom.
pub const BOTTOM_RESERVE: f32 = 18.0;
pub const FOOTER_FROM_BOTTOM: f32 = 11.0;
pub const SIGNATURE_FROM_BOTTOM: f32 = 30.0;
pub const SIGNATURE_LABEL_GAP: f32 = 6.0;

pub const LOGO_BOX: (f32, f32, f32) = (12.0, 12.0, 20.0);
/// Header text stays clear of the logo box on both sides.
const HEADER_SIDE: f32 = 34.0;
const HEADER_TOP: f32 = 12.0;
const HEADER_LEADING: f32 = 1.15;
const HEADER_MAX_LINES: usize = 2;

const COLUMN_SHARES: [f32; 5] = [0.32, 0.16, 0.2, 0.18, 0.14];
pub const COLUMN_TITLES: [&str; 5] = [
    "Subject",
    "Full Marks",
    "Marks Obtained",
    "Grade Obtained",
    "Position",
];
const MM_PER_PT: f32 = 0.352_778;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn for_size(size: PageSize) -> Self {
        let (width, height) = size.dimensions_mm();
        Self { width, height }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * SIDE_MARGIN
    }

    pub fn bottom_limit(&self) -> f32 {
        self.height - BOTTOM_RESERVE
    }

    pub fn footer_y(&self) -> f32 {
        self.height - FOOTER_FROM_BOTTOM
    }

    /// x positions of the table's vertical rules, left to right.
    pub fn column_edges(&self) -> Vec<f32> {
        let width = self.content_width();
        let mut edges = vec![SIDE_MARGIN];
        let mut x = SIDE_MARGIN;
        for share in COLUMN_SHARES {
            x += share * width;
            edges.push(x);
        }
        edges
    }

    pub fn header_width(&self) -> f32 {
        self.width - 2.0 * HEADER_SIDE
    }
}

/// One table row with every cell wrapped to its column.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<Vec<String>>,
    pub height: f32,
    pub bold: bool,
}

impl TableRow {
    pub fn wrap(cells: &[String], geom: &PageGeometry, min_height: f32, bold: bool) -> Self {
        let edges = geom.column_edges();
        let cells: Vec<Vec<String>> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = edges[i + 1] - edges[i] - 2.0 * CELL_PAD;
                text::wrap(cell, TABLE_FONT_PT, bold, width)
            })
            .collect();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        Self {
            cells,
            height: min_height + (lines - 1) as f32 * LINE_PITCH,
            bold,
        }
    }
}

/// The subject table of one marksheet, ready to be laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct MarksTable {
    pub head: TableRow,
    pub body: Vec<TableRow>,
    pub foot: TableRow,
}

impl MarksTable {
    pub fn for_view(view: &MarksheetView, geom: &PageGeometry) -> Self {
        let head: Vec<String> = COLUMN_TITLES.iter().map(|t| t.to_string()).collect();
        let body = view
            .rows
            .iter()
            .map(|row| {
                let cells = [
                    row.subject.clone(),
                    fmt_score(row.full),
                    fmt_score(row.obtained),
                    row.grade.to_string(),
                    row.position.to_string(),
                ];
                TableRow::wrap(&cells, geom, ROW_HEIGHT, false)
            })
            .collect();
        let s = &view.summary;
        let foot = [
            "Total".to_string(),
            fmt_score(s.total_full),
            fmt_score(s.total_obtained),
            s.grade.to_string(),
            s.position.to_string(),
        ];
        Self {
            head: TableRow::wrap(&head, geom, HEAD_HEIGHT, true),
            body,
            foot: TableRow::wrap(&foot, geom, ROW_HEIGHT, true),
        }
    }
}

/// A centred header line with its own size and baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub y: f32,
}

fn header_block(s: &str, max_pt: f32, min_pt: f32, bold: bool, width: f32) -> (f32, Vec<String>) {
    let size = text::fit_size(s, max_pt, min_pt, bold, width);
    let mut lines = text::wrap(s, size, bold, width);
    if lines.len() > HEADER_MAX_LINES {
        let rest = lines.split_off(HEADER_MAX_LINES - 1).join(" ");
        lines.push(text::ellipsize(&rest, size, bold, width));
    }
    (size, lines)
}

/// Institution name then exam title, shrunk and wrapped to stay between the
/// logo and the divider.
pub fn header_lines(institution: &str, exam: &str, geom: &PageGeometry) -> Vec<HeaderLine> {
    let width = geom.header_width();
    let blocks = [
        (header_block(institution, 16.0, 10.0, true, width), true),
        (header_block(exam, 12.0, 9.0, false, width), false),
    ];
    let mut y = HEADER_TOP;
    let mut out = Vec::new();
    for ((size, lines), bold) in blocks {
        for line in lines {
            y += size * MM_PER_PT * HEADER_LEADING;
            out.push(HeaderLine {
                text: line,
                size,
                bold,
                y,
            });
        }
    }
    out
}

/// The part of the subject table drawn on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSlice {
    pub top: f32,
    pub rows: Range<usize>,
    pub with_foot: bool,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosingBlock {
    pub attendance_y: Option<f32>,
    pub signature_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// 1-based.
    pub number: usize,
    pub student_info: bool,
    pub table: Option<TableSlice>,
    pub closing: Option<ClosingBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub geometry: PageGeometry,
    pub pages: Vec<PagePlan>,
}

impl DocumentPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// Attendance sits 8mm below the table, signatures 10mm below that.
fn closing_after(table_bottom: f32, has_attendance: bool, geom: &PageGeometry) -> Option<ClosingBlock> {
    let mut y = table_bottom + 8.0;
    let attendance_y = if has_attendance {
        let at = y;
        y += 10.0;
        Some(at)
    } else {
        None
    };
    let signature_y = y + 10.0;
    let ceiling = geom.height - SIGNATURE_FROM_BOTTOM;
    if signature_y > ceiling {
        return None;
    }
    Some(ClosingBlock {
        attendance_y,
        signature_y,
    })
}

fn table_top(page_number: usize) -> f32 {
    if page_number == 1 {
        FIRST_TABLE_TOP
    } else {
        CONTINUED_TABLE_TOP
    }
}

/// Splits the table rows across pages by their wrapped heights.
///
/// The head row repeats on every page that carries part of the table. The
/// foot (totals) row is drawn once, directly after the last subject row;
/// if it does not fit there it opens the next page on its own. A row too
/// tall for an empty continuation page is placed anyway. The closing block
/// follows the table, or moves to a fresh page when it would run into the
/// signature area.
pub fn paginate(table: &MarksTable, has_attendance: bool, geom: PageGeometry) -> DocumentPlan {
    let limit = geom.bottom_limit();
    let row_count = table.body.len();
    let empty_page_room = limit - CONTINUED_TABLE_TOP - table.head.height;
    let mut pages: Vec<PagePlan> = Vec::new();
    let mut next_row = 0;
    let mut foot_placed = false;

    while !foot_placed {
        let number = pages.len() + 1;
        let top = table_top(number);
        let mut y = top + table.head.height;
        let mut end = next_row;
        while end < row_count {
            let h = table.body[end].height;
            let oversized = end == next_row && number > 1 && h > empty_page_room;
            if y + h > limit && !oversized {
                break;
            }
            y += h;
            end += 1;
        }
        let foot_h = table.foot.height;
        let with_foot =
            end == row_count && (y + foot_h <= limit || (end == next_row && number > 1));
        if with_foot {
            y += foot_h;
        }

        pages.push(PagePlan {
            number,
            student_info: number == 1,
            table: Some(TableSlice {
                top,
                rows: next_row..end,
                with_foot,
                bottom: y,
            }),
            closing: None,
        });
        next_row = end;
        foot_placed = with_foot;
    }

    let table_bottom = pages
        .last()
        .and_then(|p| p.table.as_ref())
        .map(|t| t.bottom)
        .unwrap_or(FIRST_TABLE_TOP);
    match closing_after(table_bottom, has_attendance, &geom) {
        Some(block) => {
            if let Some(last) = pages.last_mut() {
                last.closing = Some(block);
            }
        }
        None => {
            let number = pages.len() + 1;
            let block = closing_after(CONTINUED_TABLE_TOP - 8.0, has_attendance, &geom).unwrap_or(
                ClosingBlock {
                    attendance_y: has_attendance.then_some(CONTINUED_TABLE_TOP),
                    signature_y: geom.height - SIGNATURE_FROM_BOTTOM,
                },
            );
            pages.push(PagePlan {
                number,
                student_info: false,
                table: None,
                closing: Some(block),
            });
        }
    }

    DocumentPlan { geometry: geom, pages }
}
