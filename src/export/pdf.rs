use super::layout::{
    self, ClosingBlock, PageGeometry, TableRow, TableSlice, CELL_PAD, DIVIDER_Y, FRAME_INSET,
    INFO_LINE, INFO_Y, LINE_PITCH, LOGO_BOX, SIDE_MARGIN, SIGNATURE_LABEL_GAP, TABLE_FONT_PT,
};
use super::text;
use super::{Capabilities, DocumentBackend, DocumentContent};
use crate::view::MarksheetView;
use anyhow::anyhow;
use printpdf::image_crate::{DynamicImage, GenericImageView};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};

const HEAD_FILL: (f32, f32, f32) = (13.0 / 255.0, 110.0 / 255.0, 253.0 / 255.0);
const FOOT_FILL: (f32, f32, f32) = (220.0 / 255.0, 220.0 / 255.0, 220.0 / 255.0);
const MM_PER_PT: f32 = 0.352_778;
const IMAGE_DPI: f32 = 300.0;

/// PDF renderer on builtin Helvetica. `table_layout: false` models a
/// deployment without the table renderer; such a backend is refused before
/// rendering starts.
pub struct PdfBackend {
    table_layout: bool,
}

impl PdfBackend {
    pub fn new(table_layout: bool) -> Self {
        Self { table_layout }
    }
}

impl DocumentBackend for PdfBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            document: true,
            table_layout: self.table_layout,
        }
    }

    fn render(&self, doc: &DocumentContent<'_>) -> anyhow::Result<Vec<u8>> {
        if !self.table_layout {
            return Err(anyhow!("table layout is disabled"));
        }
        render_pdf(doc)
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn black() -> Color {
    rgb((0.0, 0.0, 0.0))
}

/// One page, addressed top-down in millimetres.
struct Canvas<'a> {
    layer: PdfLayerReference,
    geom: &'a PageGeometry,
    fonts: &'a Fonts,
}

impl Canvas<'_> {
    fn y(&self, top_down: f32) -> Mm {
        Mm(self.geom.height - top_down)
    }

    fn text(&self, s: &str, size: f32, x: f32, y: f32, bold: bool) {
        self.layer.set_fill_color(black());
        let font = if bold { &self.fonts.bold } else { &self.fonts.regular };
        self.layer.use_text(s, size, Mm(x), self.y(y), font);
    }

    fn text_centered(&self, s: &str, size: f32, cx: f32, y: f32, bold: bool) {
        self.text(s, size, cx - text::text_width(s, size, bold) / 2.0, y, bold);
    }

    fn text_right(&self, s: &str, size: f32, right: f32, y: f32) {
        self.text(s, size, right - text::text_width(s, size, false), y, false);
    }

    fn line(&self, x1: f32, y1: f32, x2: f32, y2: f32, thickness_mm: f32) {
        self.layer.set_outline_color(black());
        self.layer.set_outline_thickness(thickness_mm / MM_PER_PT);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), self.y(y1)), false),
                (Point::new(Mm(x2), self.y(y2)), false),
            ],
            is_closed: false,
        });
    }

    fn stroke_rect(&self, x: f32, y: f32, w: f32, h: f32, thickness_mm: f32) {
        self.layer.set_outline_color(black());
        self.layer.set_outline_thickness(thickness_mm / MM_PER_PT);
        self.layer
            .add_rect(Rect::new(Mm(x), self.y(y + h), Mm(x + w), self.y(y)).with_mode(PaintMode::Stroke));
    }

    fn fill_rect(&self, x: f32, y: f32, w: f32, h: f32, fill: (f32, f32, f32)) {
        self.layer.set_fill_color(rgb(fill));
        self.layer
            .add_rect(Rect::new(Mm(x), self.y(y + h), Mm(x + w), self.y(y)).with_mode(PaintMode::Fill));
    }

    /// Stretches `img` over the box whose top-left corner is (x, y).
    fn image(&self, img: &DynamicImage, x: f32, y: f32, w: f32, h: f32) {
        let (px_w, px_h) = img.dimensions();
        if px_w == 0 || px_h == 0 {
            return;
        }
        let native_w = px_w as f32 / IMAGE_DPI * 25.4;
        let native_h = px_h as f32 / IMAGE_DPI * 25.4;
        let flat = DynamicImage::ImageRgb8(img.to_rgb8());
        Image::from_dynamic_image(&flat).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(self.y(y + h)),
                scale_x: Some(w / native_w),
                scale_y: Some(h / native_h),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
    }
}

fn draw_frame_and_header(c: &Canvas<'_>, doc: &DocumentContent<'_>) {
    let g = c.geom;
    if let Some(bg) = &doc.assets.background {
        c.image(bg, 0.0, 0.0, g.width, g.height);
    }
    c.stroke_rect(
        FRAME_INSET,
        FRAME_INSET,
        g.width - 2.0 * FRAME_INSET,
        g.height - 2.0 * FRAME_INSET,
        0.6,
    );
    if let Some(logo) = &doc.assets.logo {
        let (x, y, side) = LOGO_BOX;
        c.image(logo, x, y, side, side);
    }
    for line in layout::header_lines(&doc.branding.institution, &doc.branding.exam, g) {
        c.text_centered(&line.text, line.size, g.width / 2.0, line.y, line.bold);
    }
    c.line(10.0, DIVIDER_Y, g.width - 10.0, DIVIDER_Y, 0.3);
}

fn draw_student_info(c: &Canvas<'_>, view: &MarksheetView) {
    let half = c.geom.width / 2.0;
    let left_room = half - SIDE_MARGIN - CELL_PAD;
    let right_room = c.geom.width - SIDE_MARGIN - half;
    let s = &view.student;
    let fields = [
        (format!("Name: {}", s.name), SIDE_MARGIN, INFO_Y, left_room),
        (format!("Roll No: {}", s.roll), half, INFO_Y, right_room),
        (format!("Class: {}", s.class), SIDE_MARGIN, INFO_Y + INFO_LINE, left_room),
        (format!("Section: {}", s.section), half, INFO_Y + INFO_LINE, right_room),
    ];
    for (label, x, y, room) in fields {
        let size = text::fit_size(&label, 11.0, 7.0, false, room);
        let label = text::ellipsize(&label, size, false, room);
        c.text(&label, size, x, y, false);
    }
}

// Each cell's lines are centred vertically within the row.
fn draw_row(c: &Canvas<'_>, edges: &[f32], top: f32, row: &TableRow) {
    for (i, lines) in row.cells.iter().enumerate() {
        let block = (lines.len().max(1) - 1) as f32 * LINE_PITCH;
        let mut baseline = top + (row.height - block) / 2.0 + 1.5;
        for line in lines {
            c.text(line, TABLE_FONT_PT, edges[i] + CELL_PAD, baseline, row.bold);
            baseline += LINE_PITCH;
        }
    }
    let right = edges[edges.len() - 1];
    c.line(SIDE_MARGIN, top + row.height, right, top + row.height, 0.1);
    for x in edges {
        c.line(*x, top, *x, top + row.height, 0.1);
    }
}

fn draw_table(c: &Canvas<'_>, slice: &TableSlice, doc: &DocumentContent<'_>) {
    let edges = c.geom.column_edges();
    let left = SIDE_MARGIN;
    let width = c.geom.content_width();
    let table = doc.table;

    c.fill_rect(left, slice.top, width, table.head.height, HEAD_FILL);
    c.line(left, slice.top, left + width, slice.top, 0.1);
    draw_row(c, &edges, slice.top, &table.head);

    let mut y = slice.top + table.head.height;
    for row in &table.body[slice.rows.clone()] {
        draw_row(c, &edges, y, row);
        y += row.height;
    }

    if slice.with_foot {
        c.fill_rect(left, y, width, table.foot.height, FOOT_FILL);
        draw_row(c, &edges, y, &table.foot);
    }
}

fn draw_closing(c: &Canvas<'_>, block: &ClosingBlock, view: &MarksheetView) {
    if let (Some(y), Some(a)) = (block.attendance_y, view.attendance) {
        c.text(
            &format!("Days Present: {}   |   Days Absent: {}", a.present, a.absent),
            11.0,
            SIDE_MARGIN,
            y,
            false,
        );
    }
    let left_x = 20.0;
    let right_x = c.geom.width - 20.0;
    let y = block.signature_y;
    c.line(left_x, y, left_x + 60.0, y, 0.3);
    c.line(right_x - 60.0, y, right_x, y, 0.3);
    c.text("Parent's Signature", 10.0, left_x, y + SIGNATURE_LABEL_GAP, false);
    c.text(
        "Class Teacher's Signature",
        10.0,
        right_x - 60.0,
        y + SIGNATURE_LABEL_GAP,
        false,
    );
}

fn load_fonts(pdf: &PdfDocumentReference) -> anyhow::Result<Fonts> {
    Ok(Fonts {
        regular: pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("failed to load Helvetica: {e:?}"))?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("failed to load Helvetica-Bold: {e:?}"))?,
    })
}

fn render_pdf(doc: &DocumentContent<'_>) -> anyhow::Result<Vec<u8>> {
    let geom = doc.plan.geometry;
    let title = format!("Marksheet - {}", doc.view.student.name);
    let (pdf, first_page, first_layer) =
        PdfDocument::new(title, Mm(geom.width), Mm(geom.height), "Marksheet");
    let fonts = load_fonts(&pdf)?;
    let total = doc.plan.page_count();

    for page in &doc.plan.pages {
        let (page_idx, layer_idx) = if page.number == 1 {
            (first_page, first_layer)
        } else {
            pdf.add_page(Mm(geom.width), Mm(geom.height), "Marksheet")
        };
        let canvas = Canvas {
            layer: pdf.get_page(page_idx).get_layer(layer_idx),
            geom: &geom,
            fonts: &fonts,
        };

        draw_frame_and_header(&canvas, doc);
        if page.student_info {
            draw_student_info(&canvas, doc.view);
        }
        if let Some(slice) = &page.table {
            draw_table(&canvas, slice, doc);
        }
        if let Some(block) = &page.closing {
            draw_closing(&canvas, block, doc.view);
        }
        canvas.text_right(
            &format!("Page {} of {}", page.number, total),
            10.0,
            geom.width - SIDE_MARGIN,
            geom.footer_y(),
        );
    }

    pdf.save_to_bytes()
        .map_err(|e| anyhow!("failed to serialize PDF: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSize;
    use crate::export::assets::{resolve_image, ExportAssets};
    use crate::export::{plan_document, Branding};
    use crate::records::{demo_records, SubjectScore};
    use crate::view::build_marksheet;
    use std::path::Path;

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn branding() -> Branding {
        Branding {
            institution: "Greenfield College".into(),
            exam: "Annual Examination".into(),
        }
    }

    fn render_with(
        backend: &PdfBackend,
        view: &MarksheetView,
        branding: &Branding,
        assets: &ExportAssets,
        size: PageSize,
    ) -> anyhow::Result<Vec<u8>> {
        let (table, plan) = plan_document(view, size);
        backend.render(&DocumentContent {
            view,
            branding,
            assets,
            table: &table,
            plan: &plan,
        })
    }

    #[test]
    fn renders_single_page_pdf() {
        let records = demo_records();
        let view = build_marksheet(&records[0], &records);
        let (_, plan) = plan_document(&view, PageSize::Letter);
        assert_eq!(plan.page_count(), 1);
        let bytes = render_with(
            &PdfBackend::new(true),
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::Letter,
        )
        .expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_marksheet_paginates() {
        let mut record = demo_records().remove(0);
        record.marks = (0..40)
            .map(|i| SubjectScore {
                subject: format!("Paper {i}"),
                obtained: 50.0 + i as f64,
                full: 100.0,
            })
            .collect();
        let view = build_marksheet(&record, std::slice::from_ref(&record));
        let (_, plan) = plan_document(&view, PageSize::Letter);
        assert!(plan.page_count() >= 2);
        let bytes = render_with(
            &PdfBackend::new(true),
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::Letter,
        )
        .expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_subject_and_header_text_render_wrapped() {
        let mut record = demo_records().remove(0);
        record.marks[0].subject = "Information and Communication Technology".into();
        let view = build_marksheet(&record, std::slice::from_ref(&record));
        let (table, plan) = plan_document(&view, PageSize::Letter);
        assert!(table.body[0].cells[0].len() >= 2);
        assert!(table.body[0].height > table.body[1].height);
        let slice = plan.pages[0].table.as_ref().expect("table");
        let expected = slice.top
            + table.head.height
            + table.body.iter().map(|r| r.height).sum::<f32>()
            + table.foot.height;
        assert!((slice.bottom - expected).abs() < 1e-3);

        let wide = Branding {
            institution: "Greenfield International College of Science, Technology and Humanities"
                .into(),
            exam: "Half-Yearly Examination for the Academic Session 2025-2026".into(),
        };
        let bytes = render_with(
            &PdfBackend::new(true),
            &view,
            &wide,
            &ExportAssets::default(),
            PageSize::A4,
        )
        .expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_logo_and_background_images() {
        let url = format!("data:image/png;base64,{}", PIXEL_PNG);
        let image = resolve_image(Some(&url), Path::new(".")).expect("decoded png");
        let assets = ExportAssets {
            logo: Some(image.clone()),
            background: Some(image),
        };
        let records = demo_records();
        let view = build_marksheet(&records[0], &records);
        let plain = render_with(
            &PdfBackend::new(true),
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::Letter,
        )
        .expect("render plain");
        let with_images = render_with(
            &PdfBackend::new(true),
            &view,
            &branding(),
            &assets,
            PageSize::Letter,
        )
        .expect("render with images");
        assert!(with_images.starts_with(b"%PDF"));
        assert!(with_images.len() > plain.len());
    }

    #[test]
    fn empty_image_is_skipped() {
        let assets = ExportAssets {
            logo: Some(DynamicImage::new_rgb8(0, 0)),
            background: None,
        };
        let records = demo_records();
        let view = build_marksheet(&records[0], &records);
        let bytes = render_with(
            &PdfBackend::new(true),
            &view,
            &branding(),
            &assets,
            PageSize::Letter,
        )
        .expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn table_layout_disabled_refuses_to_render() {
        let records = demo_records();
        let view = build_marksheet(&records[0], &records);
        let backend = PdfBackend::new(false);
        assert!(!backend.capabilities().table_layout);
        assert!(render_with(
            &backend,
            &view,
            &branding(),
            &ExportAssets::default(),
            PageSize::Letter
        )
        .is_err());
    }
}
