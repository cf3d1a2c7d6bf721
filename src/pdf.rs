//! PDF rendering of a [`ReportDocument`].
//!
//! Every section starts on a new A4 page. Text uses the builtin Helvetica
//! fonts, so only WinAnsi-safe characters are written (see [`pdf_safe`]).

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::chart::{self, CHART_SIZE_PX};
use crate::errors::AppError;
use crate::report::{format_percentage, Block, ReportDocument, Section, SectionKind};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.52;

const BODY_SIZE: f32 = 11.0;
const SUBHEADING_SIZE: f32 = 13.0;
const HEADING_SIZE: f32 = 20.0;
const TITLE_SIZE: f32 = 26.0;
const TABLE_SIZE: f32 = 9.0;

const CHART_DPI: f32 = 200.0;

/// Files produced for one report.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub pdf_path: PathBuf,
    /// Intermediate files (chart images) still on disk.
    pub temp_files: Vec<PathBuf>,
}

impl RenderedReport {
    /// Deletes the PDF and every temporary file. Files already gone are skipped.
    /// Returns the number of files removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        for path in self.temp_files.iter().chain(std::iter::once(&self.pdf_path)) {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        tracing::debug!("Cleaned up {} report file(s)", removed);
        removed
    }
}

/// Renders the document into `work_dir`.
///
/// The chart image is deleted as soon as the PDF is written; on failure every
/// file created so far is removed.
pub fn render_report(document: &ReportDocument, work_dir: &Path) -> Result<RenderedReport, AppError> {
    std::fs::create_dir_all(work_dir).map_err(|e| {
        AppError::RenderError(format!(
            "Failed to create report directory {}: {}",
            work_dir.display(),
            e
        ))
    })?;

    let rendered = RenderedReport {
        pdf_path: work_dir.join(format!("{}.pdf", document.file_stem)),
        temp_files: vec![work_dir.join(format!("{}_radar.png", document.file_stem))],
    };

    match write_pdf(document, &rendered) {
        Ok(()) => {
            for temp in &rendered.temp_files {
                if temp.exists() {
                    if let Err(e) = std::fs::remove_file(temp) {
                        tracing::warn!("Failed to remove {}: {}", temp.display(), e);
                    }
                }
            }
            tracing::info!("Rendered report {}", rendered.pdf_path.display());
            Ok(rendered)
        }
        Err(e) => {
            rendered.cleanup();
            Err(e)
        }
    }
}

fn write_pdf(document: &ReportDocument, rendered: &RenderedReport) -> Result<(), AppError> {
    let mut writer = PdfWriter::new(&format!("CMRA Report - {}", document.church))?;
    let chart_path = &rendered.temp_files[0];

    for (index, section) in document.sections.iter().enumerate() {
        if index > 0 {
            writer.new_page();
        }
        writer.section(section, chart_path)?;
    }

    writer.save(&rendered.pdf_path)
}

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Vertical position of the next line, in mm from the page bottom.
    cursor_y: f32,
    page_number: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) = PdfDocument::new(
            pdf_safe(title),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::RenderError(format!("Failed to load font: {:?}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::RenderError(format!("Failed to load font: {:?}", e)))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor_y: PAGE_HEIGHT_MM - MARGIN_MM,
            page_number: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_y = PAGE_HEIGHT_MM - MARGIN_MM;
        self.page_number += 1;

        let footer = format!("CMRA Report  |  Page {}", self.page_number);
        self.layer
            .use_text(footer, 8.0, Mm(MARGIN_MM), Mm(10.0), &self.regular);
    }

    fn ensure_space(&mut self, needed_mm: f32) {
        if self.cursor_y - needed_mm < MARGIN_MM {
            self.new_page();
        }
    }

    fn section(&mut self, section: &Section, chart_path: &Path) -> Result<(), AppError> {
        if section.kind == SectionKind::Cover {
            self.cursor_y = PAGE_HEIGHT_MM * 0.62;
            self.text_block(&section.title, TITLE_SIZE, true, 0.0);
            self.rule();
        } else {
            self.text_block(&section.title, HEADING_SIZE, true, 0.0);
        }
        self.cursor_y -= 4.0;

        for block in &section.blocks {
            match block {
                Block::Subheading { text } => {
                    self.cursor_y -= 2.0;
                    self.text_block(text, SUBHEADING_SIZE, true, 0.0);
                }
                Block::Paragraph { text } => self.text_block(text, BODY_SIZE, false, 0.0),
                Block::Bullets { items } => {
                    for item in items {
                        self.bullet(item);
                    }
                    self.cursor_y -= 2.0;
                }
                Block::Table { headers, rows } => self.table(headers, rows),
                Block::RadarChart { points } => self.radar_chart(points, chart_path)?,
                Block::NoteLines { count } => self.note_lines(*count),
            }
        }
        Ok(())
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.4
    }

    fn text_block(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        let lines = wrap_text(&pdf_safe(text), chars_per_line(CONTENT_WIDTH_MM - indent, size));
        let height = Self::line_height(size);
        let font = if bold { self.bold.clone() } else { self.regular.clone() };

        for line in lines {
            self.ensure_space(height);
            self.cursor_y -= height;
            self.layer
                .use_text(line, size, Mm(MARGIN_MM + indent), Mm(self.cursor_y), &font);
        }
        self.cursor_y -= height * 0.4;
    }

    fn bullet(&mut self, item: &str) {
        let height = Self::line_height(BODY_SIZE);
        self.ensure_space(height);
        self.layer.use_text(
            "-",
            BODY_SIZE,
            Mm(MARGIN_MM + 2.0),
            Mm(self.cursor_y - height),
            &self.regular,
        );
        self.text_block(item, BODY_SIZE, false, 7.0);
    }

    fn rule(&mut self) {
        self.cursor_y -= 2.0;
        self.horizontal_line(self.cursor_y, 0.8);
        self.cursor_y -= 4.0;
    }

    fn horizontal_line(&self, y: f32, thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.12, 0.31, 0.47, None)));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn table(&mut self, headers: &[String], rows: &[Vec<String>]) {
        let widths = column_widths(headers.len());
        let height = Self::line_height(TABLE_SIZE);

        self.table_row(headers, &widths, true);
        self.horizontal_line(self.cursor_y + height * 0.3, 0.5);

        for row in rows {
            self.table_row(row, &widths, false);
        }
        self.cursor_y -= height;
    }

    fn table_row(&mut self, cells: &[String], widths: &[f32], bold: bool) {
        let height = Self::line_height(TABLE_SIZE);
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| wrap_text(&pdf_safe(cell), chars_per_line(width - 2.0, TABLE_SIZE)))
            .collect();
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        self.ensure_space(height * line_count as f32);
        let font = if bold { self.bold.clone() } else { self.regular.clone() };

        let mut x = MARGIN_MM;
        for (lines, width) in wrapped.iter().zip(widths) {
            for (i, line) in lines.iter().enumerate() {
                let y = self.cursor_y - height * (i as f32 + 1.0);
                self.layer
                    .use_text(line.clone(), TABLE_SIZE, Mm(x), Mm(y), &font);
            }
            x += width;
        }
        self.cursor_y -= height * line_count as f32 + 1.5;
    }

    fn radar_chart(&mut self, points: &[(String, f64)], chart_path: &Path) -> Result<(), AppError> {
        chart::render_radar_chart(points, chart_path)?;

        let size_mm = CHART_SIZE_PX as f32 / CHART_DPI * 25.4;
        let label_height = Self::line_height(BODY_SIZE);
        self.ensure_space(size_mm + 2.0 * label_height + 4.0);
        self.cursor_y -= label_height;

        let left = (PAGE_WIDTH_MM - size_mm) / 2.0;
        let bottom = self.cursor_y - size_mm;

        let file = File::open(chart_path).map_err(|e| {
            AppError::RenderError(format!("Failed to open chart {}: {}", chart_path.display(), e))
        })?;
        let decoder = PngDecoder::new(BufReader::new(file))
            .map_err(|e| AppError::RenderError(format!("Failed to decode chart: {}", e)))?;
        let image = Image::try_from(decoder)
            .map_err(|e| AppError::RenderError(format!("Failed to embed chart: {}", e)))?;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(left)),
                translate_y: Some(Mm(bottom)),
                dpi: Some(CHART_DPI),
                ..Default::default()
            },
        );

        // Axis labels just outside the chart's outer ring.
        let center_x = left + size_mm / 2.0;
        let center_y = bottom + size_mm / 2.0;
        let label_radius = size_mm / 2.0 + 3.0;
        for (i, (label, value)) in points.iter().enumerate() {
            let text = format!("{} {}", pdf_safe(label), format_percentage(*value));
            let text_width = text.chars().count() as f32 * AVG_GLYPH_WIDTH * BODY_SIZE * PT_TO_MM;

            let angle = chart::axis_angle(i, points.len());
            let (cos, sin) = (angle.cos() as f32, angle.sin() as f32);
            let x = center_x + label_radius * cos;
            // PDF y grows upwards, image rows grow downwards
            let y = center_y - label_radius * sin;

            let x = if cos < -0.2 {
                x - text_width
            } else if cos <= 0.2 {
                x - text_width / 2.0
            } else {
                x
            };
            let y = if sin < -0.2 {
                y + 1.0
            } else if sin > 0.2 {
                y - label_height
            } else {
                y - label_height / 3.0
            };

            self.layer.use_text(
                text,
                BODY_SIZE,
                Mm(x.max(2.0)),
                Mm(y),
                &self.bold,
            );
        }

        self.cursor_y = bottom - 2.0 * label_height;
        Ok(())
    }

    fn note_lines(&mut self, count: usize) {
        let spacing = 10.0;
        for _ in 0..count {
            self.ensure_space(spacing);
            self.cursor_y -= spacing;
            self.layer
                .set_outline_color(Color::Rgb(Rgb::new(0.7, 0.7, 0.7, None)));
            self.layer.set_outline_thickness(0.3);
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(MARGIN_MM), Mm(self.cursor_y)), false),
                    (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(self.cursor_y)), false),
                ],
                is_closed: false,
            });
        }
        self.cursor_y -= spacing / 2.0;
    }

    fn save(self, path: &Path) -> Result<(), AppError> {
        let file = File::create(path).map_err(|e| {
            AppError::RenderError(format!("Failed to create {}: {}", path.display(), e))
        })?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(|e| AppError::RenderError(format!("Failed to write PDF: {:?}", e)))
    }
}

fn chars_per_line(width_mm: f32, size: f32) -> usize {
    let glyph_mm = AVG_GLYPH_WIDTH * size * PT_TO_MM;
    ((width_mm / glyph_mm).floor() as usize).max(8)
}

fn column_widths(count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![CONTENT_WIDTH_MM],
        n => {
            // narrow label/value columns, the last column takes the rest
            let narrow = (CONTENT_WIDTH_MM * 0.55) / (n - 1) as f32;
            let mut widths = vec![narrow; n - 1];
            widths.push(CONTENT_WIDTH_MM - narrow * (n - 1) as f32);
            widths
        }
    }
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split_at = word
                .char_indices()
                .nth(max_chars)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split_at].to_string());
            word = &word[split_at..];
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Keeps every character the builtin fonts can encode (WinAnsi: ASCII,
/// Latin-1 and the cp1252 punctuation block). Anything else becomes `?`.
pub fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{00A0}' => ' ',
            c if is_win_ansi(c) => c,
            _ => '?',
        })
        .collect()
}

fn is_win_ansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\n' | '\t' | '\u{00A1}'..='\u{00FF}')
        || matches!(
            c,
            '\u{20AC}' | '\u{201A}' | '\u{0192}' | '\u{201E}' | '\u{2026}' | '\u{2020}'
                | '\u{2021}' | '\u{02C6}' | '\u{2030}' | '\u{0160}' | '\u{2039}' | '\u{0152}'
                | '\u{017D}' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' | '\u{2022}'
                | '\u{2013}' | '\u{2014}' | '\u{02DC}' | '\u{2122}' | '\u{0161}' | '\u{203A}'
                | '\u{0153}' | '\u{017E}' | '\u{0178}'
        )
}
