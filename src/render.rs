//! Maps a [`ReportSummary`] onto a styled [`Document`].

use crate::docx::{Alignment, Document, Paragraph, ParagraphStyle, Rgb, Run, Table, TableCell};
use crate::model::{RateTier, ReportSummary, Status, TestCase, TestSuite};
use log::debug;
use std::borrow::Cow;

pub const PASS_COLOR: Rgb = Rgb(0, 128, 0);
pub const FAIL_COLOR: Rgb = Rgb(255, 0, 0);
pub const SKIP_COLOR: Rgb = Rgb(128, 128, 128);
pub const WARN_COLOR: Rgb = Rgb(255, 165, 0);

const BODY_FONT: &str = "Arial";
const DETAILS_FONT: &str = "Courier New";
const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    /// Shown under the title as-is.
    pub generated_at: String,
    /// Longest failure details shown before truncation, in characters.
    pub details_limit: usize,
    /// Suites with more cases than this are listed as a table.
    pub table_threshold: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Test Execution Report".to_string(),
            generated_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            details_limit: 500,
            table_threshold: 10,
        }
    }
}

pub fn status_color(status: Status) -> Rgb {
    match status {
        Status::Passed => PASS_COLOR,
        Status::Failed | Status::Errored => FAIL_COLOR,
        Status::Skipped => SKIP_COLOR,
    }
}

pub fn tier_color(tier: RateTier) -> Rgb {
    match tier {
        RateTier::High => PASS_COLOR,
        RateTier::Medium => WARN_COLOR,
        RateTier::Low => FAIL_COLOR,
    }
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Passed => "✓ ",
        Status::Failed | Status::Errored => "✗ ",
        Status::Skipped => "- ",
    }
}

/// Cuts `text` to `limit` characters and appends a marker when it is longer.
pub fn truncate_details(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

fn blank(doc: &mut Document) {
    doc.add_paragraph(Paragraph::new());
}

fn qualified_name(case: &TestCase) -> String {
    format!("{}.{}", case.classname, case.name)
}

fn add_title(doc: &mut Document, options: &RenderOptions) {
    doc.add_paragraph(Paragraph::styled(ParagraphStyle::Title, options.title.as_str()));
    doc.add_paragraph(
        Paragraph::new().align(Alignment::Center).run(
            Run::new(format!("Generated on: {}", options.generated_at))
                .size(10.0)
                .italic(),
        ),
    );
    blank(doc);
}

fn add_executive_summary(doc: &mut Document, summary: &ReportSummary) {
    doc.add_paragraph(Paragraph::styled(ParagraphStyle::Heading, "Executive Summary"));

    let totals = summary.totals();
    let rows = [
        ("Total Test Suites", totals.suites.to_string()),
        ("Total Tests", totals.tests.to_string()),
        ("Passed", totals.passed().to_string()),
        ("Failed", totals.failures.to_string()),
        ("Errors", totals.errors.to_string()),
        ("Skipped", totals.skipped.to_string()),
        ("Total Execution Time", format!("{:.2} seconds", totals.time)),
    ];
    let mut table = Table::new();
    for (label, value) in rows {
        table = table.row(vec![
            TableCell::new(Paragraph::new().run(Run::new(label).font(BODY_FONT).size(10.0).bold())),
            TableCell::new(Paragraph::new().run(Run::new(value).font(BODY_FONT).size(10.0))),
        ]);
    }
    doc.add_table(table);

    let rate = totals.success_rate();
    doc.add_paragraph(
        Paragraph::new().run(
            Run::new(format!("Success Rate: {rate:.1}%"))
                .font(BODY_FONT)
                .size(12.0)
                .bold()
                .color(tier_color(RateTier::classify(rate))),
        ),
    );
    blank(doc);
}

fn suite_summary_line(suite: &TestSuite) -> Paragraph {
    let mut p = Paragraph::new()
        .run(Run::new(format!("Tests: {} | ", suite.tests)))
        .run(Run::new(format!("Passed: {} | ", suite.passed())).color(PASS_COLOR));
    if suite.failures > 0 {
        p = p.run(Run::new(format!("Failed: {} | ", suite.failures)).color(FAIL_COLOR));
    }
    if suite.errors > 0 {
        p = p.run(Run::new(format!("Errors: {} | ", suite.errors)).color(FAIL_COLOR));
    }
    if suite.skipped > 0 {
        p = p.run(Run::new(format!("Skipped: {} | ", suite.skipped)).color(SKIP_COLOR));
    }
    p.run(Run::new(format!("Time: {:.2}s", suite.time)))
}

fn add_failure_details(doc: &mut Document, case: &TestCase, options: &RenderOptions) {
    doc.add_paragraph(
        Paragraph::bullet(1).run(Run::new(qualified_name(case)).bold().color(FAIL_COLOR)),
    );
    if let Some(message) = case.message.as_deref().filter(|m| !m.is_empty()) {
        doc.add_paragraph(Paragraph::bullet(2).run(Run::new(format!("Message: {message}"))));
    }
    if let Some(details) = case.details.as_deref().filter(|d| !d.is_empty()) {
        let details = truncate_details(details, options.details_limit);
        doc.add_paragraph(
            Paragraph::bullet(2).run(
                Run::new(format!("Details: {details}"))
                    .font(DETAILS_FONT)
                    .size(9.0),
            ),
        );
    }
}

fn add_case_table(doc: &mut Document, cases: &[TestCase]) {
    doc.add_paragraph(Paragraph::new().run(Run::new("Test Cases Summary:")));

    let header = ["Test Name", "Class", "Status", "Time (s)"]
        .into_iter()
        .map(|h| TableCell::new(Paragraph::new().run(Run::new(h).bold())))
        .collect();
    let mut table = Table::new().row(header);
    for case in cases {
        table = table.row(vec![
            TableCell::new(Paragraph::new().run(Run::new(case.name.as_str()))),
            TableCell::new(Paragraph::new().run(Run::new(case.classname.as_str()))),
            TableCell::new(
                Paragraph::new()
                    .run(Run::new(case.status.label()).color(status_color(case.status))),
            ),
            TableCell::new(Paragraph::new().run(Run::new(format!("{:.3}", case.time)))),
        ]);
    }
    doc.add_table(table);
}

fn add_case_list(doc: &mut Document, cases: &[TestCase]) {
    if cases.is_empty() {
        return;
    }
    doc.add_paragraph(Paragraph::new().run(Run::new("Test Cases:")));
    for case in cases {
        doc.add_paragraph(
            Paragraph::bullet(0)
                .run(Run::new(status_icon(case.status)).color(status_color(case.status)))
                .run(Run::new(format!(
                    "{} ({:.3}s)",
                    qualified_name(case),
                    case.time
                ))),
        );
    }
}

fn add_suite_section(doc: &mut Document, suite: &TestSuite, options: &RenderOptions) {
    doc.add_paragraph(Paragraph::styled(
        ParagraphStyle::Heading,
        format!("Test Suite: {}", suite.name),
    ));
    doc.add_paragraph(suite_summary_line(suite));

    let mut failing = suite.failing_cases().peekable();
    if failing.peek().is_some() {
        doc.add_paragraph(Paragraph::bullet(0).run(Run::new("Failed/Error Tests:")));
        for case in failing {
            add_failure_details(doc, case, options);
        }
    }

    if suite.cases.len() > options.table_threshold {
        add_case_table(doc, &suite.cases);
    } else {
        add_case_list(doc, &suite.cases);
    }
    blank(doc);
}

fn add_footer(doc: &mut Document) {
    doc.add_paragraph(Paragraph::page_break());
    doc.add_paragraph(
        Paragraph::new()
            .align(Alignment::Center)
            .run(Run::new("End of Test Report").size(10.0).italic()),
    );
}

/// Builds the whole report in one forward pass.
pub fn render(summary: &ReportSummary, options: &RenderOptions) -> Document {
    let mut doc = Document::new();
    add_title(&mut doc, options);
    add_executive_summary(&mut doc, summary);
    for suite in &summary.suites {
        debug!("rendering suite {:?} ({} cases)", suite.name, suite.cases.len());
        add_suite_section(&mut doc, suite, options);
    }
    add_footer(&mut doc);
    doc
}
