//! Turns JUnit XML test results into a Word (`.docx`) report.
//!
//! [`parser`] reads the XML into a [`ReportSummary`], [`render`] lays the
//! summary out as a [`docx::Document`], and [`generate_report`] runs both and
//! writes the file.

pub mod docx;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

pub use error::{ParseError, ReportError, WriteError};
pub use model::{RateTier, ReportSummary, Status, TestCase, TestSuite, Totals};
pub use render::RenderOptions;

use log::{debug, info};
use std::fs;
use std::path::Path;

/// Parses `input`, renders it and saves the document to `output`.
///
/// The output's parent directory is created when missing. Nothing is
/// written unless parsing succeeds.
pub fn generate_report(
    input: &Path,
    output: &Path,
    options: &RenderOptions,
) -> Result<ReportSummary, ReportError> {
    if !input.exists() {
        return Err(ReportError::InputNotFound(input.to_path_buf()));
    }

    info!("parsing JUnit XML file: {}", input.display());
    let summary = parser::parse_file(input)?;
    let totals = summary.totals();
    info!(
        "found {} test suite(s) with {} total tests",
        totals.suites, totals.tests
    );

    let doc = render::render(&summary, options);
    debug!("rendered {} blocks", doc.blocks().len());

    let write_error = |source: WriteError| ReportError::Write {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_error(e.into()))?;
    }
    info!("generating Word report: {}", output.display());
    doc.save(output).map_err(write_error)?;

    Ok(summary)
}
