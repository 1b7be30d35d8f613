//! Generation driver.
//!
//! Stage 3 of the stencil pipeline. Composes enumeration ([`crate::scan`])
//! and rendering ([`crate::render`]) under the run options: which variants to
//! materialize, what suffix their destinations carry, and whether existing
//! destinations may be removed.
//!
//! ## Destination Policy
//!
//! Each variant's destination is `<output root>/<name><suffix>` — the suffix
//! (default `.generated`) keeps generated trees visually distinct from
//! anything hand-managed under the same root. A destination that already
//! exists stops the run unless `force` is set, in which case it is removed
//! and rebuilt.
//!
//! ## Failure Semantics
//!
//! Fail-fast, no rollback. A failure partway through leaves earlier variants
//! fully rendered on disk and never starts later ones. There is no
//! transactionality across variants; reruns are cheap and `--force` makes
//! them idempotent.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::render::{self, RenderError, RenderSummary};
use crate::scan::{self, RunConfig, ScanError, TemplatedImage};

/// Default suffix appended to every destination directory name.
pub const DEFAULT_DESTINATION_SUFFIX: &str = ".generated";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("{0} already exists. Use --force to allow removing it")]
    DestinationExists(PathBuf),
}

/// Per-invocation options, distinct from the [`RunConfig`] paths.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Allow-list of variant names; `None` selects all
    pub only: Option<BTreeSet<String>>,
    /// Appended to the final path segment of every destination
    pub suffix: String,
    /// Remove destinations that already exist instead of failing
    pub force: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            only: None,
            suffix: DEFAULT_DESTINATION_SUFFIX.to_string(),
            force: false,
        }
    }
}

/// One materialized variant, for display.
#[derive(Debug)]
pub struct GeneratedImage {
    pub name: String,
    pub source_dir: PathBuf,
    pub destination: PathBuf,
    pub summary: RenderSummary,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct Report {
    pub generated: Vec<GeneratedImage>,
    /// Variant names excluded by the allow-list, in enumeration order
    pub skipped: Vec<String>,
}

/// Materialize every declared variant selected by `options`.
pub fn generate(config: &RunConfig, options: &GenerateOptions) -> Result<Report, GenerateError> {
    let mut report = Report::default();

    for image in scan::enumerate_images(config)? {
        if excluded(&image, options) {
            report.skipped.push(image.image_name().to_string());
            continue;
        }

        let destination = suffixed_destination(&image, &options.suffix);
        if destination.exists() {
            if !options.force {
                return Err(GenerateError::DestinationExists(destination));
            }
            fs::remove_dir_all(&destination)?;
        }

        let summary = render::render_tree(&image.source_dir, &destination, &image.context)?;

        report.generated.push(GeneratedImage {
            name: image.image_name().to_string(),
            source_dir: image.source_dir,
            destination,
            summary,
        });
    }

    Ok(report)
}

fn excluded(image: &TemplatedImage, options: &GenerateOptions) -> bool {
    options
        .only
        .as_ref()
        .is_some_and(|only| !only.contains(image.image_name()))
}

/// Append the destination suffix to the final path segment:
/// `out/php80` + `.generated` → `out/php80.generated`.
fn suffixed_destination(image: &TemplatedImage, suffix: &str) -> PathBuf {
    let name = image
        .destination_dir
        .file_name()
        .unwrap()
        .to_string_lossy();
    image
        .destination_dir
        .with_file_name(format!("{name}{suffix}"))
}
