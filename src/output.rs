//! CLI output formatting for all pipeline stages.
//!
//! # Entity Display Contract
//!
//! Every entity follows the same two-level pattern:
//!
//! 1. **Header line**: positional index + variant name (+ arrow to the
//!    destination where one exists)
//! 2. **Context lines**: indented `Source:`, `Context:`, `Rendered:` detail
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! Images
//! 001 php80
//!     Source: php.in/
//!     Destination: out/php80
//!     Context: fpm_alias, image_name, php_version
//! ```
//!
//! ## Generate
//!
//! ```text
//! 001 php80 → out/php80.generated
//!     Source: php.in/
//!     Rendered: Dockerfile, conf/www.conf (2 templates, 4 files)
//!
//! Generated 3 images (1 skipped)
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 php.in (2 variants: php80, php81)
//! 002 docs.in (no declarations)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use std::path::Path;

use crate::generate::Report;
use crate::scan::{TemplatedImage, Variant};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Display a path relative to `base` where possible, with a trailing `/`
/// marking directories of the source root.
fn rel_display(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    format!("{}/", rel.display())
}

// ============================================================================
// List
// ============================================================================

/// Format the expansion plan. Images are shown sorted by variant name so the
/// display is stable across filesystems.
pub fn format_plan(images: &[TemplatedImage], images_dir: &Path) -> Vec<String> {
    let mut lines = vec!["Images".to_string()];

    let mut sorted: Vec<&TemplatedImage> = images.iter().collect();
    sorted.sort_by_key(|i| i.image_name().to_string());

    for (pos, image) in sorted.iter().enumerate() {
        lines.push(format!("{} {}", format_index(pos + 1), image.image_name()));
        lines.push(format!(
            "    Source: {}",
            rel_display(&image.source_dir, images_dir)
        ));
        lines.push(format!(
            "    Destination: {}",
            image.destination_dir.display()
        ));
        let keys: Vec<&str> = image.context.keys().map(String::as_str).collect();
        lines.push(format!("    Context: {}", keys.join(", ")));
    }

    if images.is_empty() {
        lines.push("    (no variants declared)".to_string());
    }

    lines
}

pub fn print_plan(images: &[TemplatedImage], images_dir: &Path) {
    for line in format_plan(images, images_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_report(report: &Report, images_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    for (pos, image) in report.generated.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(pos + 1),
            image.name,
            image.destination.display()
        ));
        lines.push(format!(
            "    Source: {}",
            rel_display(&image.source_dir, images_dir)
        ));
        if !image.summary.rendered.is_empty() {
            let rendered: Vec<String> = image
                .summary
                .rendered
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            lines.push(format!(
                "    Rendered: {} ({} templates, {} files)",
                rendered.join(", "),
                image.summary.rendered.len(),
                image.summary.files_copied
            ));
        }
    }

    lines.push(String::new());
    let skipped = if report.skipped.is_empty() {
        String::new()
    } else {
        format!(" ({} skipped)", report.skipped.len())
    };
    lines.push(format!(
        "Generated {} image{}{}",
        report.generated.len(),
        if report.generated.len() == 1 { "" } else { "s" },
        skipped
    ));

    lines
}

pub fn print_report(report: &Report, images_dir: &Path) {
    for line in format_report(report, images_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(trees: &[(std::path::PathBuf, Vec<Variant>)], images_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    for (pos, (tree, variants)) in trees.iter().enumerate() {
        let name = rel_display(tree, images_dir);
        let detail = if variants.is_empty() {
            "no declarations".to_string()
        } else {
            let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
            format!(
                "{} variant{}: {}",
                variants.len(),
                if variants.len() == 1 { "" } else { "s" },
                names.join(", ")
            )
        };
        lines.push(format!("{} {} ({})", format_index(pos + 1), name, detail));
    }

    if trees.is_empty() {
        lines.push("No templated source trees found".to_string());
    }

    lines
}

pub fn print_check(trees: &[(std::path::PathBuf, Vec<Variant>)], images_dir: &Path) {
    for line in format_check(trees, images_dir) {
        println!("{}", line);
    }
}
