//! Shared test utilities for the stencil test suite.
//!
//! Provides fixture setup and lookup helpers for scan-stage data structures
//! (`TemplatedImage`), plus tree assertions used by the render and generate
//! tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let images = enumerate_images(&config).unwrap();
//!
//! let php80 = find_image(&images, "php80");
//! assert_eq!(php80.image_name(), "php80");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::scan::TemplatedImage;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/images/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/images");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Plan lookups — panics with a clear message on miss
// =========================================================================

/// Find a templated image by variant name. Panics if not found.
pub fn find_image<'a>(images: &'a [TemplatedImage], name: &str) -> &'a TemplatedImage {
    images
        .iter()
        .find(|i| i.image_name() == name)
        .unwrap_or_else(|| {
            let names = image_names(images);
            panic!("image '{name}' not found. Available: {names:?}")
        })
}

/// All variant names in plan order.
pub fn image_names(images: &[TemplatedImage]) -> Vec<&str> {
    images.iter().map(|i| i.image_name()).collect()
}

// =========================================================================
// Tree assertions
// =========================================================================

/// Assert that no file anywhere under `root` has the given name suffix.
pub fn assert_no_files_with_suffix(root: &Path, suffix: &str) {
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let name = entry.file_name().to_string_lossy();
            assert!(
                !name.ends_with(suffix),
                "unexpected {suffix} file in output: {}",
                entry.path().display()
            );
        }
    }
}
