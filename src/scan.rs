//! Source-tree discovery and variant enumeration.
//!
//! Stage 1 of the stencil pipeline. Scans the images directory for templated
//! source trees, reads their declaration files, and produces the flat list of
//! [`TemplatedImage`] work items the generate stage consumes.
//!
//! ## Directory Structure
//!
//! stencil expects a specific source layout:
//!
//! ```text
//! images/                          # Source root
//! ├── php.in/                      # Templated source tree (`.in` suffix)
//! │   ├── template.ini             # Variant declarations
//! │   ├── Dockerfile.j2            # Template file (rendered per variant)
//! │   ├── entrypoint.sh            # Static file (copied verbatim)
//! │   └── conf/
//! │       └── www.conf.j2          # Templates can live at any depth
//! ├── redis.in/
//! │   ├── template.ini
//! │   └── Dockerfile.j2
//! └── notes.txt                    # No `.in` suffix = not a source tree
//! ```
//!
//! ## Declaration Files
//!
//! `template.ini` fans one source tree into N named variants. Every section
//! prefixed `image.` declares one variant; its key/value pairs become the
//! substitution context for that variant's render:
//!
//! ```ini
//! [image.php80]
//! php_version = 8.0
//!
//! [image.php81]
//! php_version = 8.1
//! ```
//!
//! A source tree without a `template.ini` is not an error — it simply
//! declares no variants and yields nothing.
//!
//! ## Ordering
//!
//! Variants are emitted in declaration-file section order within one tree,
//! and in filesystem-iteration order across trees. Discovery order is not
//! sorted; callers that need determinism (the `list` display does) must sort.
//!
//! ## Validation
//!
//! The scanner enforces these rules:
//! - Malformed declaration files abort the run, naming the file
//! - A section may not declare the reserved key `image_name` — that value is
//!   always derived from the section name

use ini::Ini;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name suffix marking an immediate child of the source root as a templated
/// source tree.
pub const SOURCE_TREE_SUFFIX: &str = ".in";

/// Fixed name of the per-tree variant declaration file.
pub const DECLARATION_FILE: &str = "template.ini";

/// Section-name prefix selecting variant declarations inside the file.
const IMAGE_SECTION_PREFIX: &str = "image.";

/// Reserved context key holding the variant name. Always derived from the
/// section name, never read from the declaration file.
pub const CTX_IMAGE_NAME: &str = "image_name";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed declaration file {path}: {source}")]
    Declaration {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },
    #[error("Section [image.{name}] in {path} declares the reserved key 'image_name'")]
    ReservedKey { name: String, path: PathBuf },
}

/// Immutable per-run configuration, owned by the caller and passed by
/// reference through every stage.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Source root containing `*.in` trees
    pub images_dir: PathBuf,
    /// Root under which variant destinations are materialized
    pub output_dir: PathBuf,
}

/// One declared variant of a source tree: its name plus the substitution
/// context built from the declaration section.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub context: BTreeMap<String, String>,
}

/// The unit of work: one source tree paired with one concrete destination
/// and the context it renders under.
///
/// Destination is always `<output root>/<variant name>`, so variant names
/// must be unique across all trees sharing a root or destinations collide.
/// No uniqueness check happens at this layer.
#[derive(Debug, Clone, Serialize)]
pub struct TemplatedImage {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub context: BTreeMap<String, String>,
}

impl TemplatedImage {
    /// The variant name, as injected into the context under
    /// [`CTX_IMAGE_NAME`] by the enumerator.
    pub fn image_name(&self) -> &str {
        self.context
            .get(CTX_IMAGE_NAME)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Find every immediate child of `images_dir` whose name ends in `.in`.
///
/// Entries are yielded in filesystem-iteration order. Non-directory matches
/// are not filtered out here; a file named `x.in` simply declares no variants
/// downstream because it cannot contain a declaration file.
pub fn find_source_trees(images_dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut trees = Vec::new();
    for entry in fs::read_dir(images_dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().ends_with(SOURCE_TREE_SUFFIX) {
            trees.push(entry.path());
        }
    }
    Ok(trees)
}

/// Parse the declaration file of one source tree into its variants.
///
/// An absent `template.ini` yields an empty list. Sections without the
/// `image.` prefix are ignored, as is the sectionless prelude.
pub fn parse_declaration(source_dir: &Path) -> Result<Vec<Variant>, ScanError> {
    let declaration_path = source_dir.join(DECLARATION_FILE);
    if !declaration_path.is_file() {
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(&declaration_path)?;
    let ini = Ini::load_from_str(&text).map_err(|source| ScanError::Declaration {
        path: declaration_path.clone(),
        source,
    })?;

    let mut variants = Vec::new();
    for (section, properties) in ini.iter() {
        let Some(section) = section else {
            continue;
        };
        let Some(name) = section.strip_prefix(IMAGE_SECTION_PREFIX) else {
            continue;
        };

        let mut context = BTreeMap::new();
        for (key, value) in properties.iter() {
            if key == CTX_IMAGE_NAME {
                return Err(ScanError::ReservedKey {
                    name: name.to_string(),
                    path: declaration_path,
                });
            }
            context.insert(key.to_string(), value.to_string());
        }
        context.insert(CTX_IMAGE_NAME.to_string(), name.to_string());

        variants.push(Variant {
            name: name.to_string(),
            context,
        });
    }

    Ok(variants)
}

/// Expand every source tree under the run's images directory into the flat
/// list of templated images to materialize.
pub fn enumerate_images(config: &RunConfig) -> Result<Vec<TemplatedImage>, ScanError> {
    let mut images = Vec::new();
    for source_dir in find_source_trees(&config.images_dir)? {
        for variant in parse_declaration(&source_dir)? {
            images.push(TemplatedImage {
                source_dir: source_dir.clone(),
                destination_dir: config.output_dir.join(&variant.name),
                context: variant.context,
            });
        }
    }
    Ok(images)
}
