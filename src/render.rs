//! Tree copy and template rendering.
//!
//! Stage 2 of the stencil pipeline. Takes one source tree, one fresh
//! destination, and one substitution context, and materializes the concrete
//! build context:
//!
//! ```text
//! php.in/                          out/php80.generated/
//! ├── template.ini          →      (excluded)
//! ├── Dockerfile.j2         →      Dockerfile          (rendered)
//! ├── entrypoint.sh         →      entrypoint.sh       (copied verbatim)
//! └── conf/
//!     └── www.conf.j2       →      conf/www.conf       (rendered)
//! ```
//!
//! ## Two-Phase Protocol
//!
//! The copy completes first, then the full set of `.j2` paths is collected
//! before any rendering starts. Rendered outputs are written while walking
//! that snapshot, so a freshly written `Dockerfile` can never be mistaken for
//! a template mid-walk, regardless of filesystem iteration guarantees.
//!
//! Copying before rendering also means templates can `{% include %}` or
//! `{% extends %}` sibling files: the minijinja loader is rooted at the
//! destination tree, where every non-declaration file already exists.
//!
//! ## Render Semantics
//!
//! Undefined variables are hard errors (`UndefinedBehavior::Strict`), never
//! silent empty strings. A failed render aborts the run and leaves the
//! half-rendered destination on disk for inspection.

use minijinja::{Environment, UndefinedBehavior, path_loader};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::scan::DECLARATION_FILE;

/// Name suffix marking a file as a template. The rendered output drops it.
pub const TEMPLATE_SUFFIX: &str = ".j2";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("Template error in {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
}

/// What one render produced, for display and assertions.
#[derive(Debug, Default)]
pub struct RenderSummary {
    /// Files copied from the source tree (templates included, pre-render)
    pub files_copied: usize,
    /// Destination-relative paths of rendered outputs, in render order
    pub rendered: Vec<PathBuf>,
}

/// Copy `source` into the not-yet-existing `destination`, then render every
/// `.j2` file against `context`, replacing it with its suffix-stripped
/// output.
///
/// The destination existing beforehand is a hard precondition failure; the
/// caller decides whether to clear it first.
pub fn render_tree(
    source: &Path,
    destination: &Path,
    context: &BTreeMap<String, String>,
) -> Result<RenderSummary, RenderError> {
    if destination.exists() {
        return Err(RenderError::DestinationExists(destination.to_path_buf()));
    }

    let mut summary = RenderSummary::default();
    copy_tree(source, destination, &mut summary.files_copied)?;

    // Snapshot before rendering mutates the tree.
    let templates = collect_templates(destination)?;

    let mut env = Environment::new();
    env.set_loader(path_loader(destination.to_path_buf()));
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    for template_path in templates {
        let output_path = render_one(&env, destination, &template_path, context)?;
        fs::remove_file(&template_path)?;

        let rel = output_path.strip_prefix(destination).unwrap();
        summary.rendered.push(rel.to_path_buf());
    }

    Ok(summary)
}

/// Recursively copy `src` into `dst`, excluding any entry literally named
/// `template.ini` at any depth. The exclusion is by name, not path.
fn copy_tree(src: &Path, dst: &Path, copied: &mut usize) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_name() == DECLARATION_FILE {
            continue;
        }

        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_tree(&src_path, &dst_path, copied)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
            *copied += 1;
        }
    }
    Ok(())
}

/// Collect every regular file under `root` whose name ends in `.j2`.
fn collect_templates(root: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let mut templates = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(TEMPLATE_SUFFIX)
        {
            templates.push(entry.into_path());
        }
    }
    Ok(templates)
}

/// Render one template file to its suffix-stripped sibling path.
fn render_one(
    env: &Environment,
    destination: &Path,
    template_path: &Path,
    context: &BTreeMap<String, String>,
) -> Result<PathBuf, RenderError> {
    let rel = template_path.strip_prefix(destination).unwrap();
    let name = loader_name(rel);

    let text = env
        .get_template(&name)
        .and_then(|template| template.render(context))
        .map_err(|source| RenderError::Template {
            path: template_path.to_path_buf(),
            source,
        })?;

    let output_path = strip_template_suffix(template_path);
    fs::write(&output_path, text)?;
    Ok(output_path)
}

/// Template name for the path loader: destination-relative, `/`-separated.
fn loader_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `conf/www.conf.j2` → `conf/www.conf`. Caller guarantees the suffix.
fn strip_template_suffix(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap().to_string_lossy();
    let stripped = name.strip_suffix(TEMPLATE_SUFFIX).unwrap();
    path.with_file_name(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    fn php80_context() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("image_name".to_string(), "php80".to_string()),
            ("php_version".to_string(), "8.0".to_string()),
            ("fpm_alias".to_string(), "php80-fpm".to_string()),
        ])
    }

    // =========================================================================
    // Preconditions and copy
    // =========================================================================

    #[test]
    fn existing_destination_is_error() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("php80");
        fs::create_dir_all(&dest).unwrap();

        let result = render_tree(&tmp.path().join("php.in"), &dest, &php80_context());
        assert!(matches!(result, Err(RenderError::DestinationExists(p)) if p == dest));
    }

    #[test]
    fn declaration_file_excluded_at_any_depth() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("app.in");
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("template.ini"), "[image.app1]\n").unwrap();
        fs::write(tree.join("nested/template.ini"), "not a declaration").unwrap();
        fs::write(tree.join("nested/keep.txt"), "kept").unwrap();

        let dest = tmp.path().join("out");
        render_tree(&tree, &dest, &BTreeMap::new()).unwrap();

        assert!(!dest.join("template.ini").exists());
        assert!(!dest.join("nested/template.ini").exists());
        assert!(dest.join("nested/keep.txt").exists());
    }

    #[test]
    fn template_free_tree_copies_verbatim() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("plain.in");
        fs::create_dir_all(tree.join("sub")).unwrap();
        fs::write(tree.join("a.txt"), "alpha").unwrap();
        fs::write(tree.join("sub/b.txt"), "beta").unwrap();

        let dest = tmp.path().join("out");
        let summary = render_tree(&tree, &dest, &BTreeMap::new()).unwrap();

        assert_eq!(summary.files_copied, 2);
        assert!(summary.rendered.is_empty());
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dest.join("sub/b.txt")).unwrap(), "beta");
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn templates_rendered_and_suffix_stripped() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("php80");

        render_tree(&tmp.path().join("php.in"), &dest, &php80_context()).unwrap();

        let dockerfile = fs::read_to_string(dest.join("Dockerfile")).unwrap();
        assert_eq!(
            dockerfile.lines().next().unwrap(),
            "FROM php:8.0-fpm-alpine"
        );
        assert!(!dest.join("Dockerfile.j2").exists());
    }

    #[test]
    fn nested_templates_rendered_in_place() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("php80");

        render_tree(&tmp.path().join("php.in"), &dest, &php80_context()).unwrap();

        let conf = fs::read_to_string(dest.join("conf/www.conf")).unwrap();
        assert!(conf.starts_with("[php80]"));
    }

    #[test]
    fn no_template_suffix_survives_render() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("php80");

        render_tree(&tmp.path().join("php.in"), &dest, &php80_context()).unwrap();

        assert_no_files_with_suffix(&dest, TEMPLATE_SUFFIX);
        assert!(!dest.join("template.ini").exists());
    }

    #[test]
    fn static_files_copied_untouched() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("php80");

        render_tree(&tmp.path().join("php.in"), &dest, &php80_context()).unwrap();

        let expected = fs::read_to_string(tmp.path().join("php.in/entrypoint.sh")).unwrap();
        let actual = fs::read_to_string(dest.join("entrypoint.sh")).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn undefined_variable_is_error() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("app.in");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("Dockerfile.j2"), "FROM {{ no_such_key }}\n").unwrap();

        let dest = tmp.path().join("out");
        let result = render_tree(&tree, &dest, &BTreeMap::new());
        assert!(matches!(result, Err(RenderError::Template { .. })));

        // Half-rendered destination stays on disk for inspection.
        assert!(dest.join("Dockerfile.j2").exists());
    }

    #[test]
    fn template_syntax_error_is_error() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("app.in");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("broken.j2"), "{% if %}").unwrap();

        let result = render_tree(&tree, &tmp.path().join("out"), &BTreeMap::new());
        assert!(matches!(result, Err(RenderError::Template { .. })));
    }

    #[test]
    fn templates_can_include_copied_siblings() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("app.in");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("banner.txt"), "maintained by {{ image_name }}").unwrap();
        fs::write(
            tree.join("Dockerfile.j2"),
            "{% include 'banner.txt' %}\nFROM scratch\n",
        )
        .unwrap();

        let dest = tmp.path().join("out");
        let context = BTreeMap::from([("image_name".to_string(), "app1".to_string())]);
        render_tree(&tree, &dest, &context).unwrap();

        let dockerfile = fs::read_to_string(dest.join("Dockerfile")).unwrap();
        assert!(dockerfile.starts_with("maintained by app1"));
        // The included file itself is not a template; it stays verbatim.
        assert_eq!(
            fs::read_to_string(dest.join("banner.txt")).unwrap(),
            "maintained by {{ image_name }}"
        );
    }

    #[test]
    fn rendering_twice_is_deterministic() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let source = tmp.path().join("php.in");
        let context = php80_context();

        render_tree(&source, &out.path().join("a"), &context).unwrap();
        render_tree(&source, &out.path().join("b"), &context).unwrap();

        for file in ["Dockerfile", "entrypoint.sh", "conf/www.conf"] {
            let a = fs::read(out.path().join("a").join(file)).unwrap();
            let b = fs::read(out.path().join("b").join(file)).unwrap();
            assert_eq!(a, b, "{file} differs between renders");
        }
    }

    #[test]
    fn summary_lists_rendered_outputs() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("php80");

        let summary = render_tree(&tmp.path().join("php.in"), &dest, &php80_context()).unwrap();

        let mut rendered = summary.rendered.clone();
        rendered.sort();
        assert_eq!(
            rendered,
            vec![PathBuf::from("Dockerfile"), PathBuf::from("conf/www.conf")]
        );
    }
}
