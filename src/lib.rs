//! # stencil
//!
//! A build-context generator for templated container image families. One
//! source tree fans out into N concrete, deployable build contexts — one per
//! declared variant, each rendered with its own substitution values.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! stencil processes source trees through three stages:
//!
//! ```text
//! 1. Scan      images/     →  plan            (discovery + declaration parsing)
//! 2. Render    plan entry  →  out/<variant>/  (tree copy + template expansion)
//! 3. Generate  plan        →  out/            (drives renders under run options)
//! ```
//!
//! The scan stage is read-only and pure enumeration: it never touches the
//! output filesystem, so `list` and `check` can run it safely against live
//! trees. All filesystem mutation is confined to the render stage, and the
//! generate driver decides when a render may run at all.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1 — discovers `*.in` source trees, parses `template.ini` declarations, enumerates the plan |
//! | [`render`] | Stage 2 — copies one tree into a fresh destination and renders its `.j2` templates |
//! | [`generate`] | Stage 3 — drives renders under the run options (filter, suffix, force) |
//! | [`output`] | CLI output formatting — indexed display of plans, reports, and check results |
//!
//! # Design Decisions
//!
//! ## Runtime Templates Over Compile-Time Generation
//!
//! Templates belong to the user's source trees, not to this binary, so they
//! are rendered at runtime with [minijinja](https://docs.rs/minijinja) —
//! Jinja2 syntax, which is what `.j2` files carry by convention. Two
//! non-default choices matter:
//!
//! - **Strict undefined**: referencing an undeclared variable fails the run.
//!   A Dockerfile with a silently-empty `FROM php:-fpm-alpine` is strictly
//!   worse than an error.
//! - **Loader rooted at the destination**: templates resolve includes against
//!   the already-copied output tree, so a family of Dockerfiles can share
//!   snippet files that travel with the source tree.
//!
//! ## INI Declarations
//!
//! Variant declarations use INI (`rust-ini`), not TOML: a declaration file is
//! a flat list of named sections of string pairs, INI's exact shape, and the
//! format is established convention for this kind of fan-out manifest. Every
//! value is a string that lands in a string-to-string substitution context;
//! richer types would only be flattened again at render time.
//!
//! ## Fail-Fast, No Rollback
//!
//! A failure stops the run at the failing variant. Completed variants stay on
//! disk; the failing variant's half-rendered destination is also left behind
//! for inspection. Reruns with `--force` are cheap and idempotent, which
//! makes partial-run cleanup machinery unnecessary.
//!
//! ## Single-Threaded by Design
//!
//! Image families are small — tens of variants, not thousands — and every
//! operation is local filesystem I/O. The pipeline is fully synchronous; the
//! only discipline a future parallel version would need is that variant
//! names (and therefore destinations) never collide.

pub mod generate;
pub mod output;
pub mod render;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
