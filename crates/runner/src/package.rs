// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-directory packaging and archive extraction.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use flame_core::FlameError;

/// Archive suffixes the runner recognizes as installable code bundles.
const ARCHIVE_SUFFIXES: &[&str] =
    &[".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".zip", ".tar"];

pub fn is_archive(path: &Path) -> bool {
    let name = path.to_string_lossy();
    ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn build_matcher(excludes: &[String]) -> Result<GlobSet, FlameError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in excludes {
        let glob = Glob::new(pattern).map_err(|e| {
            FlameError::invalid_config(format!("bad exclude pattern {pattern:?}: {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| FlameError::invalid_config(format!("cannot build exclude set: {e}")))
}

fn excluded(matcher: &GlobSet, relative: &Path) -> bool {
    if matcher.is_match(relative) {
        return true;
    }
    // Patterns like `.git` also match by basename, the way shell globs do.
    relative.file_name().is_some_and(|name| matcher.is_match(Path::new(name)))
}

/// Package `dir` into `{name}.tar.gz` inside `dir`, honoring `excludes`.
///
/// The archive itself is always skipped; entries keep paths relative to
/// `dir` so extraction lands the tree at the destination root.
pub fn package_working_dir(
    dir: &Path,
    name: &str,
    excludes: &[String],
) -> Result<PathBuf, FlameError> {
    let matcher = build_matcher(excludes)?;
    let archive_name = format!("{name}.tar.gz");
    let archive_path = dir.join(&archive_name);

    let file = File::create(&archive_path).map_err(|e| {
        FlameError::internal(format!("cannot create {}: {e}", archive_path.display()))
    })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    append_dir(&mut builder, dir, Path::new(""), &matcher, &archive_name)?;

    let encoder = builder
        .into_inner()
        .map_err(|e| FlameError::internal(format!("cannot finalize archive: {e}")))?;
    encoder
        .finish()
        .map_err(|e| FlameError::internal(format!("cannot finalize archive: {e}")))?;

    debug!(archive = %archive_path.display(), "working directory packaged");
    Ok(archive_path)
}

fn append_dir(
    builder: &mut tar::Builder<GzEncoder<File>>,
    base: &Path,
    relative: &Path,
    matcher: &GlobSet,
    archive_name: &str,
) -> Result<(), FlameError> {
    let dir = base.join(relative);
    let entries = std::fs::read_dir(&dir)
        .map_err(|e| FlameError::internal(format!("cannot read {}: {e}", dir.display())))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| FlameError::internal(format!("cannot read dir entry: {e}")))?;
        let rel = relative.join(entry.file_name());

        if rel == Path::new(archive_name) || excluded(matcher, &rel) {
            debug!(entry = %rel.display(), "excluded from package");
            continue;
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| FlameError::internal(format!("cannot stat {}: {e}", path.display())))?;
        if file_type.is_dir() {
            append_dir(builder, base, &rel, matcher, archive_name)?;
        } else if file_type.is_file() {
            builder.append_path_with_name(&path, &rel).map_err(|e| {
                FlameError::internal(format!("cannot archive {}: {e}", path.display()))
            })?;
        }
        // Sockets and other specials are not packageable; skip them.
    }
    Ok(())
}

/// Extract a gzipped tarball into `dest`.
///
/// Only the format the runner itself produces is extracted natively; other
/// recognized archive formats must be handled by a custom
/// [`PackageInstaller`](crate::PackageInstaller).
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), FlameError> {
    let name = archive.to_string_lossy();
    if !(name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".tar")) {
        return Err(FlameError::invalid_config(format!(
            "unsupported archive format: {name}; install it via a custom package installer"
        )));
    }

    std::fs::create_dir_all(dest).map_err(|e| {
        FlameError::internal(format!("cannot create {}: {e}", dest.display()))
    })?;

    let file = File::open(archive).map_err(|e| {
        FlameError::invalid_config(format!("cannot open {}: {e}", archive.display()))
    })?;

    if name.ends_with(".tar") {
        tar::Archive::new(file).unpack(dest)
    } else {
        tar::Archive::new(GzDecoder::new(file)).unpack(dest)
    }
    .map_err(|e| FlameError::internal(format!("archive extraction failed: {e}")))?;

    debug!(archive = %archive.display(), dest = %dest.display(), "archive extracted");
    Ok(())
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
