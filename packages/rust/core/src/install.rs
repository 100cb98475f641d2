//! Local install into a viewer's docset directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use docsetkit_shared::{DocsetError, Result};

use crate::layout::{PackageRoot, reset_directory, walk_error};

/// Copy the package into `dest_dir/<name>.docset`, replacing any previous copy.
///
/// `dest_dir` itself must already exist; it is never created here.
#[instrument(skip_all, fields(package = package.name(), dest = %dest_dir.display()))]
pub fn install(package: &PackageRoot, dest_dir: &Path) -> Result<PathBuf> {
    if !dest_dir.is_dir() {
        return Err(DocsetError::io(
            dest_dir,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "install destination does not exist",
            ),
        ));
    }
    if !package.root().is_dir() {
        return Err(DocsetError::io(
            package.root(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "package root does not exist"),
        ));
    }

    let target = dest_dir.join(format!("{}.docset", package.name()));
    let root = package
        .root()
        .canonicalize()
        .map_err(|e| DocsetError::io(package.root(), e))?;
    let dest = dest_dir
        .canonicalize()
        .map_err(|e| DocsetError::io(dest_dir, e))?;
    // Resetting the target would delete the source.
    if dest.join(format!("{}.docset", package.name())) == root || dest.starts_with(&root) {
        return Err(DocsetError::validation(format!(
            "install destination {} is the package itself or lies inside it",
            dest_dir.display()
        )));
    }

    reset_directory(&target)?;
    let files = copy_tree(&root, &target)?;

    info!(target = %target.display(), files, "package installed");
    Ok(target)
}

/// Copy everything below `from` into the existing directory `to`.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        let src = entry.path();
        let relative = src
            .strip_prefix(from)
            .map_err(|e| DocsetError::validation(format!("{} escapes {}: {e}", src.display(), from.display())))?;
        let dst = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir(&dst).map_err(|e| DocsetError::io(&dst, e))?;
        } else {
            std::fs::copy(src, &dst).map_err(|e| DocsetError::io(&dst, e))?;
            copied += 1;
        }
    }
    debug!(from = %from.display(), copied, "directory copied");
    Ok(copied)
}
