//! Archive and update feed publishing.
//!
//! A finished package is compressed to `<output_root>/<name>.tgz` and a
//! single-entry `feed.xml` pointing at it is written next to it. Viewers poll
//! the feed and download the archive when the version label changes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;
use walkdir::WalkDir;

use docsetkit_shared::{DocsetError, FeedEntry, Result};

use crate::layout::{PackageRoot, walk_error};
use crate::markup::escape;

/// File name of the update feed inside the output root.
pub const FEED_FILE: &str = "feed.xml";

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size: u64,
    /// Lowercase hex SHA-256 of the archive bytes.
    pub sha256: String,
}

/// Outcome of [`publish`].
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub archive: ArchiveInfo,
    pub feed_path: PathBuf,
    pub entry: FeedEntry,
}

/// Archive file name for a package.
pub fn archive_name(package: &PackageRoot) -> String {
    format!("{}.tgz", package.name())
}

/// Write a gzip-compressed tar of the package tree to `dest`.
///
/// Entries are stored under `<name>.docset/`, walked in sorted order, with
/// normalized headers so identical trees produce identical archives. Hidden
/// files (leading `.`) are skipped.
#[instrument(skip_all, fields(package = package.name()))]
pub fn archive_package(package: &PackageRoot, dest: &Path) -> Result<ArchiveInfo> {
    let root = package.root();
    if !root.is_dir() {
        return Err(DocsetError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "package root does not exist"),
        ));
    }

    let file = File::create(dest).map_err(|e| DocsetError::io(dest, e))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);

    let prefix = PathBuf::from(format!("{}.docset", package.name()));
    let mut files = 0usize;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map_err(|e| DocsetError::validation(format!("{} escapes package root: {e}", path.display())))?;
        let archived = if relative.as_os_str().is_empty() {
            prefix.clone()
        } else {
            prefix.join(relative)
        };

        if entry.file_type().is_dir() {
            builder
                .append_dir(&archived, path)
                .map_err(|e| DocsetError::io(path, e))?;
        } else {
            builder
                .append_path_with_name(path, &archived)
                .map_err(|e| DocsetError::io(path, e))?;
            files += 1;
        }
    }

    let encoder = builder.into_inner().map_err(|e| DocsetError::io(dest, e))?;
    let writer = encoder.finish().map_err(|e| DocsetError::io(dest, e))?;
    writer
        .into_inner()
        .map_err(|e| DocsetError::io(dest, e.into_error()))?
        .sync_all()
        .map_err(|e| DocsetError::io(dest, e))?;

    let (size, sha256) = digest_file(dest)?;
    info!(path = %dest.display(), files, size, sha256 = %sha256, "archive written");

    Ok(ArchiveInfo {
        path: dest.to_path_buf(),
        size,
        sha256,
    })
}

/// Size and SHA-256 of a file on disk.
fn digest_file(path: &Path) -> Result<(u64, String)> {
    let file = File::open(path).map_err(|e| DocsetError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let n = reader.read(&mut buf).map_err(|e| DocsetError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok((size, format!("{:x}", hasher.finalize())))
}

/// Public location of an archive.
///
/// With a base URL the archive name is joined onto it (a missing trailing `/`
/// is added so the last segment is kept). Without one, the absolute archive
/// path is turned into a `file://` URL; the archive must already exist.
pub fn archive_url(archive: &Path, base_url: Option<&Url>) -> Result<Url> {
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DocsetError::validation(format!("archive path has no file name: {}", archive.display())))?;

    match base_url {
        Some(base) => {
            let mut base = base.clone();
            if !base.path().ends_with('/') {
                let path = format!("{}/", base.path());
                base.set_path(&path);
            }
            base.join(&file_name)
                .map_err(|e| DocsetError::validation(format!("invalid archive URL: {e}")))
        }
        None => {
            let absolute = archive
                .canonicalize()
                .map_err(|e| DocsetError::io(archive, e))?;
            Url::from_file_path(&absolute).map_err(|()| {
                DocsetError::validation(format!(
                    "cannot express {} as a file URL",
                    absolute.display()
                ))
            })
        }
    }
}

/// Render the feed document for one entry.
pub fn feed_xml(entry: &FeedEntry) -> String {
    format!(
        "<entry>\n    <version>{}</version>\n    <url>{}</url>\n</entry>\n",
        escape(&entry.version),
        escape(&entry.url)
    )
}

/// Write a fresh single-entry feed, replacing any previous one.
pub fn write_feed(path: &Path, entry: &FeedEntry) -> Result<()> {
    std::fs::write(path, feed_xml(entry)).map_err(|e| DocsetError::io(path, e))?;
    debug!(path = %path.display(), version = %entry.version, "wrote feed");
    Ok(())
}

/// Archive the package into `output_root` and write the feed beside it.
#[instrument(skip(package, output_root, base_url), fields(package = package.name()))]
pub fn publish(
    package: &PackageRoot,
    output_root: &Path,
    base_url: Option<&Url>,
) -> Result<PublishResult> {
    let archive_path = output_root.join(archive_name(package));
    let archive = archive_package(package, &archive_path)?;

    let url = archive_url(&archive.path, base_url)?;
    let entry = FeedEntry::now(url.as_str());

    let feed_path = output_root.join(FEED_FILE);
    write_feed(&feed_path, &entry)?;

    info!(version = %entry.version, url = %entry.url, "package published");
    Ok(PublishResult {
        archive,
        feed_path,
        entry,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
