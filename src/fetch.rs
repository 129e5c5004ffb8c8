//! Source retrieval: download, verify, unpack, or check out.
//!
//! ```text
//! archive source:  url --download--> <cache>/<name>--<file> --sha256--> unpack --> <build dir>
//! jar source:      url --download--> <cache>/<name>--<file> --sha256--> copy   --> <build dir>/<file>
//! head source:     git clone / hg clone ---------------------------------------> <build dir>
//! ```
//!
//! Every fetch starts from an empty build directory; a leftover tree from an
//! earlier build is removed first.

use crate::error::{BuildError, Result};
use crate::formula::{SourceSpec, Vcs};
use anyhow::{Context, anyhow};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tar::Archive;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Put the sources for `source` into a fresh `build_dir`.
///
/// Returns the build directory.
pub async fn fetch(
    name: &str,
    source: &SourceSpec,
    cache: &Path,
    build_dir: &Path,
    show_progress: bool,
) -> Result<PathBuf> {
    if build_dir.exists() {
        debug!(path = %build_dir.display(), "removing stale build directory");
        fs::remove_dir_all(build_dir)?;
    }
    if let Some(parent) = build_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Some(vcs) = source.vcs {
        checkout(vcs, &source.url, build_dir).await?;
        return Ok(build_dir.to_path_buf());
    }

    let archive = download(name, source, cache, show_progress).await?;
    unpack(&archive, build_dir)?;
    Ok(build_dir.to_path_buf())
}

/// Cache location of a downloaded source
pub fn cache_path(name: &str, source: &SourceSpec, cache: &Path) -> PathBuf {
    cache.join(format!("{}--{}", name, source.file_name()))
}

/// Download `source` into the cache unless a verified copy is already there
pub async fn download(
    name: &str,
    source: &SourceSpec,
    cache: &Path,
    show_progress: bool,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(cache)
        .await
        .context("Failed to create cache directory")?;

    let output_path = cache_path(name, source, cache);

    if output_path.exists() {
        let verified = match &source.sha256 {
            Some(expected) => verify_checksum(&output_path, expected).is_ok(),
            None => true,
        };
        if verified {
            debug!(path = %output_path.display(), "using cached download");
            return Ok(output_path);
        }
        tokio::fs::remove_file(&output_path).await?;
    }

    info!(url = %source.url, "downloading");

    let pb = if show_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                .map_err(|e| anyhow!(e))?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("⬇ {}", name));
        pb
    } else {
        ProgressBar::hidden()
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("chembrew/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let mut response = client.get(&source.url).send().await?.error_for_status()?;

    if let Some(total) = response.content_length() {
        pb.set_length(total);
    }

    let mut file = tokio::fs::File::create(&output_path)
        .await
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush().await?;
    pb.finish_with_message(format!("✓ {}", name));

    if let Some(expected) = &source.sha256 {
        if let Err(e) = verify_checksum(&output_path, expected) {
            tokio::fs::remove_file(&output_path).await?;
            return Err(e);
        }
    }

    Ok(output_path)
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use std::io::Read;

    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(BuildError::ChecksumMismatch {
            path: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

fn is_tarball(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".tar")
}

/// Unpack a downloaded source into `dest`.
///
/// Tarballs are extracted with their single top-level directory stripped;
/// anything else (a jar) is copied in under its original file name.
pub fn unpack(archive_path: &Path, dest: &Path) -> Result<()> {
    if !is_tarball(archive_path) {
        fs::create_dir_all(dest)?;
        let file_name = archive_path
            .file_name()
            .ok_or_else(|| anyhow!("no file name in {}", archive_path.display()))?;
        let file_name = file_name.to_string_lossy();
        // cache entries are `<name>--<file>`
        let original = file_name
            .split_once("--")
            .map(|(_, rest)| rest)
            .unwrap_or(file_name.as_ref());
        fs::copy(archive_path, dest.join(original))?;
        return Ok(());
    }

    let staging = dest.with_extension("unpack");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let result = if archive_path.extension().is_some_and(|ext| ext == "tar") {
        Archive::new(file).unpack(&staging)
    } else {
        Archive::new(GzDecoder::new(file)).unpack(&staging)
    };
    result.with_context(|| format!("Failed to extract: {}", archive_path.display()))?;

    let entries: Vec<PathBuf> = fs::read_dir(&staging)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    let single_dir = match entries.as_slice() {
        [only] if only.is_dir() => Some(only.clone()),
        _ => None,
    };

    match single_dir {
        Some(top) => {
            fs::rename(&top, dest)?;
            fs::remove_dir_all(&staging)?;
        }
        None => fs::rename(&staging, dest)?,
    }

    debug!(archive = %archive_path.display(), dest = %dest.display(), "unpacked");
    Ok(())
}

/// Clone a head source into `dest`
pub async fn checkout(vcs: Vcs, url: &str, dest: &Path) -> Result<()> {
    let (tool, args): (&str, Vec<&str>) = match vcs {
        Vcs::Git => ("git", vec!["clone", "--depth", "1"]),
        Vcs::Mercurial => ("hg", vec!["clone"]),
    };

    info!(%url, tool, "checking out");
    let output = tokio::process::Command::new(tool)
        .args(&args)
        .arg(url)
        .arg(dest)
        .output()
        .await
        .with_context(|| format!("Failed to run {}", tool))?;

    if !output.status.success() {
        return Err(BuildError::Execution {
            step_index: 0,
            command: format!("{} {} {} {}", tool, args.join(" "), url, dest.display()),
            exit_code: output.status.code(),
            captured_output: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}
