use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::logging::Logger;

const SCOPE: &str = "AdbSetup";
const PLATFORM_TOOLS_VERSION: &str = "r34.0.0";
const DOWNLOAD_BASE: &str = "https://dl.google.com/android/repository";

/// Platform-specific adb executable name.
pub fn adb_executable_name() -> &'static str {
    if cfg!(windows) { "adb.exe" } else { "adb" }
}

/// Returns `<adb_dir>/platform-tools/<adb>`.
pub fn local_adb_path(adb_dir: &Path) -> PathBuf {
    adb_dir.join("platform-tools").join(adb_executable_name())
}

/// Platform tools archive URL for the host OS, if one exists.
pub fn platform_tools_url() -> Option<String> {
    let os = if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        return None;
    };
    Some(format!(
        "{}/platform-tools_{}-{}.zip",
        DOWNLOAD_BASE, PLATFORM_TOOLS_VERSION, os
    ))
}

/// Looks for adb in `PATH`.
pub fn find_adb_in_path() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(adb_executable_name()))
        .find(|candidate| candidate.is_file())
}

/// Finds adb in `PATH` or under `adb_dir`, downloading the platform tools
/// into `adb_dir` when neither has it.
pub fn ensure_adb(adb_dir: &Path, log: &dyn Logger) -> Result<PathBuf> {
    if let Some(adb) = find_adb_in_path() {
        log.debug(SCOPE, &format!("Found adb in PATH: {}", adb.display()));
        return Ok(adb);
    }

    let local = local_adb_path(adb_dir);
    if local.is_file() {
        log.debug(SCOPE, &format!("Found local adb: {}", local.display()));
        return Ok(local);
    }

    log.info(SCOPE, "adb not found, downloading platform tools");
    download_platform_tools(adb_dir, log)
        .context("adb setup failed, install Android platform tools manually")?;

    if local.is_file() {
        log.info(SCOPE, &format!("adb installed at: {}", local.display()));
        Ok(local)
    } else {
        Err(anyhow!(
            "adb missing after extraction, expected {}",
            local.display()
        ))
    }
}

/// Downloads and extracts the platform tools zip into `adb_dir`.
fn download_platform_tools(adb_dir: &Path, log: &dyn Logger) -> Result<()> {
    let url = platform_tools_url().ok_or_else(|| {
        anyhow!(
            "No platform tools download for {}",
            std::env::consts::OS
        )
    })?;

    log.info(SCOPE, &format!("Downloading {}", url));
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let response = client
        .get(&url)
        .header("User-Agent", "adb-compare-bot")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download platform tools: HTTP {}",
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    log.info(
        SCOPE,
        &format!("Downloaded platform tools ({} bytes)", bytes.len()),
    );

    // The archive is deleted when `archive` drops
    let mut archive = NamedTempFile::with_suffix(".zip")?;
    archive.write_all(&bytes)?;
    archive.flush()?;

    fs::create_dir_all(adb_dir)?;
    extract_zip(archive.path(), adb_dir)?;
    log.info(SCOPE, &format!("Extracted to {}", adb_dir.display()));

    Ok(())
}

/// Extracts every entry of the zip at `archive` into `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_local_adb_path() {
        let path = local_adb_path(Path::new("/opt/bot/adb"));
        assert!(path.starts_with("/opt/bot/adb/platform-tools"));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            adb_executable_name()
        );
    }

    #[test]
    fn test_platform_tools_url() {
        if let Some(url) = platform_tools_url() {
            assert!(url.starts_with("https://dl.google.com/android/repository/platform-tools_r34.0.0-"));
            assert!(url.ends_with(".zip"));
        }
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("tools.zip");
        {
            let file = fs::File::create(&archive_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file("platform-tools/adb", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"#!/bin/sh\n").unwrap();
            writer.finish().unwrap();
        }

        let dest = dir.path().join("adb");
        extract_zip(&archive_path, &dest).unwrap();

        assert_eq!(
            fs::read(dest.join("platform-tools").join("adb")).unwrap(),
            b"#!/bin/sh\n"
        );
    }
}
