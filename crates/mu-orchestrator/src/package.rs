//! Local firmware packages for manual upgrades

use std::path::{Path, PathBuf};

use mu_core::error::VersionError;
use mu_core::version;

use crate::error::RunError;
use crate::parse::InstalledPackage;

/// A package file named `name-version[-arch].npk`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub path: PathBuf,
    pub name: String,
    pub version: String,
}

impl PackageFile {
    /// Derive package name and version from the file name
    ///
    /// The version is the first `-`-separated segment that starts with a
    /// digit, everything before it is the name:
    /// `routeros-7.16-arm64.npk` is `routeros` at `7.16`, and
    /// `wifi-qcom-ac-7.16.npk` is `wifi-qcom-ac` at `7.16`.
    pub fn from_path(path: &Path) -> Result<Self, RunError> {
        let invalid = || RunError::PackageName(path.to_path_buf());

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(invalid)?;
        let stem = match file_name.len().checked_sub(4) {
            Some(cut)
                if file_name.is_char_boundary(cut)
                    && file_name[cut..].eq_ignore_ascii_case(".npk") =>
            {
                &file_name[..cut]
            }
            _ => file_name,
        };

        let segments: Vec<&str> = stem.split('-').collect();
        let version_at = segments
            .iter()
            .position(|s| s.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(invalid)?;
        if version_at == 0 {
            return Err(invalid());
        }

        Ok(Self {
            path: path.to_path_buf(),
            name: segments[..version_at].join("-"),
            version: segments[version_at].to_string(),
        })
    }

    /// Check that every path exists, then parse all of them
    ///
    /// Fails on the first missing file before anything is parsed, so a
    /// typo in the package list never leads to a partial upload.
    pub fn collect(paths: &[PathBuf]) -> Result<Vec<Self>, RunError> {
        if paths.is_empty() {
            return Err(RunError::NoPackages);
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(RunError::MissingPackage(missing.clone()));
        }
        paths.iter().map(|p| Self::from_path(p)).collect()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Whether installing `packages` moves any installed package backwards
///
/// Packages not currently installed never count as a downgrade.
pub fn detect_downgrade(
    packages: &[PackageFile],
    installed: &[InstalledPackage],
) -> Result<bool, VersionError> {
    for package in packages {
        let Some(current) = installed.iter().find(|i| i.name == package.name) else {
            continue;
        };
        if version::is_lower(&package.version, &current.version)? {
            tracing::debug!(
                package = %package.name,
                from = %current.version,
                to = %package.version,
                "package downgrade"
            );
            return Ok(true);
        }
    }
    Ok(false)
}
