//! RouterOS command vocabulary and output scraping
//!
//! Everything that depends on the exact text a device prints lives here, so
//! a change on the device side has one point of change on ours.

/// Line printed by `system backup save` on success
pub const BACKUP_SAVED: &str = "Configuration backup saved";

/// Update status when the channel carries a newer version
pub const NEW_VERSION_AVAILABLE: &str = "New version is available";

/// Update status when the installed version is the latest
pub const SYSTEM_UP_TO_DATE: &str = "System is already up to date";

/// Update status once packages are downloaded and waiting for a reboot
pub const DOWNLOADED_PLEASE_REBOOT: &str = "Downloaded, please reboot";

/// Marker RouterOS prints when it rejects a command
pub const SYNTAX_ERROR: &str = "syntax error";

/// Remote directory manual packages are uploaded into
pub const PACKAGE_DESTINATION: &str = "/";

pub mod commands {
    pub const IDENTITY: &str = "system identity print";
    pub const PACKAGE_PRINT: &str = "system package print";
    pub const UPDATE_PRINT: &str = "system package update print";
    pub const CHECK_FOR_UPDATES: &str = "system package update check-for-updates";
    pub const DOWNLOAD: &str = "system package update download";
    pub const REBOOT: &str = "system reboot\ny";
    pub const DOWNGRADE: &str = "system package downgrade\ny";

    pub fn set_channel(channel: &str) -> String {
        format!("system package update set channel={channel}")
    }

    pub fn backup_save(name: &str) -> String {
        format!("system backup save name={name}")
    }

    pub fn file_remove(file: &str) -> String {
        format!("file remove {file}")
    }
}

/// Result of `check-for-updates`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCheck {
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    /// A new version can be downloaded; false when it already was
    pub update_available: bool,
    /// Packages are already downloaded and wait for a manual reboot
    pub already_downloaded: bool,
    /// The device said it runs the latest version
    pub up_to_date: bool,
}

impl UpdateCheck {
    /// Whether the output carried any version or a known status
    pub fn is_conclusive(&self) -> bool {
        self.installed_version.is_some()
            || self.latest_version.is_some()
            || self.update_available
            || self.already_downloaded
            || self.up_to_date
    }
}

/// One row of `system package print`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// Value of a `label: value` line, matching the label exactly
///
/// `field_value(lines, "channel")` finds `   channel: stable` but not
/// `status: switching channel`.
pub fn field_value<'a>(lines: &'a [String], label: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let mut tokens = line.split_whitespace();
        let key = tokens.next()?.strip_suffix(':')?;
        if key == label {
            tokens.next()
        } else {
            None
        }
    })
}

/// All `status:` lines, without the label
fn status_lines(lines: &[String]) -> impl Iterator<Item = &str> {
    lines.iter().filter_map(|line| {
        let trimmed = line.trim_start();
        trimmed.strip_prefix("status:").map(str::trim)
    })
}

/// Parse the output of `check-for-updates`
pub fn parse_update_check(lines: &[String]) -> UpdateCheck {
    let mut new_version = false;
    let mut downloaded = false;
    let mut up_to_date = false;
    for status in status_lines(lines) {
        if status.contains(NEW_VERSION_AVAILABLE) {
            new_version = true;
        }
        if status.contains(DOWNLOADED_PLEASE_REBOOT) {
            downloaded = true;
        }
        if status.contains(SYSTEM_UP_TO_DATE) {
            up_to_date = true;
        }
    }

    UpdateCheck {
        installed_version: field_value(lines, "installed-version").map(str::to_string),
        latest_version: field_value(lines, "latest-version").map(str::to_string),
        update_available: new_version && !downloaded,
        already_downloaded: downloaded,
        up_to_date,
    }
}

/// Whether `update download` reported a completed download
pub fn download_succeeded(lines: &[String]) -> bool {
    status_lines(lines).any(|status| status.contains(DOWNLOADED_PLEASE_REBOOT))
}

/// Whether `backup save` printed the confirmation line
pub fn backup_saved(lines: &[String]) -> bool {
    lines.iter().any(|line| line.trim() == BACKUP_SAVED)
}

/// Whether the device rejected the command
pub fn has_syntax_error(lines: &[String]) -> bool {
    lines.iter().any(|line| line.contains(SYNTAX_ERROR))
}

/// Device identity from `system identity print`
pub fn parse_identity(lines: &[String]) -> Option<String> {
    field_value(lines, "name").map(str::to_string)
}

/// Rows of `system package print`
///
/// ```text
/// Columns: NAME, VERSION, BUILD-TIME, SIZE
/// #  NAME      VERSION  BUILD-TIME           SIZE
/// 0  routeros  7.15.2   2024-06-25 10:25:08  11.9MiB
/// 1  wireless  7.15.2   2024-06-25 10:25:08  5.0MiB
/// ```
///
/// A single-letter flag column (`X` for disabled) after the index is skipped,
/// as is the `Flags:` legend RouterOS v6 prints above the table.
pub fn parse_installed_packages(lines: &[String]) -> Vec<InstalledPackage> {
    lines
        .iter()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.first() {
                None | Some(&"#") | Some(&"Columns:") | Some(&"Flags:") => return None,
                _ => {}
            }
            let mut rest = &tokens[1..];
            if rest.len() > 2 && is_flag(rest[0]) {
                rest = &rest[1..];
            }
            match rest {
                [name, version, ..] => Some(InstalledPackage {
                    name: name.to_string(),
                    version: version.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

fn is_flag(token: &str) -> bool {
    token.len() == 1 && token.chars().all(|c| c.is_ascii_uppercase())
}
