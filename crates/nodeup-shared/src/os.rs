//! Operating system identification.
//!
//! Parsed from `/etc/os-release`. Only Debian- and RHEL-family distributions on
//! x86_64 or aarch64 are supported.

use crate::error::InstallerError;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Debian,
    Rhel,
    Unknown,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Debian => write!(f, "debian"),
            OsFamily::Rhel => write!(f, "rhel"),
            OsFamily::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub family: OsFamily,
    pub arch: String,
}

impl OsInfo {
    pub fn summary(&self) -> String {
        format!("{} {} ({}, {})", self.name, self.version, self.family, self.arch)
    }
}

/// Minimum major versions per distribution id.
const MIN_VERSIONS: &[(&str, u32)] = &[
    ("ubuntu", 20),
    ("debian", 11),
    ("rocky", 8),
    ("almalinux", 8),
    ("rhel", 8),
    ("centos", 9),
    ("fedora", 38),
];

const SUPPORTED_ARCHES: &[&str] = &["x86_64", "aarch64"];

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

/// Parse the contents of an os-release file.
pub fn parse_os_release(contents: &str, arch: &str) -> OsInfo {
    let fields: HashMap<&str, &str> = contents
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), unquote(v)))
        .collect();

    let id = fields.get("ID").copied().unwrap_or("").to_lowercase();
    let like = fields.get("ID_LIKE").copied().unwrap_or("").to_lowercase();

    let family = if id == "debian" || id == "ubuntu" || like.contains("debian") {
        OsFamily::Debian
    } else if ["rhel", "centos", "fedora", "rocky", "almalinux"].contains(&id.as_str())
        || like.contains("rhel")
        || like.contains("fedora")
    {
        OsFamily::Rhel
    } else {
        OsFamily::Unknown
    };

    OsInfo {
        name: fields
            .get("NAME")
            .copied()
            .filter(|n| !n.is_empty())
            .unwrap_or(id.as_str())
            .to_string(),
        version: fields.get("VERSION_ID").copied().unwrap_or("").to_string(),
        id,
        family,
        arch: arch.to_string(),
    }
}

/// Reject families, versions and architectures the installer cannot provision.
pub fn check_supported(info: &OsInfo) -> Result<(), InstallerError> {
    if info.family == OsFamily::Unknown {
        return Err(InstallerError::Environment(format!(
            "unsupported distribution '{}'",
            info.id
        )));
    }
    if !SUPPORTED_ARCHES.contains(&info.arch.as_str()) {
        return Err(InstallerError::Environment(format!(
            "unsupported architecture '{}'",
            info.arch
        )));
    }
    if let Some((_, min)) = MIN_VERSIONS.iter().find(|(id, _)| *id == info.id) {
        let major = info
            .version
            .split('.')
            .next()
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| {
                InstallerError::Environment(format!(
                    "cannot read version '{}' of {}",
                    info.version, info.name
                ))
            })?;
        if major < *min {
            return Err(InstallerError::Environment(format!(
                "{} {} is too old (need {} or newer)",
                info.name, info.version, min
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"
PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;

    const ROCKY: &str = r#"NAME="Rocky Linux"
VERSION_ID="9.3"
ID="rocky"
ID_LIKE="rhel centos fedora"
"#;

    #[test]
    fn parses_ubuntu() {
        let info = parse_os_release(UBUNTU, "x86_64");
        assert_eq!(info.id, "ubuntu");
        assert_eq!(info.name, "Ubuntu");
        assert_eq!(info.version, "22.04");
        assert_eq!(info.family, OsFamily::Debian);
        assert!(check_supported(&info).is_ok());
    }

    #[test]
    fn parses_rocky_as_rhel() {
        let info = parse_os_release(ROCKY, "aarch64");
        assert_eq!(info.family, OsFamily::Rhel);
        assert!(check_supported(&info).is_ok());
    }

    #[test]
    fn rejects_old_debian() {
        let info = parse_os_release("ID=debian\nVERSION_ID=\"10\"\nNAME=Debian", "x86_64");
        let err = check_supported(&info).unwrap_err();
        assert!(matches!(err, InstallerError::Environment(_)));
        assert!(err.to_string().contains("too old"));
    }

    #[test]
    fn rejects_unknown_family_and_arch() {
        let arch = parse_os_release("ID=arch\nNAME=Arch", "x86_64");
        assert!(check_supported(&arch).is_err());
        let riscv = parse_os_release(UBUNTU, "riscv64");
        assert!(check_supported(&riscv).unwrap_err().to_string().contains("architecture"));
    }
}
