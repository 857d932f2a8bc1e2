//! Four-part versions and the version-string grammar of the version attributes.
//!
//! ```text
//! major[.minor[.build[.revision]]]      components are decimal digits only
//! major.minor.*                         build and revision generated
//! major.minor.build.*                   revision generated
//! ```
//!
//! Only `AssemblyVersionAttribute` accepts the wildcard forms. Generated components come
//! from the build time: the build is the number of days since 2000-01-01 and the revision
//! is half the number of seconds since midnight, both in UTC.

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Seconds from the Unix epoch to 2000-01-01T00:00:00Z.
const Y2K_UNIX_SECONDS: u64 = 946_684_800;
const SECONDS_PER_DAY: u64 = 86_400;

/// A four-part version number.
///
/// # Examples
///
/// ```rust
/// use cilattr::metadata::wellknown::Version;
///
/// let version = Version::new(1, 22, 333, 4444);
/// assert_eq!(version.to_string(), "1.22.333.4444");
/// assert!(version > Version::new(1, 22, 0, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    /// Major component
    pub major: u16,
    /// Minor component
    pub minor: u16,
    /// Build component
    pub build: u16,
    /// Revision component
    pub revision: u16,
}

impl Version {
    /// Build a version from its components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Version {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Which attribute a version string comes from; selects the accepted grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionKind {
    /// `AssemblyVersionAttribute`: components up to 65534, wildcards allowed
    Assembly,
    /// `AssemblyFileVersionAttribute`: components up to 65535, no wildcards
    File,
    /// `SatelliteContractVersionAttribute`: components up to 65534, no wildcards
    SatelliteContract,
}

impl VersionKind {
    fn max_component(self) -> u16 {
        match self {
            VersionKind::File => u16::MAX,
            VersionKind::Assembly | VersionKind::SatelliteContract => u16::MAX - 1,
        }
    }
}

/// A successfully parsed version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVersion {
    /// The resulting version, with generated components filled in
    pub version: Version,
    /// The string used `*`
    pub has_wildcard: bool,
}

/// Parse `text` with the grammar of `kind`.
///
/// Returns `None` when the string does not conform. Wildcards are resolved against
/// `build_time`.
///
/// # Examples
///
/// ```rust
/// use std::time::UNIX_EPOCH;
/// use cilattr::metadata::wellknown::{parse_version, Version, VersionKind};
///
/// let parsed = parse_version("1.22.333.4444", VersionKind::Assembly, UNIX_EPOCH).unwrap();
/// assert_eq!(parsed.version, Version::new(1, 22, 333, 4444));
/// assert!(parse_version("1.*", VersionKind::Assembly, UNIX_EPOCH).is_none());
/// ```
#[must_use]
pub fn parse_version(text: &str, kind: VersionKind, build_time: SystemTime) -> Option<ParsedVersion> {
    let parts: Vec<&str> = text.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }

    let mut components = [0u16; 4];
    let mut wildcard_at = None;
    for (index, part) in parts.iter().enumerate() {
        if *part == "*" {
            let last = index + 1 == parts.len();
            if kind != VersionKind::Assembly || !last || index < 2 {
                return None;
            }
            wildcard_at = Some(index);
            continue;
        }
        components[index] = parse_component(part, kind.max_component())?;
    }

    if let Some(index) = wildcard_at {
        let (build, revision) = generated_components(build_time);
        if index == 2 {
            components[2] = build;
        }
        components[3] = revision;
    }

    Some(ParsedVersion {
        version: Version::new(components[0], components[1], components[2], components[3]),
        has_wildcard: wildcard_at.is_some(),
    })
}

fn parse_component(part: &str, max: u16) -> Option<u16> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Leading zeros are fine; the value alone is range checked.
    let value = part.bytes().try_fold(0u32, |acc, b| {
        let next = acc * 10 + u32::from(b - b'0');
        (next <= u32::from(max)).then_some(next)
    })?;
    u16::try_from(value).ok()
}

/// Build and revision numbers generated for a wildcard version at `build_time`.
#[must_use]
pub fn generated_components(build_time: SystemTime) -> (u16, u16) {
    let since_epoch = build_time
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    let since_y2k = since_epoch.saturating_sub(Y2K_UNIX_SECONDS);
    let days = since_y2k / SECONDS_PER_DAY;
    let seconds_today = since_y2k % SECONDS_PER_DAY;
    (
        u16::try_from(days).unwrap_or(u16::MAX - 1),
        u16::try_from(seconds_today / 2).unwrap_or(u16::MAX - 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds_after_y2k: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(Y2K_UNIX_SECONDS + seconds_after_y2k)
    }

    #[test]
    fn parses_partial_versions() {
        let parsed = parse_version("3", VersionKind::Assembly, at(0)).unwrap();
        assert_eq!(parsed.version, Version::new(3, 0, 0, 0));
        let parsed = parse_version("1.2", VersionKind::File, at(0)).unwrap();
        assert_eq!(parsed.version, Version::new(1, 2, 0, 0));
        assert!(!parsed.has_wildcard);
    }

    #[test]
    fn rejects_malformed() {
        for text in ["", "1.", ".1", "1.2.3.4.5", "1.-2", "1. 2", "a.b", "1.2.3.65535"] {
            assert!(
                parse_version(text, VersionKind::Assembly, at(0)).is_none(),
                "{text}"
            );
        }
        assert!(parse_version("1.2.3.65535", VersionKind::File, at(0)).is_some());
        assert!(parse_version("1.2.3.65536", VersionKind::File, at(0)).is_none());
    }

    #[test]
    fn wildcard_positions() {
        let time = at(3 * SECONDS_PER_DAY + 100);
        let build = parse_version("1.2.*", VersionKind::Assembly, time).unwrap();
        assert_eq!(build.version, Version::new(1, 2, 3, 50));
        assert!(build.has_wildcard);

        let revision = parse_version("1.2.7.*", VersionKind::Assembly, time).unwrap();
        assert_eq!(revision.version, Version::new(1, 2, 7, 50));

        assert!(parse_version("1.*", VersionKind::Assembly, time).is_none());
        assert!(parse_version("*", VersionKind::Assembly, time).is_none());
        assert!(parse_version("1.2.*.4", VersionKind::Assembly, time).is_none());
        assert!(parse_version("1.2.*", VersionKind::SatelliteContract, time).is_none());
        assert!(parse_version("1.2.*", VersionKind::File, time).is_none());
    }
}
