//! Panel firmware version parsing and the mode-4 support gate (spec §6,
//! grounded in `original_source/elitecloud_alarm/util.py` and `types.py`).

use std::fmt;

use crate::error::EciError;
use crate::flow::{Flow, FlowResult};
use crate::transformers::wait_line;

/// A `(major, minor, patch)` firmware version, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionInfo {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionInfo {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Minimum firmware that exposes mode 4 (Home Automation, no-ack).
pub const MODE_4_MINIMUM: VersionInfo = VersionInfo::new(10, 3, 50);

pub fn is_mode_4_supported(version: VersionInfo) -> bool {
    version >= MODE_4_MINIMUM
}

/// A parsed version banner. Equality ignores `serial` — two banners read
/// from the same firmware family compare equal regardless of unit serial.
#[derive(Debug, Clone)]
pub struct PanelVersion {
    pub model: String,
    pub firmware: VersionInfo,
    pub serial: String,
}

impl PartialEq for PanelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.firmware == other.firmware
    }
}

/// `<MODEL> F/W Ver. <major>.<minor>.<patch> (<serial>)`
fn parse_version_string(line: &str) -> Option<PanelVersion> {
    let line = line.trim();
    let (model, rest) = line.split_once(" F/W Ver. ")?;
    let (version_part, serial_part) = rest.split_once(" (")?;
    let serial = serial_part.strip_suffix(')')?;

    let mut fields = version_part.splitn(3, '.');
    let major: u32 = fields.next()?.parse().ok()?;
    let minor: u32 = fields.next()?.parse().ok()?;
    let patch: u32 = fields.next()?.parse().ok()?;

    Some(PanelVersion {
        model: model.to_string(),
        firmware: VersionInfo::new(major, minor, patch),
        serial: serial.to_string(),
    })
}

/// Parses a single line as a version banner, failing with `InvalidVersion`.
pub fn panel_version() -> Flow<PanelVersion> {
    wait_line("\n").then(|line: String| match parse_version_string(&line) {
        Some(v) => FlowResult::Go(v),
        None => FlowResult::Error(EciError::InvalidVersion(line)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        assert!(VersionInfo::new(10, 3, 52) < VersionInfo::new(10, 4, 0));
        assert!(VersionInfo::new(10, 4, 0) < VersionInfo::new(11, 0, 0));
    }

    #[test]
    fn mode_4_gate() {
        assert!(!is_mode_4_supported(VersionInfo::new(10, 3, 49)));
        assert!(is_mode_4_supported(VersionInfo::new(10, 3, 50)));
        assert!(is_mode_4_supported(VersionInfo::new(11, 0, 0)));
    }

    #[test]
    fn equality_ignores_serial() {
        let a = PanelVersion {
            model: "ESX".to_string(),
            firmware: VersionInfo::new(10, 3, 50),
            serial: "AAA111".to_string(),
        };
        let b = PanelVersion {
            serial: "ZZZ999".to_string(),
            ..a.clone()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn parses_banner() {
        let flow = panel_version();
        match flow.apply("ESX F/W Ver. 10.3.52 (SN12345)\n") {
            FlowResult::Go(v) => {
                assert_eq!(v.model, "ESX");
                assert_eq!(v.firmware, VersionInfo::new(10, 3, 52));
                assert_eq!(v.serial, "SN12345");
            }
            other => panic!("expected Go, got {other:?}"),
        }
    }
}
