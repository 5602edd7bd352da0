//! Panel domain state: zones, outputs, areas, protocol modes and their
//! capability sets (supplemented from `original_source/elitecloud_alarm/
//! client.py` and `types.py`, per SPEC_FULL §4).

use std::collections::HashMap;

use crate::commands::{mode_command, version_command};
use crate::error::EciError;
use crate::message::AlarmMessage;
use crate::session::Session;
use crate::version::is_mode_4_supported;

/// The panel's communication protocol mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMode {
    /// No acknowledgement, the original mode.
    Mode1 = 1,
    /// Acknowledged, "AAP".
    Mode2 = 2,
    /// Acknowledged, Permaconn.
    Mode3 = 3,
    /// No acknowledgement, Home Automation (firmware 10.3.50+ only).
    Mode4 = 4,
}

/// What arming operations a [`ProtocolMode`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArmingCapabilities {
    pub individual_area: bool,
    pub user_id_and_pin: bool,
    pub one_push: bool,
}

/// What disarming operations a [`ProtocolMode`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisarmingCapabilities {
    pub user_id_and_pin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmCapabilities {
    pub arming: ArmingCapabilities,
    pub disarming: DisarmingCapabilities,
}

/// The capability set for each mode, mirroring `client.py::_capabilities_from_mode`.
pub fn capabilities_from_mode(mode: ProtocolMode) -> AlarmCapabilities {
    match mode {
        ProtocolMode::Mode1 => AlarmCapabilities {
            arming: ArmingCapabilities {
                one_push: true,
                ..Default::default()
            },
            disarming: DisarmingCapabilities { user_id_and_pin: true },
        },
        ProtocolMode::Mode2 => AlarmCapabilities {
            arming: ArmingCapabilities {
                user_id_and_pin: true,
                ..Default::default()
            },
            disarming: DisarmingCapabilities { user_id_and_pin: true },
        },
        ProtocolMode::Mode4 => AlarmCapabilities {
            arming: ArmingCapabilities {
                individual_area: true,
                ..Default::default()
            },
            disarming: DisarmingCapabilities { user_id_and_pin: true },
        },
        ProtocolMode::Mode3 => {
            unimplemented!("mode 3 (Permaconn) capability mapping is not specified upstream")
        }
    }
}

/// Queries the panel's firmware version and switches to the highest mode it
/// supports — mode 4 (Home Automation, no-ack) if the firmware is new
/// enough, else mode 2 (acknowledged, AAP). Grounded in
/// `client.py::connect`/`_auto_set_mode`.
pub async fn auto_select_mode(session: &Session) -> Result<ProtocolMode, EciError> {
    let panel_version = session.request(version_command()).await?;
    let mode = if is_mode_4_supported(panel_version.firmware) {
        ProtocolMode::Mode4
    } else {
        ProtocolMode::Mode2
    };
    session.request(mode_command(mode as u8)).await?;
    Ok(mode)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingMode {
    Away,
    Stay,
}

impl ArmingMode {
    pub fn keyword(self) -> &'static str {
        match self {
            ArmingMode::Away => "ARMAWAY",
            ArmingMode::Stay => "ARMSTAY",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaState {
    pub armed: bool,
    pub ready_to_arm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneState {
    pub supervise_alarm: bool,
    pub trouble_alarm: bool,
    pub bypassed: bool,
    pub alarm: bool,
    pub radio_battery_low: bool,
    pub zone_closed: bool,
    pub sensor_watch_alarm: bool,
}

impl Default for ZoneState {
    fn default() -> Self {
        Self {
            supervise_alarm: false,
            trouble_alarm: false,
            bypassed: false,
            alarm: false,
            radio_battery_low: false,
            zone_closed: true,
            sensor_watch_alarm: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputState {
    pub state: bool,
}

/// Aggregated panel state, updated by dispatching notification messages
/// through [`PanelState::apply`]. Grounded in `client.py`'s
/// `_process_system_message`/`_process_rf_message`/`_process_area_message`/
/// `_process_zone_message`/`_process_output_message` handler chain; the first
/// handler that recognizes the message type wins.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    pub zones: HashMap<u32, ZoneState>,
    pub outputs: HashMap<u32, OutputState>,
    pub areas: HashMap<u32, AreaState>,
    pub mains_failed: bool,
    pub battery_low: bool,
    pub tamper_active: bool,
    pub line_failed: bool,
    pub dialer_failed: bool,
    pub fuse_failed: bool,
    pub supports_rf: bool,
}

impl PanelState {
    pub fn new(supports_rf: bool) -> Self {
        Self {
            supports_rf,
            ..Default::default()
        }
    }

    /// `true` if any configured area is armed.
    pub fn any_area_armed(&self) -> bool {
        self.areas.values().any(|a| a.armed)
    }

    /// Applies one notification message, returning `true` if it was recognized.
    pub fn apply(&mut self, message: &AlarmMessage) -> bool {
        self.apply_system(message)
            || (self.supports_rf && self.apply_rf(message))
            || self.apply_area(message)
            || self.apply_zone(message)
            || self.apply_output(message)
    }

    fn apply_system(&mut self, m: &AlarmMessage) -> bool {
        match m.message_type.as_str() {
            "RO" => self.mains_failed = false,
            "NR" => self.mains_failed = true,
            "MF" => self.mains_failed = true,
            "MR" => self.mains_failed = false,
            "BF" => self.battery_low = true,
            "BR" => self.battery_low = false,
            "TA" => self.tamper_active = true,
            "TR" => self.tamper_active = false,
            "LF" => self.line_failed = true,
            "LR" => self.line_failed = false,
            "DF" => self.dialer_failed = true,
            "DR" => self.dialer_failed = false,
            "FF" => self.fuse_failed = true,
            "FR" => self.fuse_failed = false,
            "CAL" => {}
            "CLF" => {}
            _ => return false,
        }
        true
    }

    fn apply_rf(&mut self, m: &AlarmMessage) -> bool {
        matches!(m.message_type.as_str(), "RIF" | "RIR" | "ZBL" | "ZBR" | "ZIA" | "ZIR")
    }

    /// Only inserts a map entry for a message type it actually recognizes —
    /// an unrelated message must never leave a phantom default entry behind.
    fn apply_area(&mut self, m: &AlarmMessage) -> bool {
        let Some(number) = m.number else { return false };
        match m.message_type.as_str() {
            "A" | "EA" => self.areas.entry(number).or_default().armed = true,
            "S" => self.areas.entry(number).or_default().ready_to_arm = true,
            "D" => {
                let area = self.areas.entry(number).or_default();
                area.armed = false;
                area.ready_to_arm = false;
            }
            "ES" => self.areas.entry(number).or_default().ready_to_arm = false,
            _ => return false,
        }
        true
    }

    fn apply_zone(&mut self, m: &AlarmMessage) -> bool {
        let Some(number) = m.number else { return false };
        match m.message_type.as_str() {
            "ZO" => self.zones.entry(number).or_default().zone_closed = false,
            "ZC" => self.zones.entry(number).or_default().zone_closed = true,
            "ZA" => self.zones.entry(number).or_default().alarm = true,
            "ZR" => self.zones.entry(number).or_default().alarm = false,
            "ZT" => self.zones.entry(number).or_default().trouble_alarm = true,
            "ZTR" => self.zones.entry(number).or_default().trouble_alarm = false,
            "ZBY" => self.zones.entry(number).or_default().bypassed = true,
            "ZBYR" => self.zones.entry(number).or_default().bypassed = false,
            "ZSA" => self.zones.entry(number).or_default().sensor_watch_alarm = true,
            "ZSR" => self.zones.entry(number).or_default().sensor_watch_alarm = false,
            _ => return false,
        }
        true
    }

    fn apply_output(&mut self, m: &AlarmMessage) -> bool {
        let Some(number) = m.number else { return false };
        match m.message_type.as_str() {
            "OO" => self.outputs.entry(number).or_default().state = true,
            "OR" => self.outputs.entry(number).or_default().state = false,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::test_support::in_memory_transport;

    #[tokio::test]
    async fn auto_select_mode_picks_mode4_when_firmware_supports_it() {
        let (transport, handle) = in_memory_transport();
        handle.feed("WELCOME");
        let session = Session::new(transport, None, SessionConfig::default());
        session.connect().await.unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { auto_select_mode(&session).await }
        });
        assert_eq!(handle.written().await.unwrap().trim(), "VERSION");
        handle.feed("ESX F/W Ver. 10.3.52 (SN1)\n");
        assert_eq!(handle.written().await.unwrap().trim(), "MODE 4");
        handle.feed("OK Mode\n4\n");

        assert_eq!(task.await.unwrap().unwrap(), ProtocolMode::Mode4);
    }

    #[tokio::test]
    async fn auto_select_mode_falls_back_to_mode2_on_old_firmware() {
        let (transport, handle) = in_memory_transport();
        handle.feed("WELCOME");
        let session = Session::new(transport, None, SessionConfig::default());
        session.connect().await.unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { auto_select_mode(&session).await }
        });
        assert_eq!(handle.written().await.unwrap().trim(), "VERSION");
        handle.feed("ESX F/W Ver. 9.0.0 (SN1)\n");
        assert_eq!(handle.written().await.unwrap().trim(), "MODE 2");
        handle.feed("OK Mode\n2\n");

        assert_eq!(task.await.unwrap().unwrap(), ProtocolMode::Mode2);
    }

    #[test]
    fn composite_area_armed_is_any_area() {
        let mut state = PanelState::new(false);
        state.apply(&AlarmMessage::parse("A1"));
        assert!(state.any_area_armed());
        state.apply(&AlarmMessage::parse("D1"));
        assert!(!state.any_area_armed());
    }

    #[test]
    fn zone_open_close_toggles_closed_flag() {
        let mut state = PanelState::new(false);
        assert!(state.apply(&AlarmMessage::parse("ZO3")));
        assert!(!state.zones[&3].zone_closed);
        assert!(state.apply(&AlarmMessage::parse("ZC3")));
        assert!(state.zones[&3].zone_closed);
    }

    #[test]
    fn unrelated_message_leaves_no_phantom_entries() {
        let mut state = PanelState::new(false);
        assert!(state.apply(&AlarmMessage::parse("OO1")));
        assert!(!state.areas.contains_key(&1));
        assert!(!state.zones.contains_key(&1));
        assert!(state.outputs.contains_key(&1));
    }

    #[test]
    fn rf_messages_ignored_when_not_supported() {
        let mut state = PanelState::new(false);
        assert!(!state.apply(&AlarmMessage::parse("ZBL3")));
    }

    #[test]
    fn capabilities_for_mode4_are_individual_area() {
        let caps = capabilities_from_mode(ProtocolMode::Mode4);
        assert!(caps.arming.individual_area);
        assert!(!caps.arming.user_id_and_pin);
    }
}
