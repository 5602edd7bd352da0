//! Command constructors: pure factories from parameters to [`Request`]
//! (spec §4.6), grounded in `original_source/elitecloud_alarm/commands.py`
//! and supplemented per SPEC_FULL §4.

use std::time::Duration;

use crate::error::{EciError, ExpectedSet};
use crate::flow::{Flow, FlowResult};
use crate::panel::ArmingMode;
use crate::request::Request;
use crate::transformers::{command_int_data, command_no_data, invalid_response_error, wait_any_complete_lines};
use crate::version::{panel_version, PanelVersion};

/// `VERSION` — the panel's firmware banner.
pub fn version_command() -> Request<PanelVersion> {
    Request::single_shot("VERSION", panel_version())
}

/// `MODE <n>` — switch protocol mode. The panel replies with `"OK Mode"`
/// followed by a second line echoing the mode number, which must match `n`.
pub fn mode_command(mode: u8) -> Request<()> {
    Request::single_shot(format!("MODE {mode}"), mode_response_transformer(mode))
}

/// Grounded in `commands.py::mode_command`'s two-line `OK Mode` / `<n>`
/// reply shape, with the panel's echoed integer checked against `mode`
/// rather than discarded.
fn mode_response_transformer(mode: u8) -> Flow<()> {
    wait_any_complete_lines("\n").then(move |lines: Vec<String>| {
        let header = lines[0].trim();
        let mut parts = header.splitn(2, ' ');
        let verdict = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("");
        match verdict {
            "OK" if rest.eq_ignore_ascii_case("Mode") => match lines.get(1) {
                None => FlowResult::Wait,
                Some(echoed) => match echoed.trim().parse::<i64>() {
                    Ok(n) if n == mode as i64 => FlowResult::Go(()),
                    Ok(_) => FlowResult::Error(EciError::InvalidResponse {
                        received: echoed.clone(),
                        expected: ExpectedSet(vec![mode.to_string()]),
                    }),
                    Err(_) => FlowResult::Error(EciError::ParseInt(echoed.clone())),
                },
            },
            "OK" => FlowResult::Error(invalid_response_error(header.to_string(), &["Mode"])),
            "ERR" => FlowResult::Error(EciError::from_command_code(rest, "MODE", header)),
            _ => FlowResult::Error(invalid_response_error(header.to_string(), &["OK", "ERR"])),
        }
    })
}

fn require_positive(value: i64, field: &'static str) -> Result<(), EciError> {
    if value > 0 {
        Ok(())
    } else {
        Err(EciError::InvalidParameter {
            command: field.to_string(),
            response: format!("{value} is not a valid {field}"),
        })
    }
}

/// `<ARMAWAY|ARMSTAY> <user_id> <pin>` — mode 2 style arming.
pub fn arm_user_command(user_id: u32, pin: u32, mode: ArmingMode) -> Result<Request<i64>, EciError> {
    require_positive(user_id as i64, "user_id")?;
    let command = format!("{} {user_id} {pin}", mode.keyword());
    Ok(Request::single_shot(
        command.clone(),
        command_int_data(command, mode.keyword()),
    ))
}

/// `<ARMAWAY|ARMSTAY>` alone — mode 1 one-push arming, result discarded.
pub fn arm_no_pin_command(mode: ArmingMode) -> Request<()> {
    let command = mode.keyword().to_string();
    Request::single_shot(command.clone(), command_no_data(command, mode.keyword()))
}

/// `<ARMAWAY|ARMSTAY> <area_id>` — mode 4 individual-area arming.
pub fn arm_area_command(area_id: u32, mode: ArmingMode) -> Result<Request<i64>, EciError> {
    require_positive(area_id as i64, "area_id")?;
    let command = format!("{} {area_id}", mode.keyword());
    Ok(Request::single_shot(
        command.clone(),
        command_int_data(command, mode.keyword()),
    ))
}

/// `DISARM <user_id> <pin>`.
pub fn disarm_command(user_id: u32, pin: u32) -> Result<Request<i64>, EciError> {
    require_positive(user_id as i64, "user_id")?;
    let command = format!("DISARM {user_id} {pin}");
    Ok(Request::single_shot(command.clone(), command_int_data(command, "DISARM")))
}

/// `BYPASS <zone_id>`.
pub fn bypass_zone_command(zone_id: u32) -> Request<()> {
    let command = format!("BYPASS {zone_id}");
    Request::single_shot(command.clone(), command_no_data(command, "BYPASS"))
}

/// `UNBYPASS <zone_id>`.
pub fn unbypass_zone_command(zone_id: u32) -> Request<()> {
    let command = format!("UNBYPASS {zone_id}");
    Request::single_shot(command.clone(), command_no_data(command, "UNBYPASS"))
}

/// `OUTPUTON <output_id>`.
pub fn output_on_command(output_id: u32) -> Request<()> {
    let command = format!("OUTPUTON {output_id}");
    Request::single_shot(command.clone(), command_no_data(command, "OUTPUTON"))
}

/// `OUTPUTOFF <output_id>`.
pub fn output_off_command(output_id: u32) -> Request<()> {
    let command = format!("OUTPUTOFF {output_id}");
    Request::single_shot(command.clone(), command_no_data(command, "OUTPUTOFF"))
}

/// `OUTPUT <output_id>` — queries whether an output is currently on.
pub fn output_state_command(output_id: u32) -> Request<bool> {
    let command = format!("OUTPUT {output_id}");
    Request::single_shot(
        command.clone(),
        command_int_data(command, "OUTPUT").then(|n: i64| FlowResult::Go(n != 0)),
    )
}

/// `DEVICE <n>` — sets the virtual keypad number used for arm/disarm commands.
pub fn set_virtual_keypad_command(n: u32) -> Request<()> {
    let command = format!("DEVICE {n}");
    Request::single_shot(command.clone(), command_no_data(command, "DEVICE"))
}

/// `STATUS` — a header line (`"OK Status <first>"` or `"ERR <code>"`)
/// followed by a burst of bare notification lines, terminated by silence
/// rather than a fixed line count.
pub fn status_command(timeout: Duration) -> Request<Vec<String>> {
    Request::sliding_timeout("STATUS", status_lines_transformer(), timeout)
}

/// Grounded in `parsing.py::ok_status_listener`: strips the `OK`/`Status`
/// header off the first line and surfaces an `ERR` header as an error,
/// while every subsequent line passes through unchanged.
fn status_lines_transformer() -> Flow<Vec<String>> {
    wait_any_complete_lines("\n").then(|lines: Vec<String>| {
        let header = lines[0].trim();
        let mut parts = header.splitn(3, ' ');
        let verdict = parts.next().unwrap_or("");
        let keyword = parts.next().unwrap_or("");
        let data = parts.next().unwrap_or("");
        match verdict {
            "OK" if keyword.eq_ignore_ascii_case("Status") => {
                let mut result = vec![data.to_string()];
                result.extend(lines[1..].iter().cloned());
                FlowResult::Go(result)
            }
            "OK" => FlowResult::Error(invalid_response_error(header.to_string(), &["Status"])),
            "ERR" => FlowResult::Error(EciError::from_command_code(keyword, "STATUS", header)),
            _ => FlowResult::Error(invalid_response_error(header.to_string(), &["OK", "ERR"])),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_area_rejects_non_positive_id() {
        let err = arm_area_command(0, ArmingMode::Away).unwrap_err();
        assert!(matches!(err, EciError::InvalidParameter { .. }));
    }

    #[test]
    fn mode_command_builds_expected_wire_text() {
        let request = mode_command(4);
        assert_eq!(request.data, "MODE 4");
    }

    #[test]
    fn mode_response_waits_for_echoed_integer_line() {
        let flow = mode_response_transformer(4);
        assert!(matches!(flow.apply("OK Mode\n"), FlowResult::Wait));
        assert!(matches!(flow.apply("OK Mode\n4\n"), FlowResult::Go(())));
    }

    #[test]
    fn mode_response_rejects_mismatched_echo() {
        let flow = mode_response_transformer(4);
        match flow.apply("OK Mode\n5\n") {
            FlowResult::Error(EciError::InvalidResponse { .. }) => {}
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[test]
    fn mode_response_surfaces_err_without_a_second_line() {
        let flow = mode_response_transformer(4);
        match flow.apply("ERR 3\n") {
            FlowResult::Error(EciError::CommandNotAllowed { .. }) => {}
            other => panic!("expected CommandNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn status_lines_strips_header_and_keeps_the_rest_verbatim() {
        let flow = status_lines_transformer();
        match flow.apply("OK Status A1\nZC3\nZC5\n") {
            FlowResult::Go(lines) => assert_eq!(lines, vec!["A1".to_string(), "ZC3".to_string(), "ZC5".to_string()]),
            other => panic!("expected Go, got {other:?}"),
        }
    }

    #[test]
    fn status_lines_surfaces_err_header() {
        let flow = status_lines_transformer();
        match flow.apply("ERR 3\n") {
            FlowResult::Error(EciError::CommandNotAllowed { .. }) => {}
            other => panic!("expected CommandNotAllowed, got {other:?}"),
        }
    }
}
