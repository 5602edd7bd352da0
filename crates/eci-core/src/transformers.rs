//! The reusable transformer library (spec §4.2), grounded in
//! `original_source/arrowhead_alarm/transformers.py`.

use crate::error::{EciError, ExpectedSet};
use crate::flow::{Flow, FlowResult};

/// Splits `buffer` on `delimiter`, discarding the trailing (possibly
/// incomplete) fragment — mirrors `util.split_complete_lines`.
fn split_complete_lines(buffer: &str, delimiter: &str) -> Vec<String> {
    let mut parts: Vec<String> = buffer.split(delimiter).map(str::to_string).collect();
    parts.pop();
    parts
}

/// `Go(lines)` once at least one complete line is present, else `Wait`.
pub fn wait_any_complete_lines(delimiter: impl Into<String>) -> Flow<Vec<String>> {
    let delimiter = delimiter.into();
    Flow::new(move |buffer: &str| {
        let lines = split_complete_lines(buffer, &delimiter);
        if lines.is_empty() {
            FlowResult::Wait
        } else {
            FlowResult::Go(lines)
        }
    })
}

/// `Go(lines)` once exactly `n` complete lines are present, `Wait` otherwise
/// (below *or* above `n` — an overshoot never rejects, it just keeps
/// accumulating until whatever reads it gives up).
pub fn wait_n_lines(n: usize, delimiter: impl Into<String>) -> Flow<Vec<String>> {
    let delimiter = delimiter.into();
    Flow::new(move |buffer: &str| {
        let lines = split_complete_lines(buffer, &delimiter);
        if lines.len() == n {
            FlowResult::Go(lines)
        } else {
            FlowResult::Wait
        }
    })
}

/// `wait_n_lines(1, _)` unwrapped to a single line.
pub fn wait_line(delimiter: impl Into<String>) -> Flow<String> {
    wait_n_lines(1, delimiter).then(|mut lines: Vec<String>| FlowResult::Go(lines.remove(0)))
}

/// Joins a list of lines with `sep` — the inverse of a split step.
pub fn line_join(sep: impl Into<String>) -> impl Fn(Vec<String>) -> FlowResult<String> + Send + Sync + 'static {
    let sep = sep.into();
    move |lines: Vec<String>| FlowResult::Go(lines.join(&sep))
}

/// Splits a joined string back into its fields on whitespace.
pub fn split_whitespace() -> impl Fn(String) -> FlowResult<Vec<String>> + Send + Sync + 'static {
    |s: String| FlowResult::Go(s.split_whitespace().map(str::to_string).collect())
}

/// Trims surrounding whitespace.
pub fn strip() -> impl Fn(String) -> FlowResult<String> + Send + Sync + 'static {
    |s: String| FlowResult::Go(s.trim().to_string())
}

/// Parses a decimal integer, surfacing a parse failure as `Error`.
pub fn parse_int() -> impl Fn(String) -> FlowResult<i64> + Send + Sync + 'static {
    |s: String| match s.trim().parse::<i64>() {
        Ok(n) => FlowResult::Go(n),
        Err(_) => FlowResult::Error(EciError::ParseInt(s)),
    }
}

/// Discards the carried value, succeeding with `()`.
pub fn discard<T>() -> impl Fn(T) -> FlowResult<()> + Send + Sync + 'static {
    |_| FlowResult::Go(())
}

/// Exact (case-sensitive or not) match against a single expected keyword.
/// No partial-match tolerance: `Go(())` on equality, `Reject` otherwise.
pub fn keyword_check(
    expected: impl Into<String>,
    case_sensitive: bool,
) -> impl Fn(String) -> FlowResult<()> + Send + Sync + 'static {
    let expected = expected.into();
    move |s: String| {
        let matched = if case_sensitive {
            s == expected
        } else {
            s.eq_ignore_ascii_case(&expected)
        };
        if matched {
            FlowResult::Go(())
        } else {
            FlowResult::Reject
        }
    }
}

/// The option-match rule (spec.md §4.2): `Go` on an exact match, `Wait` while
/// the buffer is still a strict prefix of at least one option (it could still
/// become valid), `Reject` once it can no longer match anything.
pub fn check_string_with_options(options: &[&str], case_sensitive: bool) -> Flow<String> {
    let options: Vec<String> = options.iter().map(|s| s.to_string()).collect();
    Flow::new(move |buffer: &str| {
        let cmp = |a: &str, b: &str| {
            if case_sensitive {
                a == b
            } else {
                a.eq_ignore_ascii_case(b)
            }
        };
        let starts_with = |a: &str, b: &str| {
            if case_sensitive {
                a.starts_with(b)
            } else {
                a.len() <= b.len() && a.eq_ignore_ascii_case(&b[..a.len()])
            }
        };

        if let Some(m) = options.iter().find(|opt| cmp(buffer, opt)) {
            return FlowResult::Go(m.clone());
        }
        if options.iter().any(|opt| starts_with(opt, buffer)) {
            return FlowResult::Wait;
        }
        FlowResult::Reject
    })
}

/// Builds the `InvalidResponse` error for a failed strict option match.
pub fn invalid_response_error(received: impl Into<String>, expected: &[&str]) -> EciError {
    EciError::InvalidResponse {
        received: received.into(),
        expected: ExpectedSet(expected.iter().map(|s| s.to_string()).collect()),
    }
}

/// The `<OK|ERR> <KEYWORD> <DATA...>` response shape shared by every command
/// (spec.md §4.2, grounded in `create_command_data_transformer`).
///
/// Splits into at most 3 whitespace-separated parts: verdict, keyword, and
/// the remaining data (kept as one field, may be empty). `ERR` responses are
/// translated into the §7 error taxonomy via [`EciError::from_command_code`].
pub fn command_response(command: impl Into<String>, keyword: impl Into<String>) -> Flow<String> {
    let command = command.into();
    let keyword = keyword.into();
    wait_line("\n").then(move |line: String| {
        let parts: Vec<&str> = line.splitn(3, ' ').collect();
        let verdict = parts.first().copied().unwrap_or("");
        let got_keyword = parts.get(1).copied().unwrap_or("");
        let data = parts.get(2).copied().unwrap_or("").to_string();

        match verdict {
            "OK" => {
                if got_keyword.eq_ignore_ascii_case(&keyword) {
                    FlowResult::Go(data)
                } else {
                    FlowResult::Error(invalid_response_error(line.clone(), &[keyword.as_str()]))
                }
            }
            "ERR" => FlowResult::Error(EciError::from_command_code(got_keyword, &command, &line)),
            _ => FlowResult::Error(invalid_response_error(line.clone(), &["OK", "ERR"])),
        }
    })
}

/// `command_response` followed by parsing the data field as an integer.
pub fn command_int_data(command: impl Into<String>, keyword: impl Into<String>) -> Flow<i64> {
    command_response(command, keyword).then(|data: String| match data.trim().parse::<i64>() {
        Ok(n) => FlowResult::Go(n),
        Err(_) => FlowResult::Error(EciError::ParseInt(data)),
    })
}

/// `command_response` that discards the data field, succeeding with `()`.
pub fn command_no_data(command: impl Into<String>, keyword: impl Into<String>) -> Flow<()> {
    command_response(command, keyword).then(|_| FlowResult::Go(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_match_progression() {
        let flow = check_string_with_options(&["WELCOME", "LOGIN"], true);
        assert!(matches!(flow.apply("W"), FlowResult::Wait));
        assert!(matches!(flow.apply("WEL"), FlowResult::Wait));
        assert!(matches!(flow.apply("WELCOME"), FlowResult::Go(_)));
        assert!(matches!(flow.apply("X"), FlowResult::Reject));
    }

    #[test]
    fn keyword_check_rejects_on_mismatch() {
        let step = keyword_check("Status", true);
        assert!(matches!(step("Status".to_string()), FlowResult::Go(())));
        assert!(matches!(step("Other".to_string()), FlowResult::Reject));
    }

    #[test]
    fn command_response_maps_err_code() {
        let flow = command_response("ARMAWAY 1 1234", "ARMAWAY");
        match flow.apply("ERR 3\n") {
            FlowResult::Error(EciError::CommandNotAllowed { .. }) => {}
            other => panic!("expected CommandNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn command_response_ok_extracts_data() {
        let flow = command_response("STATUS", "Status");
        match flow.apply("OK Status 1\n") {
            FlowResult::Go(data) => assert_eq!(data, "1"),
            other => panic!("expected Go, got {other:?}"),
        }
    }
}
