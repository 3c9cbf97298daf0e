use crate::route::{Route, ASN};
use crate::shared::{PipelineError, Result, RouteStatus};

pub const FIELD_SEPARATOR: char = '|';

const TIMESTAMP: usize = 1;
const STATUS: usize = 2;
const ORIGIN_IP: usize = 3;
const START_SYSTEM: usize = 4;
const PREFIX: usize = 5;
const AS_PATH: usize = 6;
const ADDITIONAL_INFO: usize = 11;

/// Lines shorter than this cannot name a prefix and are rejected.
pub const MIN_FIELDS: usize = PREFIX + 1;

/// Parses one `bgpdump -m` style line into a [`Route`].
///
/// The AS path and the additional-info column are optional; when the line
/// stops before them they are left empty. Withdrawals and unknown update
/// types are parsed as well, the caller decides what to keep.
pub fn parse_update_line(line: &str) -> Result<Route> {
    let line = line.trim_end_matches(['\r', '\n']);
    let parts: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

    if parts.len() < MIN_FIELDS {
        return Err(PipelineError::malformed(
            truncate(line),
            format!("expected at least {} fields, found {}", MIN_FIELDS, parts.len()),
        ));
    }

    let field = |index: usize| parts.get(index).map(|s| s.trim()).unwrap_or("");

    let as_path: Vec<ASN> = field(AS_PATH)
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let route = Route::new(
        field(TIMESTAMP).to_string(),
        RouteStatus::from_marker(field(STATUS)),
        field(ORIGIN_IP).to_string(),
        field(START_SYSTEM).to_string(),
        field(PREFIX).to_string(),
        as_path,
    );

    let info = field(ADDITIONAL_INFO);
    if info.is_empty() {
        Ok(route)
    } else {
        Ok(route.with_additional_info(info.to_string()))
    }
}

fn truncate(line: &str) -> String {
    const MAX: usize = 80;
    match line.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOUNCE: &str = "BGP4MP|1735689600|A|208.51.134.246|3549|1.2.3.0/24|3549 3356 13335|IGP|208.51.134.246|0|0||NAG||";

    #[test]
    fn test_parse_full_announce() {
        let route = parse_update_line(ANNOUNCE).unwrap();

        assert_eq!(route.timestamp, "1735689600");
        assert_eq!(route.status, RouteStatus::Announce);
        assert_eq!(route.origin_ip, "208.51.134.246");
        assert_eq!(route.start_system, "3549");
        assert_eq!(route.prefix, "1.2.3.0/24");
        assert_eq!(route.as_path, vec!["3549", "3356", "13335"]);
        assert_eq!(route.target_system.as_deref(), Some("13335"));
        assert!(route.additional_info.is_none());
    }

    #[test]
    fn test_parse_withdraw_without_path() {
        let route = parse_update_line("BGP4MP|1735689600|W|208.51.134.246|3549|1.2.3.0/24").unwrap();

        assert_eq!(route.status, RouteStatus::Withdraw);
        assert!(route.as_path.is_empty());
        assert!(route.target_system.is_none());
    }

    #[test]
    fn test_parse_additional_info() {
        let line = "BGP4MP|1|A|10.0.0.1|64500|10.0.0.0/8|64500 64501|IGP|10.0.0.1|0|0|community-x";
        let route = parse_update_line(line).unwrap();
        assert_eq!(route.additional_info.as_deref(), Some("community-x"));
    }

    #[test]
    fn test_short_line_is_malformed() {
        let err = parse_update_line("BGP4MP|1735689600|A|208.51.134.246").unwrap_err();
        assert!(err.is_recoverable());
    }
}
