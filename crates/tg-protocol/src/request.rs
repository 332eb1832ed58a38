//! Session requests carried in the upgrade query string
//!
//! Both hops share one query vocabulary. The only difference is the
//! identifier: clients name a workload (`workload_id`), the gateway names
//! the resolved container (`container_id`) when it dials a helper.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::split_command;
use crate::error::ProtocolError;

/// Log lines returned when the caller does not ask for a tail
pub const DEFAULT_TAIL: Tail = Tail::Lines(100);

/// The two kinds of session a bridge can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Interactive command execution
    Exec,
    /// Historical and live log streaming
    Logs,
}

impl SessionKind {
    /// HTTP path serving this kind
    pub fn path(&self) -> &'static str {
        match self {
            SessionKind::Exec => "/v1/exec",
            SessionKind::Logs => "/v1/logs",
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Exec => "exec",
            SessionKind::Logs => "logs",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exec" => Ok(SessionKind::Exec),
            "logs" => Ok(SessionKind::Logs),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// How much log history to replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// Entire history
    All,
    /// Last N lines
    Lines(u64),
}

impl fmt::Display for Tail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tail::All => f.write_str("all"),
            Tail::Lines(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for Tail {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Tail::All);
        }
        s.parse::<u64>()
            .map(Tail::Lines)
            .map_err(|_| ProtocolError::InvalidParameter {
                name: "tail",
                value: s.to_string(),
            })
    }
}

impl Default for Tail {
    fn default() -> Self {
        DEFAULT_TAIL
    }
}

/// Parse a boolean query flag.
///
/// Accepts `1`/`0`, `true`/`false` and `yes`/`no` in any case; both hops
/// historically used different spellings.
pub fn parse_flag(name: &'static str, value: &str) -> Result<bool, ProtocolError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ProtocolError::InvalidParameter {
            name,
            value: value.to_string(),
        }),
    }
}

/// Whether `id` can name a task or container.
///
/// Same shape the orchestrator hands out: an ASCII alphanumeric followed by
/// alphanumerics, `_`, `.` or `-`. Anything else never reaches a directory
/// or runtime API path.
pub fn is_valid_identifier(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    }
}

/// Parameters of an exec session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecParams {
    /// Raw command string, `None` for the default shell
    pub command: Option<String>,
    /// Allocate a TTY
    pub tty: bool,
}

impl ExecParams {
    /// Argument vector for the runtime
    pub fn argv(&self) -> Vec<String> {
        split_command(self.command.as_deref())
    }
}

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            command: None,
            tty: true,
        }
    }
}

/// Parameters of a logs session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogsParams {
    /// Keep streaming new output
    pub follow: bool,
    /// History to replay first
    pub tail: Tail,
}

/// Kind-specific session parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionParams {
    Exec(ExecParams),
    Logs(LogsParams),
}

impl SessionParams {
    /// Kind these parameters belong to
    pub fn kind(&self) -> SessionKind {
        match self {
            SessionParams::Exec(_) => SessionKind::Exec,
            SessionParams::Logs(_) => SessionKind::Logs,
        }
    }
}

/// Which identifier parameter a hop expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierField {
    /// Client to gateway
    Workload,
    /// Gateway to helper
    Container,
}

impl IdentifierField {
    /// Query parameter name
    pub fn name(&self) -> &'static str {
        match self {
            IdentifierField::Workload => "workload_id",
            IdentifierField::Container => "container_id",
        }
    }
}

/// Query string of a session upgrade request, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQuery {
    pub workload_id: Option<String>,
    pub container_id: Option<String>,
    pub cmd: Option<String>,
    pub tty: Option<String>,
    pub follow: Option<String>,
    pub tail: Option<String>,
}

impl SessionQuery {
    fn identifier(&self, field: IdentifierField) -> Option<&str> {
        let value = match field {
            IdentifierField::Workload => self.workload_id.as_deref(),
            IdentifierField::Container => self.container_id.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// A validated session request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Workload id at the gateway, container id at the helper
    pub target: String,
    /// Kind-specific parameters
    pub params: SessionParams,
}

impl SessionRequest {
    /// Create a request
    pub fn new(target: impl Into<String>, params: SessionParams) -> Self {
        Self {
            target: target.into(),
            params,
        }
    }

    /// Session kind
    pub fn kind(&self) -> SessionKind {
        self.params.kind()
    }

    /// Validate a received query string
    pub fn from_query(
        kind: SessionKind,
        field: IdentifierField,
        query: &SessionQuery,
    ) -> Result<Self, ProtocolError> {
        let target = query
            .identifier(field)
            .ok_or(ProtocolError::MissingIdentifier { field: field.name() })?
            .to_string();
        if !is_valid_identifier(&target) {
            return Err(ProtocolError::InvalidParameter {
                name: field.name(),
                value: target,
            });
        }

        let params = match kind {
            SessionKind::Exec => SessionParams::Exec(ExecParams {
                command: query
                    .cmd
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
                tty: match query.tty.as_deref() {
                    Some(v) => parse_flag("tty", v)?,
                    None => true,
                },
            }),
            SessionKind::Logs => SessionParams::Logs(LogsParams {
                follow: match query.follow.as_deref() {
                    Some(v) => parse_flag("follow", v)?,
                    None => false,
                },
                tail: match query.tail.as_deref().map(str::trim) {
                    Some(v) if !v.is_empty() => v.parse()?,
                    _ => DEFAULT_TAIL,
                },
            }),
        };

        Ok(Self { target, params })
    }

    /// Encode as query pairs using canonical spellings (`true`/`false`)
    pub fn to_query_pairs(&self, field: IdentifierField) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(field.name(), self.target.clone())];

        match &self.params {
            SessionParams::Exec(exec) => {
                if let Some(command) = &exec.command {
                    pairs.push(("cmd", command.clone()));
                }
                pairs.push(("tty", exec.tty.to_string()));
            }
            SessionParams::Logs(logs) => {
                pairs.push(("follow", logs.follow.to_string()));
                pairs.push(("tail", logs.tail.to_string()));
            }
        }

        pairs
    }

    /// Same request aimed at a different identifier
    pub fn retarget(&self, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            params: self.params.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> SessionQuery {
        let json = serde_json::Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect(),
        );
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_missing_identifier() {
        let err = SessionRequest::from_query(
            SessionKind::Exec,
            IdentifierField::Workload,
            &query(&[("cmd", "ls")]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingIdentifier {
                field: "workload_id"
            }
        );
        assert_eq!(err.to_string(), "missing identifier");
    }

    #[test]
    fn test_blank_identifier_is_missing() {
        let result = SessionRequest::from_query(
            SessionKind::Logs,
            IdentifierField::Container,
            &query(&[("container_id", "  ")]),
        );
        assert!(matches!(
            result,
            Err(ProtocolError::MissingIdentifier { .. })
        ));
    }

    #[test]
    fn test_identifier_shape() {
        for id in ["w1", "web.1.abc", "x7kq2m9d0c3e", "stack_web-1"] {
            assert!(is_valid_identifier(id), "{}", id);
        }
        for id in ["", "..", ".hidden", "-x", "a/b", "a?b", "a b", "w1%2F", "ü"] {
            assert!(!is_valid_identifier(id), "{}", id);
        }
    }

    #[test]
    fn test_path_like_identifier_is_rejected() {
        let err = SessionRequest::from_query(
            SessionKind::Exec,
            IdentifierField::Workload,
            &query(&[("workload_id", "../containers/json?all=1")]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidParameter {
                name: "workload_id",
                value: "../containers/json?all=1".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            r#"invalid workload_id: "../containers/json?all=1""#
        );
    }

    #[test]
    fn test_exec_defaults() {
        let request = SessionRequest::from_query(
            SessionKind::Exec,
            IdentifierField::Workload,
            &query(&[("workload_id", "w1"), ("cmd", "")]),
        )
        .unwrap();
        assert_eq!(request.target, "w1");
        assert_eq!(request.params, SessionParams::Exec(ExecParams::default()));
        if let SessionParams::Exec(exec) = &request.params {
            assert_eq!(exec.argv(), vec!["/bin/sh"]);
        }
    }

    #[test]
    fn test_logs_defaults() {
        let request = SessionRequest::from_query(
            SessionKind::Logs,
            IdentifierField::Container,
            &query(&[("container_id", "c1")]),
        )
        .unwrap();
        assert_eq!(
            request.params,
            SessionParams::Logs(LogsParams {
                follow: false,
                tail: Tail::Lines(100),
            })
        );
    }

    #[test]
    fn test_follow_accepts_both_spellings() {
        for value in ["1", "true", "TRUE", "yes"] {
            assert!(parse_flag("follow", value).unwrap(), "{}", value);
        }
        for value in ["0", "false", "False", "no", ""] {
            assert!(!parse_flag("follow", value).unwrap(), "{}", value);
        }
        assert!(parse_flag("follow", "maybe").is_err());
    }

    #[test]
    fn test_tail_parsing() {
        assert_eq!("all".parse::<Tail>().unwrap(), Tail::All);
        assert_eq!("0".parse::<Tail>().unwrap(), Tail::Lines(0));
        assert_eq!(" 25 ".parse::<Tail>().unwrap(), Tail::Lines(25));
        assert!(matches!(
            "-3".parse::<Tail>(),
            Err(ProtocolError::InvalidParameter { name: "tail", .. })
        ));
    }

    #[test]
    fn test_gateway_request_is_reencoded_for_helper() {
        let request = SessionRequest::from_query(
            SessionKind::Logs,
            IdentifierField::Workload,
            &query(&[("workload_id", "w1"), ("follow", "1"), ("tail", "all")]),
        )
        .unwrap();

        let pairs = request
            .retarget("abc123")
            .to_query_pairs(IdentifierField::Container);
        assert_eq!(
            pairs,
            vec![
                ("container_id", "abc123".to_string()),
                ("follow", "true".to_string()),
                ("tail", "all".to_string()),
            ]
        );
    }

    #[test]
    fn test_exec_command_is_forwarded() {
        let request = SessionRequest::new(
            "c1",
            SessionParams::Exec(ExecParams {
                command: Some("echo hi".to_string()),
                tty: true,
            }),
        );
        assert_eq!(
            request.to_query_pairs(IdentifierField::Container),
            vec![
                ("container_id", "c1".to_string()),
                ("cmd", "echo hi".to_string()),
                ("tty", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_kind_paths() {
        assert_eq!(SessionKind::Exec.path(), "/v1/exec");
        assert_eq!(SessionKind::Logs.path(), "/v1/logs");
        assert_eq!("logs".parse::<SessionKind>().unwrap(), SessionKind::Logs);
        assert!("attach".parse::<SessionKind>().is_err());
    }
}
