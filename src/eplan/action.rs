//! EPLAN action-string grammar.
//!
//! EPLAN's remoting interface accepts flat, CLI-like action strings:
//!
//! ```text
//! ActionName /KEY1:"value one" /KEY2:1
//! ```
//!
//! This module owns both directions of that contract: building an action
//! string from a typed [`ActionRequest`], and parsing one back (used for
//! diagnostics and to guarantee the grammar round-trips). It also classifies
//! raw host responses into structured [`ActionResult`]s.
//!
//! # Escaping
//!
//! String values are always emitted quoted. Inside quotes, backslash and
//! double quote are escaped with a backslash. Booleans are emitted as the
//! bare tokens `1`/`0` and integers as bare decimal, matching how EPLAN
//! documents its action parameters.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Markers that classify a textual host response as a failure.
///
/// EPLAN does not formally specify its response grammar; this set is the
/// external contract observed from the remoting interface and can be
/// extended without touching the dispatch logic.
pub const ERROR_MARKERS: [&str; 4] = ["ERROR", "FAILED", "EXCEPTION", "NOT POSSIBLE"];

/// A typed parameter value in an action string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// String value, always emitted quoted and escaped.
    Str(String),
    /// Boolean, emitted as `1` or `0`.
    Bool(bool),
    /// Integer, emitted as bare decimal.
    Int(i64),
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl ParamValue {
    /// Renders this value as an action-string token (including quoting).
    fn render(&self) -> String {
        match self {
            Self::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
                out
            }
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(i) => i.to_string(),
        }
    }
}

/// A logical operation to be sent to the host, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// The host action name (e.g. `ProjectOpen`).
    pub name: String,
    /// Ordered key/value parameters. Order is preserved exactly as built.
    pub parameters: IndexMap<String, ParamValue>,
    /// Whether dispatch must route this action through the quiet-execution
    /// bridge to suppress interactive dialogs.
    pub requires_quiet_mode: bool,
}

impl ActionRequest {
    /// Creates a request with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: IndexMap::new(),
            requires_quiet_mode: false,
        }
    }

    /// Adds a parameter (builder style).
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Adds a parameter only when `value` is `Some`.
    #[must_use]
    pub fn opt_param<V: Into<ParamValue>>(
        mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        if let Some(v) = value {
            self.parameters.insert(key.into(), v.into());
        }
        self
    }

    /// Marks this request as requiring dialog suppression.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.requires_quiet_mode = true;
        self
    }

    /// Serialises this request into the host's action-string grammar.
    #[must_use]
    pub fn to_action_string(&self) -> String {
        let mut out = self.name.clone();
        for (key, value) in &self.parameters {
            out.push_str(" /");
            out.push_str(key);
            out.push(':');
            out.push_str(&value.render());
        }
        out
    }
}

/// Parses an action string back into a request.
///
/// Quoted tokens become [`ParamValue::Str`] with escapes resolved; bare
/// tokens that parse as decimal become [`ParamValue::Int`], anything else
/// becomes a string. The `requires_quiet_mode` flag is not part of the wire
/// grammar and is always `false` on parsed requests.
///
/// # Errors
///
/// Returns a description of the first syntax fault: empty input, a
/// parameter token without the `/KEY:` shape, or an unterminated quote.
pub fn parse_action_string(input: &str) -> Result<ActionRequest, String> {
    let mut chars = input.trim().chars().peekable();

    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        name.push(c);
        chars.next();
    }
    if name.is_empty() {
        return Err("empty action string".to_string());
    }

    let mut parameters = IndexMap::new();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };
        if first != '/' {
            return Err(format!("expected '/' before parameter, found '{first}'"));
        }
        chars.next();

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == ':' {
                break;
            }
            if c.is_whitespace() {
                return Err(format!("parameter '{key}' is missing ':'"));
            }
            key.push(c);
            chars.next();
        }
        if chars.next() != Some(':') {
            return Err(format!("parameter '{key}' is missing ':'"));
        }
        if key.is_empty() {
            return Err("parameter with empty key".to_string());
        }

        let value = if chars.peek() == Some(&'"') {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => s.push(escaped),
                        Some(other) => {
                            s.push('\\');
                            s.push(other);
                        }
                        None => return Err(format!("unterminated escape in '{key}'")),
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => s.push(c),
                }
            }
            if !closed {
                return Err(format!("unterminated quote in parameter '{key}'"));
            }
            ParamValue::Str(s)
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
            token
                .parse::<i64>()
                .map_or_else(|_| ParamValue::Str(token.clone()), ParamValue::Int)
        };

        parameters.insert(key, value);
    }

    Ok(ActionRequest {
        name,
        parameters,
        requires_quiet_mode: false,
    })
}

/// Structured outcome of a dispatched action, never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// Whether the host carried out the action.
    pub success: bool,
    /// Human-readable outcome summary.
    pub message: String,
    /// The raw textual host response (empty for quiet-mode results).
    pub raw_response: String,
    /// Structured data extracted from a quiet-mode result file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ActionResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn ok(message: String, raw_response: String) -> Self {
        Self {
            success: true,
            message,
            raw_response,
            payload: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub const fn failure(message: String, raw_response: String) -> Self {
        Self {
            success: false,
            message,
            raw_response,
            payload: None,
        }
    }

    /// Attaches structured payload data.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Classifies a raw host response into an [`ActionResult`].
///
/// A response containing any recognised error marker (case-insensitive) is
/// a failure; everything else is success. The message is the first
/// non-empty response line, with a leading marker such as `ERROR:` stripped.
#[must_use]
pub fn classify_response(action_name: &str, raw: &str) -> ActionResult {
    let upper = raw.to_uppercase();
    let failed = ERROR_MARKERS.iter().any(|marker| upper.contains(marker));

    let first_line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let message = if first_line.is_empty() {
        if failed {
            format!("{action_name} failed")
        } else {
            format!("Executed: {action_name}")
        }
    } else {
        strip_marker_prefix(first_line).to_string()
    };

    if failed {
        ActionResult::failure(message, raw.to_string())
    } else {
        ActionResult::ok(message, raw.to_string())
    }
}

/// Strips a leading `MARKER:` prefix (e.g. `ERROR: file missing`).
fn strip_marker_prefix(line: &str) -> &str {
    for marker in ERROR_MARKERS {
        let Some(rest) = line
            .get(..marker.len())
            .filter(|head| head.eq_ignore_ascii_case(marker))
            .map(|_| &line[marker.len()..])
        else {
            continue;
        };
        return rest.trim_start_matches([':', ' ']).trim();
    }
    line
}
