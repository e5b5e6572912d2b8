//! Decoding of loosely-typed JSON request bodies into token inputs.
//!
//! Request bodies come from arbitrary HTTP clients, so fields of the wrong
//! type are skipped rather than rejected, except where a rule says
//! otherwise (`acountsMax` on update).

use serde_json::Value;

use super::types::{NewToken, TokenError, TokenPatch};

/// A JSON number as whole unix seconds. Fractions are truncated.
pub(crate) fn numeric(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// A JSON number that is a whole value >= 1 (`2` and `2.0` both qualify).
pub(crate) fn positive_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return (n > 0).then_some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= i64::MAX as f64)
        .map(|f| f as i64)
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

impl NewToken {
    /// Build issuance metadata from a request body. A missing or non-object
    /// body yields all defaults.
    pub fn from_json(body: &Value) -> Self {
        let end_time_history = body
            .get("endTimeHistory")
            .and_then(Value::as_array)
            .and_then(|items| items.iter().map(numeric).collect::<Option<Vec<_>>>());

        Self {
            name: string_field(body, "name"),
            desc: string_field(body, "desc"),
            end_time: body.get("endTime").and_then(numeric),
            end_time_history,
            acounts_max: body.get("acountsMax").and_then(positive_integer),
        }
    }
}

impl TokenPatch {
    /// Build a partial update from a request body.
    ///
    /// `name`/`desc`/`endTime` of the wrong type are ignored. A present,
    /// non-null `acountsMax` that is not a whole number is rejected; its
    /// positivity is checked against the record later.
    pub fn from_json(body: &Value) -> Result<Self, TokenError> {
        let acounts_max = match body.get("acountsMax") {
            None | Some(Value::Null) => None,
            Some(value) => Some(whole_number(value).ok_or(TokenError::InvalidAccountsMax)?),
        };

        Ok(Self {
            name: string_field(body, "name"),
            desc: string_field(body, "desc"),
            end_time: body.get("endTime").and_then(numeric),
            acounts_max,
        })
    }
}

fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// The raw `account` field of a request body, or `""` when absent or not a
/// string. Validation and trimming happen in the service.
pub fn account_field(body: &Value) -> &str {
    body.get("account").and_then(Value::as_str).unwrap_or("")
}

/// Interpret the `ended` query flag: `true/1/yes/y/on` (any case) select
/// ended records, every other value selects live ones.
pub fn parse_ended_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "on"
    )
}
