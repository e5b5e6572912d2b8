//! Token record, operation inputs/results, and token error definitions.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

use super::input::{numeric, positive_integer};

/// Account capacity applied when a record carries no valid `acountsMax`.
pub const DEFAULT_MAX_ACCOUNTS: usize = 100;

// ==============================================================================
// Token Record
// ==============================================================================

/// One issued token and the accounts bound to it.
///
/// Field names match the persisted snapshot layout, including the
/// `acounts` spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub desc: String,
    #[serde(rename = "endTime", default, deserialize_with = "lenient_end_time")]
    pub end_time: Option<i64>,
    #[serde(
        rename = "endTimeHistory",
        default,
        deserialize_with = "lenient_history"
    )]
    pub end_time_history: Vec<i64>,
    #[serde(
        rename = "acountsMax",
        default,
        deserialize_with = "lenient_capacity",
        skip_serializing_if = "Option::is_none"
    )]
    pub acounts_max: Option<i64>,
    #[serde(default, deserialize_with = "lenient_accounts")]
    pub acounts: Vec<String>,
}

impl TokenRecord {
    /// The account limit actually enforced for this record.
    pub fn capacity(&self) -> usize {
        self.acounts_max
            .filter(|max| *max > 0)
            .and_then(|max| usize::try_from(max).ok())
            .unwrap_or(DEFAULT_MAX_ACCOUNTS)
    }

    /// A record is ended once its `endTime` is set and not in the future.
    pub fn is_ended(&self, now: i64) -> bool {
        self.end_time.is_some_and(|end| end <= now)
    }

    pub fn has_account(&self, account: &str) -> bool {
        self.acounts.iter().any(|a| a == account)
    }
}

// Record fields below are decoded leniently: one odd value in a hand-edited
// or legacy snapshot must not make the whole array undecodable.

fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(numeric).unwrap_or_default())
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => text,
        _ => String::new(),
    })
}

fn lenient_accounts<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(account) => Some(account),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_end_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(numeric))
}

fn lenient_history<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(numeric).collect(),
        _ => Vec::new(),
    })
}

// Snapshots written by older deployments may hold 0, negatives, or strings
// here; those mean "use the default" rather than a broken snapshot.
fn lenient_capacity<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(positive_integer))
}

// ==============================================================================
// Operation Inputs
// ==============================================================================

/// Initial metadata for a newly issued token. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewToken {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub end_time: Option<i64>,
    pub end_time_history: Option<Vec<i64>>,
    pub acounts_max: Option<i64>,
}

/// Partial metadata update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPatch {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub end_time: Option<i64>,
    pub acounts_max: Option<i64>,
}

impl TokenPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.desc.is_none()
            && self.end_time.is_none()
            && self.acounts_max.is_none()
    }
}

/// Listing filter. Both criteria are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFilter {
    /// Case-insensitive substring of `name`.
    pub name: Option<String>,
    /// `Some(true)` keeps only ended records, `Some(false)` only live ones.
    pub ended: Option<bool>,
}

// ==============================================================================
// Operation Results
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub record: TokenRecord,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountAdded {
    pub token: String,
    pub account_added: String,
    pub acounts: Vec<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub token: String,
    pub account: String,
    pub exists: bool,
    pub total_accounts: usize,
}

/// Verification always answers; an unknown token is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Checked(Verification),
    UnknownToken { token: String },
}

impl VerifyOutcome {
    pub fn exists(&self) -> bool {
        match self {
            Self::Checked(v) => v.exists,
            Self::UnknownToken { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRemoved {
    pub token: String,
    pub deleted_account: String,
    pub remaining_acounts: Vec<String>,
    pub total_accounts: usize,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenDeleted {
    pub deleted_token: String,
    pub deleted_accounts: Vec<String>,
    pub remaining_tokens: usize,
}

// ==============================================================================
// Errors
// ==============================================================================

/// Coarse classification the HTTP layer maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    CapacityExceeded,
    StorageFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Account parameter is required and must be a non-empty string")]
    InvalidAccount,

    #[error("Nothing to update: supply at least one of name, desc, endTime, acountsMax")]
    NothingToUpdate,

    #[error("acountsMax must be a positive integer")]
    InvalidAccountsMax,

    #[error("Token not found")]
    TokenNotFound { token: String },

    #[error("Account not found in the token")]
    AccountNotFound { token: String, account: String },

    #[error("Generated token already exists")]
    TokenConflict { attempts: usize },

    #[error("Account already exists in the list")]
    DuplicateAccount { token: String, account: String },

    #[error("Maximum number of accounts ({limit}) reached for this token")]
    CapacityReached { token: String, limit: usize },

    #[error(
        "acountsMax ({requested}) cannot be lower than the current number of accounts ({current})"
    )]
    AccountsMaxBelowCount { requested: i64, current: usize },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAccount | Self::NothingToUpdate | Self::InvalidAccountsMax => {
                ErrorKind::InvalidInput
            }
            Self::TokenNotFound { .. } | Self::AccountNotFound { .. } => ErrorKind::NotFound,
            Self::TokenConflict { .. } | Self::DuplicateAccount { .. } => ErrorKind::Conflict,
            Self::CapacityReached { .. } | Self::AccountsMaxBelowCount { .. } => {
                ErrorKind::CapacityExceeded
            }
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_record_decodes_with_defaults() {
        let record: TokenRecord = serde_json::from_str(
            r#"{"token":"sk-legacy","created_at":5,"updated_at":6,"acounts":["user1"]}"#,
        )
        .expect("legacy record should decode");

        assert_eq!(record.name, "");
        assert_eq!(record.desc, "");
        assert_eq!(record.end_time, None);
        assert!(record.end_time_history.is_empty());
        assert_eq!(record.acounts_max, None);
        assert_eq!(record.capacity(), DEFAULT_MAX_ACCOUNTS);
    }

    #[test]
    fn malformed_fields_in_snapshot_decode_to_defaults() {
        let record: TokenRecord = serde_json::from_str(
            r#"{"token":"sk-odd","created_at":null,"updated_at":"soon","name":null,"desc":7,"acounts":null}"#,
        )
        .expect("record should decode");
        assert_eq!(record.created_at, 0);
        assert_eq!(record.updated_at, 0);
        assert_eq!(record.name, "");
        assert_eq!(record.desc, "");
        assert!(record.acounts.is_empty());

        let record: TokenRecord =
            serde_json::from_str(r#"{"token":"sk-mixed","acounts":["alice",3,null,"bob"]}"#)
                .expect("record should decode");
        assert_eq!(record.acounts, vec!["alice".to_string(), "bob".to_string()]);

        let record: TokenRecord = serde_json::from_str(r#"{"token":"sk-obj","acounts":{"a":1}}"#)
            .expect("record should decode");
        assert!(record.acounts.is_empty());
    }

    #[test]
    fn invalid_capacity_in_snapshot_falls_back_to_default() {
        for raw in ["0", "-4", "\"ten\"", "2.5", "null"] {
            let json = format!(r#"{{"token":"sk-x","acountsMax":{raw}}}"#);
            let record: TokenRecord = serde_json::from_str(&json).expect("record should decode");
            assert_eq!(record.acounts_max, None, "acountsMax {raw}");
            assert_eq!(record.capacity(), DEFAULT_MAX_ACCOUNTS);
        }
    }

    #[test]
    fn serialized_field_names_match_snapshot_layout() {
        let record = TokenRecord {
            token: "sk-a".into(),
            created_at: 1,
            updated_at: 2,
            name: "drop".into(),
            desc: String::new(),
            end_time: None,
            end_time_history: vec![7],
            acounts_max: Some(3),
            acounts: vec!["alice".into()],
        };
        let value = serde_json::to_value(&record).expect("serialize");
        let keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        for key in [
            "token",
            "created_at",
            "updated_at",
            "name",
            "desc",
            "endTime",
            "endTimeHistory",
            "acountsMax",
            "acounts",
        ] {
            assert!(keys.contains(&key), "missing `{key}`");
        }
        assert_eq!(value["endTime"], serde_json::Value::Null);
    }

    #[test]
    fn ended_requires_end_time_at_or_before_now() {
        let mut record: TokenRecord =
            serde_json::from_str(r#"{"token":"sk-x"}"#).expect("decode");
        assert!(!record.is_ended(i64::MAX));

        record.end_time = Some(1000);
        assert!(record.is_ended(1000));
        assert!(record.is_ended(1001));
        assert!(!record.is_ended(999));
    }

    #[test]
    fn error_kinds_cover_taxonomy() {
        assert_eq!(TokenError::InvalidAccount.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            TokenError::AccountNotFound {
                token: "t".into(),
                account: "a".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TokenError::TokenConflict { attempts: 3 }.kind(),
            ErrorKind::Conflict
        );
        let err = TokenError::CapacityReached {
            token: "t".into(),
            limit: 2,
        };
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(
            err.to_string(),
            "Maximum number of accounts (2) reached for this token"
        );
    }
}
