//! `TokenService`: every rule governing token records.
//!
//! Each operation runs one load → validate → mutate → save cycle against
//! the whole snapshot while holding `write_lock`, so concurrent requests
//! can never interleave and lose each other's updates.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use crate::store::RecordStore;

use super::types::{
    AccountAdded, AccountRemoved, IssuedToken, NewToken, TokenDeleted, TokenError, TokenFilter,
    TokenPatch, TokenRecord, Verification, VerifyOutcome, DEFAULT_MAX_ACCOUNTS,
};

/// How many fresh ids issuance tries before reporting a conflict.
const MAX_ID_ATTEMPTS: usize = 3;

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

pub struct TokenService {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
    clock: fn() -> i64,
    generate_id: IdGenerator,
}

impl TokenService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            clock: unix_now,
            generate_id: Box::new(random_token_id),
        }
    }

    /// Replace the wall clock (unix seconds).
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the `sk-<uuid>` generator.
    pub fn with_id_generator(mut self, generate: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.generate_id = Box::new(generate);
        self
    }

    // ========================================================================
    // Token lifecycle
    // ========================================================================

    pub async fn issue_token(&self, input: NewToken) -> Result<IssuedToken, TokenError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load_all().await?;

        let token = self.fresh_token_id(&records)?;
        let now = self.now();
        let default_max = i64::try_from(DEFAULT_MAX_ACCOUNTS).unwrap_or(i64::MAX);

        let record = TokenRecord {
            token,
            created_at: now,
            updated_at: now,
            name: input.name.unwrap_or_default(),
            desc: input.desc.unwrap_or_default(),
            end_time: input.end_time,
            end_time_history: input.end_time_history.unwrap_or_default(),
            acounts_max: Some(input.acounts_max.filter(|max| *max > 0).unwrap_or(default_max)),
            acounts: Vec::new(),
        };

        records.push(record.clone());
        self.store.save_all(&records).await?;

        tracing::info!(
            token = %record.token,
            acounts_max = record.capacity(),
            total = records.len(),
            "token issued"
        );
        Ok(IssuedToken {
            record,
            total: records.len(),
        })
    }

    pub async fn list_tokens(&self, filter: &TokenFilter) -> Result<Vec<TokenRecord>, TokenError> {
        let _guard = self.write_lock.lock().await;
        let records = self.store.load_all().await?;
        let now = self.now();
        let needle = filter.name.as_deref().map(str::to_lowercase);

        Ok(records
            .into_iter()
            .filter(|r| match &needle {
                Some(needle) => r.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .filter(|r| match filter.ended {
                Some(ended) => r.is_ended(now) == ended,
                None => true,
            })
            .collect())
    }

    pub async fn update_token(
        &self,
        token: &str,
        patch: TokenPatch,
    ) -> Result<TokenRecord, TokenError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load_all().await?;
        let now = self.now();

        let record = find_mut(&mut records, token)?;
        if patch.is_empty() {
            return Err(TokenError::NothingToUpdate);
        }

        // Validate everything before touching the record.
        if let Some(requested) = patch.acounts_max {
            if requested <= 0 {
                return Err(TokenError::InvalidAccountsMax);
            }
            let current = record.acounts.len();
            if usize::try_from(requested).unwrap_or(usize::MAX) < current {
                return Err(TokenError::AccountsMaxBelowCount { requested, current });
            }
        }

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(desc) = patch.desc {
            record.desc = desc;
        }
        if let Some(end_time) = patch.end_time {
            if let Some(previous) = record.end_time.filter(|prev| *prev != end_time) {
                record.end_time_history.push(previous);
            }
            record.end_time = Some(end_time);
        }
        if let Some(max) = patch.acounts_max {
            record.acounts_max = Some(max);
        }
        record.updated_at = now.max(record.created_at);

        let updated = record.clone();
        self.store.save_all(&records).await?;

        tracing::info!(
            token = %updated.token,
            end_time = ?updated.end_time,
            acounts_max = updated.capacity(),
            "token updated"
        );
        Ok(updated)
    }

    pub async fn delete_token(&self, token: &str) -> Result<TokenDeleted, TokenError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load_all().await?;

        let idx = records
            .iter()
            .position(|r| r.token == token)
            .ok_or_else(|| TokenError::TokenNotFound {
                token: token.to_string(),
            })?;
        let removed = records.remove(idx);
        self.store.save_all(&records).await?;

        tracing::info!(
            token = %removed.token,
            accounts = removed.acounts.len(),
            remaining = records.len(),
            "token deleted"
        );
        Ok(TokenDeleted {
            deleted_token: removed.token,
            deleted_accounts: removed.acounts,
            remaining_tokens: records.len(),
        })
    }

    // ========================================================================
    // Account membership
    // ========================================================================

    pub async fn add_account(&self, token: &str, account: &str) -> Result<AccountAdded, TokenError> {
        let account = normalize_account(account)?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load_all().await?;
        let now = self.now();

        let record = find_mut(&mut records, token)?;
        if record.has_account(&account) {
            return Err(TokenError::DuplicateAccount {
                token: token.to_string(),
                account,
            });
        }
        let limit = record.capacity();
        if record.acounts.len() >= limit {
            return Err(TokenError::CapacityReached {
                token: token.to_string(),
                limit,
            });
        }

        record.acounts.push(account.clone());
        record.updated_at = now.max(record.created_at);
        let added = AccountAdded {
            token: record.token.clone(),
            account_added: account,
            acounts: record.acounts.clone(),
            updated_at: record.updated_at,
        };
        self.store.save_all(&records).await?;

        tracing::info!(
            token = %added.token,
            account = %added.account_added,
            total = added.acounts.len(),
            limit,
            "account added"
        );
        Ok(added)
    }

    pub async fn verify_account(
        &self,
        token: &str,
        account: &str,
    ) -> Result<VerifyOutcome, TokenError> {
        let account = normalize_account(account)?;

        let _guard = self.write_lock.lock().await;
        let records = self.store.load_all().await?;

        let Some(record) = records.iter().find(|r| r.token == token) else {
            return Ok(VerifyOutcome::UnknownToken {
                token: token.to_string(),
            });
        };

        Ok(VerifyOutcome::Checked(Verification {
            token: record.token.clone(),
            exists: record.has_account(&account),
            account,
            total_accounts: record.acounts.len(),
        }))
    }

    pub async fn remove_account(
        &self,
        token: &str,
        account: &str,
    ) -> Result<AccountRemoved, TokenError> {
        let account = normalize_account(account)?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load_all().await?;
        let now = self.now();

        let record = find_mut(&mut records, token)?;
        let idx = record
            .acounts
            .iter()
            .position(|a| *a == account)
            .ok_or_else(|| TokenError::AccountNotFound {
                token: token.to_string(),
                account: account.clone(),
            })?;

        record.acounts.remove(idx);
        record.updated_at = now.max(record.created_at);
        let removed = AccountRemoved {
            token: record.token.clone(),
            deleted_account: account,
            remaining_acounts: record.acounts.clone(),
            total_accounts: record.acounts.len(),
            updated_at: record.updated_at,
        };
        self.store.save_all(&records).await?;

        tracing::info!(
            token = %removed.token,
            account = %removed.deleted_account,
            total = removed.total_accounts,
            "account removed"
        );
        Ok(removed)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn fresh_token_id(&self, records: &[TokenRecord]) -> Result<String, TokenError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = (self.generate_id)();
            if !records.iter().any(|r| r.token == candidate) {
                return Ok(candidate);
            }
            tracing::warn!(attempt, token = %candidate, "generated token collides with an existing one");
        }
        Err(TokenError::TokenConflict {
            attempts: MAX_ID_ATTEMPTS,
        })
    }
}

fn find_mut<'a>(
    records: &'a mut [TokenRecord],
    token: &str,
) -> Result<&'a mut TokenRecord, TokenError> {
    records
        .iter_mut()
        .find(|r| r.token == token)
        .ok_or_else(|| TokenError::TokenNotFound {
            token: token.to_string(),
        })
}

fn normalize_account(raw: &str) -> Result<String, TokenError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TokenError::InvalidAccount);
    }
    Ok(trimmed.to_string())
}

fn random_token_id() -> String {
    format!("sk-{}", uuid::Uuid::new_v4())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
