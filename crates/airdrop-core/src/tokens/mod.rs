//! Token records and the rules that govern them.
//!
//! [`TokenService`] is the only writer: it issues tokens, manages each
//! token's bounded account list, and edits metadata, persisting the whole
//! collection through a [`RecordStore`](crate::store::RecordStore) after
//! every mutation.

mod input;
mod service;
mod types;

pub use input::{account_field, parse_ended_flag};
pub use service::TokenService;
pub use types::{
    AccountAdded, AccountRemoved, ErrorKind, IssuedToken, NewToken, TokenDeleted, TokenError,
    TokenFilter, TokenPatch, TokenRecord, Verification, VerifyOutcome, DEFAULT_MAX_ACCOUNTS,
};
