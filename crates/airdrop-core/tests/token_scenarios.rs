use std::sync::{Arc, Once};

use airdrop_core::store::{FileStore, MemoryStore, RecordStore};
use airdrop_core::tokens::{
    ErrorKind, NewToken, TokenError, TokenFilter, TokenPatch, TokenService, VerifyOutcome,
};

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("airdrop_core=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

#[tokio::test]
async fn capacity_two_token_full_lifecycle() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileStore::new(dir.path().join("db").join("auth.json")));
    let service = TokenService::new(store.clone());

    let token = service
        .issue_token(NewToken {
            name: Some("limited".into()),
            acounts_max: Some(2),
            ..NewToken::default()
        })
        .await
        .expect("issue")
        .record
        .token;

    let added = service.add_account(&token, "alice").await.expect("add alice");
    assert_eq!(added.acounts, vec!["alice"]);

    let added = service.add_account(&token, "bob").await.expect("add bob");
    assert_eq!(added.acounts, vec!["alice", "bob"]);

    let err = service
        .add_account(&token, "carol")
        .await
        .expect_err("carol exceeds capacity");
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    assert!(err.to_string().contains("(2)"), "{err}");

    let removed = service
        .remove_account(&token, "alice")
        .await
        .expect("remove alice");
    assert_eq!(removed.remaining_acounts, vec!["bob"]);

    let verified = service.verify_account(&token, "bob").await.expect("verify");
    assert!(verified.exists());

    let deleted = service.delete_token(&token).await.expect("delete");
    assert_eq!(deleted.deleted_accounts, vec!["bob"]);

    let listed = service
        .list_tokens(&TokenFilter::default())
        .await
        .expect("list");
    assert!(listed.iter().all(|r| r.token != token));

    // The snapshot on disk reflects the final state.
    assert!(store.load_all().await.expect("reload").is_empty());
}

#[tokio::test]
async fn ended_filter_never_includes_open_ended_records() {
    init_tracing();

    let store = Arc::new(MemoryStore::new());
    let service = TokenService::new(store).with_clock(|| 1_000);

    for (name, end_time) in [("past", Some(500)), ("open", None), ("later", Some(5_000))] {
        service
            .issue_token(NewToken {
                name: Some(name.into()),
                end_time,
                ..NewToken::default()
            })
            .await
            .expect("issue");
    }

    let ended = service
        .list_tokens(&TokenFilter {
            name: None,
            ended: Some(true),
        })
        .await
        .expect("list");
    let names: Vec<_> = ended.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["past"]);
}

#[tokio::test]
async fn repeated_add_is_a_conflict_not_a_silent_success() {
    init_tracing();

    let service = TokenService::new(Arc::new(MemoryStore::new()));
    let token = service
        .issue_token(NewToken::default())
        .await
        .expect("issue")
        .record
        .token;

    service.add_account(&token, "dup").await.expect("first add");
    let err = service
        .add_account(&token, " dup ")
        .await
        .expect_err("second add");
    assert!(matches!(err, TokenError::DuplicateAccount { .. }));

    let outcome = service.verify_account(&token, "dup").await.expect("verify");
    let VerifyOutcome::Checked(verification) = outcome else {
        panic!("token should exist");
    };
    assert_eq!(verification.total_accounts, 1);
}

#[tokio::test]
async fn snapshot_survives_service_restart() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("auth.json");

    let token = {
        let service = TokenService::new(Arc::new(FileStore::new(&path)));
        let token = service
            .issue_token(NewToken::default())
            .await
            .expect("issue")
            .record
            .token;
        service
            .update_token(
                &token,
                TokenPatch {
                    end_time: Some(10),
                    ..TokenPatch::default()
                },
            )
            .await
            .expect("set end");
        service
            .update_token(
                &token,
                TokenPatch {
                    end_time: Some(20),
                    ..TokenPatch::default()
                },
            )
            .await
            .expect("change end");
        token
    };

    let service = TokenService::new(Arc::new(FileStore::new(&path)));
    let listed = service
        .list_tokens(&TokenFilter::default())
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].token, token);
    assert_eq!(listed[0].end_time, Some(20));
    assert_eq!(listed[0].end_time_history, vec![10]);
}

#[tokio::test]
async fn legacy_snapshot_with_odd_fields_survives_issuance() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("auth.json");
    std::fs::write(
        &path,
        r#"[
          {"token":"sk-good","created_at":1,"updated_at":1,"name":"a","desc":"","acounts":["u1","u2"]},
          {"token":"sk-legacy","created_at":2,"updated_at":2,"name":null,"acounts":null}
        ]"#,
    )
    .expect("write fixture");

    let store = Arc::new(FileStore::new(&path));
    let service = TokenService::new(store.clone());
    service
        .issue_token(NewToken::default())
        .await
        .expect("issue");

    let records = store.load_all().await.expect("reload");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].token, "sk-good");
    assert_eq!(records[0].acounts, vec!["u1", "u2"]);
    assert_eq!(records[1].token, "sk-legacy");

    let added = service
        .add_account("sk-legacy", "carol")
        .await
        .expect("legacy record accepts accounts");
    assert_eq!(added.acounts, vec!["carol"]);
}
