//! Integration tests for the emailed-code password reset.

use chrono::Duration;

use duenotes_core::Email;
use duenotes_integration_tests::{RecordingMailer, SentMail, fixed_now, signup};
use duenotes_server::db::{MemoryStore, UserStore};
use duenotes_server::models::MAX_RESET_ATTEMPTS;
use duenotes_server::services::auth::{AuthError, AuthService, PasswordResetService};

const NEW_PASSWORD: &str = "brand new secret";

fn email(s: &str) -> Email {
    Email::parse(s).expect("valid email")
}

fn other_than(code: &str) -> &'static str {
    if code == "000000" { "000001" } else { "000000" }
}

#[tokio::test]
async fn test_full_reset_flow_changes_password() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    let who = reset
        .request_code("Ann@Example.com", fixed_now())
        .await
        .expect("code sent");
    assert_eq!(who.as_str(), "ann@example.com");

    let code = mailer.last_code_for("ann@example.com").expect("code emailed");
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    reset
        .verify_code(&who, &code, fixed_now() + Duration::minutes(5))
        .await
        .expect("code accepted");
    reset
        .reset_password(&who, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect("password reset");

    let auth = AuthService::new(&store);
    assert!(matches!(
        auth.login("ann@example.com", "correct horse battery").await,
        Err(AuthError::WrongPassword)
    ));
    auth.login("ann@example.com", NEW_PASSWORD)
        .await
        .expect("new password works");

    assert!(
        mailer
            .sent()
            .contains(&SentMail::PasswordChanged {
                to: "ann@example.com".to_owned()
            })
    );
}

#[tokio::test]
async fn test_code_expires_after_ten_minutes() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    let who = reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("code sent");
    let code = mailer.last_code_for("ann@example.com").expect("code emailed");

    let just_before = fixed_now() + Duration::minutes(10) - Duration::seconds(1);
    reset
        .verify_code(&who, &code, just_before)
        .await
        .expect("accepted before expiry");

    let at_expiry = fixed_now() + Duration::minutes(10);
    assert!(matches!(
        reset.verify_code(&who, &code, at_expiry).await,
        Err(AuthError::InvalidResetCode)
    ));
}

#[tokio::test]
async fn test_wrong_code_is_rejected() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    let who = reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("code sent");
    let code = mailer.last_code_for("ann@example.com").expect("code emailed");
    let wrong = other_than(&code);

    assert!(matches!(
        reset.verify_code(&who, wrong, fixed_now()).await,
        Err(AuthError::InvalidResetCode)
    ));
}

#[tokio::test]
async fn test_code_cannot_be_reused_after_reset() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let ann = signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    let who = reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("code sent");
    let code = mailer.last_code_for("ann@example.com").expect("code emailed");
    reset
        .verify_code(&who, &code, fixed_now())
        .await
        .expect("accepted");
    reset
        .reset_password(&who, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect("reset");

    let user = store.get_by_id(ann).await.expect("load").expect("exists");
    assert_eq!(user.reset, None);

    assert!(matches!(
        reset.verify_code(&who, &code, fixed_now()).await,
        Err(AuthError::InvalidResetCode)
    ));
    assert!(matches!(
        reset.reset_password(&who, "another password", "another password").await,
        Err(AuthError::InvalidSessionState)
    ));
}

#[tokio::test]
async fn test_newer_code_replaces_older_one() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    let who = reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("first code");
    let first = mailer.last_code_for("ann@example.com").expect("emailed");

    let later = fixed_now() + Duration::minutes(8);
    reset
        .request_code("ann@example.com", later)
        .await
        .expect("second code");
    let second = mailer.last_code_for("ann@example.com").expect("emailed");

    // The second code's clock starts at the second request.
    reset
        .verify_code(&who, &second, later + Duration::minutes(9))
        .await
        .expect("newest code accepted");
    if first != second {
        assert!(matches!(
            reset.verify_code(&who, &first, later).await,
            Err(AuthError::InvalidResetCode)
        ));
    }
}

#[tokio::test]
async fn test_unknown_email_sends_nothing() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    assert!(matches!(
        reset.request_code("nobody@example.com", fixed_now()).await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        reset.request_code("not an email", fixed_now()).await,
        Err(AuthError::UserNotFound)
    ));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_send_failure_is_reported() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::failing();
    signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    assert!(matches!(
        reset.request_code("ann@example.com", fixed_now()).await,
        Err(AuthError::EmailDelivery(_))
    ));
}

#[tokio::test]
async fn test_mismatched_or_weak_password_keeps_old_one() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let ann = signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);
    let before = store.password_hash(ann).expect("lock");

    reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("code sent");
    let who = email("ann@example.com");

    assert!(matches!(
        reset.reset_password(&who, NEW_PASSWORD, "something else").await,
        Err(AuthError::PasswordMismatch)
    ));
    assert!(matches!(
        reset.reset_password(&who, "short", "short").await,
        Err(AuthError::WeakPassword(_))
    ));

    assert_eq!(store.password_hash(ann).expect("lock"), before);
    let user = store.get_by_id(ann).await.expect("load").expect("exists");
    assert!(user.reset.is_some());
}

#[tokio::test]
async fn test_repeated_wrong_codes_revoke_the_code() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let ann = signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);

    let who = reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("code sent");
    let code = mailer.last_code_for("ann@example.com").expect("code emailed");
    let wrong = other_than(&code);

    for _ in 1..MAX_RESET_ATTEMPTS {
        assert!(matches!(
            reset.verify_code(&who, wrong, fixed_now()).await,
            Err(AuthError::InvalidResetCode)
        ));
    }
    assert!(matches!(
        reset.verify_code(&who, wrong, fixed_now()).await,
        Err(AuthError::TooManyResetAttempts)
    ));

    // The right code no longer works once revoked.
    let user = store.get_by_id(ann).await.expect("load").expect("exists");
    assert_eq!(user.reset, None);
    assert!(matches!(
        reset.verify_code(&who, &code, fixed_now()).await,
        Err(AuthError::InvalidResetCode)
    ));

    // A new request starts over with a fresh allowance.
    reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("new code sent");
    let fresh = mailer.last_code_for("ann@example.com").expect("code emailed");
    assert!(matches!(
        reset.verify_code(&who, other_than(&fresh), fixed_now()).await,
        Err(AuthError::InvalidResetCode)
    ));
    reset
        .verify_code(&who, &fresh, fixed_now())
        .await
        .expect("fresh code accepted");
}

#[tokio::test]
async fn test_confirmation_email_failure_does_not_block_reset() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::failing_confirmations();
    let ann = signup(&store, "ann@example.com").await;
    let reset = PasswordResetService::new(&store, &mailer);
    let before = store.password_hash(ann).expect("lock");

    let who = reset
        .request_code("ann@example.com", fixed_now())
        .await
        .expect("code sent");
    let code = mailer.last_code_for("ann@example.com").expect("code emailed");
    reset
        .verify_code(&who, &code, fixed_now())
        .await
        .expect("accepted");

    reset
        .reset_password(&who, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect("reset succeeds without the confirmation email");

    assert_ne!(store.password_hash(ann).expect("lock"), before);
    AuthService::new(&store)
        .login("ann@example.com", NEW_PASSWORD)
        .await
        .expect("new password works");
    assert!(
        !mailer
            .sent()
            .iter()
            .any(|mail| matches!(mail, SentMail::PasswordChanged { .. }))
    );
}
