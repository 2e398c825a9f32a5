use backend::config::secret::resolve_signing_secret_from;
use backend::{SecretSource, SecurityConfig};

#[test]
fn pinned_secret_survives_restarts() {
    let first = resolve_signing_secret_from(Some("abc123".into())).unwrap();
    let second = resolve_signing_secret_from(Some("abc123".into())).unwrap();

    assert_eq!(first.as_bytes(), b"abc123");
    assert_eq!(first, second);
}

#[test]
fn generated_secret_changes_per_process() {
    let first = resolve_signing_secret_from(None).unwrap();
    let second = resolve_signing_secret_from(None).unwrap();

    assert_eq!(first.source(), SecretSource::Generated);
    assert_eq!(first.as_bytes().len(), 32);
    assert_ne!(first.as_bytes(), second.as_bytes());
}

#[test]
fn security_config_never_prints_the_secret() {
    let secret = resolve_signing_secret_from(Some("do-not-log-me".into())).unwrap();
    let security = SecurityConfig::new(secret, &Default::default());

    let printed = format!("{security:?}");
    assert!(!printed.contains("do-not-log-me"), "{printed}");
}
