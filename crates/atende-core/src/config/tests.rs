use super::*;
use std::collections::HashMap;

#[test]
fn test_defaults_when_sections_missing() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.session.key, "default_session");
    assert_eq!(cfg.session.table, "whatsapp_sessions");
    assert_eq!(cfg.session.backend, SessionBackendKind::Supabase);
    assert!(cfg.session.clear_on_disconnect);
    assert!(!cfg.session.seed_placeholder);
    assert_eq!(cfg.bot.reply_delay_ms, 3000);
    assert_eq!(cfg.api.port, 3000);
    assert_eq!(cfg.email.base_url, "https://api.brevo.com");
    assert_eq!(cfg.email.subject, "QR Code para Conectar o Bot");
}

#[test]
fn test_parse_full_config() {
    let toml_str = r#"
        [bot]
        reply_delay_ms = 0

        [session]
        backend = "sqlite"
        key = "loja-centro"
        sqlite_path = "/tmp/atende.db"
        clear_on_disconnect = false

        [email]
        api_key = "xkeysib-123"
        from = "bot@example.com"
        to = "admin@example.com"

        [bridge]
        command = "bun"
        script = "bridge.ts"
        args = ["--headless"]

        [api]
        port = 8080
        api_key = "secret"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.bot.reply_delay_ms, 0);
    assert_eq!(cfg.session.backend, SessionBackendKind::Sqlite);
    assert_eq!(cfg.session.key, "loja-centro");
    assert!(!cfg.session.clear_on_disconnect);
    assert!(cfg.email.is_configured());
    assert_eq!(cfg.email.to_name, "Usuário");
    assert_eq!(cfg.bridge.command, "bun");
    assert_eq!(cfg.bridge.args, vec!["--headless"]);
    assert_eq!(cfg.api.port, 8080);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_unknown_backend_rejected() {
    let result: Result<Config, _> = toml::from_str("[session]\nbackend = \"redis\"");
    assert!(result.is_err());
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("SUPABASE_URL", "https://proj.supabase.co"),
        ("SUPABASE_KEY", "anon-key"),
        ("BREVO_API_KEY", "xkeysib-env"),
        ("EMAIL_FROM", "bot@example.com"),
        ("EMAIL_TO", "dono@example.com"),
        ("PORT", "4000"),
    ]
    .into_iter()
    .collect();

    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

    assert_eq!(cfg.session.supabase_url, "https://proj.supabase.co");
    assert_eq!(cfg.session.supabase_key, "anon-key");
    assert_eq!(cfg.email.api_key, "xkeysib-env");
    assert_eq!(cfg.email.to, "dono@example.com");
    assert_eq!(cfg.api.port, 4000);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_env_overrides_ignore_empty_and_invalid() {
    let mut cfg = Config::default();
    cfg.api.port = 3100;
    cfg.email.from = "keep@example.com".into();
    apply_env_overrides(&mut cfg, |k| match k {
        "PORT" => Some("not-a-port".into()),
        "EMAIL_FROM" => Some("  ".into()),
        _ => None,
    });
    assert_eq!(cfg.api.port, 3100);
    assert_eq!(cfg.email.from, "keep@example.com");
}

#[test]
fn test_validate_requires_supabase_credentials() {
    let cfg = Config::default();
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("SUPABASE_URL"), "got: {err}");
}

#[test]
fn test_validate_sqlite_needs_no_remote() {
    let mut cfg = Config::default();
    cfg.session.backend = SessionBackendKind::Sqlite;
    assert!(cfg.validate().is_ok());

    cfg.session.key = " ".into();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_email_not_configured_without_recipient() {
    let mut email = EmailConfig {
        api_key: "k".into(),
        from: "bot@example.com".into(),
        ..Default::default()
    };
    assert!(!email.is_configured());
    email.to = "admin@example.com".into();
    assert!(email.is_configured());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load_file("/nonexistent/__atende_config__.toml").unwrap();
    assert_eq!(cfg.session.key, "default_session");
}

#[test]
fn test_load_file_parse_error() {
    let tmp = std::env::temp_dir().join("__atende_test_bad_config__.toml");
    std::fs::write(&tmp, "[session\nkey = ").unwrap();
    let err = load_file(tmp.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, AtendeError::Config(_)));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_shellexpand_passthrough() {
    assert_eq!(shellexpand("/var/lib/atende"), "/var/lib/atende");
    assert_eq!(shellexpand("relative/path"), "relative/path");
}
