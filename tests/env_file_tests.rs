use sec_amendments::core::config::{EMAIL_VAR, PASSWORD_VAR};
use sec_amendments::{ConfigError, Credentials};
use std::fs;
use tempfile::tempdir;

// Single test: it mutates the process environment.
#[test]
fn test_credentials_from_env_file() {
    let dir = tempdir().unwrap();

    let placeholder = dir.path().join("placeholder.env");
    fs::write(
        &placeholder,
        format!("{}=your-email@domain.com\n", EMAIL_VAR),
    )
    .unwrap();
    dotenv::from_path(&placeholder).unwrap();
    assert!(matches!(
        Credentials::from_env(),
        Err(ConfigError::PlaceholderVariable(_))
    ));
    std::env::remove_var(EMAIL_VAR);

    let real = dir.path().join(".env");
    fs::write(
        &real,
        format!(
            "# StockTitan account\n{}=analyst@fund.com\n{}=\"hunter2\"\n",
            EMAIL_VAR, PASSWORD_VAR
        ),
    )
    .unwrap();
    dotenv::from_path(&real).unwrap();

    let credentials = Credentials::from_env().unwrap();
    assert_eq!(credentials.identifier(), "analyst@fund.com");
    assert_eq!(credentials.secret(), "hunter2");
}
