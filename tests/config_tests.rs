use serial_test::serial;
use std::{env, panic, time::Duration};
use storefront_api::{
    AppConfig,
    config::{ConfigError, Env},
    policy::OwnershipRule,
};

const VARS: [&str; 10] = [
    "APP_ENV",
    "DATABASE_URL",
    "REDIS_URL",
    "SERVER_PORT",
    "JWT_ISSUER",
    "JWT_ACCESS_TOKEN_KEY",
    "JWT_REFRESH_TOKEN_KEY",
    "RATE_LIMIT_MAX",
    "RATE_LIMIT_WINDOW_SECS",
    "OWNERSHIP_RULE",
];

// --- Setup/Teardown Utilities ---

/// Clears every config variable, applies `vars`, runs `test`, then restores
/// the original environment even if the test panicked.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> =
        VARS.iter().map(|&var| (var, env::var(var).ok())).collect();

    unsafe {
        for var in VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original) in originals {
        unsafe {
            match original {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn local_env_falls_back_to_defaults() {
    let config = run_with_env(&[("DATABASE_URL", "postgres://u:p@localhost/shop")], || {
        AppConfig::load()
    })
    .expect("local config loads");

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_url, "postgres://u:p@localhost/shop");
    assert_eq!(config.port, 8080);
    assert_eq!(config.rate_limit_max, 100);
    assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    assert_eq!(config.ownership_rule, OwnershipRule::SelfOrAdmin);
    assert_ne!(config.jwt_access_key, config.jwt_refresh_key);
}

#[test]
#[serial]
fn database_url_is_always_required() {
    let result = run_with_env(&[], AppConfig::load);
    assert_eq!(result.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
}

#[test]
#[serial]
fn production_requires_token_keys() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/shop"),
            ("REDIS_URL", "redis://cache:6379"),
        ],
        AppConfig::load,
    );
    assert_eq!(
        result.unwrap_err(),
        ConfigError::Missing("JWT_ACCESS_TOKEN_KEY")
    );
}

#[test]
#[serial]
fn production_with_everything_set() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/shop"),
            ("REDIS_URL", "redis://cache:6379"),
            ("JWT_ACCESS_TOKEN_KEY", "access-secret"),
            ("JWT_REFRESH_TOKEN_KEY", "refresh-secret"),
            ("SERVER_PORT", "9000"),
            ("RATE_LIMIT_MAX", "5"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
            ("OWNERSHIP_RULE", "self-and-admin"),
        ],
        AppConfig::load,
    )
    .expect("production config loads");

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.redis_url, "redis://cache:6379");
    assert_eq!(config.port, 9000);
    assert_eq!(config.rate_limit_max, 5);
    assert_eq!(config.rate_limit_window, Duration::from_secs(10));
    assert_eq!(config.ownership_rule, OwnershipRule::SelfAndAdmin);
}

#[test]
#[serial]
fn shared_token_key_is_refused() {
    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@localhost/shop"),
            ("JWT_ACCESS_TOKEN_KEY", "same"),
            ("JWT_REFRESH_TOKEN_KEY", "same"),
        ],
        AppConfig::load,
    );
    assert_eq!(result.unwrap_err(), ConfigError::SharedTokenKey);
}

#[test]
#[serial]
fn unparsable_values_name_the_variable() {
    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@localhost/shop"),
            ("SERVER_PORT", "eighty"),
        ],
        AppConfig::load,
    );
    assert_eq!(
        result.unwrap_err(),
        ConfigError::Invalid {
            name: "SERVER_PORT",
            value: "eighty".into()
        }
    );

    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@localhost/shop"),
            ("OWNERSHIP_RULE", "anyone"),
        ],
        AppConfig::load,
    );
    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            name: "OWNERSHIP_RULE",
            ..
        })
    ));
}

#[test]
#[serial]
fn rate_limit_values_must_be_positive() {
    let cases = [
        ("RATE_LIMIT_WINDOW_SECS", "0"),
        ("RATE_LIMIT_MAX", "0"),
        ("RATE_LIMIT_MAX", "-5"),
    ];
    for (name, value) in cases {
        let result = run_with_env(
            &[("DATABASE_URL", "postgres://u:p@localhost/shop"), (name, value)],
            AppConfig::load,
        );
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name,
                value: value.into()
            },
            "{name}={value}"
        );
    }
}
