//! Reading the provider credential from the environment
//!
//! Environment mutation is process-wide, so the whole sequence lives in one test.

use photo_genius::config::{GatewayConfig, ProviderConfig, CREDENTIAL_ENV_VAR};

#[test]
fn test_credential_is_read_once_from_env() {
    std::env::set_var(CREDENTIAL_ENV_VAR, "env-key");
    let config = GatewayConfig::from_env();
    assert_eq!(config.credential.as_ref().map(|c| c.expose()), Some("env-key"));
    assert_eq!(config.provider, ProviderConfig::default());

    // Later changes do not reach an already built config.
    std::env::set_var(CREDENTIAL_ENV_VAR, "rotated-key");
    assert_eq!(config.credential.as_ref().map(|c| c.expose()), Some("env-key"));

    std::env::set_var(CREDENTIAL_ENV_VAR, "");
    assert!(GatewayConfig::from_env().credential.is_none());

    std::env::remove_var(CREDENTIAL_ENV_VAR);
    assert!(GatewayConfig::from_env().credential.is_none());
}
