//! Settings loading and validation commands.
//!
//! Settings are loaded from TOML files and merged with environment variables
//! prefixed with `TENPAY__`. For example, `TENPAY__MERCHANT__APP_ID` will
//! override `merchant.app_id` in the TOML file.

use std::path::Path;

use tenpay_sign_common::request_signing::RefreshPolicy;
use tenpay_sign_common::settings::Settings;

use crate::error::CliError;

/// Load, merge and validate settings from a TOML file.
pub(crate) fn load_settings(file: &Path, verbose: bool) -> Result<Settings, CliError> {
    if verbose {
        println!("Loading settings from: {}", file.display());
        println!("Environment variables with TENPAY__ prefix will be merged");
    }

    Ok(Settings::from_file(file)?)
}

/// Validate a settings file.
pub fn validate(file: &Path, verbose: bool) -> Result<(), CliError> {
    let settings = load_settings(file, verbose)?;
    let policy = RefreshPolicy::from(&settings.key_cache);

    println!("Configuration is valid");
    println!("  File: {}", file.display());
    println!("  App ID: {}", settings.merchant.app_id);
    println!("  Merchant account: {}", settings.merchant.account_key());

    if verbose {
        match policy.ttl {
            Some(ttl) => println!("  Platform key TTL: {}s", ttl.as_secs()),
            None => println!("  Platform key TTL: process lifetime"),
        }
        println!(
            "  Minimum refetch interval: {}s",
            policy.min_refetch_interval.as_secs()
        );
    }

    Ok(())
}
