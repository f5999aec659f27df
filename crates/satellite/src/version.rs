//! API level check.

use crate::api::ManagementApi;
use satprep_common::{Error, Result};
use tracing::{debug, error};

/// API levels satprep has been verified against.
pub const SUPPORTED_API_LEVELS: &[&str] = &["11.1", "12", "13", "13.0", "14", "14.0", "15", "15.0"];

/// Fail unless the server reports a supported API level.
pub async fn check_api_level(api: &dyn ManagementApi) -> Result<String> {
    let version = api
        .api_version()
        .await
        .map_err(|e| Error::Other(format!("unable to query API level: {}", e)))?;

    if SUPPORTED_API_LEVELS.contains(&version.as_str()) {
        debug!("Supported API level {} found", version);
        Ok(version)
    } else {
        error!(
            "API level {} is not supported (supported: {})",
            version,
            SUPPORTED_API_LEVELS.join(", ")
        );
        Err(Error::UnsupportedApi { version })
    }
}
