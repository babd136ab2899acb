//! Verification of engine settings before they are saved.

use panda_client::{Credentials, ProviderClient};
use panda_core::models::Cloud;
use panda_core::{PandaSettings, TranscodeError, TranscodeResult};

/// Validate `settings`, switch `client` to its credentials and check them
/// against the provider. Any provider failure is reported as invalid
/// settings.
pub async fn verify_settings(
    settings: &PandaSettings,
    client: &ProviderClient,
) -> TranscodeResult<Cloud> {
    settings.validate_settings()?;
    client.update_credentials(Credentials::from_settings(settings));

    match client.get_cloud().await {
        Ok(cloud) => {
            tracing::info!(cloud_id = %cloud.id, "Panda settings verified");
            Ok(cloud)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Panda settings rejected by the provider");
            Err(TranscodeError::InvalidSettings(e.to_string()))
        }
    }
}
