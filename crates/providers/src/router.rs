//! Provider construction from configuration.

use std::sync::Arc;

use orderdesk_config::AppConfig;
use orderdesk_core::error::ProviderError;
use orderdesk_core::provider::Provider;

use crate::anthropic::AnthropicProvider;

/// Build the configured model provider.
///
/// A missing API key is not an error here; the provider reports
/// `NotConfigured` on first use, so the gateway can still start.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    match config.model.provider.as_str() {
        "anthropic" => {
            let api_key = config.api_key.clone().unwrap_or_default();
            let mut provider = AnthropicProvider::new(api_key).with_timeout(config.model.timeout());
            if let Some(ref url) = config.model.api_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::NotConfigured(format!(
            "unsupported model provider '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = AppConfig::default();
        config.model.provider = "carrier-pigeon".into();
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
