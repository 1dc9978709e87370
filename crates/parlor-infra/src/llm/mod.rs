//! Completion provider implementations.
//!
//! Contains the concrete [`LlmProvider`](parlor_core::llm::provider::LlmProvider)
//! used in production and a factory ([`build_provider`]) that constructs it
//! from [`ProviderSettings`].

pub mod openai_compat;

use secrecy::SecretString;

use parlor_core::llm::box_provider::BoxLlmProvider;
use parlor_types::config::ProviderSettings;
use parlor_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] from settings and an optional API key.
///
/// A missing key is allowed (local OpenAI-compatible servers often need
/// none); the first request will then fail with `AuthenticationFailed` if
/// the server does require one.
pub fn build_provider(
    settings: &ProviderSettings,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    if api_key.is_none() {
        tracing::warn!(
            env = %settings.api_key_env,
            "no API key found, sending unauthenticated requests"
        );
    }
    let provider = OpenAiCompatibleProvider::new(settings, api_key)?;
    tracing::debug!(
        provider = %settings.name,
        base_url = %settings.base_url,
        model = %settings.model,
        "completion provider ready"
    );
    Ok(BoxLlmProvider::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_provider_without_key() {
        let provider = build_provider(&ProviderSettings::default(), None).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(provider.capabilities().streaming);
    }
}
