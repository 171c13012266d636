//! Provider registry: identifier → connection parameters.

use std::collections::BTreeMap;

use healthrag_core::{Error, ProviderOverride, RagSettings, Result};
use tracing::debug;

use crate::types::ProviderFamily;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_GROQ_SMALL_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Built-in table: (identifier, model, temperature, max output tokens).
const BUILTIN: &[(&str, &str, f32, u32)] = &[
    ("openai", DEFAULT_OPENAI_MODEL, 0.5, 4096),
    ("groq", DEFAULT_GROQ_MODEL, 0.6, 1000),
    ("groq-small", DEFAULT_GROQ_SMALL_MODEL, 0.2, 256),
    ("gemini", DEFAULT_GEMINI_MODEL, 0.5, 8192),
];

/// Connection parameters for one provider. Immutable once loaded.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub identifier: String,
    pub family: ProviderFamily,
    pub credential: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub base_url: String,
}

impl ProviderConfig {
    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("identifier", &self.identifier)
            .field("family", &self.family)
            .field("credential", &if self.has_credential() { "<set>" } else { "<unset>" })
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Static lookup table of every supported provider.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    entries: BTreeMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Build the table from the built-in defaults, settings overrides and credentials.
    pub fn from_settings(settings: &RagSettings) -> Result<Self> {
        let mut overrides_by_id: BTreeMap<String, &ProviderOverride> = BTreeMap::new();
        for (key, overrides) in &settings.providers {
            let identifier = key.trim().to_lowercase();
            if overrides_by_id.insert(identifier.clone(), overrides).is_some() {
                return Err(Error::Config(format!(
                    "provider '{}' is overridden more than once",
                    identifier
                )));
            }
        }

        let mut entries = BTreeMap::new();
        for (identifier, model, temperature, max_tokens) in BUILTIN {
            let family = ProviderFamily::from_identifier(identifier)
                .ok_or_else(|| Error::UnknownProvider(identifier.to_string()))?;
            let overrides = overrides_by_id
                .remove(*identifier)
                .cloned()
                .unwrap_or_default();

            let config = ProviderConfig {
                identifier: identifier.to_string(),
                family,
                credential: settings
                    .api_key_for(family.credential_key())
                    .unwrap_or_default()
                    .to_string(),
                model_name: overrides.model.unwrap_or_else(|| model.to_string()),
                temperature: overrides.temperature.unwrap_or(*temperature),
                max_output_tokens: overrides.max_output_tokens.unwrap_or(*max_tokens),
                base_url: overrides
                    .base_url
                    .unwrap_or_else(|| family.default_base_url().to_string()),
            };
            validate(&config)?;
            entries.insert(identifier.to_string(), config);
        }

        if let Some(identifier) = overrides_by_id.keys().next() {
            return Err(Error::UnknownProvider(identifier.clone()));
        }

        debug!("Provider registry loaded: {:?}", entries.keys().collect::<Vec<_>>());
        Ok(Self { entries })
    }

    /// Look up a provider by identifier (case-insensitive).
    pub fn resolve(&self, identifier: &str) -> Result<&ProviderConfig> {
        self.entries
            .get(&identifier.trim().to_lowercase())
            .ok_or_else(|| Error::UnknownProvider(identifier.to_string()))
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

fn validate(config: &ProviderConfig) -> Result<()> {
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(Error::Config(format!(
            "temperature {} for '{}' is outside [0, 2]",
            config.temperature, config.identifier
        )));
    }
    if config.max_output_tokens == 0 {
        return Err(Error::Config(format!(
            "max_output_tokens for '{}' must be positive",
            config.identifier
        )));
    }
    if config.model_name.trim().is_empty() {
        return Err(Error::Config(format!("model for '{}' is empty", config.identifier)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RagSettings {
        RagSettings {
            openai_api_key: Some("sk-test".into()),
            groq_api_key: Some("gsk-test".into()),
            google_api_key: None,
            ..RagSettings::default()
        }
    }

    #[test]
    fn test_resolve_known_providers() {
        let registry = ProviderRegistry::from_settings(&settings()).unwrap();
        let expected = [
            ("openai", "gpt-4o-mini"),
            ("groq", "llama-3.3-70b-versatile"),
            ("groq-small", "llama-3.1-8b-instant"),
            ("gemini", "gemini-2.5-flash"),
        ];
        for (id, model) in expected {
            assert_eq!(registry.resolve(id).unwrap().model_name, model);
        }
        assert_eq!(registry.resolve("OpenAI").unwrap().identifier, "openai");
        assert_eq!(registry.identifiers().count(), 4);
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let registry = ProviderRegistry::from_settings(&settings()).unwrap();
        for id in ["anthropic", "", "groq-large"] {
            assert!(matches!(registry.resolve(id), Err(Error::UnknownProvider(_))));
        }
    }

    #[test]
    fn test_builtin_parameters() {
        let registry = ProviderRegistry::from_settings(&settings()).unwrap();
        let groq = registry.resolve("groq").unwrap();
        assert_eq!(groq.family, ProviderFamily::Groq);
        assert_eq!(groq.temperature, 0.6);
        assert_eq!(groq.max_output_tokens, 1000);
        assert_eq!(groq.credential, "gsk-test");
        assert_eq!(registry.resolve("groq-small").unwrap().credential, "gsk-test");

        let gemini = registry.resolve("gemini").unwrap();
        assert_eq!(gemini.max_output_tokens, 8192);
        assert!(!gemini.has_credential());
    }

    #[test]
    fn test_overrides_applied() {
        let mut s = settings();
        s.providers.insert(
            "openai".into(),
            ProviderOverride {
                model: Some("gpt-4o".into()),
                temperature: Some(1.1),
                max_output_tokens: None,
                base_url: Some("http://proxy.local/v1".into()),
            },
        );
        let registry = ProviderRegistry::from_settings(&s).unwrap();
        let openai = registry.resolve("openai").unwrap();
        assert_eq!(openai.model_name, "gpt-4o");
        assert_eq!(openai.temperature, 1.1);
        assert_eq!(openai.max_output_tokens, 4096);
        assert_eq!(openai.base_url, "http://proxy.local/v1");
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let mut s = settings();
        s.providers.insert(
            "groq".into(),
            ProviderOverride {
                temperature: Some(2.5),
                ..ProviderOverride::default()
            },
        );
        assert!(matches!(ProviderRegistry::from_settings(&s), Err(Error::Config(_))));

        let mut s = settings();
        s.providers.insert(
            "gemini".into(),
            ProviderOverride {
                max_output_tokens: Some(0),
                ..ProviderOverride::default()
            },
        );
        assert!(matches!(ProviderRegistry::from_settings(&s), Err(Error::Config(_))));

        let mut s = settings();
        s.providers.insert("mistral".into(), ProviderOverride::default());
        assert!(matches!(
            ProviderRegistry::from_settings(&s),
            Err(Error::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_override_keys_case_insensitive() {
        let mut s = settings();
        s.providers.insert(
            "Groq".into(),
            ProviderOverride {
                model: Some("custom-model".into()),
                ..ProviderOverride::default()
            },
        );
        let registry = ProviderRegistry::from_settings(&s).unwrap();
        assert_eq!(registry.resolve("groq").unwrap().model_name, "custom-model");

        let mut s = settings();
        s.providers.insert(
            "Groq".into(),
            ProviderOverride {
                model: Some("custom-model".into()),
                temperature: Some(5.0),
                ..ProviderOverride::default()
            },
        );
        assert!(matches!(ProviderRegistry::from_settings(&s), Err(Error::Config(_))));

        let mut s = settings();
        s.providers.insert("groq".into(), ProviderOverride::default());
        s.providers.insert("GROQ".into(), ProviderOverride::default());
        assert!(matches!(ProviderRegistry::from_settings(&s), Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_masks_credential() {
        let registry = ProviderRegistry::from_settings(&settings()).unwrap();
        let rendered = format!("{:?}", registry.resolve("openai").unwrap());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("<set>"));
    }
}
