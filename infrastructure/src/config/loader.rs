//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Configuration loader that handles file discovery and merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Project root: `./gateway.toml` or `./.gateway.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/inference-gateway/config.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        for filename in &["gateway.toml", ".gateway.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Default configuration only (for `--no-config`).
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// The global config file path, following XDG conventions.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("inference-gateway").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_any_file() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.providers.request_timeout_secs, 30);
        assert_eq!(config.cache.similarity_threshold, 0.95);
        assert_eq!(config.sandbox.strategy, "auto");
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gateway.toml",
                r#"
                [cache]
                similarity_threshold = 0.9

                [providers.groq]
                model = "llama-3.1-8b-instant"
                "#,
            )?;

            let config = ConfigLoader::load(None).expect("load");
            assert_eq!(config.cache.similarity_threshold, 0.9);
            assert_eq!(config.providers.groq.model, "llama-3.1-8b-instant");
            // Untouched sections keep their defaults
            assert_eq!(config.sandbox.timeout_secs, 30);
            assert!(config.providers.groq.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_path_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("gateway.toml", "[cache]\ncapacity = 10\n")?;
            jail.create_file("override.toml", "[cache]\ncapacity = 99\n")?;

            let config = ConfigLoader::load(Some(&PathBuf::from("override.toml"))).expect("load");
            assert_eq!(config.cache.capacity, 99);
            Ok(())
        });
    }
}
