//! Subcommand implementations

pub mod browse;
pub mod components;
pub mod config;
pub mod props;
pub mod resolve;
pub mod run;
pub mod transfer;

use anyhow::{Context, Result};
use artif_core::config::vars;
use artif_core::{ArtifactStore, Environment, ServerConfig, Settings};
use artif_types::{server, ArtifactRef};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Connection flags, environment and settings for one invocation
pub struct Session {
    pub env: Environment,
    pub settings: Settings,
    /// Flag values with environment and settings fallback applied
    pub server: ServerConfig,
    flags: ServerConfig,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(
        flags: ServerConfig,
        env: Environment,
        settings: Settings,
        cancel: CancellationToken,
    ) -> Self {
        let server = flags.clone().with_env(&env).with_settings(&settings);
        Self {
            env,
            settings,
            server,
            flags,
            cancel,
        }
    }

    pub fn store(&self) -> Result<Arc<dyn ArtifactStore>> {
        self.server
            .connect()
            .context("Repository connection is not configured (see `artif config`)")
    }

    /// Environment handed to components
    ///
    /// Flags override the captured variables; settings only fill variables
    /// that are unset.
    pub fn component_env(&self) -> Environment {
        let mut env = self.env.clone();
        let layers = [
            (vars::TOKEN, &self.flags.token, &self.settings.token),
            (vars::SERVER, &self.flags.server, &self.settings.server),
        ];
        for (key, flag, saved) in layers {
            if !flag.trim().is_empty() {
                env = env.with(key, flag.as_str());
            } else if env.get(key).is_none() && !saved.trim().is_empty() {
                env = env.with(key, saved.as_str());
            }
        }
        if env.first(vars::OUTPUT_DIR).is_none() && !self.settings.output_dir.trim().is_empty() {
            env = env.with(vars::OUTPUT_DIR[0], self.settings.output_dir.as_str());
        }
        env
    }

    /// `dir`, else the output directory variables, else settings, else `.`
    pub fn output_dir(&self, dir: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = dir {
            return dir;
        }
        let configured = self
            .env
            .or_env("", vars::OUTPUT_DIR)
            .trim()
            .to_string();
        let configured = if configured.is_empty() {
            self.settings.output_dir.trim().to_string()
        } else {
            configured
        };
        if configured.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(configured)
        }
    }

    /// Artifact named by a storage URI or a download URI
    pub fn artifact(&self, uri: &str) -> Result<ArtifactRef> {
        let storage = server::to_storage_uri(&self.server.server, uri);
        ArtifactRef::from_uri(&storage).with_context(|| format!("Invalid artifact URI: {}", uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(flags: ServerConfig, env: Environment, settings: Settings) -> Session {
        Session::new(flags, env, settings, CancellationToken::new())
    }

    #[test]
    fn test_connection_precedence() {
        let env = Environment::empty().with(vars::TOKEN, "env-token");
        let settings = Settings {
            server: "https://saved/artifactory/api".to_string(),
            token: "saved-token".to_string(),
            ..Default::default()
        };
        let s = session(ServerConfig::default(), env, settings);
        assert_eq!(s.server.token, "env-token");
        assert_eq!(s.server.server, "https://saved/artifactory/api");

        let component_env = s.component_env();
        assert_eq!(component_env.get(vars::TOKEN), Some("env-token"));
        assert_eq!(
            component_env.get(vars::SERVER),
            Some("https://saved/artifactory/api")
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let env = Environment::empty().with(vars::SERVER, "https://env/artifactory/api");
        let flags = ServerConfig::new("https://flag/artifactory/api", "");
        let s = session(flags, env, Settings::default());
        assert_eq!(s.server.server, "https://flag/artifactory/api");
        assert_eq!(
            s.component_env().get(vars::SERVER),
            Some("https://flag/artifactory/api")
        );
    }

    #[test]
    fn test_output_dir_fallback() {
        let settings = Settings {
            output_dir: "/saved".to_string(),
            ..Default::default()
        };
        let s = session(
            ServerConfig::default(),
            Environment::empty().with("OUTPUTDIR", "/env"),
            settings.clone(),
        );
        assert_eq!(s.output_dir(None), PathBuf::from("/env"));
        assert_eq!(s.output_dir(Some("/flag".into())), PathBuf::from("/flag"));

        let s = session(ServerConfig::default(), Environment::empty(), settings);
        assert_eq!(s.output_dir(None), PathBuf::from("/saved"));
        assert_eq!(s.component_env().get("ARTIFACTORY_OUTPUTDIR"), Some("/saved"));
    }

    #[test]
    fn test_artifact_accepts_download_uri() {
        let s = session(
            ServerConfig::new("https://h/artifactory/api", "t"),
            Environment::empty(),
            Settings::default(),
        );
        let artifact = s.artifact("https://h/artifactory/images/win22/a.ova").unwrap();
        assert_eq!(artifact.repo, "images");
        assert_eq!(artifact.file_name, "a.ova");
    }
}
