use std::io::Read;
use std::path::{Path, PathBuf};

/// What happens to the best score when a game restarts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Carry the session's best score into the new game.
    #[default]
    KeepBest,
    /// Start the new game with a best score of zero.
    ResetBest,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Seed for tile placement. When absent the RNG is seeded from entropy.
    pub seed: Option<u64>,

    /// Probability that a dealt tile is a 4 rather than a 2.
    pub spawn_high_probability: f64,

    pub restart_policy: RestartPolicy,

    /// Start a new game automatically once no move is left.
    pub restart_on_game_over: bool,

    /// Where the CLI keeps its save file.
    pub save_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            spawn_high_probability: 0.2,
            restart_policy: RestartPolicy::default(),
            restart_on_game_over: true,
            save_path: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Defaults with a fixed RNG seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed), ..Self::default() }
    }

    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = std::fs::File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let p = self.spawn_high_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::Invalid(format!(
                "spawn_high_probability must be within [0, 1], got {p}"
            )));
        }
        Ok(())
    }
}
