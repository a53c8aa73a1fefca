use anyhow::{Context, Result};
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::config::{get_config_path, Config, LeaderboardConfig};
use crate::scoring::ScoringConfig;

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Config written by `init`: every section spelled out with its defaults
pub fn default_config() -> Config {
    Config {
        scoring: Some(ScoringConfig::default()),
        leaderboard: Some(LeaderboardConfig::default()),
        store: None,
    }
}

/// Write the default config to `path` (or the default config path).
///
/// An existing file is only replaced with `force`, or after confirmation
/// when stdin is a terminal. Returns the path written, or None if the user
/// declined.
pub fn write_default_config(path: Option<PathBuf>, force: bool) -> Result<Option<PathBuf>> {
    let config_path = path.unwrap_or_else(get_config_path);

    if config_path.exists() && !force {
        let overwrite = std::io::stdin().is_terminal()
            && prompt_yes_no(
                &format!(
                    "Config already exists at {}. Overwrite?",
                    config_path.display()
                ),
                false,
            )?;
        if !overwrite {
            return Ok(None);
        }
    }

    write_config(&config_path, &default_config())?;
    Ok(Some(config_path))
}

fn write_config(config_path: &Path, config: &Config) -> Result<()> {
    let yaml = serde_saphyr::to_string(config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}
