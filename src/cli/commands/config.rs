//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::{Settings, HEYGEN_SETTINGS_FILE};
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            let config_path = Settings::default_config_path();
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                ));
            } else {
                Settings::default().save_to(&config_path)?;
                Output::success(&format!("Wrote default config to {}", config_path.display()));
            }

            let profile_path = Settings::config_dir().join(HEYGEN_SETTINGS_FILE);
            if profile_path.exists() && !force {
                Output::warning(&format!("{} already exists", profile_path.display()));
            } else {
                write_heygen_template(&profile_path)?;
                Output::success(&format!("Wrote HeyGen settings template to {}", profile_path.display()));
                Output::info("Fill in avatar_id and voice_id, and api_key (or export HEYGEN_API_KEY).");
            }
        }
    }

    Ok(())
}

/// Write a HeyGen settings file with every field present and the selectors blank.
fn write_heygen_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let template = serde_json::json!({
        "avatar_id": "",
        "avatar_style": "normal",
        "voice_id": "",
        "background_color": "#ffffff",
        "width": 1280,
        "height": 720,
        "api_key": ""
    });
    std::fs::write(path, serde_json::to_string_pretty(&template)?)?;
    Ok(())
}
