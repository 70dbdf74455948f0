//! Doctor command - verify configuration and credentials.

use crate::cli::Output;
use crate::config::{HeygenSettings, Settings, HEYGEN_SETTINGS_FILE};
use crate::speech::TTS_API_KEY_ENV;
use crate::upload::StoredCredentials;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    /// An error when the feature is enabled, a warning otherwise.
    fn required_if(enabled: bool, name: &str, message: &str, hint: &str) -> Self {
        if enabled {
            Self::error(name, message, hint)
        } else {
            Self::warning(name, message, hint)
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Reelcast Doctor");
    println!();
    println!("Checking configuration and credentials...\n");

    let mut checks = Vec::new();

    let sections: [(&str, Vec<CheckResult>); 3] = [
        ("Configuration", vec![check_config_file(), check_heygen(settings)]),
        ("Credentials", vec![check_speech(settings), check_youtube(settings)]),
        ("Directories", check_directories(settings)),
    ];

    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Reelcast.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Reelcast is ready to use.");
    }

    Ok(())
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: reelcast config init",
        )
    }
}

/// Check the generation settings resolve.
fn check_heygen(settings: &Settings) -> CheckResult {
    match HeygenSettings::load(&settings.heygen) {
        Ok(heygen) => CheckResult::ok(
            "HeyGen",
            &format!(
                "avatar {}, voice {}, key {}",
                heygen.avatar_id,
                heygen.voice_id,
                mask_secret(&heygen.api_key)
            ),
        ),
        Err(e) => CheckResult::error(
            "HeyGen",
            &e.to_string(),
            &format!("Edit {} (reelcast config init creates one)", HEYGEN_SETTINGS_FILE),
        ),
    }
}

/// Check the text-to-speech key.
fn check_speech(settings: &Settings) -> CheckResult {
    let key = settings
        .speech
        .api_key
        .clone()
        .or_else(|| std::env::var(TTS_API_KEY_ENV).ok())
        .filter(|k| !k.trim().is_empty());

    match key {
        Some(key) => CheckResult::ok("Text-to-speech", &format!("key {}", mask_secret(&key))),
        None => CheckResult::required_if(
            settings.speech.enabled,
            "Text-to-speech",
            "no API key",
            &format!("Set speech.api_key or export {}='...'", TTS_API_KEY_ENV),
        ),
    }
}

/// Check the stored YouTube credentials.
fn check_youtube(settings: &Settings) -> CheckResult {
    let path = settings.youtube_credentials_path();
    let hint = format!("Store OAuth2 credentials (access_token or refresh_token) at {}", path.display());

    match StoredCredentials::load(&path) {
        Ok(credentials) if credentials.refresh_token.is_some() => {
            CheckResult::ok("YouTube", "refresh token stored")
        }
        Ok(credentials) if credentials.access_token.is_some() => CheckResult::warning(
            "YouTube",
            "access token only (no refresh)",
            "Stored access tokens expire; add refresh_token, client_id and client_secret",
        ),
        Ok(_) => CheckResult::required_if(settings.youtube.enabled, "YouTube", "credentials file has no token", &hint),
        Err(e) => CheckResult::required_if(settings.youtube.enabled, "YouTube", &e.to_string(), &hint),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    [("Data directory", settings.data_dir()), ("Output directory", settings.output_dir())]
        .into_iter()
        .map(|(name, dir)| {
            if dir.exists() {
                CheckResult::ok(name, &format!("{}", dir.display()))
            } else {
                CheckResult::warning(
                    name,
                    &format!("{} (will be created)", dir.display()),
                    "Directory will be created on first use",
                )
            }
        })
        .collect()
}

/// Show only the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
