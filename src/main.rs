use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use telepulse::config::Config;
use telepulse::preferences::Preferences;

mod cli;

use cli::{Args, CliContext, Command};

/// Get the config directory path (~/.config/telepulse/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("telepulse"))
}

fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // User-only access: the directory may hold host init data
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config
        .apply_env()
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;

    let prefs_path = config_dir.join("preferences.toml");
    let prefs = match Preferences::load(&prefs_path) {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(path = %prefs_path.display(), error = %e, "Ignoring unreadable preferences");
            Preferences::default()
        }
    };

    let ctx = CliContext {
        config,
        prefs,
        prefs_path,
    };
    cli::run(args.command.unwrap_or(Command::Shell), ctx).await
}
