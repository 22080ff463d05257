//! Operator CLI for the panel.
//!
//! Works on the settings file directly, so it is usable when the entrance is
//! forgotten and the UI refuses every path. Changes reach a running server at
//! its next reload (timer, SIGHUP or file watcher).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use panel_gate::config::load_config_or_default;
use panel_gate::security::entrance::normalize_entrance;
use panel_gate::settings::{
    keys, service::generate_entrance, JsonFileSettingsStore, SettingsService, StoreError,
};

#[derive(Parser)]
#[command(name = "panelctl")]
#[command(about = "Management CLI for the server panel", long_about = None)]
struct Cli {
    /// Bootstrap configuration file used to locate the settings store.
    #[arg(short, long, env = "PANEL_CONFIG", default_value = "panel.toml")]
    config: PathBuf,

    /// Settings file; overrides `store.path` from the configuration.
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the panel user and the secret entrance
    UserInfo,
    /// List every stored setting
    List,
    /// Generate and store a new secret entrance
    ResetEntrance,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store_path = match cli.store {
        Some(path) => path,
        None => PathBuf::from(load_config_or_default(&cli.config)?.store.path),
    };
    let settings = SettingsService::new(std::sync::Arc::new(JsonFileSettingsStore::new(
        store_path.clone(),
    )));

    match cli.command {
        Commands::UserInfo => {
            let user = value_or(&settings, keys::PANEL_USER, keys::DEFAULT_PANEL_USER).await?;
            let entrance = value_or(
                &settings,
                keys::SECURITY_ENTRANCE,
                keys::DEFAULT_SECURITY_ENTRANCE,
            )
            .await?;
            let port = value_or(&settings, keys::SERVER_PORT, keys::DEFAULT_SERVER_PORT).await?;
            let host = value_or(&settings, keys::SERVER_ADDRESS, "").await?;
            let host = if host.is_empty() { "<server-ip>".to_string() } else { host };

            println!("Panel user:  {user}");
            println!("Entrance:    {}", normalize_entrance(&entrance));
            println!("Panel URL:   http://{host}:{port}{}", normalize_entrance(&entrance));
        }
        Commands::List => {
            let all = settings.get_all().await?;
            if all.is_empty() {
                println!("No settings stored in {}", store_path.display());
            }
            for setting in all {
                if setting.key == keys::PANEL_PASSWORD {
                    println!("{} = ********", setting.key);
                } else {
                    println!("{} = {}", setting.key, setting.value);
                }
            }
        }
        Commands::ResetEntrance => {
            let entrance = generate_entrance();
            settings
                .update_setting(keys::SECURITY_ENTRANCE, &entrance)
                .await?;
            println!("New entrance: {entrance}");
            println!("A running server picks it up at its next reload (or send it SIGHUP).");
        }
    }

    Ok(())
}

async fn value_or(
    settings: &SettingsService,
    key: &str,
    default: &str,
) -> Result<String, StoreError> {
    match settings.get_by_key(key).await {
        Ok(setting) if !setting.value.is_empty() => Ok(setting.value),
        Ok(_) | Err(StoreError::NotFound(_)) => Ok(default.to_string()),
        Err(e) => Err(e),
    }
}
