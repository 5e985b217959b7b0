use anyhow::Context;
use cep_weather_core::{Config, LookupService, Resolvers, SearchRecord};
use clap::{Parser, Subcommand};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cep-weather", version, about = "Weather by Brazilian postal code (CEP)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web app and its JSON API.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8080". Overrides the config file.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Look up a single CEP and print the result.
    Lookup {
        /// Eight-digit CEP, e.g. 01001000.
        cep: String,
    },

    /// Store the OpenWeather API key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind } => {
                let mut config = Config::load()?;
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }
                server::serve(config).await
            }
            Command::Lookup { cep } => {
                let config = Config::load()?;
                let service = LookupService::from(Resolvers::from_config(&config)?);
                let record = service
                    .lookup(&cep)
                    .await
                    .map_err(|e| anyhow::anyhow!("{} ({e})", e.user_message()))?;
                print_record(&record);
                Ok(())
            }
            Command::Configure => configure(),
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    // Read the file alone so environment overrides don't get persisted.
    let mut config = Config::load_from(&path)?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Get one at https://home.openweathermap.org/api_keys")
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.set_weather_api_key(api_key);
    config.save_to(&path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_record(record: &SearchRecord) {
    let missing = "Não foi localizado";
    println!("CEP:         {}", record.cep);
    println!("Cidade:      {}", record.location.as_deref().unwrap_or(missing));
    println!("Estado:      {}", record.local_state.as_deref().unwrap_or(missing));
    match record.temp {
        Some(t) => println!("Temperatura: {t:.1}°C"),
        None => println!("Temperatura: {missing}"),
    }
    println!("Pesquisado:  {}", record.timestamp);
}
