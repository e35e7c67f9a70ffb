use crate::cli::cli::{Cli, Commands};
use crate::cli::handlers::{AddOptions, Vault};
use crate::config::app_config::Config;
use clap::Parser;
use std::path::PathBuf;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Add {
            path,
            service,
            login,
            note,
            generate,
            length,
            charset,
        } => {
            let config = Config::create(path.map(PathBuf::from))?;
            let vault = Vault::create(&config);
            let opts = AddOptions {
                service,
                login,
                note,
                generate,
                length,
                charset,
            };
            vault.handle_add(opts).await?;
        }
        Commands::List {
            path,
            query,
            json,
            reveal,
        } => {
            let config = Config::create(path.map(PathBuf::from))?;
            let vault = Vault::create(&config);
            vault.handle_list(query, json, reveal).await?;
        }
        Commands::Rm { id, path, yes } => {
            let config = Config::create(path.map(PathBuf::from))?;
            let vault = Vault::create(&config);
            vault.handle_rm(&id, yes).await?;
        }
        Commands::Count { path } => {
            let config = Config::create(path.map(PathBuf::from))?;
            let vault = Vault::create(&config);
            vault.handle_count().await?;
        }
        Commands::Generate { length, charset } => {
            let config = Config::create(None)?;
            let vault = Vault::create(&config);
            vault.handle_generate(length, charset).await?;
        }
        Commands::Info { path } => {
            let config = Config::create(path.map(PathBuf::from))?;
            let vault = Vault::create(&config);
            vault.handle_info().await?;
        }
    }

    Ok(())
}
