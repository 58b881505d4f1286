use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use upgrader::{
    FilePersistor, Persistor, Version,
    config::{Config, DEFAULT_CONFIG_FILE},
};

/// Inspect and administer stored upgrade versions.
#[derive(Parser)]
#[command(name = "upgrader", version)]
struct Cli {
    /// Config file. A missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Store file to use instead of the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current version of a slot
    Show {
        #[arg(long)]
        key: Option<String>,
    },
    /// Print every slot in the store
    List,
    /// Overwrite the version of a slot
    Pin {
        version: u32,
        #[arg(long)]
        key: Option<String>,
    },
    /// Forget a slot so the next run starts from the base version
    Reset {
        #[arg(long)]
        key: Option<String>,
    },
}

impl Cli {
    fn persistor(&self, config: &Config, key: Option<&str>) -> Result<FilePersistor> {
        match &self.store {
            Some(path) => Ok(FilePersistor::new(path, key.unwrap_or(&config.key))),
            None => config.persistor(key),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match &cli.command {
        Command::Show { key } => {
            let persistor = cli.persistor(&config, key.as_deref())?;
            println!("{}", persistor.current()?);
        }
        Command::List => {
            let persistor = cli.persistor(&config, None)?;
            for (key, version) in persistor.entries()? {
                println!("{key}\t{version}");
            }
        }
        Command::Pin { version, key } => {
            let persistor = cli.persistor(&config, key.as_deref())?;
            let previous = persistor.current()?;
            persistor
                .save(Version::new(*version))
                .with_context(|| format!("Cannot pin `{}`", persistor.key()))?;
            log::info!(
                from = previous.get(), to = *version;
                "Pinned `{}` in {}", persistor.key(), persistor.path().display()
            );
        }
        Command::Reset { key } => {
            let persistor = cli.persistor(&config, key.as_deref())?;
            if persistor.remove()? {
                log::info!("Reset `{}`", persistor.key());
            } else {
                log::warn!("`{}` was never stored", persistor.key());
            }
        }
    }

    Ok(())
}
