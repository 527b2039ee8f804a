//! `fieldcrypt` CLI for encrypting, decrypting and inspecting single field values.
//!
//! Useful for computing the stored form of a value when writing SQL by hand,
//! or for checking which strategy wrote a column.

#![warn(clippy::pedantic, clippy::nursery)]

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fieldcrypt::registry::StrategyRegistry;
use fieldcrypt::strategy::{AesStrategy, ChaChaStrategy, CryptoStrategy, Marker};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fieldcrypt")]
#[command(about = "Field-level encryption CLI", long_about = None)]
struct Cli {
    /// Strategy used by `encrypt`
    #[arg(short, long, global = true, default_value = AesStrategy::NAME)]
    strategy: String,

    /// Secret key material
    #[arg(short, long, global = true, env = "FIELDCRYPT_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a value into its stored form
    Encrypt {
        /// Plaintext; read from stdin when omitted
        value: Option<String>,
    },
    /// Decrypt a stored value
    Decrypt {
        /// Stored value; read from stdin when omitted
        value: Option<String>,
    },
    /// Show which strategy marker a stored value carries
    Inspect {
        /// Stored value; read from stdin when omitted
        value: Option<String>,
    },
    /// List the built-in strategies
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    println!("{}", run(&cli)?);
    Ok(())
}

fn run(cli: &Cli) -> Result<String> {
    match &cli.command {
        Commands::Encrypt { value } => {
            let registry = build_registry(cli.key.as_deref())?;
            let strategy = registry
                .lookup(&cli.strategy)
                .with_context(|| format!("unknown strategy `{}`", cli.strategy))?;
            let plaintext = value_or_stdin(value.as_deref())?;
            tracing::debug!(strategy = strategy.name(), "encrypting value");
            strategy.encrypt(&plaintext).context("encryption failed")
        }
        Commands::Decrypt { value } => {
            let registry = build_registry(cli.key.as_deref())?;
            let stored = value_or_stdin(value.as_deref())?;
            let Some(strategy) = owning_strategy(&registry, &stored) else {
                tracing::debug!("value carries no known marker, returning as-is");
                return Ok(stored);
            };
            strategy.decrypt(&stored).context("decryption failed")
        }
        Commands::Inspect { value } => {
            let stored = value_or_stdin(value.as_deref())?;
            Ok(inspect(&stored))
        }
        Commands::Strategies => Ok(builtin_names().join("\n")),
    }
}

fn build_registry(key: Option<&str>) -> Result<Arc<StrategyRegistry>> {
    let Some(key) = key else {
        bail!("no key given; pass --key or set FIELDCRYPT_KEY");
    };

    let registry = Arc::new(StrategyRegistry::new());
    registry.register(AesStrategy::new(key).context("invalid AES key")?);
    registry.register(ChaChaStrategy::new(key).context("invalid CHACHA20 key")?);
    Ok(registry)
}

fn owning_strategy(registry: &StrategyRegistry, value: &str) -> Option<Arc<dyn CryptoStrategy>> {
    registry
        .names()
        .iter()
        .filter_map(|name| registry.lookup(name))
        .find(|strategy| strategy.is_encrypted(value))
}

fn builtin_names() -> [&'static str; 2] {
    [AesStrategy::NAME, ChaChaStrategy::NAME]
}

fn inspect(value: &str) -> String {
    if value.is_empty() {
        return "empty".to_string();
    }
    builtin_names()
        .into_iter()
        .map(|name| (name, Marker::new(name)))
        .find(|(_, marker)| marker.is_marked(value))
        .map_or_else(|| "plaintext".to_string(), |(name, _)| format!("encrypted ({name})"))
}

fn value_or_stdin(value: Option<&str>) -> Result<String> {
    if let Some(value) = value {
        return Ok(value.to_string());
    }

    let mut input = String::new();
    io::stdin().read_to_string(&mut input).context("failed to read value from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "1234567890123456";

    fn run_args(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(args)?;
        run(&cli)
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let sealed =
            run_args(&["fieldcrypt", "--key", KEY, "encrypt", "user1@example.com"]).unwrap();
        assert!(sealed.starts_with("{AES}"));

        let opened = run_args(&["fieldcrypt", "--key", KEY, "decrypt", sealed.as_str()]).unwrap();
        assert_eq!(opened, "user1@example.com");
    }

    #[test]
    fn test_encrypt_with_chacha() {
        let sealed =
            run_args(&["fieldcrypt", "-k", KEY, "-s", "chacha20", "encrypt", "secret"]).unwrap();
        assert!(sealed.starts_with("{CHACHA20}"));

        // decrypt picks the strategy from the marker
        let opened = run_args(&["fieldcrypt", "-k", KEY, "decrypt", sealed.as_str()]).unwrap();
        assert_eq!(opened, "secret");
    }

    #[test]
    fn test_decrypt_plaintext_passes_through() {
        let opened = run_args(&["fieldcrypt", "-k", KEY, "decrypt", "plain"]).unwrap();
        assert_eq!(opened, "plain");
    }

    #[test]
    fn test_unknown_strategy() {
        let err = run_args(&["fieldcrypt", "-k", KEY, "-s", "rot13", "encrypt", "x"]).unwrap_err();
        assert!(err.to_string().contains("rot13"));
    }

    #[test]
    fn test_inspect() {
        assert_eq!(inspect("{AES}AAAA"), "encrypted (AES)");
        assert_eq!(inspect("{CHACHA20}AAAA"), "encrypted (CHACHA20)");
        assert_eq!(inspect("user1@example.com"), "plaintext");
        assert_eq!(inspect(""), "empty");
    }

    #[test]
    fn test_strategies() {
        assert_eq!(run_args(&["fieldcrypt", "strategies"]).unwrap(), "AES\nCHACHA20");
    }
}
