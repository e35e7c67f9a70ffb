use clap::{Args, Parser, Subcommand};

const LOCKBOX_LONG_VERSION: &str = concat!(
    "version: ", env!("CARGO_PKG_VERSION"), "\n",
    "git sha: ", env!("LOCKBOX_GIT_SHA"), "\n",
    "build time (UTC): ", env!("LOCKBOX_BUILD_TIME"), "\n",
    "target: ", env!("LOCKBOX_TARGET"), "\n",
    "features: ", env!("LOCKBOX_FEATURES")
);

#[derive(Parser)]
#[command(
    name = "lockbox",
    version = env!("CARGO_PKG_VERSION"),
    long_version = LOCKBOX_LONG_VERSION,
    about = "🔐 Lockbox: encrypted credential vault"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Character category switches shared by `add --generate` and `generate`.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct CharsetArgs {
    /// Disable lowercase letters
    #[arg(long)]
    pub no_lower: bool,
    /// Disable uppercase letters
    #[arg(long)]
    pub no_upper: bool,
    /// Disable digits
    #[arg(long)]
    pub no_digits: bool,
    /// Disable special characters
    #[arg(long)]
    pub no_special: bool,
    /// Leave out look-alike characters such as O/0/I/l/|
    #[arg(long)]
    pub avoid_ambiguous: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add an account
    Add {
        /// Vault file path override
        #[arg(long)]
        path: Option<String>,
        /// Service name, e.g. "Gmail"
        #[arg(long)]
        service: String,
        /// Login or e-mail
        #[arg(long)]
        login: String,
        /// Free-text note
        #[arg(long, default_value = "")]
        note: String,
        /// Generate the secret instead of prompting for it
        #[arg(long)]
        generate: bool,
        /// Generated secret length
        #[arg(long)]
        length: Option<u16>,
        #[command(flatten)]
        charset: CharsetArgs,
    },
    /// List accounts, optionally filtered by service name
    List {
        /// Vault file path override
        #[arg(long)]
        path: Option<String>,
        /// Case-insensitive service name filter
        #[arg(long)]
        query: Option<String>,
        /// Output a JSON array
        #[arg(long)]
        json: bool,
        /// Show secrets instead of masks
        #[arg(long)]
        reveal: bool,
    },
    /// Remove an account by id
    Rm {
        id: String,
        /// Vault file path override
        #[arg(long)]
        path: Option<String>,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Print the number of stored accounts
    Count {
        /// Vault file path override
        #[arg(long)]
        path: Option<String>,
    },
    /// Generate a password without touching the vault
    Generate {
        /// Password length
        #[arg(long)]
        length: Option<u16>,
        #[command(flatten)]
        charset: CharsetArgs,
    },
    /// Describe the vault file layout (no passphrase needed, no secrets shown)
    Info {
        /// Vault file path override
        #[arg(long)]
        path: Option<String>,
    },
}
