use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate lines once through the primary provider with fallback
    Translate {
        /// Target language (two-letter code)
        #[arg(short, long, default_value = "es")]
        target: String,

        /// Source language, or auto
        #[arg(short, long, default_value = "auto")]
        source: String,

        /// Print which provider produced each line
        #[arg(long)]
        providers: bool,

        /// Lines to translate
        #[arg(required = true)]
        lines: Vec<String>,
    },

    /// Guess the language of a text sample
    Detect {
        text: String,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
