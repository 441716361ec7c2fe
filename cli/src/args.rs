use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tern")]
#[command(about = "Tern VM host tool", long_about = None, version)]
pub struct Cli {
    /// VM configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every binding in the root environment
    Names,
    /// Show the documentation of a binding
    Doc {
        /// Binding name, e.g. `print` or `math/sqrt`
        name: String,
    },
    /// Load a native module into the root environment
    Native {
        /// Path to the shared library
        path: String,
    },
    /// Disassemble an assembled builtin
    Disasm {
        /// Binding name, e.g. `+` or `order<=`
        name: String,
    },
}
