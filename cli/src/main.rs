use anyhow::Result;
use clap::Parser;
use std::io;

use cli::args::{Cli, Commands};
use cli::commands::{disassemble, env, native};
use cli::{boot, load_config, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let (mut vm, root) = boot(config)?;
    let mut out = io::stdout().lock();

    match &cli.command {
        Commands::Names => env::list_names(&vm, &root, &mut out),
        Commands::Doc { name } => env::show_doc(&vm, &root, name, &mut out),
        Commands::Native { path } => native::load_module(&mut vm, &root, path, &mut out),
        Commands::Disasm { name } => disassemble::disassemble_binding(&vm, &root, name, &mut out),
    }
}
