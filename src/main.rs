use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::debug;

use sim8086::vm::disassembler::write_listing;
use sim8086::vm::runtime::{Runtime, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "sim8086", about = "Intel 8086 decoder and simulator")]
struct CLI {
    /// Flat binary of 8086 machine code
    file: PathBuf,
    /// Execute the program instead of disassembling it
    #[arg(long)]
    exec: bool,
    /// Write the 1 MiB memory image here after execution
    #[arg(long, requires = "exec")]
    dump: Option<PathBuf>,
    /// Log the register file before every instruction (RUST_LOG=debug)
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = CLI::parse();

    let program = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    debug!("Loaded {} bytes from {}", program.len(), args.file.display());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if !args.exec {
        write_listing(&mut out, &program)?;
        out.flush()?;
        return Ok(());
    }

    let mut runtime = Runtime::with_config(&program, RuntimeConfig { trace: args.trace });
    let result = runtime.run(&mut out);
    out.flush()?;
    result?;

    if let Some(path) = args.dump {
        let mut file = BufWriter::new(
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?,
        );
        runtime.memory().dump(&mut file)?;
        file.flush()?;
    }
    Ok(())
}
