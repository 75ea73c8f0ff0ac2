use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use decaf::{CompilerOptions, DecafError, Unit};

#[derive(Parser, Debug)]
#[command(name = "decafc")]
#[command(about = "Decaf compiler - JSON syntax tree to abstract machine listing", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON syntax tree produced by the front end
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Listing path (default: INPUT with extension .ami)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Size of the register pool
    #[arg(long, value_name = "N", default_value_t = decaf_compiler::options::DEFAULT_REGISTERS)]
    registers: usize,

    /// Do not emit the __start stub
    #[arg(long)]
    no_entry: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<(), DecafError> {
    let options = CompilerOptions::new()
        .with_register_count(cli.registers)
        .with_entry_stub(!cli.no_entry);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("ami"));

    Unit::from_path(&cli.input)?
        .with_options(options)
        .build_and_write(&output)?;
    Ok(())
}
