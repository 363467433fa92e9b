use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use frugal_compiler::error::FrugalError;
use frugal_compiler::{compile, emit_intermediate, Auditor, Config, StdLogger};

#[derive(Parser)]
#[command(name = "frugalc")]
#[command(about = "Compile, audit, or dump Frugal IDL schemas", long_about = None)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a `.frugal` schema and emit the intermediate Thrift file
    Compile {
        /// Input `.frugal` file
        #[arg(short, long)]
        input: PathBuf,

        /// Target backend plus comma-separated options (e.g. "dart:use_vendor")
        #[arg(short, long, default_value = "")]
        gen: String,

        /// Output directory (defaults to the input file's directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Topic-segment separator for scope prefixes
        #[arg(long, default_value = ".")]
        delimiter: String,
    },

    /// Compare two schema revisions and report breaking changes
    Audit {
        /// The previously published schema
        #[arg(long)]
        old: PathBuf,

        /// The candidate schema
        #[arg(long)]
        new: PathBuf,
    },

    /// Parse a schema and pretty-print the resolved AST as JSON
    Dump {
        /// Input `.frugal` file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn run(cli: &Cli) -> Result<(), FrugalError> {
    match &cli.command {
        Commands::Compile {
            input,
            gen,
            out,
            delimiter,
        } => {
            let config = Config {
                topic_delimiter: delimiter.clone(),
                gen: gen.clone(),
                out: out.clone(),
                ..Config::default()
            };
            let frugal = compile(input)?;
            let mut out_dir = config
                .out
                .clone()
                .or_else(|| input.parent().map(PathBuf::from))
                .unwrap_or_default();
            if out_dir.as_os_str().is_empty() {
                out_dir = PathBuf::from(".");
            }
            let artifact = emit_intermediate(&frugal, &out_dir)?;
            info!("compiled {} -> {}", input.display(), artifact.display());
            println!("Compiled {} -> {}", input.display(), artifact.display());
            Ok(())
        }

        Commands::Audit { old, new } => {
            let logger = StdLogger::new();
            Auditor::new(&logger).audit(old, new)?;
            println!("Audit passed: {} is compatible with {}", new.display(), old.display());
            Ok(())
        }

        Commands::Dump { input } => {
            let frugal = compile(input)?;
            let json = serde_json::to_string_pretty(&frugal.ordered())
                .map_err(|e| FrugalError::Generator(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("{}", err);
        process::exit(1);
    }
}
