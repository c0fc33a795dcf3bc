use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gomorph::pipeline::{aliases, parse_pipeline};
use gomorph::{passes, Error, RunConfig, TransformOptions};

/// gomorph - multi-pass Go source-to-source transformer
#[derive(Debug, Parser)]
#[command(name = "gomorph", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
struct GlobalOptions {
    /// Enable verbose (debug-level) logging and error locations.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Transform a Go project into a new output tree.
    Transform {
        /// Root of the Go project.
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Directory the transformed tree is written to.
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Comma-separated pass aliases, or `all`.
        #[arg(short, long, default_value = "all", value_name = "LIST")]
        passes: String,

        /// Write the struct registry to this JSON file.
        #[arg(long, value_name = "FILE")]
        map: Option<PathBuf>,

        /// Preload the struct registry from a previous map file.
        #[arg(long, value_name = "FILE")]
        resume: Option<PathBuf>,

        /// JSON file with transform options.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Module manifest; defaults to `<input>/go.mod`.
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Compute everything but write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Leave string literals readable.
        #[arg(long)]
        no_obfuscate: bool,

        /// Shortest string literal that gets obfuscated.
        #[arg(long, value_name = "N")]
        min_string_len: Option<usize>,

        /// Shortest if-chain that becomes a jump table.
        #[arg(long, value_name = "N")]
        min_chain: Option<usize>,
    },

    /// Parse and type-check a project without writing anything.
    Check {
        /// Root of the Go project.
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// JSON file with transform options.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// List the available passes in default order.
    Passes,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gomorph=debug" } else { "gomorph=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(config: Option<&PathBuf>) -> Result<TransformOptions, Error> {
    match config {
        Some(path) => TransformOptions::load(path),
        None => Ok(TransformOptions::default()),
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Transform {
            input,
            output,
            passes,
            map,
            resume,
            config,
            manifest,
            dry_run,
            no_obfuscate,
            min_string_len,
            min_chain,
        } => {
            let mut options = load_options(config.as_ref())?;
            if let Some(n) = min_string_len {
                options.short_string_min_len = n;
            }
            if let Some(n) = min_chain {
                options.jump_table_min_chain = n;
            }
            let pipeline = parse_pipeline(&passes)?;

            let mut run = RunConfig::new(input, output);
            if let Some(manifest) = manifest {
                run.module_manifest_path = manifest;
            }
            run.map_file_path = map;
            run.resume_map_path = resume;
            run.verbose = cli.global.verbose;
            run.dry_run = dry_run;
            run.obfuscate = !no_obfuscate;

            let summary = gomorph::transform(run, options, pipeline)?;
            println!(
                "{} files changed, {} written, {} copied, {} structs packed",
                summary.changed_files,
                summary.output.written.len(),
                summary.output.copied.len(),
                summary.structs.len()
            );
            println!("{}", summary.metrics);
            Ok(())
        }
        Command::Check { input, config } => {
            let options = load_options(config.as_ref())?;
            let report = gomorph::check(&input, options)?;
            for path in &report.failed {
                println!("unparsed: {}", path.display());
            }
            println!(
                "{} files parsed, {} failed, {} type diagnostics",
                report.parsed,
                report.failed.len(),
                report.type_diagnostics
            );
            Ok(())
        }
        Command::Passes => {
            for (pass, alias) in passes::all().iter().zip(aliases()) {
                println!(
                    "{alias:<18} {:<22} {:>4}  {}",
                    pass.name(),
                    pass.priority(),
                    pass.description()
                );
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.global.verbose;
    init_tracing(verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut line = format!("error[{}]: {err}", err.kind());
            if let Some(pass) = err.pass() {
                line.push_str(&format!(" ({pass})"));
            }
            if verbose {
                if let Some(pos) = err.position() {
                    line.push_str(&format!(" at {pos}"));
                }
            }
            eprintln!("{line}");
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}
