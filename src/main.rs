//! `sputnik` - differential-testing harness generator for C libraries.
//!
//! # Usage
//!
//! ```bash
//! # Write the starter config.json for a new library:
//! sputnik introduce ./musl-1.2.0
//!
//! # Compile, link and rename every configured library:
//! sputnik prebuild -c configs/config_builder.json -v
//!
//! # Synthesize and build a differential test harness for `isdigit`:
//! sputnik run -c configs/config_harness.json isdigit --engine symex --out target/isdigit
//! ```

mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use assembler::Assembler;
use builder::config::{BuilderConfig, RunOptions};
use builder::Builder;
use diagnostics::SputnikError;
use harness::{Harness, HarnessContext, TestCase};
use library::Library;
use wrappers::config::{WrapperConfig, WrapperEntry};

#[derive(Parser)]
#[command(name = "sputnik")]
#[command(version = "0.1.0")]
#[command(about = "Differential-testing harness generator for C libraries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase output verbosity (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the starter `config.json` template for a new library
    Introduce {
        /// Directory the library lives in
        path: PathBuf,

        /// Overwrite an existing `config.json`
        #[arg(long)]
        force: bool,
    },

    /// Compile, link, rename, and check integrity for every configured library
    Prebuild {
        /// Path to the builder config (`config_builder.json`)
        #[arg(short, long)]
        config: PathBuf,

        /// Ignore already-built files and recompile everything
        #[arg(short, long)]
        rebuild: bool,

        /// Only (re)build the call wrappers, skipping the per-library build
        #[arg(long)]
        wrappers_only: bool,
    },

    /// Synthesize and build a differential test harness for one function
    Run {
        /// Path to the harness config (`config_harness.json`)
        #[arg(short, long)]
        config: PathBuf,

        /// C function name to differentially test
        function: String,

        /// Execution backend to target
        #[arg(long, value_enum, default_value = "symex")]
        engine: EngineArg,

        /// Directory the built target is written into
        #[arg(long, default_value = "./target_out")]
        out: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Symex,
    Fuzzing,
}

/// The default `TestCase`: no explicit signature (so `Harness::prepare`
/// resolves it from the man page), no semantic wrappers, one engine fixed
/// by `--engine`.
struct DefaultTestCase {
    function: String,
    engine: EngineArg,
}

impl TestCase for DefaultTestCase {
    fn configure(&self, harness: &mut Harness) -> Result<(), SputnikError> {
        harness.function = self.function.clone();
        match self.engine {
            EngineArg::Symex => harness.set_engine_symex(),
            EngineArg::Fuzzing => harness.set_engine_fuzzing(),
        }
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    logging::init_with_level(level);

    let result = match cli.command {
        Commands::Introduce { path, force } => introduce(&path, force),
        Commands::Prebuild { config, rebuild, wrappers_only } => prebuild(&config, rebuild, wrappers_only),
        Commands::Run { config, function, engine, out } => run(&config, function, engine, &out),
    };

    if let Err(err) = result {
        eprintln!("sputnik: {err}");
        process::exit(1);
    }
}

fn introduce(path: &PathBuf, force: bool) -> Result<(), SputnikError> {
    Library::write_default_config(path, force)?;
    println!("wrote starter config to {}", path.join(Library::CONFIG_NAME).display());
    Ok(())
}

/// Derive the shared wrapper config from the builder config's `functions`
/// map, sorted by name so the generated sources are byte-stable across runs.
fn wrapper_config(config: &BuilderConfig) -> Option<WrapperConfig> {
    let wrappers = config.wrappers.clone()?;
    let wrappers_header = config.wrappers_header.clone()?;

    let mut functions: Vec<WrapperEntry> = config
        .functions
        .iter()
        .map(|(function, headers)| WrapperEntry {
            function: function.clone(),
            headers: headers.clone(),
        })
        .collect();
    functions.sort_by(|a, b| a.function.cmp(&b.function));

    Some(WrapperConfig { functions, wrappers, wrappers_header })
}

fn prebuild(config_path: &PathBuf, rebuild: bool, wrappers_only: bool) -> Result<(), SputnikError> {
    let raw = std::fs::read_to_string(config_path)?;
    let config: BuilderConfig = serde_json::from_str(&raw).map_err(|e| SputnikError::Config {
        path: config_path.clone(),
        message: e.to_string(),
    })?;

    if let Some(wconfig) = wrapper_config(&config) {
        let report = wrappers::build_call_wrappers(&wconfig)?;
        log::info!("wrapped {} function(s)", report.wrapped.len());
    }

    if wrappers_only {
        return Ok(());
    }

    let options = RunOptions { rebuild };
    for libpath in &config.libs {
        let library = Library::load(libpath)?;
        let name = library.name.clone();
        let mut builder = Builder::new(library);
        let report = builder.run(&config, options)?;
        if !report.integrity_ok {
            log::error!("{name}: missing functions after build: {}", report.missing.join(", "));
        }
    }

    Ok(())
}

fn run(config_path: &PathBuf, function: String, engine: EngineArg, out: &PathBuf) -> Result<(), SputnikError> {
    let ctx = HarnessContext::load(config_path)?;
    let mut harness = Harness::new(ctx);
    let test = DefaultTestCase { function: function.clone(), engine };

    harness.prepare(&test)?;

    std::fs::create_dir_all(out)?;
    let assembler = Assembler::new();
    let mut folders = std::iter::once(out.clone());
    let blobs = assembler.build_targets(&mut harness, &test, &mut folders, false, false)?;

    for blob in &blobs {
        println!("built {}", blob.display());
    }

    Ok(())
}
