//! # bincheck CLI - Genome Bin Quality Prediction
//!
//! A command-line interface for predicting completeness and contamination of
//! metagenome-assembled genomes.
//!
//! ## Usage
//!
//! ```bash
//! # Predict quality for every .fna file in a folder
//! bincheck predict --threads 30 --input bins/ --output-directory out/
//!
//! # A list of (optionally gzipped) genomes
//! bincheck predict -i a.fna b.fasta.gz -o out/
//!
//! # Register the reference database once
//! bincheck database --setdblocation /data/bincheck_db.dmnd
//!
//! # Check the installation on the bundled test genomes
//! bincheck testrun --threads 4
//! ```
//!
//! ## Predict options
//!
//! - `-i, --input <PATH>...`: folder of genomes or list of genome files
//! - `-o, --output-directory <DIR>`: output folder
//! - `-x, --extension <EXT>`: extension of genomes in an input folder (default: fna, faa with `--genes`)
//! - `--general`, `--specific`, `--allmodels`: force a model choice (default: automatic)
//! - `--genes`: inputs are protein FASTA files
//! - `-t, --threads <N>`: worker threads (default: 1)
//! - `--lowmem`: smaller search blocks for less memory
//! - `--ttable <TABLE>`: fixed translation table (default: choose 11 or 4)
//! - `--database_path <FILE>`: reference database for this run
//! - `--model-dir <DIR>`: model and schema folder (default: `BINCHECK_DATA`)
//! - `--resume`, `--force`, `--remove_intermediates`, `--stdout`
//! - `--dbg_cos`, `--dbg_vectors`: diagnostic side outputs
//!
//! ## Test run
//!
//! `testrun` checks the genomes in `<model-dir>/testrun/` against the
//! checksums in `testrun/expected.tsv`, predicts them in automatic mode and
//! fails unless every genome lands inside its listed ranges. It takes the
//! same `--threads`, `--lowmem`, `--database_path`, `--model-dir`,
//! `--prodigal` and `--diamond` options as `predict`.
//!
//! ## Environment
//!
//! - `BINCHECK_DB`: reference database, overrides the registered location
//! - `BINCHECK_DATA`: model and schema folder
//! - `BINCHECK_REGISTRY`: location of the database registry file

mod inputs;
mod logging;

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use bincheck_core::config::{DebugFlags, ModelMode, PipelineConfig, TranslationTableChoice};
use bincheck_core::constants::{DEFAULT_SEARCH_BATCH_SIZE, LOG_FILE};
use bincheck_core::database::{
    ChecksumValidator, DATABASE_ENV, DatabaseRegistry, DatabaseValidator, JsonRegistry,
    resolve_database,
};
use bincheck_core::pipeline::Predictor;
use bincheck_core::testrun::TestSet;
use bincheck_core::tools::{DiamondSearcher, ProdigalGeneCaller};
use bincheck_core::types::TranslationTable;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command, value_parser};

/// Environment variable naming the model and schema folder.
const DATA_ENV: &str = "BINCHECK_DATA";

/// Environment variable overriding the registry file location.
const REGISTRY_ENV: &str = "BINCHECK_REGISTRY";

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

/// Options shared by every subcommand that runs the workflow.
fn run_args() -> Vec<Arg> {
    vec![
        Arg::new("threads")
            .short('t')
            .long("threads")
            .value_name("N")
            .default_value("1")
            .value_parser(value_parser!(usize))
            .help("Number of worker threads"),
        flag("lowmem", "Reduce search block size to lower peak memory"),
        Arg::new("database_path")
            .long("database_path")
            .visible_alias("database-path")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .help("Reference database for this run [default: BINCHECK_DB or the registered location]"),
        Arg::new("model-dir")
            .long("model-dir")
            .value_name("DIR")
            .value_parser(value_parser!(PathBuf))
            .help("Folder with feature schema, reference tables and models [default: BINCHECK_DATA]"),
        Arg::new("prodigal")
            .long("prodigal")
            .value_name("PROGRAM")
            .default_value("prodigal")
            .value_parser(value_parser!(PathBuf))
            .help("Gene caller executable"),
        Arg::new("diamond")
            .long("diamond")
            .value_name("PROGRAM")
            .default_value("diamond")
            .value_parser(value_parser!(PathBuf))
            .help("Aligner executable"),
    ]
}

fn build_cli() -> Command {
    let predict = Command::new("predict")
        .about("Predict the completeness and contamination of genome bins")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("PATH")
                .num_args(1..)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Folder containing genomes, or a list of genome files"),
        )
        .arg(
            Arg::new("output-directory")
                .short('o')
                .long("output-directory")
                .visible_alias("output_directory")
                .value_name("DIR")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Output folder"),
        )
        .arg(
            Arg::new("extension")
                .short('x')
                .long("extension")
                .value_name("EXT")
                .help("Extension of genomes in an input folder [default: fna, faa with --genes]"),
        )
        .arg(flag("general", "Force the general model for all genomes"))
        .arg(flag("specific", "Force the specific model for all genomes"))
        .arg(flag("allmodels", "Report both models for every genome"))
        .arg(flag("genes", "Inputs are protein FASTA files; skip gene calling"))
        .arg(
            Arg::new("ttable")
                .long("ttable")
                .value_name("TABLE")
                .value_parser(value_parser!(u8))
                .help("Translation table for all genomes [default: choose 11 or 4]"),
        )
        .arg(
            Arg::new("tmpdir")
                .long("tmpdir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Folder for decompressed inputs [default: system temporary folder]"),
        )
        .arg(flag("force", "Overwrite a non-empty output folder"))
        .arg(flag("resume", "Reuse predicted proteins and hit tables found in the output folder"))
        .arg(flag("stdout", "Also print the report to stdout"))
        .arg(flag("remove_intermediates", "Remove protein files and hit tables once the report is written"))
        .arg(flag("dbg_cos", "Write cosine similarities to every reference centroid"))
        .arg(flag("dbg_vectors", "Write feature vectors as JSON"))
        .arg(
            Arg::new("specific-min-cosine")
                .long("specific-min-cosine")
                .value_name("VALUE")
                .value_parser(value_parser!(f64))
                .help("Override the composition similarity above which the specific model is used"),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Genomes per homology search [default: 1000]"),
        )
        .args(run_args());

    let testrun = Command::new("testrun")
        .about("Run prediction on the bundled test genomes to check the installation")
        .args(run_args());

    let database = Command::new("database")
        .about("Manage the reference database location")
        .arg(
            Arg::new("setdblocation")
                .long("setdblocation")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Register an already downloaded database file"),
        )
        .arg(flag("current", "Print the registered database location"))
        .group(
            ArgGroup::new("action")
                .args(["setdblocation", "current"])
                .required(true),
        );

    Command::new("bincheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Genome bin completeness and contamination prediction")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output debug information"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only output errors"),
        )
        .subcommand(predict)
        .subcommand(testrun)
        .subcommand(database)
}

/// Registry file: `BINCHECK_REGISTRY`, else `~/.config/bincheck/database.json`.
fn registry() -> anyhow::Result<JsonRegistry> {
    if let Some(path) = env::var_os(REGISTRY_ENV).filter(|p| !p.is_empty()) {
        return Ok(JsonRegistry::new(path));
    }
    let home = env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .with_context(|| format!("HOME is not set; set {REGISTRY_ENV} to locate the database registry"))?;
    Ok(JsonRegistry::new(
        PathBuf::from(home)
            .join(".config")
            .join("bincheck")
            .join("database.json"),
    ))
}

/// Refuses to clobber earlier results unless forced; resuming needs them.
fn prepare_output_dir(dir: &Path, resume: bool, force: bool) -> anyhow::Result<()> {
    if resume {
        if !dir.is_dir() {
            bail!("cannot resume: output directory {} does not exist", dir.display());
        }
        return Ok(());
    }
    if dir.is_dir() && std::fs::read_dir(dir)?.next().is_some() {
        if !force {
            bail!(
                "output directory {} is not empty; use --force to overwrite or --resume to continue",
                dir.display()
            );
        }
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("cannot clear output directory {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    Ok(())
}

fn reference_database(args: &ArgMatches) -> anyhow::Result<PathBuf> {
    let registry = registry()?;
    Ok(resolve_database(
        args.get_one::<PathBuf>("database_path").map(PathBuf::as_path),
        env::var_os(DATABASE_ENV).map(PathBuf::from),
        &registry,
        &ChecksumValidator,
    )?)
}

fn data_dir(args: &ArgMatches) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>("model-dir")
        .cloned()
        .or_else(|| env::var_os(DATA_ENV).filter(|d| !d.is_empty()).map(PathBuf::from))
        .with_context(|| format!("no model directory; pass --model-dir or set {DATA_ENV}"))
}

fn threads(args: &ArgMatches) -> usize {
    args.get_one::<usize>("threads").copied().unwrap_or(1)
}

fn predictor(config: PipelineConfig, args: &ArgMatches) -> anyhow::Result<Predictor> {
    Ok(Predictor::new(
        config,
        Box::new(ProdigalGeneCaller::new(
            args.get_one::<PathBuf>("prodigal").cloned().unwrap_or_default(),
        )),
        Box::new(DiamondSearcher::new(
            args.get_one::<PathBuf>("diamond").cloned().unwrap_or_default(),
        )),
    )?)
}

fn predict(args: &ArgMatches, level: log::LevelFilter) -> anyhow::Result<()> {
    let mode = ModelMode::from_flags(
        args.get_flag("general"),
        args.get_flag("specific"),
        args.get_flag("allmodels"),
    )?;
    let translation_table = match args.get_one::<u8>("ttable") {
        Some(&table) => TranslationTableChoice::Fixed(TranslationTable::new(table)?),
        None => TranslationTableChoice::Auto,
    };
    let genes = args.get_flag("genes");
    let resume = args.get_flag("resume");
    let output_dir = args
        .get_one::<PathBuf>("output-directory")
        .cloned()
        .context("missing output directory")?;

    prepare_output_dir(&output_dir, resume, args.get_flag("force"))?;
    logging::init(level, Some(&output_dir.join(LOG_FILE)))?;
    log::info!("Running bincheck version {}", env!("CARGO_PKG_VERSION"));

    let config = PipelineConfig {
        mode,
        threads: threads(args),
        low_memory: args.get_flag("lowmem"),
        database: reference_database(args)?,
        data_dir: data_dir(args)?,
        translation_table,
        genes_input: genes,
        resume,
        remove_intermediates: args.get_flag("remove_intermediates"),
        debug: DebugFlags {
            cosine: args.get_flag("dbg_cos"),
            vectors: args.get_flag("dbg_vectors"),
        },
        search_batch_size: args
            .get_one::<usize>("batch-size")
            .copied()
            .unwrap_or(DEFAULT_SEARCH_BATCH_SIZE),
        specific_min_cosine: args.get_one::<f64>("specific-min-cosine").copied(),
    };

    let scratch = match args.get_one::<PathBuf>("tmpdir") {
        Some(dir) => tempfile::Builder::new().prefix("bincheck-").tempdir_in(dir)?,
        None => tempfile::Builder::new().prefix("bincheck-").tempdir()?,
    };
    let canonical = inputs::canonical_extension(genes);
    let extension = args
        .get_one::<String>("extension")
        .map_or(canonical, String::as_str);
    let raw_inputs: Vec<PathBuf> = args
        .get_many::<PathBuf>("input")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let genomes = inputs::collect_inputs(&raw_inputs, extension, canonical, scratch.path())?;

    let report = predictor(config, args)?.run(&genomes, &output_dir)?;

    if args.get_flag("stdout") {
        report.write_to(io::stdout().lock())?;
    }
    log::info!("bincheck finished successfully");
    Ok(())
}

/// Predicts the bundled test genomes into a throwaway folder and checks
/// each against its expected range.
fn testrun(args: &ArgMatches, level: log::LevelFilter) -> anyhow::Result<()> {
    logging::init(level, None)?;
    let threads = threads(args);
    log::info!("Test run: predicting the bundled test genomes with {threads} threads");

    let data_dir = data_dir(args)?;
    let tests = TestSet::load(&data_dir)?;
    log::info!("Running checksum on test genomes");
    tests.verify_checksums()?;
    log::info!("Checksum successful");

    let config = PipelineConfig {
        mode: ModelMode::Auto,
        threads,
        low_memory: args.get_flag("lowmem"),
        database: reference_database(args)?,
        data_dir,
        ..Default::default()
    };
    let output = tempfile::Builder::new().prefix("bincheck-testrun-").tempdir()?;
    let report = predictor(config, args)?.run(&tests.genomes(), output.path())?;
    tests.check(&report)?;

    log::info!("Test run successful");
    report.write_to(io::stdout().lock())?;
    Ok(())
}

fn database(args: &ArgMatches, level: log::LevelFilter) -> anyhow::Result<()> {
    logging::init(level, None)?;
    let registry = registry()?;

    if let Some(path) = args.get_one::<PathBuf>("setdblocation") {
        if !ChecksumValidator.validate(path) {
            bail!("{} is missing, empty or fails its checksum", path.display());
        }
        let absolute = std::fs::canonicalize(path)?;
        registry.set_location(&absolute)?;
        log::info!("Database location set to {}", absolute.display());
    } else if args.get_flag("current") {
        match registry.location()? {
            Some(path) => println!("{}", path.display()),
            None => bail!(
                "no database location registered in {}",
                registry.path().display()
            ),
        }
    }
    Ok(())
}

/// Main entry point for the bincheck CLI.
///
/// Fatal errors are reported on stderr and give a non-zero exit status.
fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    let level = logging::level(matches.get_flag("debug"), matches.get_flag("quiet"));

    match matches.subcommand() {
        Some(("predict", args)) => predict(args, level),
        Some(("testrun", args)) => testrun(args, level),
        Some(("database", args)) => database(args, level),
        _ => unreachable!("subcommand_required"),
    }
}
