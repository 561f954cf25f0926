//! relq — inspect query translation and postprocessing
//!
//! # Usage
//!
//! ```bash
//! # Postprocess a serialized select tree
//! relq optimize query.json --params params.json
//!
//! # Replay several bindings through the compiled query cache
//! relq optimize query.json --params a.json --params b.json --cache-key by-name
//!
//! # Translate one method call with the SQL Server translators
//! relq translate call.json
//!
//! # List registered translators
//! relq translators
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use relq::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relq")]
#[command(version)]
#[command(about = "Relational query translation and postprocessing", long_about = None)]
#[command(after_help = "EXAMPLES:
    relq optimize query.json --params params.json
    relq optimize query.json --params a.json --params b.json
    relq optimize query.json --relational-nulls --format json
    relq translate call.json")]
struct Cli {
    /// Configuration file (defaults to ./relq.toml, then the user config dir)
    #[arg(short, long, global = true, env = "RELQ_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Sql,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Postprocess a select tree against parameter values
    Optimize {
        /// Select tree as JSON
        tree: PathBuf,

        /// Parameter values as a JSON object; repeat to run several bindings
        #[arg(short, long)]
        params: Vec<PathBuf>,

        /// Compiled query cache key (defaults to the tree path)
        #[arg(long)]
        cache_key: Option<String>,

        /// Keep comparisons three-valued
        #[arg(long)]
        relational_nulls: bool,

        #[arg(short, long, value_enum, default_value = "sql")]
        format: OutputFormat,
    },
    /// Translate a serialized method call
    Translate {
        /// Method call as JSON
        call: PathBuf,
    },
    /// List the SQL Server translators in registration order
    Translators,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "relq=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Optimize {
            tree,
            params,
            cache_key,
            relational_nulls,
            format,
        } => {
            let config = RelqConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
            let mut options = config.postprocessor_options();
            options.use_relational_nulls |= *relational_nulls;
            let cache = CompiledQueryCache::new(config.cache.clone());
            let key = cache_key.clone().unwrap_or_else(|| tree.display().to_string());
            optimize(tree, params, &key, &cache, options, *format)
        }
        Commands::Translate { call } => translate(call),
        Commands::Translators => {
            list_translators();
            Ok(())
        }
    }
}

fn optimize(
    tree: &Path,
    params: &[PathBuf],
    cache_key: &str,
    cache: &CompiledQueryCache,
    options: PostprocessorOptions,
    format: OutputFormat,
) -> Result<()> {
    let content = fs::read_to_string(tree).with_context(|| format!("cannot read {}", tree.display()))?;
    let select: Arc<SelectExpression> =
        serde_json::from_str(&content).with_context(|| format!("invalid select tree in {}", tree.display()))?;
    let bindings = if params.is_empty() {
        vec![ParameterValues::new()]
    } else {
        params
            .iter()
            .map(|path| load_parameter_values(path))
            .collect::<Result<Vec<_>>>()?
    };

    let postprocessor = ParameterBasedPostprocessor::new(SqlExpressionFactory::default(), options);
    for values in &bindings {
        let (finalized, can_cache) = cache.get_or_optimize(cache_key, &select, values, &postprocessor)?;

        match format {
            OutputFormat::Sql => {
                println!("{}", "Finalized SQL:".green().bold());
                println!("{}", finalized.to_sql().white());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(finalized.as_ref())?);
            }
        }

        let verdict = if can_cache { "cacheable".green() } else { "not cacheable".yellow() };
        eprintln!("{} {}", "Cache:".cyan(), verdict);
    }

    if cache.is_enabled() {
        let stats = cache.stats();
        eprintln!(
            "{} {} entries, {} hits, {} misses ({:.1}% hit rate)",
            "Query cache:".cyan(),
            stats.entries,
            stats.hits,
            stats.misses,
            stats.hit_rate()
        );
    }
    Ok(())
}

fn load_parameter_values(path: &Path) -> Result<ParameterValues> {
    let content = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let serde_json::Value::Object(map) = json else {
        anyhow::bail!("{} must contain a JSON object of parameter values", path.display());
    };
    Ok(map
        .into_iter()
        .map(|(name, value)| (name, Value::from_json(value)))
        .collect())
}

fn translate(path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let call: MethodCall = serde_json::from_str(&content)?;
    let registry = MethodCallTranslatorRegistry::sql_server();

    match registry.translate_call(&call)? {
        Some(sql) => println!("{}", sql.to_sql().white()),
        None => println!(
            "{} {}",
            "not translated:".yellow(),
            call.method.qualified_name()
        ),
    }
    Ok(())
}

fn list_translators() {
    let registry = MethodCallTranslatorRegistry::sql_server();
    println!("{}", "Translators (first match wins):".cyan().bold());
    for (i, id) in registry.translator_ids().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, id);
    }
}
