//! `orglink run` and `orglink validate`: config-driven record linkage.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;
use orglink_linkage::config::SourceConfig;
use orglink_linkage::{LinkConfig, LinkError, LinkResult, RecordSet, Side, Vocabulary};

use crate::exit_codes::{EXIT_LINK_INVALID_CONFIG, EXIT_LINK_NO_MATCHES, EXIT_LINK_RUNTIME, EXIT_USAGE};
use crate::export::write_matches_table;
use crate::CliError;

fn link_err(e: LinkError) -> CliError {
    let code = match e {
        LinkError::ConfigParse(_) | LinkError::ConfigValidation(_) | LinkError::UnknownAlgorithm(_) => {
            EXIT_LINK_INVALID_CONFIG
        }
        _ => EXIT_LINK_RUNTIME,
    };
    CliError::new(code, e.to_string())
}

fn read_config(config_path: &Path) -> Result<LinkConfig, CliError> {
    if !config_path.exists() {
        return Err(CliError::new(
            EXIT_USAGE,
            format!("config not found: {}", config_path.display()),
        ));
    }
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::new(EXIT_LINK_RUNTIME, format!("cannot read config: {e}")))?;
    LinkConfig::from_toml(&config_str).map_err(link_err)
}

fn load_side(
    base_dir: &Path,
    side: Side,
    source: &SourceConfig,
    delimiter: u8,
) -> Result<RecordSet, CliError> {
    let path = base_dir.join(&source.file);
    let data = std::fs::read_to_string(&path).map_err(|e| {
        CliError::new(EXIT_LINK_RUNTIME, format!("cannot read {}: {e}", path.display()))
    })?;
    let set = orglink_linkage::load_records(side, &data, source, delimiter).map_err(|e| {
        CliError::new(EXIT_LINK_RUNTIME, format!("{}: {e}", path.display()))
    })?;
    info!("{side} table: {} record(s) from {}", set.len(), path.display());
    Ok(set)
}

fn load_vocabulary(base_dir: &Path, file: &str) -> Result<Vocabulary, CliError> {
    let path = base_dir.join(file);
    let reader = File::open(&path).map(BufReader::new).map_err(|e| {
        CliError::new(EXIT_LINK_RUNTIME, format!("cannot read {}: {e}", path.display()))
    })?;
    Vocabulary::from_reader(reader).map_err(link_err)
}

/// Load both tables (paths relative to the config file), derive cleaned
/// columns and run every pass.
fn execute(config_path: &Path, config: &LinkConfig) -> Result<LinkResult, CliError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let delimiter = config.delimiter_byte().map_err(link_err)?;

    let vocabulary = match &config.vocabulary {
        Some(file) => Some(load_vocabulary(base_dir, file)?),
        None => None,
    };

    let mut left = load_side(base_dir, Side::Left, &config.left, delimiter)?;
    let mut right = load_side(base_dir, Side::Right, &config.right, delimiter)?;
    orglink_linkage::prepare(config, &mut left, &mut right, vocabulary.as_ref()).map_err(link_err)?;

    orglink_linkage::run(config, left, &right).map_err(link_err)
}

fn print_summary(result: &LinkResult) {
    for pass in &result.passes {
        eprintln!(
            "pass '{}': {} unmatched before, {} candidates, {} plausible, {} matched",
            pass.name, pass.pool_before, pass.candidates, pass.plausible, pass.best_matches,
        );
    }
    let a = &result.accounting;
    eprintln!(
        "{}: {} match(es) for {} left record(s), {} left record(s) unmatched",
        result.meta.config_name, a.matched, a.matched_distinct, a.unmatched,
    );
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    matches_file: Option<PathBuf>,
    fail_on_empty: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let result = execute(&config_path, &config)?;

    let json_str = result.to_json_pretty().map_err(link_err)?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_LINK_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = matches_file {
        let delimiter = config.delimiter_byte().map_err(link_err)?;
        write_matches_table(path, &result.matches, delimiter)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    if fail_on_empty && result.matches.is_empty() {
        return Err(CliError::new(EXIT_LINK_NO_MATCHES, "no matches found")
            .with_hint("check the blocking key and min_evidence_score of each pass"));
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let passes = config.compile_passes().map_err(link_err)?;
    let rules: usize = passes.iter().map(|p| p.rules.len()).sum();
    eprintln!(
        "valid: link config '{}' with {} pass(es), {} rule(s)",
        config.name,
        passes.len(),
        rules,
    );
    Ok(())
}
