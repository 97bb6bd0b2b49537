use std::io::Read;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use estate_normalizer::config::SourceProfile;
use estate_normalizer::domain::EstateRecord;
use estate_normalizer::error::NormalizeError;
use estate_normalizer::logging;
use estate_normalizer::mapper::{FieldMapper, MapOptions, RawValue, FIELD_RULES};

#[derive(Parser)]
#[command(name = "estate-normalizer")]
#[command(about = "Field normalizer for multi-source real-estate listing data")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw listing records from a JSON file or stdin
    Normalize {
        /// Input path; reads stdin when omitted
        #[arg(long)]
        input: Option<String>,
        /// Source profile TOML (match mode, multiplier, plan base URL)
        #[arg(long)]
        profile: Option<String>,
        /// Compare keys by full equality instead of containment
        #[arg(long)]
        exact_match: bool,
        /// Fail on keys no mapping rule recognizes
        #[arg(long)]
        strict: bool,
        /// Abort the whole batch on the first bad record
        #[arg(long)]
        fail_fast: bool,
        /// Pretty-print the output array
        #[arg(long)]
        pretty: bool,
    },
    /// Print the field-mapping rule table
    Rules,
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize {
            input,
            profile,
            exact_match,
            strict,
            fail_fast,
            pretty,
        } => {
            let mut profile = match profile {
                Some(path) => SourceProfile::load(&path)?,
                None => SourceProfile::default(),
            };
            profile.exact_match |= exact_match;
            profile.strict |= strict;
            run_normalize(&profile, input.as_deref(), fail_fast, pretty)
        }
        Commands::Rules => {
            print_rules();
            Ok(())
        }
    }
}

fn run_normalize(
    profile: &SourceProfile,
    input: Option<&str>,
    fail_fast: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let document: serde_json::Value = serde_json::from_str(&raw)?;

    let plan_base_url = profile
        .plan_base_url
        .as_deref()
        .map(url::Url::parse)
        .transpose()
        .map_err(|e| NormalizeError::Config(format!("bad plan_base_url: {}", e)))?;
    let options = MapOptions {
        price_multiplier: profile.price_multiplier,
        plan_base_url,
        ..MapOptions::default()
    };
    let mapper = FieldMapper::new(profile.match_mode())
        .strict(profile.strict)
        .with_options(options);

    let mut accepted = Vec::new();
    let mut rejected = 0usize;
    for (index, record) in normalize_document(&mapper, profile, &document).into_iter().enumerate() {
        match record {
            Ok(record) => accepted.push(record),
            Err(e) if fail_fast => {
                return Err(anyhow::anyhow!("record {} rejected: {}", index, e));
            }
            Err(e) => {
                warn!(record = index, error = %e, "record rejected, skipping");
                rejected += 1;
            }
        }
    }

    let output = if pretty {
        serde_json::to_string_pretty(&accepted)?
    } else {
        serde_json::to_string(&accepted)?
    };
    println!("{}", output);
    info!(accepted = accepted.len(), rejected, "batch finished");
    Ok(())
}

/// Route every raw record in the document through the mapper. Three input
/// shapes are supported: an array of key→value objects (one record each), a
/// {"header", "rows"} table (one record), and {"keys", "values"} parallel
/// sequences (one record).
fn normalize_document(
    mapper: &FieldMapper,
    profile: &SourceProfile,
    document: &serde_json::Value,
) -> Vec<Result<EstateRecord, NormalizeError>> {
    use serde_json::Value;

    let new_record = || match profile.default_type {
        Some(t) => EstateRecord::with_type(t),
        None => EstateRecord::new(),
    };

    let finish = |mut record: EstateRecord,
                  mapped: Result<(), NormalizeError>|
     -> Result<EstateRecord, NormalizeError> {
        mapped?;
        if profile.reconcile_promotions {
            record.reconcile_promotions();
        }
        record.finalize()
    };

    match document {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let Value::Object(object) = item else {
                    return Err(NormalizeError::Validation(
                        "array items must be key/value objects".to_string(),
                    ));
                };
                let mut record = new_record();
                let mapped = mapper.map_object(&mut record, object);
                finish(record, mapped)
            })
            .collect(),
        Value::Object(object) if object.contains_key("header") => {
            let header = raw_sequence(object.get("header"));
            let rows: Vec<Vec<RawValue>> = object
                .get("rows")
                .and_then(Value::as_array)
                .map(|rows| rows.iter().map(|row| raw_sequence(Some(row))).collect())
                .unwrap_or_default();
            let mut record = new_record();
            let mapped = mapper.map_table(&mut record, &header, &rows);
            vec![finish(record, mapped)]
        }
        Value::Object(object) if object.contains_key("keys") => {
            let keys = raw_sequence(object.get("keys"));
            let values = raw_sequence(object.get("values"));
            let mut record = new_record();
            let mapped = mapper.map_parallel(&mut record, &keys, &values);
            vec![finish(record, mapped)]
        }
        Value::Object(object) => {
            let mut record = new_record();
            let mapped = mapper.map_object(&mut record, object);
            vec![finish(record, mapped)]
        }
        _ => vec![Err(NormalizeError::Validation(
            "unsupported input shape".to_string(),
        ))],
    }
}

fn raw_sequence(value: Option<&serde_json::Value>) -> Vec<RawValue> {
    value
        .and_then(serde_json::Value::as_array)
        .map(|items| items.iter().map(|v| RawValue::from(v.clone())).collect())
        .unwrap_or_default()
}

fn print_rules() {
    for rule in FIELD_RULES {
        let target = match rule.setter {
            Some(setter) => setter.name(),
            None => "(ignored)",
        };
        println!("{:<20} <- {}", target, rule.aliases.join(", "));
    }
}
