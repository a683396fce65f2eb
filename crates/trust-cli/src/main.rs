use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use trust_cli::config::EvaluationConfig;
use trust_cli::run::run_evaluation;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("TRUST_LOG", "error,trust=info"))
        .init();

    let matches = Command::new("trust")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("Trust scores for the predictions of fitted classifiers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("evaluate")
                .about("Fit classifiers on tabular datasets and score every test prediction")
                .arg(
                    Arg::new("config")
                        .help("Path to evaluation JSON configuration file")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("dataset")
                        .short('d')
                        .long("dataset")
                        .help("CSV/TSV dataset. Repeat for several. Overrides `datasets` in the config.")
                        .action(ArgAction::Append)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("label_column")
                        .short('l')
                        .long("label")
                        .help("Name of the label column")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .help("Keep only the first N rows of each dataset")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("test_fraction")
                        .long("test-fraction")
                        .help("Share of rows held out for testing")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed of the train/test split")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("classifier")
                        .short('c')
                        .long("classifier")
                        .help("Primary classifier (gbdt, bayes, knn, lda; dt, rf, svm, lr with the linfa feature). Repeat for several.")
                        .action(ArgAction::Append)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("timeout_ms")
                        .long("timeout-ms")
                        .help("Wall-clock limit per trust calculator in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .help("Directory the per-classifier CSV files are written to")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(Command::new("defaults").about("Print the default evaluation configuration as JSON"))
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        Some(("defaults", _)) => {
            println!("{}", serde_json::to_string_pretty(&EvaluationConfig::default())?);
            Ok(())
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    match config_path {
        Some(path) => log::info!("[Trust::Evaluate] Using config: {:?}", path),
        None => log::info!("[Trust::Evaluate] No config provided; using defaults."),
    }

    let config = EvaluationConfig::from_arguments(config_path, matches)?;
    match run_evaluation(&config) {
        Ok(files) => {
            log::info!("[Trust::Evaluate] Wrote {} output files", files.len());
            Ok(())
        }
        Err(e) => {
            log::error!("Evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
