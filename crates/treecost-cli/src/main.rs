use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use treecost_cli::costs::run_costs;
use treecost_cli::train::{format_importance, run_train};
use treecost_cli::util::load_pipeline_config;
use treecost_models::config::{ModelType, PipelineConfig};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("TREECOST_LOG", "error,treecost=info"))
        .init();

    let matches = Command::new("treecost")
        .version(clap::crate_version!())
        .about("\u{1F333} treecost - street-tree removal cost synthesis and modelling")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("costs")
                .about("Add synthesized removal costs to a tree census CSV")
                .arg(
                    Arg::new("census")
                        .help("Path to the census CSV (needs a tree_dbh column)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Where to write the CSV with costs. Defaults to <census>_with_costs.csv.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for the cost noise. Overrides noise_seed from the config.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("max_diameter")
                        .long("max-diameter")
                        .help("Drop trees wider than this many inches. Overrides the config.")
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new("train")
                .about("Train the cost model and rank the features that drive cost")
                .arg(
                    Arg::new("data")
                        .help("Path to the census CSV, with or without an estimated_cost column")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("test_fraction")
                        .long("test-fraction")
                        .help("Fraction of rows held out for evaluation.")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for the train/test split.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("num_trees")
                        .long("num-trees")
                        .help("Number of boosting rounds.")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .help("Path of the HTML report. Defaults to treecost_report.html.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("report"),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("costs", sub_m)) => handle_costs(sub_m),
        Some(("train", sub_m)) => handle_train(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Path to a JSON pipeline configuration file")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn load_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(config_path) => {
            eprintln!("[treecost] Using config: {:?}", config_path);
            load_pipeline_config(config_path)
        }
        None => {
            eprintln!("[treecost] No config provided; using defaults.");
            Ok(PipelineConfig::default())
        }
    }
}

fn print_default_config(matches: &ArgMatches, config: &PipelineConfig) {
    if matches.get_one::<PathBuf>("config").is_none() {
        let default_json = serde_json::to_string_pretty(config).unwrap_or_default();
        eprintln!("[treecost] Default config:\n{}", default_json);
    }
}

fn handle_costs(matches: &ArgMatches) -> Result<()> {
    let census_path: &PathBuf = matches
        .get_one("census")
        .ok_or_else(|| anyhow::anyhow!("census path is required"))?;
    let output_path: Option<&PathBuf> = matches.get_one("output_file");

    let mut config = load_config(matches)?;
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.noise_seed = *seed;
    }
    if let Some(max_diameter) = matches.get_one::<f64>("max_diameter") {
        config.max_diameter = Some(*max_diameter);
    }
    print_default_config(matches, &config);

    match run_costs(census_path, output_path.map(PathBuf::as_path), &config) {
        Ok(result) => {
            println!(
                "Wrote {} rows with costs to {} ({} removed while cleaning, {:.1}% without a cost).",
                result.cleaning.remaining,
                result.output_path.display(),
                result.cleaning.removed_invalid + result.cleaning.removed_outliers,
                result.summary.missing_percentage()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Cost synthesis failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let data_path: &PathBuf = matches
        .get_one("data")
        .ok_or_else(|| anyhow::anyhow!("data path is required"))?;

    let mut config = load_config(matches)?;
    if let Some(fraction) = matches.get_one::<f64>("test_fraction") {
        config.split.test_fraction = *fraction;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.split.seed = *seed;
    }
    if let Some(trees) = matches.get_one::<u32>("num_trees") {
        let ModelType::GBDT { num_trees, .. } = &mut config.model.model_type;
        *num_trees = *trees;
    }
    print_default_config(matches, &config);

    let report_path = if matches.get_flag("no_report") {
        None
    } else {
        Some(
            matches
                .get_one::<PathBuf>("report")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("treecost_report.html")),
        )
    };

    match run_train(data_path, &config, report_path.as_deref()) {
        Ok(output) => {
            println!("Mean Absolute Error: ${:.2}", output.mean_absolute_error);
            println!("Feature importance (weight):");
            for line in format_importance(&output) {
                println!("  {}", line);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
