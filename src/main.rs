use clap::{Arg, ArgMatches, Command, value_parser};
use entel::{
    PrepareConfig, SplitFractions, load_partitions, prepare, read_csv, swap, swapped_dir,
    write_partitions,
};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let matches = Command::new("entel")
        .version("0.1.0")
        .about("Prepare English-Telugu parallel corpora for fine-tuning")
        .subcommand_required(true)
        .subcommand(
            Command::new("prepare")
                .about("Clean a CSV corpus and split it into train/val/test TSV files")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .short('i')
                        .help("Path to input CSV file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .short('o')
                        .help("Output directory for processed files")
                        .default_value("processed")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("en-col")
                        .long("en-col")
                        .help("Column name for English text")
                        .default_value("English"),
                )
                .arg(
                    Arg::new("te-col")
                        .long("te-col")
                        .help("Column name for Telugu text")
                        .default_value("Telugu"),
                )
                .arg(
                    Arg::new("test-size")
                        .long("test-size")
                        .help("Fraction of records held out for testing")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("val-size")
                        .long("val-size")
                        .help("Fraction of records held out for validation")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Random seed for the split")
                        .default_value("42")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("swap")
                .about("Write a direction-swapped copy of a processed directory")
                .arg(
                    Arg::new("processed-dir")
                        .long("processed-dir")
                        .short('p')
                        .help("Directory containing train.tsv, val.tsv and test.tsv")
                        .default_value("processed")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .short('o')
                        .help("Output directory (default: <processed-dir>_swapped)")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("prepare", args)) => run_prepare(args),
        Some(("swap", args)) => run_swap(args),
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn run_prepare(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let input = args.get_one::<PathBuf>("input").expect("required");
    let out_dir = args.get_one::<PathBuf>("out-dir").expect("defaulted");

    let config = PrepareConfig {
        source_column: args.get_one::<String>("en-col").expect("defaulted").clone(),
        target_column: args.get_one::<String>("te-col").expect("defaulted").clone(),
        fractions: SplitFractions::new(
            *args.get_one::<f64>("test-size").expect("defaulted"),
            *args.get_one::<f64>("val-size").expect("defaulted"),
        )?,
        seed: *args.get_one::<u64>("seed").expect("defaulted"),
    };

    let table = read_csv(input)?;
    let dataset = prepare(&table, &config)?;
    write_partitions(&dataset, out_dir)?;

    info!("✅ Preprocessing completed. Files saved in {}", out_dir.display());
    Ok(())
}

fn run_swap(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let processed_dir = args.get_one::<PathBuf>("processed-dir").expect("defaulted");
    let out_dir = args
        .get_one::<PathBuf>("out-dir")
        .cloned()
        .unwrap_or_else(|| swapped_dir(processed_dir));

    let dataset = load_partitions(processed_dir)?;
    let mirrored = swap(&dataset);
    write_partitions(&mirrored, &out_dir)?;

    info!(
        "🔁 Swapped {} records from {} into {}",
        mirrored.len(),
        processed_dir.display(),
        out_dir.display()
    );
    Ok(())
}
