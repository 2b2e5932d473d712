use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use entel::{
    DirectedDataset, LanguagePair, bidirectional, load_dataset, load_partitions, swapped_dir,
};
use entel_mt::{
    AdapterConfig, HttpRuntimeLoader, Hyperparameters, MockLoader, MockMode, ModelAdapter,
    RuntimeLoader, TrainingConfig,
};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let matches = Command::new("entel-train")
        .version("0.1.0")
        .about("Fine-tune a translation model on prepared English-Telugu data")
        .arg(
            Arg::new("train")
                .long("train")
                .help("Training partition TSV")
                .value_parser(value_parser!(PathBuf))
                .requires_all(["val", "test"])
                .conflicts_with("processed-dir"),
        )
        .arg(
            Arg::new("val")
                .long("val")
                .help("Validation partition TSV")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("test")
                .long("test")
                .help("Test partition TSV")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("processed-dir")
                .long("processed-dir")
                .help("Directory with train.tsv, val.tsv and test.tsv")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("bidirectional")
                .long("bidirectional")
                .help("Also train the reverse direction from <processed-dir>_swapped")
                .requires("processed-dir")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .short('o')
                .help("Directory for checkpoints and the final model")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("model-name")
                .long("model-name")
                .help("Pretrained model identifier")
                .default_value("facebook/nllb-200-distilled-600M"),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .default_value("4")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("epochs")
                .long("epochs")
                .default_value("3")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("learning-rate")
                .long("learning-rate")
                .default_value("5e-5")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("max-length")
                .long("max-length")
                .help("Max tokens per source or target sequence")
                .default_value("128")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("save-steps")
                .long("save-steps")
                .default_value("500")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("eval-steps")
                .long("eval-steps")
                .default_value("500")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("save-total-limit")
                .long("save-total-limit")
                .help("Checkpoints to keep (default: 3, or 2 with --bidirectional)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the in-process mock runtime instead of ENTEL_RUNTIME_URL")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let data = load_training_data(&matches)?;
    let config = training_config(&matches);
    let output_dir = matches.get_one::<PathBuf>("output-dir").unwrap();
    let model_name = matches.get_one::<String>("model-name").unwrap();

    let loader: Box<dyn RuntimeLoader> = if matches.get_flag("mock") {
        Box::new(MockLoader::new(MockMode::Echo))
    } else {
        Box::new(HttpRuntimeLoader::from_env()?)
    };

    let mut adapter =
        ModelAdapter::load(loader.as_ref(), model_name, AdapterConfig::default()).await?;
    let report = adapter.fit(&data, &config, output_dir).await?;

    info!(
        "📦 {} steps, train loss {:.4}, eval loss {}, test loss {}",
        report.global_steps,
        report.train_loss,
        format_loss(report.eval_loss),
        format_loss(report.test_loss)
    );
    Ok(())
}

fn load_training_data(
    matches: &ArgMatches,
) -> Result<Vec<DirectedDataset>, Box<dyn std::error::Error>> {
    let pair = LanguagePair::english_telugu();

    if let Some(dir) = matches.get_one::<PathBuf>("processed-dir") {
        if matches.get_flag("bidirectional") {
            let forward = load_partitions(dir)?;
            let mirror_dir = swapped_dir(dir);
            // reuse a swapped copy written by `entel swap` when present
            if mirror_dir.exists() {
                let mirrored = load_partitions(&mirror_dir)?;
                return Ok(vec![
                    DirectedDataset::new(pair, forward),
                    DirectedDataset::new(pair.reversed(), mirrored),
                ]);
            }
            return Ok(bidirectional(forward, pair));
        }
        return Ok(vec![DirectedDataset::new(pair, load_partitions(dir)?)]);
    }

    match (
        matches.get_one::<PathBuf>("train"),
        matches.get_one::<PathBuf>("val"),
        matches.get_one::<PathBuf>("test"),
    ) {
        (Some(train), Some(val), Some(test)) => Ok(vec![DirectedDataset::new(
            pair,
            load_dataset(train, val, test)?,
        )]),
        _ => Err("pass either --processed-dir or all of --train, --val and --test".into()),
    }
}

fn training_config(matches: &ArgMatches) -> TrainingConfig {
    let base = if matches.get_flag("bidirectional") {
        TrainingConfig::bidirectional()
    } else {
        TrainingConfig::default()
    };

    TrainingConfig {
        hyperparameters: Hyperparameters {
            epochs: *matches.get_one::<usize>("epochs").unwrap(),
            batch_size: *matches.get_one::<usize>("batch-size").unwrap(),
            learning_rate: *matches.get_one::<f64>("learning-rate").unwrap(),
            max_sequence_length: *matches.get_one::<usize>("max-length").unwrap(),
        },
        save_steps: *matches.get_one::<u64>("save-steps").unwrap(),
        eval_steps: *matches.get_one::<u64>("eval-steps").unwrap(),
        save_total_limit: matches
            .get_one::<usize>("save-total-limit")
            .copied()
            .or(base.save_total_limit),
        ..base
    }
}

fn format_loss(loss: Option<f32>) -> String {
    loss.map(|l| format!("{:.4}", l))
        .unwrap_or_else(|| "n/a".to_string())
}
