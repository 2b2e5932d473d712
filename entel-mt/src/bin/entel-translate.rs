use clap::{Arg, Command, value_parser};
use entel::{TranslationRequest, validate};
use entel_mt::{
    AdapterConfig, HttpRuntimeLoader, MockLoader, MockMode, ModelAdapter, RuntimeLoader,
};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("entel-translate")
        .version("0.1.0")
        .about("Translate a sentence between English and Telugu")
        .arg(
            Arg::new("text")
                .help("Text to translate")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .help("Source language code (en or te)")
                .default_value("en"),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .short('t')
                .help("Target language code (en or te)")
                .default_value("te"),
        )
        .arg(
            Arg::new("model-name")
                .long("model-name")
                .help("Model identifier or fine-tuned model directory")
                .default_value("facebook/nllb-200-distilled-600M"),
        )
        .arg(
            Arg::new("max-length")
                .long("max-length")
                .help("Maximum generated tokens")
                .default_value("200")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock runtime instead of ENTEL_RUNTIME_URL")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show the resolved language tags and device")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let text = matches.get_one::<String>("text").unwrap();
    let source = matches.get_one::<String>("source").unwrap();
    let target = matches.get_one::<String>("target").unwrap();
    let model_name = matches.get_one::<String>("model-name").unwrap();
    let max_length = *matches.get_one::<usize>("max-length").unwrap();
    let use_mock = matches.get_flag("mock");
    let verbose = matches.get_flag("verbose");

    // 1. Validate before touching the model
    let request = match validate(&TranslationRequest::new(text.as_str(), source, target)) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Err(e.into());
        }
    };

    if verbose {
        println!("📝 Source: \"{}\"", request.text);
        println!(
            "🌍 {} → {} ({} → {})",
            request.pair.source().name(),
            request.pair.target().name(),
            request.source_tag(),
            request.target_tag()
        );
    }

    // 2. Load the model
    let loader: Box<dyn RuntimeLoader> = if use_mock {
        Box::new(MockLoader::new(MockMode::Suffix))
    } else {
        if env::var("ENTEL_RUNTIME_URL").is_err() {
            eprintln!("❌ ENTEL_RUNTIME_URL environment variable not set");
            eprintln!("   Set it with: export ENTEL_RUNTIME_URL=http://127.0.0.1:9000");
            eprintln!("   Or use --mock to use the mock runtime");
            return Err("Missing runtime URL".into());
        }
        Box::new(HttpRuntimeLoader::from_env()?)
    };

    let config = AdapterConfig {
        max_output_length: max_length,
        ..AdapterConfig::default()
    };
    let adapter = ModelAdapter::load(loader.as_ref(), model_name, config).await?;

    if verbose {
        println!("✅ Loaded {} on {}", adapter.model_name(), adapter.device());
        println!();
    }

    // 3. Translate
    let translation = match adapter.translate_request(&request).await {
        Ok(translation) => translation,
        Err(e) => {
            eprintln!("❌ Translation failed: {}", e);
            return Err(e.into());
        }
    };

    if verbose {
        println!("✨ Translation:");
    }
    println!("{}", translation);

    Ok(())
}
