//! End-to-End Integration Tests for the preparation, training and serving paths
//!
//! Everything runs against [`MockLoader`], so no model files or runtime
//! server are needed. A variant against a real runtime server is `#[ignore]`d:
//!
//! ```bash
//! export ENTEL_RUNTIME_URL=http://127.0.0.1:9000
//! cargo test -p entel-mt integration_tests -- --ignored --nocapture
//! ```

#[cfg(test)]
mod tests {
    use super::super::*;
    use entel::{
        LanguagePair, PrepareConfig, RawTable, RequestError, SplitFractions, TranslationRequest,
        bidirectional, load_partitions, prepare, swap, swapped_dir, validate, write_partitions,
    };
    use std::sync::Arc;
    use tempfile::tempdir;

    fn raw_corpus(rows: usize) -> RawTable {
        let mut data: Vec<Vec<String>> = (0..rows)
            .map(|i| vec![format!("Sentence number {}", i), format!("వాక్యం సంఖ్య {}", i)])
            .collect();
        // rows the preparer must drop
        data.push(vec!["Orphan".to_string(), "  ".to_string()]);
        data.push(vec!["".to_string(), "అనాథ".to_string()]);
        RawTable::new(vec!["English".to_string(), "Telugu".to_string()], data)
    }

    #[tokio::test]
    async fn test_e2e_prepare_swap_train_translate() {
        let workspace = tempdir().unwrap();
        let processed = workspace.path().join("processed");
        let output = workspace.path().join("model");

        // 1. Prepare and persist
        let dataset = prepare(&raw_corpus(40), &PrepareConfig::default()).unwrap();
        assert_eq!(dataset.len(), 40);
        let pair = LanguagePair::english_telugu();
        write_partitions(&dataset, &processed).unwrap();

        // 2. Swap into the mirror directory
        let mirror_dir = swapped_dir(&processed);
        write_partitions(&swap(&dataset), &mirror_dir).unwrap();
        assert_eq!(load_partitions(&mirror_dir).unwrap(), swap(&dataset));

        // 3. Train both directions from disk
        let loaded = load_partitions(&processed).unwrap();
        let data = bidirectional(loaded, pair);
        let mut adapter = ModelAdapter::load(
            &MockLoader::new(MockMode::Suffix),
            "mock-nllb",
            AdapterConfig::default(),
        )
        .await
        .unwrap();

        let config = TrainingConfig {
            save_steps: 5,
            eval_steps: 5,
            logging_steps: 5,
            ..TrainingConfig::bidirectional()
        };
        let report = adapter.fit(&data, &config, &output).await.unwrap();

        // 2 × 32 train pairs / batch 4 = 16 steps per epoch
        assert_eq!(report.global_steps, 48);
        assert_eq!(report.checkpoints.len(), 2);
        assert!(output.join("model.json").exists());

        // 4. Serve from the same adapter, now shared read-only
        let adapter = Arc::new(adapter);
        let request = validate(&TranslationRequest::new("Good morning", "en", "te")).unwrap();
        let translated = adapter.translate_request(&request).await.unwrap();
        assert_eq!(translated, "Good morning_tel_Telu");
    }

    #[tokio::test]
    async fn test_e2e_validation_precedes_model() {
        let adapter = ModelAdapter::load(
            &MockLoader::new(MockMode::Error("should never run".to_string())),
            "mock",
            AdapterConfig::default(),
        )
        .await
        .unwrap();

        let cases = [
            (TranslationRequest::new("", "xx", "te"), "empty-input"),
            (TranslationRequest::new("Hello", "en", "en"), "identical-language"),
            (TranslationRequest::new("Hello", "en", "hi"), "unsupported-language"),
        ];
        for (request, kind) in cases {
            let err: RequestError = validate(&request).unwrap_err();
            assert_eq!(err.kind(), kind);
        }

        // a valid request reaches the model and fails there, per call
        let request = validate(&TranslationRequest::new("Hello", "te", "en")).unwrap();
        assert!(matches!(
            adapter.translate_request(&request).await,
            Err(MtError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn test_e2e_tiny_corpus_split() {
        let raw = RawTable::new(
            vec!["English".to_string(), "Telugu".to_string()],
            vec![
                vec!["one".to_string(), "ఒకటి".to_string()],
                vec!["two".to_string(), "".to_string()],
                vec!["three".to_string(), "మూడు".to_string()],
                vec!["four".to_string(), " ".to_string()],
                vec!["five".to_string(), "ఐదు".to_string()],
            ],
        );
        let config = PrepareConfig {
            fractions: SplitFractions::new(0.2, 0.2).unwrap(),
            ..PrepareConfig::default()
        };
        let dataset = prepare(&raw, &config).unwrap();
        assert_eq!(
            (dataset.train.len(), dataset.validation.len(), dataset.test.len()),
            (1, 1, 1)
        );

        let mut adapter =
            ModelAdapter::load(&MockLoader::new(MockMode::Echo), "mock", AdapterConfig::default())
                .await
                .unwrap();
        let dir = tempdir().unwrap();
        let data = vec![entel::DirectedDataset::new(LanguagePair::english_telugu(), dataset)];
        let report = adapter
            .fit(&data, &TrainingConfig::default(), dir.path())
            .await
            .unwrap();
        assert_eq!(report.global_steps, 3);
        assert!(report.checkpoints.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_e2e_real_runtime_translation() {
        if std::env::var("ENTEL_RUNTIME_URL").is_err() {
            eprintln!("⚠️  Skipping: ENTEL_RUNTIME_URL not set");
            return;
        }

        let loader = HttpRuntimeLoader::from_env().unwrap();
        let adapter = ModelAdapter::load(
            &loader,
            "facebook/nllb-200-distilled-600M",
            AdapterConfig::default(),
        )
        .await
        .unwrap();

        let request = validate(&TranslationRequest::new("How are you?", "en", "te")).unwrap();
        let first = adapter.translate_request(&request).await.unwrap();
        let second = adapter.translate_request(&request).await.unwrap();
        println!("🌍 How are you? → {}", first);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
