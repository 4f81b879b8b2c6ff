//! Tests for the build phase run at startup.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use ground_rag::mock::{MockEmbeddingProvider, MockLanguageModel};
use ground_rag::{PipelinePhase, RagError};
use ground_rag_cli::{Cli, build_pipeline};

fn cli_for(data: &Path, index: &Path) -> Cli {
    Cli::parse_from([
        "ground-rag",
        "--data-dir",
        data.to_str().unwrap(),
        "--index-dir",
        index.to_str().unwrap(),
    ])
}

#[tokio::test]
async fn progress_lines_follow_the_build_order() {
    let temp = tempfile::tempdir().unwrap();
    let data = temp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("a.txt"), "The sky is blue. Grass is green.").unwrap();
    let cli = cli_for(&data, &temp.path().join("index"));

    let mut out = Vec::new();
    let pipeline = build_pipeline(
        &cli,
        Arc::new(MockEmbeddingProvider::new(32)),
        Arc::new(MockLanguageModel::new("ok")),
        &mut out,
    )
    .await
    .unwrap();
    let output = String::from_utf8(out).unwrap();

    let loading = output.find("Loading & chunking documents...").unwrap();
    let opening = output.find("Creating / loading vector store...").unwrap();
    assert!(loading < opening);
    assert!(output.contains("  -> 1 chunks from 1 files"));
    assert_eq!(pipeline.phase(), PipelinePhase::Ready);
}

#[tokio::test]
async fn missing_data_folder_stops_before_the_index_is_opened() {
    let temp = tempfile::tempdir().unwrap();
    let cli = cli_for(&temp.path().join("data"), &temp.path().join("index"));

    let mut out = Vec::new();
    let result = build_pipeline(
        &cli,
        Arc::new(MockEmbeddingProvider::new(32)),
        Arc::new(MockLanguageModel::new("ok")),
        &mut out,
    )
    .await;
    let Err(err) = result else {
        panic!("build succeeded without a data folder");
    };
    let output = String::from_utf8(out).unwrap();

    assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::SourceNotFound { .. })));
    assert!(output.contains("Loading & chunking documents..."));
    assert!(!output.contains("Creating / loading vector store..."));
}
