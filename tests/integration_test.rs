//! Integration tests for octopus.
//!
//! Builds pipelines from configuration files on disk with the built-in
//! components and a small medical lexicon.
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::too_many_lines,
    clippy::doc_markdown
)]

use octopus::config::checkpoint_path;
use octopus::{Checkpoint, Error, MemorySample, Mode, PipelineFactory, Registry};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes a medical lexicon into `<root>/data`.
fn write_lexicon(root: &Path) -> PathBuf {
    let data_dir = root.join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(
        data_dir.join("domain_medical_terms.json"),
        json!({"患者": "patient", "紧急": "urgent"}).to_string(),
    )
    .unwrap();
    std::fs::write(
        data_dir.join("domain_medical_rules.json"),
        json!([{"source_pattern": "需要", "target_pattern": "需"}]).to_string(),
    )
    .unwrap();
    std::fs::write(
        data_dir.join("domain_medical_abbreviations.json"),
        json!({"心梗": "心肌梗死"}).to_string(),
    )
    .unwrap();
    data_dir
}

/// A four-subnet document; `coordinator` is supplied by the caller.
fn document(root: &Path, coordinator: serde_json::Value) -> serde_json::Value {
    json!({
        "domain": "medical",
        "data_dir": write_lexicon(root),
        "memory_dir": root.join("memory"),
        "adapters": {
            "source": "chinese_v1",
            "target": "english_v1",
            "source_params": {"embed_dim": 32, "max_seq_len": 16},
            "target_params": {"embed_dim": 32, "max_seq_len": 16}
        },
        "subnets": [
            {"name": "lexical_v1"},
            {"name": "syntax_v1"},
            {"name": "context_v1"},
            {"name": "domain_v1"}
        ],
        "coordinator": coordinator
    })
}

fn pinned(index: usize) -> serde_json::Value {
    let mut weights = vec![0.0; 4];
    weights[index] = 1.0;
    json!({"name": "fixed_weight_v1", "params": {"weights": weights}})
}

fn attention() -> serde_json::Value {
    json!({"name": "attention_v1", "params": {"hidden_dim": 16, "seed": 3}})
}

fn build(doc: &serde_json::Value) -> octopus::Pipeline {
    PipelineFactory::new(Registry::global())
        .build_from_value(doc)
        .unwrap()
}

#[test]
fn test_build_from_yaml_file() {
    let dir = TempDir::new().unwrap();
    let data_dir = write_lexicon(dir.path());
    let config_path = dir.path().join("zh2en_medical.yaml");
    std::fs::write(
        &config_path,
        format!(
            "domain: medical\n\
             data_dir: {}\n\
             memory_dir: {}\n\
             adapters:\n  source: chinese_v1\n  target: english_v1\n\
             subnets:\n  - name: lexical_v1\n  - name: domain_v1\n\
             coordinator:\n  name: attention_v1\n",
            data_dir.display(),
            dir.path().join("memory").display()
        ),
    )
    .unwrap();

    let pipeline = PipelineFactory::new(Registry::global())
        .build_from_file(&config_path)
        .unwrap();
    assert_eq!(pipeline.subnet_names(), vec!["lexical_v1", "domain_v1"]);
    assert_eq!(pipeline.source_adapter().embed_dim(), 768);
    assert_eq!(pipeline.fuser().embed_dim(), 768);
    assert!(!pipeline.translate("心梗患者需要紧急处理", "").unwrap().is_empty());
}

#[test]
fn test_domain_subnet_translates_terms() {
    let dir = TempDir::new().unwrap();
    let pipeline = build(&document(dir.path(), pinned(3)));
    assert_eq!(pipeline.translate("患者", "").unwrap(), "patient");
}

#[test]
fn test_syntax_subnet_applies_rules() {
    let dir = TempDir::new().unwrap();
    let pipeline = build(&document(dir.path(), pinned(1)));
    assert_eq!(
        pipeline.translate("心梗需要处理", "").unwrap(),
        "心肌梗死需处理"
    );
}

#[test]
fn test_context_subnet_resolves_pronouns() {
    let dir = TempDir::new().unwrap();
    let pipeline = build(&document(dir.path(), pinned(2)));
    assert_eq!(
        pipeline.translate("他需要手术", "心梗").unwrap(),
        "心肌梗死. the patient需要手术"
    );
    assert_eq!(pipeline.translate("它", "").unwrap(), "the object");
}

#[test]
fn test_lexical_subnet_uses_memory() {
    let dir = TempDir::new().unwrap();
    let pipeline = build(&document(dir.path(), pinned(0)));
    let before = pipeline.translate("心梗", "").unwrap();
    assert_ne!(before, "myocardial infarction");

    pipeline
        .update_memory(&[MemorySample::new("心肌梗死", "myocardial infarction")])
        .unwrap();
    assert_eq!(
        pipeline.translate("心梗", "").unwrap(),
        "myocardial infarction"
    );
}

#[test]
fn test_memory_survives_rebuild() {
    let dir = TempDir::new().unwrap();
    let doc = document(dir.path(), attention());
    {
        let pipeline = build(&doc);
        pipeline
            .update_memory(&[
                MemorySample::new("患者", "patient"),
                MemorySample::new("紧急", "urgent").with_context("ward"),
            ])
            .unwrap();
    }

    for stem in ["lexical", "syntax", "context", "domain"] {
        assert!(
            dir.path()
                .join("memory")
                .join(format!("{stem}_medical.json"))
                .exists()
        );
    }

    let pipeline = build(&doc);
    for unit in 0..pipeline.subnet_count() {
        let recent = pipeline.recent_memory(unit, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].context.as_deref(), Some("ward"));
    }
    let last = pipeline.recent_memory(0, 1).unwrap();
    assert_eq!(last, vec![MemorySample::new("紧急", "urgent").with_context("ward")]);
}

#[test]
fn test_translate_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let doc = document(dir.path(), attention());
    let first = build(&doc);
    let second = build(&doc);
    let text = "心梗患者需要紧急处理";
    let a = first.translate(text, "急诊").unwrap();
    assert_eq!(first.translate(text, "急诊").unwrap(), a);
    assert_eq!(second.translate(text, "急诊").unwrap(), a);
}

#[test]
fn test_checkpoint_roundtrip_and_mismatch() {
    let dir = TempDir::new().unwrap();
    let doc = document(dir.path(), attention());
    let path = dir.path().join("checkpoints").join("model.ckpt");

    let pipeline = build(&doc);
    pipeline.save(&path).unwrap();
    let checkpoint = Checkpoint::read(&path).unwrap();
    assert_eq!(checkpoint.subnets.len(), 4);

    let mut other_seed = doc.clone();
    other_seed["coordinator"]["params"]["seed"] = json!(99);
    let mut restored = build(&other_seed);
    restored.load(&path).unwrap();
    assert_eq!(restored.checkpoint().unwrap(), pipeline.checkpoint().unwrap());
    assert_eq!(
        restored.translate("心梗患者", "").unwrap(),
        pipeline.translate("心梗患者", "").unwrap()
    );

    let mut smaller = doc.clone();
    smaller["subnets"] = json!([{"name": "lexical_v1"}, {"name": "syntax_v1"}, {"name": "domain_v1"}]);
    let mut three = build(&smaller);
    match three.load(&path) {
        Err(Error::StateMismatch { expected, found }) => {
            assert_eq!(expected, 3);
            assert_eq!(found, 4);
        },
        other => panic!("expected StateMismatch, got {other:?}"),
    }
}

#[test]
fn test_checkpoint_rejects_wrong_subnet_kind() {
    let dir = TempDir::new().unwrap();
    let doc = document(dir.path(), attention());
    let path = dir.path().join("model.ckpt");
    build(&doc).save(&path).unwrap();

    let mut reordered = doc.clone();
    reordered["subnets"] = json!([
        {"name": "domain_v1"},
        {"name": "syntax_v1"},
        {"name": "context_v1"},
        {"name": "lexical_v1"}
    ]);
    let mut pipeline = build(&reordered);
    let before = pipeline.checkpoint().unwrap();
    assert!(pipeline.load(&path).is_err());
    assert_eq!(pipeline.checkpoint().unwrap(), before);
}

#[test]
fn test_train_then_translate_from_config_checkpoint() {
    let dir = TempDir::new().unwrap();
    let doc = document(dir.path(), pinned(0));
    let checkpoint = dir
        .path()
        .join(checkpoint_path(Path::new("configs/zh2en_medical.yaml")));
    let data: Vec<MemorySample> = serde_json::from_value(json!([
        {"src": "心肌梗死", "tgt": "myocardial infarction"},
        {"src": "患者", "tgt": "the patient", "context": "ward"}
    ]))
    .unwrap();

    let mut trainer = build(&doc);
    trainer.set_mode(Mode::Training);
    trainer.update_memory(&data).unwrap();
    trainer.save(&checkpoint).unwrap();
    assert!(checkpoint.ends_with("models/zh2en_medical.ckpt"));

    let mut translator = build(&doc);
    translator.load(&checkpoint).unwrap();
    translator.set_mode(Mode::Inference);
    assert_eq!(translator.mode(), Mode::Inference);
    assert_eq!(
        translator.translate("心梗", "").unwrap(),
        "myocardial infarction"
    );
    assert_eq!(translator.recent_memory(0, 5).unwrap(), data);
}

#[test]
fn test_set_mode_keeps_output() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = build(&document(dir.path(), attention()));
    let inference = pipeline.translate("患者", "").unwrap();
    pipeline.set_mode(Mode::Training);
    assert_eq!(pipeline.mode(), Mode::Training);
    assert_eq!(pipeline.translate("患者", "").unwrap(), inference);
}

#[tokio::test]
async fn test_concurrent_equals_sequential() {
    let dir = TempDir::new().unwrap();
    let pipeline = build(&document(dir.path(), attention()));
    for (text, context) in [
        ("心梗患者需要紧急处理", ""),
        ("他需要手术", "心梗"),
        ("", ""),
    ] {
        let sequential = pipeline.translate(text, context).unwrap();
        let concurrent = pipeline.translate_concurrent(text, context).await.unwrap();
        assert_eq!(concurrent, sequential);
    }
}
