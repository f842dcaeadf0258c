//! Failure paths: every error propagates and no fallback score is produced.

mod common;

use common::{png_bytes, scripted_scorer, uniform};
use image::{DynamicImage, RgbImage};
use shotspot::{
    AestheticError, AestheticScorer, PipelineError, PromptBank, RawUpload, ScorerConfig,
    StubEncoder, UploadConfig, UploadError, load_scorer, process_upload, score_bytes,
};
use std::sync::Arc;

fn upload(bytes: Vec<u8>, content_type: Option<&str>) -> RawUpload {
    RawUpload {
        id: "err-1".into(),
        category: "landscape".into(),
        content_type: content_type.map(str::to_string),
        bytes,
    }
}

fn scorer() -> AestheticScorer {
    scripted_scorer(uniform(0.25, 0.0))
}

#[test]
fn empty_payload_is_rejected_before_decoding() {
    let err = process_upload(upload(Vec::new(), None), &scorer(), &UploadConfig::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Upload(UploadError::EmptyPayload)));
    assert!(err.is_client_error());
}

#[test]
fn oversized_payload_is_rejected() {
    let cfg = UploadConfig {
        max_bytes: 64,
        ..UploadConfig::default()
    };
    let err = process_upload(upload(png_bytes(32, 32, 1), None), &scorer(), &cfg).unwrap_err();
    match err {
        PipelineError::Upload(UploadError::PayloadTooLarge { max, size }) => {
            assert_eq!(max, 64);
            assert!(size > 64);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_image_content_type_is_rejected() {
    let err = process_upload(
        upload(png_bytes(8, 8, 1), Some("application/pdf")),
        &scorer(),
        &UploadConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Upload(UploadError::UnsupportedContentType(_))
    ));
}

#[test]
fn content_type_parameters_are_ignored() {
    let scored = process_upload(
        upload(png_bytes(8, 8, 1), Some("Image/PNG; charset=binary")),
        &scorer(),
        &UploadConfig::default(),
    )
    .expect("image/png with parameters is accepted");
    assert_eq!((scored.width, scored.height), (8, 8));
}

#[test]
fn corrupt_bytes_are_an_encoding_error() {
    let err = score_bytes("bad", "landscape", b"\x89PNG\r\n\x1a\nnope".to_vec(), &scorer())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Aesthetic(AestheticError::Encoding(_))
    ));
    assert!(err.is_client_error());
}

#[test]
fn images_below_minimum_dimension_are_rejected() {
    let cfg = UploadConfig {
        min_dimension: 16,
        ..UploadConfig::default()
    };
    let err = process_upload(upload(png_bytes(20, 8, 1), None), &scorer(), &cfg).unwrap_err();
    assert_eq!(
        err.to_string(),
        "upload rejected: image is 20x8, minimum dimension is 16px"
    );
}

#[test]
fn zero_size_image_fails_to_evaluate() {
    let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
    let err = scorer().evaluate(&empty, "other").unwrap_err();
    assert!(matches!(err, AestheticError::Encoding(_)));
}

#[test]
fn uninitialized_prompt_bank_is_model_unavailable() {
    let scorer = AestheticScorer::new(
        Arc::new(StubEncoder::new("stub", 32)),
        Arc::new(PromptBank::new()),
    )
    .unwrap();
    assert!(!scorer.is_ready());

    let err = score_bytes("cold", "sunset", png_bytes(8, 8, 1), &scorer).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Aesthetic(AestheticError::ModelUnavailable(_))
    ));
    assert!(!err.is_client_error());
}

#[test]
fn mismatched_bank_and_encoder_are_rejected() {
    let bank = Arc::new(PromptBank::new());
    bank.initialize(&StubEncoder::new("stub-a", 32)).unwrap();

    let err = AestheticScorer::new(Arc::new(StubEncoder::new("stub-b", 32)), bank.clone())
        .unwrap_err();
    assert!(matches!(err, AestheticError::InvalidConfig(_)));

    let err = AestheticScorer::new(Arc::new(StubEncoder::new("stub-a", 48)), bank).unwrap_err();
    assert!(matches!(err, AestheticError::InvalidConfig(_)));
}

#[tokio::test]
async fn missing_model_files_fail_loading() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ScorerConfig {
        visual_model_path: dir.path().join("visual.onnx"),
        text_model_path: dir.path().join("textual.onnx"),
        tokenizer_path: dir.path().join("tokenizer.json"),
        ..ScorerConfig::default()
    };
    let err = load_scorer(&cfg).await.unwrap_err();
    assert!(matches!(err, AestheticError::ModelUnavailable(_)), "{err:?}");
}
