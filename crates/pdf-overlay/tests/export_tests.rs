mod common;

use common::*;
use pdf_overlay::*;
use std::sync::Arc;

fn letter_context() -> CoordinateSpaceContext {
    CoordinateSpaceContext::capture(816.0, 1056.0, 612.0, 792.0, 2.0, 1.0)
}

fn signature(ctx: Option<CoordinateSpaceContext>) -> AnnotationRecord {
    let stroke = InkStroke::new(
        vec![
            Point::new(100.0, 260.0),
            Point::new(160.0, 200.0),
            Point::new(220.0, 280.0),
            Point::new(300.0, 230.0),
        ],
        StrokeStyle::default(),
    );
    let record = AnnotationRecord::new(0, AnnotationKind::Ink, Geometry::from_strokes(vec![stroke]));
    match ctx {
        Some(ctx) => record.with_context(ctx, &BoundsPolicy::default()).unwrap(),
        None => record,
    }
}

fn values(pairs: &[(&str, &str)]) -> FieldValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn setup(doc: lopdf::Document) -> (ExportPipeline<MemoryStore>, DocumentId) {
    let store = Arc::new(MemoryStore::new());
    let id = DocumentId::new("doc-1");
    store.insert(id.clone(), to_bytes(doc)).await;
    (ExportPipeline::new(store, ExportOptions::default()), id)
}

fn field_value(bytes: &[u8], name: &str) -> Option<String> {
    let mut pdf = PdfHandle::load(bytes).unwrap();
    let form = pdf.form().unwrap();
    form.value(name)
}

#[tokio::test]
async fn test_repeated_export_is_identical() {
    let (pipeline, id) = setup(create_form_pdf()).await;
    let store = pipeline.store().clone();
    record_form_values(&*store, &id, values(&[("Name", "Alice"), ("Hotline", "YES")]))
        .await
        .unwrap();
    store
        .put_annotations(&id, vec![signature(Some(letter_context()))])
        .await
        .unwrap();

    let first = pipeline.export(&id).await.unwrap();
    let second = pipeline.export(&id).await.unwrap();

    assert_eq!(second.metadata.version, first.metadata.version + 1);
    assert_eq!(first.report.annotations_applied, 1);
    assert_eq!(first.report.fill.filled_count, 2);

    let first_doc = lopdf::Document::load_mem(&first.bytes).unwrap();
    let second_doc = lopdf::Document::load_mem(&second.bytes).unwrap();
    assert_eq!(first_page_content(&first_doc), first_page_content(&second_doc));
    let first_images = image_streams(&first_doc);
    assert_eq!(first_images.len(), 2, "signature and its soft mask");
    assert_eq!(first_images, image_streams(&second_doc));
    assert_eq!(field_value(&first.bytes, "Name").as_deref(), Some("Alice"));
    assert_eq!(field_value(&second.bytes, "Name").as_deref(), Some("Alice"));
    assert_eq!(field_value(&second.bytes, "Hotline").as_deref(), Some("Yes"));
}

#[tokio::test]
async fn test_export_never_touches_original() {
    let original = to_bytes(create_form_pdf());
    let store = Arc::new(MemoryStore::new());
    let id = DocumentId::new("doc-1");
    store.insert(id.clone(), original.clone()).await;
    store
        .put_form_field_values(&id, values(&[("Name", "Bob")]))
        .await
        .unwrap();

    let pipeline = ExportPipeline::new(store.clone(), ExportOptions::default());
    let artifact = pipeline.export(&id).await.unwrap();
    assert_ne!(artifact.bytes, original);

    let record = store.get(&id).await.unwrap();
    assert_eq!(&*record.original, original.as_slice());
    assert_eq!(record.export_metadata, artifact.metadata);
    assert!(record.export_metadata.last_exported_at.is_some());
}

#[tokio::test]
async fn test_stages_in_order() {
    let (pipeline, id) = setup(create_form_pdf()).await;
    let options = ExportOptions {
        flatten: true,
        ..ExportOptions::default()
    };
    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    assert_eq!(
        artifact.stages,
        vec![
            ExportStage::LoadingOriginal,
            ExportStage::ApplyingFormData,
            ExportStage::ApplyingAnnotations,
            ExportStage::Flattening,
            ExportStage::Saved,
        ]
    );
}

#[tokio::test]
async fn test_no_matching_fields_is_fatal() {
    let (pipeline, id) = setup(create_form_pdf()).await;
    pipeline
        .store()
        .put_form_field_values(&id, values(&[("Ghost", "x"), ("Phantom", "y")]))
        .await
        .unwrap();

    let err = pipeline.export(&id).await.unwrap_err();
    assert_eq!(err.stage, ExportStage::ApplyingFormData);
    assert!(matches!(err.source, OverlayError::NoFieldsFilled { attempted: 2 }));
    assert!(err.to_string().starts_with("export failed while applying form data"));

    // Nothing durable happened
    let record = pipeline.store().get(&id).await.unwrap();
    assert_eq!(record.export_metadata.version, 0);
}

#[tokio::test]
async fn test_values_without_form_is_fatal() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    pipeline
        .store()
        .put_form_field_values(&id, values(&[("Name", "Alice")]))
        .await
        .unwrap();

    let err = pipeline.export(&id).await.unwrap_err();
    assert!(matches!(err.source, OverlayError::NoFieldsFilled { attempted: 1 }));
}

#[tokio::test]
async fn test_some_missing_fields_are_not_fatal() {
    let (pipeline, id) = setup(create_form_pdf()).await;
    pipeline
        .store()
        .put_form_field_values(&id, values(&[("Name", "Alice"), ("Ghost", "x")]))
        .await
        .unwrap();

    let artifact = pipeline.export(&id).await.unwrap();
    assert_eq!(artifact.report.fill.missing, vec!["Ghost".to_string()]);
    assert!(!artifact.report.is_clean());
}

#[tokio::test]
async fn test_invalid_header_fails_while_loading() {
    let store = Arc::new(MemoryStore::new());
    let id = DocumentId::new("junk");
    store.insert(id.clone(), b"GIF89a not a pdf".to_vec()).await;
    let pipeline = ExportPipeline::new(store, ExportOptions::default());

    let err = pipeline.export(&id).await.unwrap_err();
    assert_eq!(err.stage, ExportStage::LoadingOriginal);
    assert!(matches!(err.source, OverlayError::InvalidDocument(_)));
}

#[tokio::test]
async fn test_unknown_document() {
    let pipeline = ExportPipeline::new(Arc::new(MemoryStore::new()), ExportOptions::default());
    let err = pipeline.export(&DocumentId::new("nope")).await.unwrap_err();
    assert_eq!(err.stage, ExportStage::LoadingOriginal);
    assert!(matches!(err.source, OverlayError::DocumentNotFound(_)));
}

#[tokio::test]
async fn test_unusable_annotations_are_skipped() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    let empty = AnnotationRecord::new(0, AnnotationKind::Ink, Geometry::default()).with_id("empty");
    let no_context = signature(None).with_id("no-context");
    let off_page = AnnotationRecord::new(
        7,
        AnnotationKind::Ink,
        signature(None).pixel_geometry().clone(),
    )
    .with_id("off-page")
    .with_context(letter_context(), &BoundsPolicy::default())
    .unwrap();
    pipeline
        .store()
        .put_annotations(&id, vec![empty, no_context, off_page, signature(Some(letter_context()))])
        .await
        .unwrap();

    let artifact = pipeline.export(&id).await.unwrap();
    assert_eq!(artifact.report.annotations_applied, 1);
    let skipped: Vec<&str> = artifact
        .report
        .skipped_annotations
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(skipped, vec!["empty", "no-context", "off-page"]);
}

#[tokio::test]
async fn test_placement_follows_export_bounds_policy() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    let stroke = InkStroke::new(
        vec![Point::new(100.0, 100.0), Point::new(150.0, 140.0), Point::new(200.0, 120.0)],
        StrokeStyle::default(),
    );
    // 150x40 rect over 100x40 of strokes: kept under the default 2x inflation
    let geometry = Geometry {
        rect: Some(Rect::new(75.0, 100.0, 225.0, 140.0)),
        strokes: vec![stroke],
    };
    let annotation = AnnotationRecord::new(0, AnnotationKind::Ink, geometry)
        .with_context(CoordinateSpaceContext::identity(612.0, 792.0), &BoundsPolicy::default())
        .unwrap();
    let stored_rect = annotation.pdf_geometry().and_then(|g| g.rect).unwrap();
    assert_eq!(stored_rect.width(), 150.0);
    pipeline.store().put_annotations(&id, vec![annotation]).await.unwrap();

    let options = ExportOptions {
        supersample: 1.0,
        padding: 0.0,
        bounds: BoundsPolicy {
            max_rect_inflation: 1.2,
            ..BoundsPolicy::default()
        },
        ..ExportOptions::default()
    };
    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    assert_eq!(artifact.report.annotations_applied, 1);

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert_eq!(image_sizes(&doc), vec![(100, 40), (100, 40)]);
    let content = first_page_content(&doc);
    assert!(content.contains("q 100 0 0 40 100 652 cm"), "{content}");
}

#[tokio::test]
async fn test_flat_signature_is_skipped() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    let line = InkStroke::new(
        vec![Point::new(100.0, 200.0), Point::new(300.0, 200.0)],
        StrokeStyle::default(),
    );
    let annotation = AnnotationRecord::new(0, AnnotationKind::Ink, Geometry::from_strokes(vec![line]))
        .with_id("flat")
        .with_context(letter_context(), &BoundsPolicy::default())
        .unwrap();
    pipeline.store().put_annotations(&id, vec![annotation]).await.unwrap();

    let artifact = pipeline.export(&id).await.unwrap();
    assert_eq!(artifact.report.annotations_applied, 0);
    assert_eq!(artifact.report.skipped_annotations.len(), 1);
    assert_eq!(artifact.report.skipped_annotations[0].id, "flat");
    assert!(artifact.report.skipped_annotations[0].reason.contains("no area"));

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert!(image_sizes(&doc).is_empty());
    assert!(!first_page_content(&doc).contains(" cm"));
}

#[tokio::test]
async fn test_unpositioned_policy_embeds_without_context() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    pipeline
        .store()
        .put_annotations(&id, vec![signature(None)])
        .await
        .unwrap();

    let options = ExportOptions {
        missing_context: MissingContextPolicy::Unpositioned,
        ..ExportOptions::default()
    };
    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    assert_eq!(artifact.report.annotations_applied, 1);
    assert_eq!(artifact.report.annotations_degraded, 1);

    // Pixels treated as points: 200 wide, top edge at 792 - 200
    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert!(first_page_content(&doc).contains("q 200 0 0 80 100 512 cm"));
}

#[tokio::test]
async fn test_highlight_and_text_are_drawn() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    let ctx = CoordinateSpaceContext::identity(612.0, 792.0);
    let highlight = AnnotationRecord::new(
        0,
        AnnotationKind::Highlight,
        Geometry::from_rect(Rect::new(50.0, 92.0, 250.0, 112.0)),
    )
    .with_style(StrokeStyle {
        color: Color::YELLOW,
        stroke_width: 1.0,
        opacity: 0.4,
    })
    .with_context(ctx, &BoundsPolicy::default())
    .unwrap();
    let note = AnnotationRecord::new(
        0,
        AnnotationKind::Text,
        Geometry::from_rect(Rect::new(300.0, 92.0, 500.0, 140.0)),
    )
    .with_contents("Reviewed")
    .with_context(ctx, &BoundsPolicy::default())
    .unwrap();
    let blank_note = AnnotationRecord::new(
        0,
        AnnotationKind::Text,
        Geometry::from_rect(Rect::new(300.0, 300.0, 500.0, 340.0)),
    )
    .with_id("blank")
    .with_context(ctx, &BoundsPolicy::default())
    .unwrap();
    pipeline
        .store()
        .put_annotations(&id, vec![highlight, note, blank_note])
        .await
        .unwrap();

    let artifact = pipeline.export(&id).await.unwrap();
    assert_eq!(artifact.report.annotations_applied, 2);
    assert_eq!(artifact.report.skipped_annotations[0].id, "blank");

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    let content = first_page_content(&doc);
    assert!(content.contains("1 1 0 rg 50 680 200 20 re f"), "{content}");
    assert!(content.contains("(Reviewed) Tj"), "{content}");
}

#[tokio::test]
async fn test_flatten_removes_interactive_form() {
    let (pipeline, id) = setup(create_form_pdf()).await;
    pipeline
        .store()
        .put_form_field_values(&id, values(&[("Name", "Alice")]))
        .await
        .unwrap();
    let options = ExportOptions {
        flatten: true,
        ..ExportOptions::default()
    };

    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    assert!(artifact.report.flattened);
    assert!(artifact.metadata.flattened);

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert!(!has_acroform(&doc));
}

#[tokio::test]
async fn test_flatten_is_tolerated_without_form() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    let options = ExportOptions {
        flatten: true,
        ..ExportOptions::default()
    };
    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    assert!(!artifact.report.flattened);
    assert!(artifact.report.warnings.is_empty());
}

#[tokio::test]
async fn test_stale_appearances_block_flatten() {
    let (pipeline, id) = setup(create_form_pdf_without_name_rect()).await;
    pipeline
        .store()
        .put_form_field_values(&id, values(&[("Name", "Alice")]))
        .await
        .unwrap();

    let options = ExportOptions {
        flatten: true,
        ..ExportOptions::default()
    };
    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    assert!(artifact.report.fill.appearance_failure.is_some());
    assert!(!artifact.report.flattened);
    assert_eq!(artifact.report.warnings.len(), 1);
    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert!(has_acroform(&doc));

    let forced = ExportOptions {
        flatten_with_stale_appearances: true,
        ..options
    };
    let artifact = pipeline.export_with(&id, &forced).await.unwrap();
    assert!(artifact.report.flattened);
}

#[tokio::test]
async fn test_preview_is_attached_on_request() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    pipeline
        .store()
        .put_annotations(&id, vec![signature(Some(letter_context()))])
        .await
        .unwrap();

    let options = ExportOptions {
        preview_page: Some(0),
        ..ExportOptions::default()
    };
    let artifact = pipeline.export_with(&id, &options).await.unwrap();
    let png = artifact.preview_png.expect("preview requested");
    let preview = image::load_from_memory(&png).unwrap();
    assert_eq!((preview.width(), preview.height()), (816, 1056));

    let artifact = pipeline.export(&id).await.unwrap();
    assert!(artifact.preview_png.is_none());
}

#[tokio::test]
async fn test_artifact_goes_stale_after_edit() {
    let (pipeline, id) = setup(create_form_pdf()).await;
    let artifact = pipeline.export(&id).await.unwrap();
    let current = pipeline.store().get(&id).await.unwrap().export_metadata;
    assert!(!artifact.is_stale(&current));

    record_form_values(&**pipeline.store(), &id, values(&[("Name", "Carol")]))
        .await
        .unwrap();
    let current = pipeline.store().get(&id).await.unwrap().export_metadata;
    assert!(artifact.is_stale(&current));
}

#[tokio::test]
async fn test_invalid_options_are_rejected() {
    let (pipeline, id) = setup(create_test_pdf(1)).await;
    let options = ExportOptions {
        supersample: 0.5,
        ..ExportOptions::default()
    };
    let err = pipeline.export_with(&id, &options).await.unwrap_err();
    assert!(matches!(err.source, OverlayError::Config(_)));
}
