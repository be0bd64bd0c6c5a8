mod common;

use common::*;
use pdf_overlay::*;
use std::sync::Arc;

/// Engine stand-in: strokes only become visible once committed
#[derive(Default)]
struct FakeEngine {
    tool: Option<AnnotationKind>,
    pending: Vec<PageInk>,
    committed: Vec<PageInk>,
    commits: usize,
}

impl AnnotationProvider for FakeEngine {
    fn toggle_tool(&mut self, kind: AnnotationKind) {
        self.tool = if self.tool == Some(kind) { None } else { Some(kind) };
    }

    async fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        self.committed.append(&mut self.pending);
        Ok(())
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.committed.clear();
    }

    fn state(&self) -> ProviderState {
        ProviderState {
            active_tool: self.tool,
            pages: self.committed.clone(),
        }
    }
}

fn page_ink(page_index: usize, context: Option<CoordinateSpaceContext>) -> PageInk {
    PageInk {
        page_index,
        strokes: vec![InkStroke::new(
            vec![Point::new(100.0, 200.0), Point::new(300.0, 280.0)],
            StrokeStyle::default(),
        )],
        context,
    }
}

fn letter_context() -> CoordinateSpaceContext {
    CoordinateSpaceContext::capture(816.0, 1056.0, 612.0, 792.0, 2.0, 1.0)
}

async fn store_with_document() -> (Arc<MemoryStore>, DocumentId) {
    let store = Arc::new(MemoryStore::new());
    let id = DocumentId::new("doc");
    store.insert(id.clone(), to_bytes(create_test_pdf(2))).await;
    (store, id)
}

#[tokio::test]
async fn test_capture_waits_for_commit() {
    let (store, id) = store_with_document().await;
    let mut engine = FakeEngine::default();
    engine.toggle_tool(AnnotationKind::Ink);
    engine.pending.push(page_ink(0, Some(letter_context())));

    let captured = capture_annotations(&mut engine, &*store, &id, &BoundsPolicy::default())
        .await
        .unwrap();
    assert_eq!(engine.commits, 1);
    assert_eq!(captured.len(), 1);
    assert_eq!(engine.state().active_tool, Some(AnnotationKind::Ink));

    let pdf_rect = captured[0].pdf_geometry().and_then(|g| g.rect).unwrap();
    assert_eq!(pdf_rect, Rect::new(75.0, 582.0, 225.0, 642.0));

    let record = store.get(&id).await.unwrap();
    assert_eq!(record.annotations, captured);
    assert_eq!(record.export_metadata.version, 1);
}

#[tokio::test]
async fn test_capture_appends_and_keeps_pixel_only_ink() {
    let (store, id) = store_with_document().await;
    let mut engine = FakeEngine::default();
    engine.pending.push(page_ink(0, Some(letter_context())));
    capture_annotations(&mut engine, &*store, &id, &BoundsPolicy::default())
        .await
        .unwrap();

    engine.clear();
    engine.pending.push(page_ink(1, None));
    let captured = capture_annotations(&mut engine, &*store, &id, &BoundsPolicy::default())
        .await
        .unwrap();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].pdf_geometry().is_none());
    assert!(captured[0].context().is_none());

    let record = store.get(&id).await.unwrap();
    assert_eq!(record.annotations.len(), 2);
    assert_eq!(record.export_metadata.version, 2);
}

#[tokio::test]
async fn test_capture_without_ink_writes_nothing() {
    let (store, id) = store_with_document().await;
    let mut engine = FakeEngine::default();
    engine.pending.push(PageInk {
        page_index: 0,
        strokes: Vec::new(),
        context: Some(letter_context()),
    });

    let captured = capture_annotations(&mut engine, &*store, &id, &BoundsPolicy::default())
        .await
        .unwrap();
    assert!(captured.is_empty());
    assert_eq!(store.get(&id).await.unwrap().export_metadata.version, 0);
}

#[tokio::test]
async fn test_record_form_values_bumps_version() {
    let (store, id) = store_with_document().await;
    let mut values = FieldValueMap::new();
    values.insert("Name".to_string(), "Alice".to_string());

    record_form_values(&*store, &id, values.clone()).await.unwrap();
    record_form_values(&*store, &id, values.clone()).await.unwrap();

    let record = store.get(&id).await.unwrap();
    assert_eq!(record.form_field_values, values);
    assert_eq!(record.export_metadata.version, 2);
}

#[test]
fn test_set_pixel_geometry_rederives() {
    let mut record = AnnotationRecord::new(
        0,
        AnnotationKind::Highlight,
        Geometry::from_rect(Rect::new(0.0, 0.0, 80.0, 40.0)),
    )
    .with_context(letter_context(), &BoundsPolicy::default())
    .unwrap();
    let before = record.modified_at;

    record
        .set_pixel_geometry(
            Geometry::from_rect(Rect::new(400.0, 0.0, 480.0, 40.0)),
            &BoundsPolicy::default(),
        )
        .unwrap();
    let rect = record.pdf_geometry().and_then(|g| g.rect).unwrap();
    assert_eq!(rect, Rect::new(300.0, 762.0, 360.0, 792.0));
    assert!(record.modified_at >= before);
}

#[test]
fn test_preview_matches_rendered_size() {
    let record = AnnotationRecord::new(
        0,
        AnnotationKind::Ink,
        Geometry::from_strokes(page_ink(0, None).strokes),
    )
    .with_context(letter_context(), &BoundsPolicy::default())
    .unwrap();

    let png = render_overlay_preview(&[record.clone()], 0, &ExportOptions::default())
        .unwrap()
        .unwrap();
    let preview = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(preview.dimensions(), (816, 1056));
    assert!(preview.get_pixel(200, 240)[3] > 0);
    assert_eq!(preview.get_pixel(10, 10)[3], 0);

    // Nothing on page 1
    assert!(
        render_overlay_preview(&[record], 1, &ExportOptions::default())
            .unwrap()
            .is_none()
    );
}
