#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// Letter-sized pages with a trivial content stream
pub fn create_test_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => Dictionary::new(),
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn first_page(doc: &Document) -> ObjectId {
    *doc.get_pages().values().next().expect("document has pages")
}

fn catalog_id(doc: &Document) -> ObjectId {
    doc.trailer
        .get(b"Root")
        .and_then(|r| r.as_reference())
        .expect("trailer has a root")
}

fn add_widget(doc: &mut Document, page_id: ObjectId, mut widget: Dictionary) -> ObjectId {
    widget.set("Type", "Annot");
    widget.set("Subtype", "Widget");
    widget.set("P", page_id);
    let id = doc.add_object(widget);

    let page = doc.get_dictionary_mut(page_id).expect("page dictionary");
    let mut annots = page
        .get(b"Annots")
        .and_then(|a| a.as_array())
        .cloned()
        .unwrap_or_default();
    annots.push(Object::Reference(id));
    page.set("Annots", annots);
    id
}

/// One-page document with a form:
///
/// - `Name`: text field
/// - `Hotline`: checkbox without appearance streams
/// - `Color`: combo box with options Red, Green, Blue
/// - `Size`: radio group with on-states S and M
/// - `Submit`: push button
pub fn create_form_pdf() -> Document {
    let mut doc = create_test_pdf(1);
    let page_id = first_page(&doc);

    let name = add_widget(
        &mut doc,
        page_id,
        dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("Name"),
            "Rect" => vec![100.into(), 700.into(), 300.into(), 720.into()],
            "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        },
    );
    let hotline = add_widget(
        &mut doc,
        page_id,
        dictionary! {
            "FT" => "Btn",
            "T" => Object::string_literal("Hotline"),
            "Rect" => vec![100.into(), 650.into(), 115.into(), 665.into()],
            "V" => "Off",
            "AS" => "Off",
        },
    );
    let color = add_widget(
        &mut doc,
        page_id,
        dictionary! {
            "FT" => "Ch",
            "Ff" => 1 << 17,
            "T" => Object::string_literal("Color"),
            "Rect" => vec![100.into(), 600.into(), 200.into(), 620.into()],
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
            "Opt" => vec![
                Object::string_literal("Red"),
                Object::string_literal("Green"),
                Object::string_literal("Blue"),
            ],
        },
    );
    let submit = add_widget(
        &mut doc,
        page_id,
        dictionary! {
            "FT" => "Btn",
            "Ff" => 1 << 16,
            "T" => Object::string_literal("Submit"),
            "Rect" => vec![400.into(), 50.into(), 480.into(), 70.into()],
        },
    );

    let size = doc.new_object_id();
    let mut size_kids = Vec::new();
    for (state, x) in [("S", 100), ("M", 130)] {
        let on = doc.add_object(Stream::new(Dictionary::new(), b"0 g 0 0 10 10 re f".to_vec()));
        let off = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let mut normal = Dictionary::new();
        normal.set(state, on);
        normal.set("Off", off);
        let kid = add_widget(
            &mut doc,
            page_id,
            dictionary! {
                "Parent" => size,
                "Rect" => vec![x.into(), 550.into(), (x + 10).into(), 560.into()],
                "AS" => "Off",
                "AP" => dictionary! { "N" => normal },
            },
        );
        size_kids.push(Object::Reference(kid));
    }
    doc.objects.insert(
        size,
        Object::Dictionary(dictionary! {
            "FT" => "Btn",
            "Ff" => 1 << 15,
            "T" => Object::string_literal("Size"),
            "Kids" => size_kids,
        }),
    );

    let acroform = doc.add_object(dictionary! {
        "Fields" => vec![
            Object::Reference(name),
            Object::Reference(hotline),
            Object::Reference(color),
            Object::Reference(size),
            Object::Reference(submit),
        ],
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
    });
    let catalog = catalog_id(&doc);
    doc.get_dictionary_mut(catalog)
        .expect("catalog dictionary")
        .set("AcroForm", acroform);
    doc
}

/// Same form, but `Name` has no /Rect so its appearance cannot be built
pub fn create_form_pdf_without_name_rect() -> Document {
    let mut doc = create_form_pdf();
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        if let Ok(dict) = doc.get_dictionary_mut(id) {
            let is_name = matches!(dict.get(b"T"), Ok(Object::String(s, _)) if s == b"Name");
            if is_name {
                dict.remove(b"Rect");
            }
        }
    }
    doc
}

pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save test document");
    out
}

/// Decoded content of the first page
pub fn first_page_content(doc: &Document) -> String {
    let page = first_page(doc);
    let content = doc.get_page_content(page).expect("page content");
    String::from_utf8_lossy(&content).into_owned()
}

pub fn has_acroform(doc: &Document) -> bool {
    doc.get_dictionary(catalog_id(doc))
        .map(|c| c.has(b"AcroForm"))
        .unwrap_or(false)
}

fn image_stream_dicts(doc: &Document) -> impl Iterator<Item = &Stream> {
    doc.objects.values().filter_map(|obj| {
        let stream = obj.as_stream().ok()?;
        let subtype = stream.dict.get(b"Subtype").and_then(|o| o.as_name()).ok()?;
        (subtype == b"Image").then_some(stream)
    })
}

/// Decoded samples of every image XObject, soft masks included, in object order
pub fn image_streams(doc: &Document) -> Vec<Vec<u8>> {
    image_stream_dicts(doc)
        .map(|s| s.decompressed_content().unwrap_or_else(|_| s.content.clone()))
        .collect()
}

/// `(Width, Height)` of every image XObject, in object order
pub fn image_sizes(doc: &Document) -> Vec<(i64, i64)> {
    image_stream_dicts(doc)
        .map(|s| {
            let width = s.dict.get(b"Width").and_then(|o| o.as_i64()).expect("image width");
            let height = s.dict.get(b"Height").and_then(|o| o.as_i64()).expect("image height");
            (width, height)
        })
        .collect()
}
