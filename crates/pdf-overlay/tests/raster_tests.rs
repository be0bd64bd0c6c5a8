use pdf_overlay::*;

fn signature() -> Vec<InkStroke> {
    let style = StrokeStyle {
        color: Color::rgb(10, 20, 200),
        stroke_width: 3.0,
        opacity: 1.0,
    };
    vec![
        InkStroke::new(
            vec![
                Point::new(100.0, 220.0),
                Point::new(140.0, 200.0),
                Point::new(180.0, 260.0),
                Point::new(230.0, 210.0),
            ],
            style,
        ),
        InkStroke::new(vec![Point::new(250.0, 240.0), Point::new(300.0, 250.0)], style),
    ]
}

#[test]
fn test_rasterize_is_deterministic() {
    let strokes = signature();
    let bounds = compute_ink_bounds(&strokes).unwrap();
    let first = rasterize(&strokes, &bounds, 3.0, 4.0).unwrap();
    let second = rasterize(&strokes, &bounds, 3.0, 4.0).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.data(), second.data());
    assert_eq!(first.encode_png().unwrap(), second.encode_png().unwrap());
}

#[test]
fn test_degenerate_bounds_give_one_transparent_pixel() {
    let bitmap = rasterize(&[], &Rect::new(5.0, 5.0, 5.0, 5.0), 3.0, 4.0).unwrap();
    assert_eq!((bitmap.width(), bitmap.height()), (1, 1));
    assert!(bitmap.is_fully_transparent());
}

#[test]
fn test_strokes_are_drawn_in_their_color() {
    let strokes = signature();
    let bounds = compute_ink_bounds(&strokes).unwrap();
    let bitmap = rasterize(&strokes, &bounds, 2.0, 4.0).unwrap();
    assert!(!bitmap.is_fully_transparent());

    // Start of the first stroke, shifted by padding and scaled
    let x = ((100.0 - bounds.min_x + 4.0) * 2.0) as u32;
    let y = ((220.0 - bounds.min_y + 4.0) * 2.0) as u32;
    let [r, g, b, a] = bitmap.pixel(x, y).unwrap();
    assert_eq!(a, 255);
    assert!(r < 40 && g < 50 && b > 170, "unexpected color {r},{g},{b}");

    // Corners stay transparent
    assert_eq!(bitmap.pixel(0, 0).unwrap()[3], 0);
    assert_eq!(
        bitmap.pixel(bitmap.width() - 1, bitmap.height() - 1).unwrap()[3],
        0
    );
}

#[test]
fn test_single_tap_leaves_a_dot() {
    let tap = InkStroke::new(vec![Point::new(10.0, 10.0)], StrokeStyle::default());
    let bounds = Rect::new(0.0, 0.0, 20.0, 20.0);
    let bitmap = rasterize(&[tap], &bounds, 2.0, 0.0).unwrap();
    assert!(bitmap.pixel(20, 20).unwrap()[3] > 0);
}

#[test]
fn test_translucent_strokes_keep_their_opacity() {
    let style = StrokeStyle {
        opacity: 0.5,
        stroke_width: 6.0,
        ..StrokeStyle::default()
    };
    let stroke = InkStroke::new(vec![Point::new(0.0, 10.0), Point::new(40.0, 10.0)], style);
    let bitmap = rasterize(&[stroke], &Rect::new(0.0, 0.0, 40.0, 20.0), 1.0, 0.0).unwrap();
    let alpha = bitmap.pixel(20, 10).unwrap()[3];
    assert!((120..=136).contains(&alpha), "alpha was {alpha}");
}

#[test]
fn test_png_decodes_to_bitmap_size() {
    let strokes = signature();
    let bounds = compute_ink_bounds(&strokes).unwrap();
    let bitmap = rasterize(&strokes, &bounds, 1.5, 2.0).unwrap();
    let png = bitmap.encode_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.width(), bitmap.width());
    assert_eq!(decoded.height(), bitmap.height());
}
