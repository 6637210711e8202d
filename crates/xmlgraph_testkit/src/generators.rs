//! Property-based test generators using proptest.
//!
//! Provides strategies for the fixture types. Generated values only use
//! values whose text form parses back to an equal value (finite floats,
//! absolute URLs).

use crate::fixtures::{
    Circle, Color, Drawing, Layer, Point, Scrapbook, Shape, Square, Stroke, Widget,
};
use proptest::prelude::*;
use url::Url;
use uuid::Uuid;
use xmlgraph_core::Dynamic;

/// Strategy for element and attribute text: printable ASCII including
/// XML metacharacters, tabs and line breaks, Latin-1, Greek and CJK.
/// Whitespace-only strings are included.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::string::string_regex(
            "[\\t\\n\\r -~\\x{a0}-\\x{17f}\\x{3b1}-\\x{3c9}\\x{4e00}-\\x{4e3f}]{0,24}"
        )
        .expect("Invalid regex"),
        1 => prop::string::string_regex("[ \\t\\r\\n]{1,6}").expect("Invalid regex"),
    ]
}

/// Strategy for finite floats.
pub fn coordinate_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e6..1.0e6_f64,
        Just(0.0),
        any::<i32>().prop_map(f64::from),
    ]
}

/// Strategy for points.
pub fn point_strategy() -> impl Strategy<Value = Point> {
    (any::<i32>(), any::<i32>()).prop_map(|(x, y)| Point { x, y })
}

/// Strategy for circles and squares behind `Box<dyn Shape>`.
pub fn shape_strategy() -> BoxedStrategy<Box<dyn Shape>> {
    prop_oneof![
        (point_strategy(), coordinate_strategy())
            .prop_map(|(center, radius)| Box::new(Circle { center, radius }) as Box<dyn Shape>),
        (point_strategy(), coordinate_strategy())
            .prop_map(|(corner, side)| Box::new(Square { corner, side }) as Box<dyn Shape>),
    ]
    .boxed()
}

/// Strategy for colours.
pub fn color_strategy() -> impl Strategy<Value = Color> {
    any::<[u8; 3]>().prop_map(|[r, g, b]| Color { r, g, b })
}

/// Strategy for stroke styles.
pub fn stroke_strategy() -> impl Strategy<Value = Stroke> {
    prop_oneof![Just(Stroke::Solid), Just(Stroke::Dashed), Just(Stroke::Dotted)]
}

/// Strategy for absolute http(s) URLs.
pub fn url_strategy() -> impl Strategy<Value = Url> {
    (
        prop_oneof![Just("http"), Just("https")],
        prop::string::string_regex("[a-z]{1,10}\\.(org|com|net)").expect("Invalid regex"),
        prop::collection::vec(
            prop::string::string_regex("[a-zA-Z0-9_-]{1,8}").expect("Invalid regex"),
            0..4,
        ),
    )
        .prop_map(|(scheme, host, segments)| {
            let raw = format!("{scheme}://{host}/{}", segments.join("/"));
            Url::parse(&raw).expect("Invalid url")
        })
}

/// Strategy for layers with up to `max_shapes` shapes.
pub fn layer_strategy(max_shapes: usize) -> impl Strategy<Value = Layer> {
    (
        text_strategy(),
        any::<bool>(),
        stroke_strategy(),
        color_strategy(),
        color_strategy(),
        prop::collection::vec(shape_strategy(), 0..=max_shapes),
        prop::collection::vec(text_strategy(), 0..4),
        prop::option::of(text_strategy()),
    )
        .prop_map(|(name, visible, stroke, color, fill, shapes, tags, note)| {
            let mut layer = Layer::new(name);
            layer.set_visible(visible);
            layer.stroke = stroke;
            layer.color = color;
            layer.fill = fill;
            layer.shapes = shapes;
            layer.tags = tags;
            layer.note = note;
            layer
        })
}

/// Strategy for whole drawings.
pub fn drawing_strategy() -> impl Strategy<Value = Drawing> {
    (
        text_strategy(),
        any::<u128>(),
        prop::option::of(url_strategy()),
        prop::collection::vec(layer_strategy(3), 0..4),
        prop::option::of(shape_strategy()),
    )
        .prop_map(|(title, id, source, layers, frame)| Drawing {
            title,
            id: Uuid::from_u128(id),
            source,
            layers,
            frame,
        })
}

/// Strategy for widgets.
pub fn widget_strategy() -> impl Strategy<Value = Widget> {
    text_strategy().prop_map(|label| Widget { label })
}

/// Strategy for a single scrapbook entry: fixture objects, an
/// adapter-covered colour, a user scalar and built-in scalars.
pub fn entry_strategy() -> impl Strategy<Value = Dynamic> {
    prop_oneof![
        point_strategy().prop_map(|p| Box::new(p) as Dynamic),
        (point_strategy(), coordinate_strategy())
            .prop_map(|(center, radius)| Box::new(Circle { center, radius }) as Dynamic),
        stroke_strategy().prop_map(|s| Box::new(s) as Dynamic),
        color_strategy().prop_map(|c| Box::new(c) as Dynamic),
        widget_strategy().prop_map(|w| Box::new(w) as Dynamic),
        text_strategy().prop_map(|t| Box::new(t) as Dynamic),
        any::<i64>().prop_map(|n| Box::new(n) as Dynamic),
        any::<bool>().prop_map(|b| Box::new(b) as Dynamic),
    ]
}

/// Strategy for scrapbooks with up to `max_entries` mixed entries.
pub fn scrapbook_strategy(max_entries: usize) -> impl Strategy<Value = Scrapbook> {
    prop::collection::vec(entry_strategy(), 0..=max_entries)
        .prop_map(|entries| Scrapbook { entries })
}
