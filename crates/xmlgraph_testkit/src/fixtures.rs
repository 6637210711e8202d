//! Fixture types and a persister that knows them.
//!
//! The fixtures cover every kind of member the engine handles: attribute
//! scalars, nested objects, polymorphic slots, arrays, user scalars,
//! accessors with setters and an adapter-covered value.

use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;
use xmlgraph_core::{
    Adapter, AsAny, Dynamic, ObjectDescriptor, PersistError, PersistResult, Persistable,
    Persistent, Persister, PersisterConfig, TypeKey,
};
use xmlgraph_tree::Element;

/// A shape stored in `Box<dyn Shape>` slots.
pub trait Shape: AsAny + fmt::Debug {
    /// Surface area.
    fn area(&self) -> f64;

    /// Structural equality across shape types.
    fn same_shape(&self, other: &dyn Shape) -> bool;
}

impl PartialEq for dyn Shape {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other)
    }
}

fn same_as<S: Shape + PartialEq>(shape: &S, other: &dyn Shape) -> bool {
    AsAny::as_any(other).downcast_ref::<S>() == Some(shape)
}

/// A point; both coordinates are attributes.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Persistable for Point {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Point>()
            .default_constructible()
            .field(Persistent::member("x").attribute(true), |p| &p.x, |p, v| p.x = v)
            .field(Persistent::member("y").attribute(true), |p| &p.y, |p, v| p.y = v)
            .build()
    }
}

/// A circle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Circle {
    /// Centre point.
    pub center: Point,
    /// Radius.
    pub radius: f64,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    fn same_shape(&self, other: &dyn Shape) -> bool {
        same_as(self, other)
    }
}

impl Persistable for Circle {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Circle>()
            .default_constructible()
            .field("center", |c| &c.center, |c, v| c.center = v)
            .field(Persistent::member("radius").attribute(true), |c| &c.radius, |c, v| c.radius = v)
            .build()
    }
}

/// An axis-aligned square.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Square {
    /// Top-left corner.
    pub corner: Point,
    /// Edge length.
    pub side: f64,
}

impl Shape for Square {
    fn area(&self) -> f64 {
        self.side * self.side
    }

    fn same_shape(&self, other: &dyn Shape) -> bool {
        same_as(self, other)
    }
}

impl Persistable for Square {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Square>()
            .default_constructible()
            .field("corner", |s| &s.corner, |s, v| s.corner = v)
            .field("side", |s| &s.side, |s, v| s.side = v)
            .build()
    }
}

/// Stroke style; a user scalar.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    /// Continuous line.
    #[default]
    Solid,
    /// Dashed line.
    Dashed,
    /// Dotted line.
    Dotted,
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stroke::Solid => "solid",
            Stroke::Dashed => "dashed",
            Stroke::Dotted => "dotted",
        })
    }
}

impl FromStr for Stroke {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solid" => Ok(Stroke::Solid),
            "dashed" => Ok(Stroke::Dashed),
            "dotted" => Ok(Stroke::Dotted),
            other => Err(format!("unknown stroke {other:?}")),
        }
    }
}

/// An RGB colour, persisted only through [`HexColorAdapter`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Writes a [`Color`] as `#rrggbb` element text.
#[derive(Debug, Default)]
pub struct HexColorAdapter;

impl Adapter<Color> for HexColorAdapter {
    fn to_xml(&self, value: &Color, element: &mut Element, _context: Option<&Url>) -> PersistResult<()> {
        element.append_text(format!("#{:02x}{:02x}{:02x}", value.r, value.g, value.b));
        Ok(())
    }

    fn from_xml(&self, element: &Element, _context: Option<&Url>) -> PersistResult<Color> {
        let text = element.text().unwrap_or_default();
        let hex = text
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| PersistError::format(text.as_str(), "Color", "expected #rrggbb"))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| PersistError::format(text.as_str(), "Color", e.to_string()))
        };
        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

/// Writes a [`Color`] as `r`, `g`, `b` attributes; used as a member adapter.
#[derive(Debug, Default)]
pub struct RgbAttributesAdapter;

impl Adapter<Color> for RgbAttributesAdapter {
    fn to_xml(&self, value: &Color, element: &mut Element, _context: Option<&Url>) -> PersistResult<()> {
        element.set_attribute("r", value.r.to_string());
        element.set_attribute("g", value.g.to_string());
        element.set_attribute("b", value.b.to_string());
        Ok(())
    }

    fn from_xml(&self, element: &Element, _context: Option<&Url>) -> PersistResult<Color> {
        let channel = |name: &str| -> PersistResult<u8> {
            let text = element.attribute(name).ok_or_else(|| PersistError::missing(name))?;
            text.parse()
                .map_err(|e: std::num::ParseIntError| PersistError::format(text, "u8", e.to_string()))
        };
        Ok(Color {
            r: channel("r")?,
            g: channel("g")?,
            b: channel("b")?,
        })
    }
}

/// A named group of shapes.
#[derive(Debug, PartialEq)]
pub struct Layer {
    /// Layer name.
    pub name: String,
    visible: bool,
    /// Stroke style.
    pub stroke: Stroke,
    /// Stroke colour (global adapter).
    pub color: Color,
    /// Fill colour (member adapter).
    pub fill: Color,
    /// Shapes in drawing order.
    pub shapes: Vec<Box<dyn Shape>>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Optional comment.
    pub note: Option<String>,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            name: String::new(),
            visible: true,
            stroke: Stroke::default(),
            color: Color::default(),
            fill: Color::default(),
            shapes: Vec::new(),
            tags: Vec::new(),
            note: None,
        }
    }
}

impl Layer {
    /// Creates an empty, visible layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the layer is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide the layer.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl Persistable for Layer {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Layer>()
            .default_constructible()
            .accessor(Persistent::member("is_visible").attribute(true), Layer::is_visible)
            .setter("set_visible", Layer::set_visible)
            .field(Persistent::member("name").attribute(true), |l| &l.name, |l, v| l.name = v)
            .field("stroke", |l| &l.stroke, |l, v| l.stroke = v)
            .field("color", |l| &l.color, |l, v| l.color = v)
            .field(
                Persistent::member("fill").adapter::<Color, RgbAttributesAdapter>(),
                |l| &l.fill,
                |l, v| l.fill = v,
            )
            .field(
                Persistent::member("shapes").element_name("shape"),
                |l| &l.shapes,
                |l, v| l.shapes = v,
            )
            .field(
                Persistent::member("tags").element_name("tag"),
                |l| &l.tags,
                |l, v| l.tags = v,
            )
            .optional_field("note", |l| l.note.as_ref(), |l, v| l.note = v)
            .build()
    }
}

/// Document root: metadata plus layers.
#[derive(Debug, PartialEq)]
pub struct Drawing {
    /// Title.
    pub title: String,
    /// Stable identifier.
    pub id: Uuid,
    /// Where the drawing was imported from.
    pub source: Option<Url>,
    /// Layers, bottom first.
    pub layers: Vec<Layer>,
    /// Optional frame around the whole drawing.
    pub frame: Option<Box<dyn Shape>>,
}

impl Default for Drawing {
    fn default() -> Self {
        Self {
            title: String::new(),
            id: Uuid::nil(),
            source: None,
            layers: Vec::new(),
            frame: None,
        }
    }
}

impl Persistable for Drawing {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Drawing>()
            .default_constructible()
            .field("title", |d| &d.title, |d, v| d.title = v)
            .field(Persistent::member("id").attribute(true), |d| &d.id, |d, v| d.id = v)
            .optional_field("source", |d| d.source.as_ref(), |d, v| d.source = v)
            .field(
                Persistent::member("layers").element_name("layer"),
                |d| &d.layers,
                |d, v| d.layers = v,
            )
            .optional_boxed_field::<dyn Shape>("frame", |d| d.frame.as_deref(), |d, v| d.frame = v)
            .build()
    }
}

/// A type registered under the explicit name `widget`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Widget {
    /// Display label.
    pub label: String,
}

impl Persistable for Widget {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Widget>()
            .default_constructible()
            .field("label", |w| &w.label, |w, v| w.label = v)
            .build()
    }
}

/// A heterogeneous bag of values.
#[derive(Debug, Default)]
pub struct Scrapbook {
    /// Entries of any registered type.
    pub entries: Vec<Dynamic>,
}

/// Entries compare equal when both hold the same fixture or scalar type
/// with equal values; entries of other types never compare equal.
impl PartialEq for Scrapbook {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| same_entry(a, b))
    }
}

fn same_entry(a: &Dynamic, b: &Dynamic) -> bool {
    fn same<T: PartialEq + 'static>(a: &Dynamic, b: &Dynamic) -> Option<bool> {
        Some(a.downcast_ref::<T>()? == b.downcast_ref::<T>()?)
    }
    same::<Point>(a, b)
        .or_else(|| same::<Circle>(a, b))
        .or_else(|| same::<Square>(a, b))
        .or_else(|| same::<Stroke>(a, b))
        .or_else(|| same::<Color>(a, b))
        .or_else(|| same::<Widget>(a, b))
        .or_else(|| same::<String>(a, b))
        .or_else(|| same::<i64>(a, b))
        .or_else(|| same::<bool>(a, b))
        .unwrap_or(false)
}

impl Persistable for Scrapbook {
    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor::builder::<Scrapbook>()
            .default_constructible()
            .field("entries", |s| &s.entries, |s, v| s.entries = v)
            .build()
    }
}

/// A persister with every fixture registered under its short Rust name
/// (`Widget` as `widget`).
pub fn fixture_persister() -> Persister {
    fixture_persister_with(PersisterConfig::default())
}

/// [`fixture_persister`] with the given configuration.
pub fn fixture_persister_with(config: PersisterConfig) -> Persister {
    let persister = Persister::with_config(config);
    register_fixtures(&persister);
    persister
}

/// [`fixture_persister`] configured from JSON, e.g. `{"ignore_nulls": true}`.
///
/// # Panics
///
/// Panics if the JSON is not a valid configuration.
pub fn fixture_persister_from_json(json: &str) -> Persister {
    let config: PersisterConfig = serde_json::from_str(json).expect("Invalid persister config");
    fixture_persister_with(config)
}

/// Register the fixtures with an existing persister.
///
/// # Panics
///
/// Panics if a fixture name is rejected, which would be a bug in the
/// fixtures.
pub fn register_fixtures(persister: &Persister) {
    persister.register::<Point>();
    persister.register::<Circle>();
    persister.register::<Square>();
    persister.register::<Layer>();
    persister.register::<Drawing>();
    persister.register::<Widget>();
    persister.register::<Scrapbook>();

    persister
        .register_abstract::<dyn Shape>("Shape")
        .expect("Invalid fixture name");
    persister.register_subtype::<Circle, dyn Shape>(|c| Box::new(c) as Box<dyn Shape>);
    persister.register_subtype::<Square, dyn Shape>(|s| Box::new(s) as Box<dyn Shape>);
    persister.register_boxed_array::<dyn Shape>();
    persister.register_array::<Layer>();
    persister.register_scalar::<Stroke>();
    persister.register_adapter::<Color, _>(HexColorAdapter);

    for (key, name) in [
        (TypeKey::of::<Point>(), "Point"),
        (TypeKey::of::<Circle>(), "Circle"),
        (TypeKey::of::<Square>(), "Square"),
        (TypeKey::of::<Layer>(), "Layer"),
        (TypeKey::of::<Drawing>(), "Drawing"),
        (TypeKey::of::<Widget>(), "widget"),
        (TypeKey::of::<Scrapbook>(), "Scrapbook"),
        (TypeKey::of::<Color>(), "Color"),
    ] {
        persister
            .register_named_key(key, name)
            .expect("Invalid fixture name");
    }
}

/// A small drawing touching every member kind.
pub fn sample_drawing() -> Drawing {
    let mut background = Layer::new("background");
    background.stroke = Stroke::Dotted;
    background.color = Color { r: 0x20, g: 0x40, b: 0x60 };
    background.shapes.push(Box::new(Square {
        corner: Point { x: 0, y: 0 },
        side: 100.0,
    }));

    let mut sketch = Layer::new("sketch");
    sketch.set_visible(false);
    sketch.fill = Color { r: 255, g: 0, b: 127 };
    sketch.shapes.push(Box::new(Circle {
        center: Point { x: 10, y: -4 },
        radius: 2.5,
    }));
    sketch.tags = vec!["draft".to_string(), "a & b".to_string()];
    sketch.note = Some("check <scale>".to_string());

    Drawing {
        title: "Sample".to_string(),
        id: Uuid::from_u128(0x6a8f_3c1e_0000_4000_8000_0000_0000_0001),
        source: Some(Url::parse("http://example.org/drawings/sample.xml").expect("Invalid url")),
        layers: vec![background, sketch],
        frame: Some(Box::new(Square {
            corner: Point { x: -1, y: -1 },
            side: 102.0,
        })),
    }
}
