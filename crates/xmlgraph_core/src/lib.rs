//! # xmlgraph core
//!
//! Saves object graphs into XML element trees and rebuilds them, driven by
//! per-type descriptors instead of hand-written serializers.
//!
//! ## Model
//!
//! - A [`Persistable`] type describes its persistent fields and accessors
//!   with an [`ObjectDescriptor`]. Saving an object appends an element named
//!   after its type and writes each member as a child element (or, for
//!   scalars marked as attributes, as an attribute of the object element).
//! - A value whose runtime type differs from the declared type of its slot
//!   carries a `type` attribute. Polymorphic slots are `Box<dyn Trait>`
//!   (with `Trait: AsAny`) or fully dynamic slots.
//! - Null values are elements with `null="true"`.
//! - Arrays (`Vec<T>`) and collections ([`DynCollection`]) are elements with
//!   one entry element per item.
//! - Leaf values are [scalars](ScalarCodec): anything `Display + FromStr`.
//! - [`Adapter`]s take over the element of a type, or of a single member.
//!
//! ## Example
//!
//! ```
//! use xmlgraph_core::{ObjectDescriptor, Persistable, Persistent, Persister};
//! use xmlgraph_tree::Element;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Persistable for Point {
//!     fn descriptor() -> ObjectDescriptor {
//!         ObjectDescriptor::builder::<Point>()
//!             .default_constructible()
//!             .field(Persistent::member("x").attribute(true), |p| &p.x, |p, v| p.x = v)
//!             .field("y", |p| &p.y, |p, v| p.y = v)
//!             .build()
//!     }
//! }
//!
//! let persister = Persister::new();
//! persister.register::<Point>();
//! persister.register_named_type::<Point>("Point").unwrap();
//!
//! let mut root = Element::new("root");
//! persister.save(&Point { x: 1, y: 2 }, &mut root, None).unwrap();
//!
//! let saved = root.first_child_element().unwrap();
//! assert_eq!(saved.name(), "Point");
//! assert_eq!(saved.attribute("x"), Some("1"));
//! assert_eq!(saved.child_element_named(0, "y").and_then(|y| y.text()).as_deref(), Some("2"));
//!
//! let loaded: Point = persister.load_as(saved, None).unwrap();
//! assert_eq!(loaded, Point { x: 1, y: 2 });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod collection;
mod config;
mod descriptor;
mod dynamic;
mod error;
mod member;
pub mod naming;
mod persist;
mod persister;
pub mod registry;
mod scalar;
mod unpersist;

pub use adapter::{erase, factory, Adapter, AdapterFactory, AdapterRegistry, PersistentAdapter};
pub use collection::{ArrayCodec, CollectionCodec, DynCollection};
pub use config::{PersisterConfig, DEFAULT_ELEMENT_NAME};
pub use descriptor::{ObjectBuilder, ObjectDescriptor, Persistable};
pub use dynamic::{AsAny, Dynamic, MemberValue, TypeKey};
pub use error::{PersistError, PersistResult};
pub use member::{Member, MemberKind, Persistent};
pub use persister::{Persister, NULL_ATTRIBUTE, TYPE_ATTRIBUTE};
pub use registry::{TypeCatalog, TypeInfo, TypeKind, TypeLoader};
pub use scalar::{synonym_name, synonym_type, ScalarCodec};
