//! # xmlgraph tree
//!
//! The in-memory XML element tree that xmlgraph persists object graphs into.
//!
//! The tree is deliberately small: elements with a tag name, ordered
//! attributes and child nodes (elements or text). There are no namespaces,
//! no document node and no entity declarations; the persistence engine only
//! appends to and reads from caller-owned elements.
//!
//! Text conversion is provided for tests and for hosts that want to store
//! the tree somewhere:
//!
//! ```
//! use xmlgraph_tree::{parse_str, to_string, Element};
//!
//! let mut root = Element::new("root");
//! root.append_child(Element::new("point"))
//!     .set_attribute("x", "1");
//!
//! let xml = to_string(&root).unwrap();
//! assert_eq!(xml, r#"<root><point x="1"/></root>"#);
//! assert_eq!(parse_str(&xml).unwrap(), root);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod element;
mod error;
mod reader;
mod writer;

pub use element::{Element, Node};
pub use error::{TreeError, TreeResult};
pub use reader::parse_str;
pub use writer::{to_string, to_string_pretty};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn name_strategy() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,8}").expect("Invalid regex")
    }

    fn leaf_strategy() -> impl Strategy<Value = Element> {
        (
            name_strategy(),
            prop::collection::vec((name_strategy(), "[ -~]{0,12}"), 0..3),
            prop::option::of("[!-~][ -~]{0,12}"),
        )
            .prop_map(|(name, attrs, text)| {
                let mut e = Element::new(name);
                for (k, v) in attrs {
                    e.set_attribute(k, v);
                }
                if let Some(t) = text {
                    e.append_text(t);
                }
                e
            })
    }

    fn tree_strategy() -> impl Strategy<Value = Element> {
        leaf_strategy().prop_recursive(3, 24, 4, |inner| {
            (name_strategy(), prop::collection::vec(inner, 1..4)).prop_map(|(name, children)| {
                let mut e = Element::new(name);
                for c in children {
                    e.append_child(c);
                }
                e
            })
        })
    }

    #[test]
    fn roundtrip_document() {
        let root = Element::new("drawing")
            .with_attribute("version", "2")
            .with_child(
                Element::new("shapes")
                    .with_attribute("type", "VecDeque")
                    .with_child(Element::new("element").with_text("a & b")),
            )
            .with_child(Element::new("owner").with_attribute("null", "true"));

        let xml = to_string(&root).unwrap();
        assert_eq!(parse_str(&xml).unwrap(), root);

        let pretty = to_string_pretty(&root).unwrap();
        assert_eq!(parse_str(&pretty).unwrap(), root);
    }

    proptest! {
        #[test]
        fn written_trees_parse_back(tree in tree_strategy()) {
            let xml = to_string(&tree).unwrap();
            prop_assert_eq!(parse_str(&xml).unwrap(), tree);
        }
    }
}
