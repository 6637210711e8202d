//! Cross-crate integration test helpers.
//!
//! Provides utilities that run values through the persister and the XML
//! text reader/writer together.

use std::any::Any;
use url::Url;
use xmlgraph_core::{PersistError, PersistResult, Persister};
use xmlgraph_tree::{parse_str, to_string, Element};

/// Name of the scratch parent element the helpers save into.
pub const SCRATCH_ROOT: &str = "document";

/// Save `value` and return the element created for it.
///
/// # Errors
///
/// Whatever the save reports.
pub fn save_element<T: Any>(persister: &Persister, value: &T, context: Option<&Url>) -> PersistResult<Element> {
    let mut root = Element::new(SCRATCH_ROOT);
    persister.save(value, &mut root, context)?;
    root.remove_child_element(0)
        .ok_or_else(|| PersistError::persistence("save produced no element"))
}

/// Save `value` and write the resulting document as XML text.
///
/// # Errors
///
/// Whatever the save or the writer reports.
pub fn write_document<T: Any>(persister: &Persister, value: &T, context: Option<&Url>) -> PersistResult<String> {
    let mut root = Element::new(SCRATCH_ROOT);
    persister.save(value, &mut root, context)?;
    Ok(to_string(&root)?)
}

/// Parse a document written by [`write_document`] and load its value.
///
/// # Errors
///
/// Whatever the reader or the load reports; a document without a value
/// element is a [`PersistError::Persistence`].
pub fn read_document<T: Any>(persister: &Persister, xml: &str, context: Option<&Url>) -> PersistResult<T> {
    let root = parse_str(xml)?;
    let element = root
        .first_child_element()
        .ok_or_else(|| PersistError::persistence("document has no value element"))?;
    persister.load_as(element, context)
}

/// Save `value`, write it as text, read it back and load it.
///
/// # Errors
///
/// Whatever any stage reports.
pub fn round_trip<T: Any>(persister: &Persister, value: &T) -> PersistResult<T> {
    let xml = write_document(persister, value, None)?;
    read_document(persister, &xml, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_persister, sample_drawing, Drawing, Widget};

    #[test]
    fn sample_drawing_round_trips() {
        let persister = fixture_persister();
        let drawing = sample_drawing();
        assert_eq!(round_trip(&persister, &drawing).unwrap(), drawing);
    }

    #[test]
    fn document_wraps_one_value() {
        let persister = fixture_persister();
        let xml = write_document(&persister, &Widget { label: "x".into() }, None).unwrap();
        assert_eq!(xml, "<document><widget><label>x</label></widget></document>");
    }

    #[test]
    fn empty_document_is_rejected() {
        let persister = fixture_persister();
        let err = read_document::<Drawing>(&persister, "<document/>", None).unwrap_err();
        assert!(matches!(err, PersistError::Persistence { .. }));

        let err = read_document::<Drawing>(&persister, "<document>", None).unwrap_err();
        assert!(matches!(err, PersistError::Tree(_)));
    }
}
