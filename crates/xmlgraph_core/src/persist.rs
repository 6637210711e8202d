//! Saving: object graph to elements.

use crate::adapter::AdapterRegistry;
use crate::config::PersisterConfig;
use crate::dynamic::{runtime_id, TypeKey};
use crate::error::{PersistError, PersistResult};
use crate::member::Persistent;
use crate::persister::{Persister, NULL_ATTRIBUTE, TYPE_ATTRIBUTE};
use crate::registry::{TypeInfo, TypeKind, TypeRegistry};
use std::any::Any;
use tracing::{debug, trace};
use url::Url;
use xmlgraph_tree::Element;

/// State of one save call.
pub(crate) struct Saver<'a> {
    types: &'a TypeRegistry,
    adapters: &'a AdapterRegistry,
    config: PersisterConfig,
    context: Option<&'a Url>,
}

impl<'a> Saver<'a> {
    pub(crate) fn new(persister: &'a Persister, context: Option<&'a Url>) -> Self {
        Self {
            types: persister.types(),
            adapters: persister.adapters(),
            config: persister.config(),
            context,
        }
    }

    /// Append an element named after the object's type to `parent`, and
    /// fill it through the type's adapter or member by member.
    pub(crate) fn save_object(&self, object: &dyn Any, parent: &mut Element) -> PersistResult<()> {
        let id = runtime_id(object);
        let adapter = self.adapters.get(id);
        let info = match self.types.info(id) {
            Some(info) if adapter.is_some() || info.is_persistable() => info,
            Some(info) => return Err(PersistError::not_persistable(info.display_name())),
            None => return Err(PersistError::not_persistable(format!("{id:?}"))),
        };

        let name = self.types.resolve_name_from_type(info.key())?;
        debug!(element = %name, "saving object");
        let element = parent.append_child(Element::new(name));

        if let Some(adapter) = adapter {
            return adapter.to_xml(object, element, self.context);
        }

        let descriptor = info
            .descriptor()
            .ok_or_else(|| PersistError::not_persistable(info.display_name()))?;
        for member in descriptor.members() {
            trace!(member = member.name(), "saving member");
            let value = member.get(object)?;
            self.persist_value(
                value.get(),
                member.declared(),
                member.name(),
                element,
                member.config(),
            )?;
        }
        Ok(())
    }

    /// Write one value named `name` into `container`.
    pub(crate) fn persist_value(
        &self,
        value: Option<&dyn Any>,
        declared: Option<TypeKey>,
        name: &str,
        container: &mut Element,
        config: &Persistent,
    ) -> PersistResult<()> {
        let Some(value) = value else {
            if !self.config.ignore_nulls {
                container.append_child(Element::new(name).with_attribute(NULL_ATTRIBUTE, "true"));
            }
            return Ok(());
        };

        let runtime = runtime_id(value);
        let info = self.types.info(runtime);
        let adapter = self.adapters.resolve(Some(runtime), config.adapter.as_ref());
        let kind = info.as_deref().map(TypeInfo::kind);
        let is_collection = matches!(kind, Some(TypeKind::Collection(_)));

        let mut element = Element::new(name);
        let mut type_saved = false;
        if declared.map(|d| d.id()) != Some(runtime) {
            let member_adapter = config.adapter.is_some() && adapter.is_some();
            if is_collection || !member_adapter {
                let info = info.as_deref().ok_or_else(|| {
                    PersistError::unsupported_type(
                        format!("{runtime:?}"),
                        format!("value of {name} has an unregistered type"),
                    )
                })?;
                let type_name = self.types.resolve_name_from_type(info.key())?;
                element.set_attribute(TYPE_ATTRIBUTE, type_name);
                type_saved = true;
            }
        }

        match kind {
            Some(TypeKind::Array(codec)) => {
                self.check_container_config(name, config)?;
                let entry_name = self.entry_name(config);
                let component = declared
                    .and_then(|d| self.types.info(d.id()))
                    .and_then(|d| match d.kind() {
                        TypeKind::Array(declared_codec) => Some(declared_codec.component()),
                        _ => None,
                    });
                let items = codec.items(value).ok_or_else(|| {
                    PersistError::type_mismatch(codec.component().rust_name(), "non-array value")
                })?;
                for item in items {
                    self.persist_value(Some(item), component, &entry_name, &mut element, config)?;
                }
                container.append_child(element);
                return Ok(());
            }
            Some(TypeKind::Collection(codec)) => {
                self.check_container_config(name, config)?;
                let entry_name = self.entry_name(config);
                let collection = codec.view(value).ok_or_else(|| {
                    PersistError::type_mismatch("collection", "non-collection value")
                })?;
                for item in collection.items() {
                    self.persist_value(item, None, &entry_name, &mut element, config)?;
                }
                container.append_child(element);
                return Ok(());
            }
            _ => {}
        }

        if let Some(adapter) = adapter {
            adapter.to_xml(value, &mut element, self.context)?;
        } else if info.as_deref().is_some_and(TypeInfo::is_persistable) {
            self.save_object(value, &mut element)?;
        } else {
            let codec = info
                .as_deref()
                .and_then(TypeInfo::scalar_codec)
                .ok_or_else(|| {
                    PersistError::unsupported_type(
                        info.as_deref().map_or(name, TypeInfo::display_name),
                        "value is neither adapter-covered, persistable nor string-instantiable",
                    )
                })?;
            let text = codec.format(value).ok_or_else(|| {
                PersistError::type_mismatch(codec.key().rust_name(), "a value of another type")
            })?;
            if config.attribute && !type_saved {
                container.set_attribute(name, text);
                return Ok(());
            }
            element.append_text(text);
        }

        container.append_child(element);
        Ok(())
    }

    fn check_container_config(&self, name: &str, config: &Persistent) -> PersistResult<()> {
        if config.attribute {
            return Err(PersistError::invalid_configuration(format!(
                "array/collection member {name} cannot be persisted as an attribute"
            )));
        }
        Ok(())
    }

    fn entry_name(&self, config: &Persistent) -> String {
        config
            .element_name
            .clone()
            .unwrap_or_else(|| self.config.default_element_name.clone())
    }
}
