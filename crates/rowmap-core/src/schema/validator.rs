use super::Registry;

use indexmap::IndexMap;

/// Reports problems with registered mappings as human readable messages,
/// without failing.
#[derive(Debug)]
pub struct SchemaValidator<'a> {
    registry: &'a Registry,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Problems found with `class`. Empty when the mapping is usable.
    pub fn validate(&self, class: &str) -> Vec<String> {
        let mut errors = vec![];

        let metadata = match self.registry.describe(class) {
            Ok(metadata) => metadata,
            Err(err) => {
                errors.push(format!("Failed to load metadata for {class}: {err}"));
                return errors;
            }
        };

        if metadata.table.trim().is_empty() {
            errors.push(format!("Entity {class} has no table name defined"));
        }

        if metadata.identifiers.is_empty() {
            errors.push(format!("Entity {class} has no identifier fields"));
        }

        if metadata.fields.is_empty() {
            errors.push(format!("Entity {class} has no mapped fields"));
        }

        for (name, association) in &metadata.associations {
            if !self.registry.is_registered(&association.target) {
                errors.push(format!(
                    "Association {name} targets non-existent class {}",
                    association.target
                ));
            }
        }

        errors
    }

    /// Validates every registered class, keeping only those with problems.
    pub fn validate_all(&self) -> IndexMap<String, Vec<String>> {
        self.registry
            .classes()
            .filter_map(|class| {
                let errors = self.validate(class);
                (!errors.is_empty()).then(|| (class.to_string(), errors))
            })
            .collect()
    }
}
