//! Class name -> constructor lookup used to rebuild pipelines from documents.

use hashbrown::HashMap;

use crate::filter::Filter;

pub type FilterFactory = fn() -> Box<dyn Filter>;

fn construct<F: Filter + Default + 'static>() -> Box<dyn Filter> {
    Box::new(F::default())
}

#[derive(Default)]
pub struct FilterRegistry {
    factories: HashMap<String, FilterFactory>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every filter shipped with this crate.
    pub fn with_builtin_filters() -> Self {
        let mut registry = Self::new();
        crate::filters::register_builtin_filters(&mut registry);
        registry
    }

    /// Registers `F` under its own class name, replacing any previous factory.
    pub fn register_filter<F: Filter + Default + 'static>(&mut self) {
        let class_name = F::default().class_name();
        self.register(class_name, construct::<F>);
    }

    pub fn register(&mut self, class_name: &str, factory: FilterFactory) {
        if self.factories.insert(class_name.to_string(), factory).is_some() {
            log::debug!("filter factory '{}' replaced", class_name);
        }
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// A fresh, default-configured instance, or `None` for an unknown class.
    pub fn create(&self, class_name: &str) -> Option<Box<dyn Filter>> {
        self.factories.get(class_name).map(|factory| factory())
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered_by_class_name() {
        let registry = FilterRegistry::with_builtin_filters();
        for name in registry.class_names() {
            let filter = registry.create(&name).unwrap();
            assert_eq!(filter.class_name(), name);
        }
        assert!(registry.contains("ConditionalSetValue"));
        assert!(registry.create("NoSuchFilter").is_none());
    }
}
