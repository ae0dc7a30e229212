use crate::mesh::quality::{GenericQuality, ShapeQuality, StrictQuality};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    #[error("a builder named '{0}' is already registered")]
    Duplicate(String),
    #[error("no builder named '{name}' is registered (valid names: {})", .valid.join(", "))]
    UnknownType { name: String, valid: Vec<String> },
}

/// Builds a boxed `T` from nothing
pub type Builder<T> = fn() -> Box<T>;

/// Registry of named builders for implementations of a (usually `dyn`) type
///
/// ```
/// use fem_hex::factory::Factory;
///
/// trait Greeting {
///     fn text(&self) -> &'static str;
/// }
/// struct Hello;
/// impl Greeting for Hello {
///     fn text(&self) -> &'static str {
///         "hello"
///     }
/// }
///
/// let mut greetings: Factory<dyn Greeting> = Factory::new();
/// greetings.register("hello", || Box::new(Hello)).unwrap();
/// assert_eq!(greetings.build("hello").unwrap().text(), "hello");
/// assert!(greetings.build("goodbye").is_err());
/// ```
pub struct Factory<T: ?Sized> {
    builders: BTreeMap<String, Builder<T>>,
}

impl<T: ?Sized> Factory<T> {
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Register a builder under `name`; names can't be registered twice
    pub fn register(&mut self, name: impl Into<String>, builder: Builder<T>) -> Result<(), FactoryError> {
        let name = name.into();
        if self.builders.contains_key(&name) {
            return Err(FactoryError::Duplicate(name));
        }
        self.builders.insert(name, builder);
        Ok(())
    }

    /// Build a new object with the builder registered under `name`
    pub fn build(&self, name: &str) -> Result<Box<T>, FactoryError> {
        match self.builders.get(name) {
            Some(builder) => Ok(builder()),
            None => {
                let valid = self.names();
                warn!(
                    "no builder named '{}' is registered; valid names are: {}",
                    name,
                    valid.join(", ")
                );
                Err(FactoryError::UnknownType {
                    name: name.to_string(),
                    valid,
                })
            }
        }
    }

    /// Registered names, in sorted order
    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }
}

impl<T: ?Sized> Default for Factory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("names", &self.names())
            .finish()
    }
}

/// Fallbacks for quality metrics that a cell type has no formula for
pub type ShapeQualityFactory = Factory<dyn ShapeQuality + Send + Sync>;

/// The process-wide [ShapeQuality] registry
///
/// * `"generic"`: [GenericQuality]
/// * `"strict"`: [StrictQuality]
pub fn shape_quality_factory() -> &'static ShapeQualityFactory {
    static FACTORY: OnceLock<ShapeQualityFactory> = OnceLock::new();

    FACTORY.get_or_init(|| {
        let mut factory = ShapeQualityFactory::new();
        let builders: [(&str, Builder<dyn ShapeQuality + Send + Sync>); 2] = [
            ("generic", || Box::new(GenericQuality)),
            ("strict", || Box::new(StrictQuality)),
        ];
        for (name, builder) in builders {
            if let Err(err) = factory.register(name, builder) {
                unreachable!("built-in ShapeQuality names are unique: {}", err);
            }
        }
        factory
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::quality::ElemQuality;
    use nalgebra::Point3;

    #[test]
    fn builtin_fallbacks() {
        let factory = shape_quality_factory();
        assert_eq!(factory.names(), vec!["generic", "strict"]);

        let points = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let generic = factory.build("generic").unwrap();
        assert_eq!(generic.default_quality(ElemQuality::Skew, &points, &[[0, 1]]), 1.0);

        let strict = factory.build("strict").unwrap();
        assert!(strict
            .default_quality(ElemQuality::Skew, &points, &[[0, 1]])
            .is_nan());
    }

    #[test]
    fn unknown_name() {
        match shape_quality_factory().build("lenient") {
            Err(FactoryError::UnknownType { name, valid }) => {
                assert_eq!(name, "lenient");
                assert_eq!(valid, vec!["generic", "strict"]);
            }
            _ => panic!("expected an unknown type error"),
        }
    }

    #[test]
    fn duplicate_registration() {
        let mut factory: Factory<dyn ShapeQuality + Send + Sync> = Factory::default();
        factory.register("generic", || Box::new(GenericQuality)).unwrap();
        assert_eq!(
            factory.register("generic", || Box::new(StrictQuality)),
            Err(FactoryError::Duplicate(String::from("generic")))
        );
        assert!(factory.contains("generic"));
        assert!(!factory.contains("strict"));
    }
}
