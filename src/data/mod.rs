//! Data module - CSV loading, filtering and integrity checks

mod loader;
mod processor;
mod validator;

pub use loader::{DataLoader, LoaderError, DAY_COL};
pub use processor::{DataProcessor, DateRange, ProcessorError};
pub use validator::{DataValidator, IntegrityReport};

#[cfg(test)]
pub(crate) use loader::tests as loader_fixtures;
