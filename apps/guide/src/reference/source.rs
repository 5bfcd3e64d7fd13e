use std::io::ErrorKind;
use std::path::PathBuf;

use crate::reference::{City, ReferenceError};

/// Raw reference text plus where it came from.
#[derive(Debug, Clone)]
pub struct SourcedText {
    pub text: String,
    pub locator: String,
}

/// Where per-city reference text lives. Read-only; addressed by city.
///
/// `Ok(None)` means the source has no document for the city.
pub trait ReferenceSource: Send + Sync {
    fn fetch(&self, city: City) -> Result<Option<SourcedText>, ReferenceError>;

    /// Human-readable address of the city's document, for error messages.
    fn locator(&self, city: City) -> String;
}

/// Reads `{root}/{city}_context.md`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, city: City) -> PathBuf {
        self.root.join(format!("{}_context.md", city.id()))
    }
}

impl ReferenceSource for DirectorySource {
    fn fetch(&self, city: City) -> Result<Option<SourcedText>, ReferenceError> {
        let path = self.path_for(city);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(SourcedText {
                text,
                locator: path.display().to_string(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReferenceError::Io {
                locator: path.display().to_string(),
                source: e,
            }),
        }
    }

    fn locator(&self, city: City) -> String {
        self.path_for(city).display().to_string()
    }
}

/// Fixed in-memory documents for tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    docs: std::collections::HashMap<City, String>,
}

#[cfg(test)]
impl InMemorySource {
    pub fn with(mut self, city: City, text: &str) -> Self {
        self.docs.insert(city, text.to_string());
        self
    }

    /// Both shipped test fixtures.
    pub fn both_cities() -> Self {
        use crate::reference::fixtures::{DINDIGUL_REFERENCE, MADURAI_REFERENCE};
        Self::default()
            .with(City::Madurai, MADURAI_REFERENCE)
            .with(City::Dindigul, DINDIGUL_REFERENCE)
    }
}

#[cfg(test)]
impl ReferenceSource for InMemorySource {
    fn fetch(&self, city: City) -> Result<Option<SourcedText>, ReferenceError> {
        Ok(self.docs.get(&city).map(|text| SourcedText {
            text: text.clone(),
            locator: self.locator(city),
        }))
    }

    fn locator(&self, city: City) -> String {
        format!("memory://{}", city.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_source_reads_city_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("madurai_context.md"), "# Madurai\nTemple city").unwrap();

        let source = DirectorySource::new(dir.path());
        let fetched = source.fetch(City::Madurai).unwrap().unwrap();
        assert_eq!(fetched.text, "# Madurai\nTemple city");
        assert!(fetched.locator.ends_with("madurai_context.md"));
    }

    #[test]
    fn test_directory_source_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(source.fetch(City::Dindigul).unwrap().is_none());
    }

    #[test]
    fn test_shipped_reference_documents_name_their_city() {
        let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../../context");
        let source = DirectorySource::new(root);
        for city in City::ALL {
            let doc = source
                .fetch(city)
                .unwrap()
                .unwrap_or_else(|| panic!("missing shipped reference for {city}"));
            assert!(doc.text.to_lowercase().contains(city.id()));
        }
    }
}
