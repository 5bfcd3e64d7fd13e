use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reference::ReferenceError;
use crate::retrieval::chunker::chunk_document;

/// The closed set of cities the guide can answer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum City {
    Madurai,
    Dindigul,
}

impl City {
    pub const ALL: [City; 2] = [City::Madurai, City::Dindigul];

    /// Stable lowercase key, used for file names and passage ids.
    pub fn id(&self) -> &'static str {
        match self {
            City::Madurai => "madurai",
            City::Dindigul => "dindigul",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            City::Madurai => "Madurai",
            City::Dindigul => "Dindigul",
        }
    }

    pub fn others(&self) -> impl Iterator<Item = City> + '_ {
        City::ALL.into_iter().filter(move |c| c != self)
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for City {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        City::ALL
            .into_iter()
            .find(|c| c.id() == wanted)
            .ok_or_else(|| ReferenceError::InvalidCity {
                requested: s.trim().to_string(),
            })
    }
}

/// A structurally delimited chunk of one city's reference document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    /// `{city}_{section_index}_{subsection_index}`, stable across reloads of the same text.
    pub id: String,
    pub city: City,
    pub section: String,
    pub content: String,
    /// Query-scoped; 0.0 until a ranker scores the passage.
    pub relevance: f64,
}

/// One city's reference text plus the passages derived from it.
///
/// Fields are private so the passages can never drift from the text they
/// were cut from: the only way to get a document is `ReferenceDocument::new`.
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    city: City,
    text: String,
    source: String,
    loaded_at: DateTime<Utc>,
    passages: Vec<Passage>,
}

impl ReferenceDocument {
    pub fn new(
        city: City,
        text: String,
        source: String,
        loaded_at: DateTime<Utc>,
    ) -> Result<Self, ReferenceError> {
        if text.trim().is_empty() {
            return Err(ReferenceError::EmptyDocument {
                city,
                locator: source,
            });
        }
        let passages = chunk_document(&text, city);
        Ok(Self {
            city,
            text,
            source,
            loaded_at,
            passages,
        })
    }

    pub fn city(&self) -> City {
        self.city
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// Sanity check only: a document that never names its own city was
    /// probably filed under the wrong key.
    pub fn mentions_own_city(&self) -> bool {
        self.text.to_lowercase().contains(self.city.id())
    }

    pub fn summary(&self) -> String {
        format!(
            "Loaded reference for {} from {} at {} ({} passages)",
            self.city,
            self.source,
            self.loaded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.passages.len()
        )
    }
}
