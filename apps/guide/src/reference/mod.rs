// Per-city reference material: loading, isolation and the source seam.
// Every answer the guide gives must be traceable to the active document here.

pub mod models;
pub mod source;
pub mod store;

use thiserror::Error;

pub use models::{City, Passage, ReferenceDocument};
#[cfg(test)]
pub use source::InMemorySource;
pub use source::{DirectorySource, ReferenceSource, SourcedText};
pub use store::ReferenceStore;

/// Configuration-level failures. These reach the caller as explicit errors
/// because they can be fixed before any question is asked.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("City '{requested}' is not supported. Available cities: Madurai, Dindigul")]
    InvalidCity { requested: String },

    #[error("No reference document for {city} (looked in {locator})")]
    NotFound { city: City, locator: String },

    #[error("Reference document for {city} at {locator} is empty")]
    EmptyDocument { city: City, locator: String },

    #[error("Failed to read reference document {locator}: {source}")]
    Io {
        locator: String,
        source: std::io::Error,
    },
}

#[cfg(test)]
pub mod fixtures {
    //! Compact reference documents with the same shape as the shipped ones.

    pub const MADURAI_REFERENCE: &str = "# Madurai Local Context

Madurai is the temple city on the Vaigai river.

## Food

### Jigarthanda
Jigarthanda is the signature cold drink of Madurai, made with milk, almond gum and nannari syrup.
Famous Jigarthanda shop near the Meenakshi temple stays open till 11pm.

### Breakfast
Idli and dosa with four chutneys are served from 6am at mess halls near the bus stand.
Murugan Idli Shop is the usual breakfast stop.

## Transport

### Buses
Mattuthavani bus stand handles long-distance buses. Periyar bus stand serves city routes.

### Autos
Share autos run on fixed routes; agree on the fare before boarding a regular auto.

## Slang

### Common phrases
People say 'enna machan' to greet friends. 'Semma' means excellent.

## Safety

### Night travel
The temple area stays busy until late; avoid isolated stretches along the river after midnight.
Emergency police number is 100.

## Lifestyle

### Festivals
Chithirai festival fills the streets around the Meenakshi temple in April.
";

    pub const DINDIGUL_REFERENCE: &str = "# Dindigul Local Context

Dindigul is known for its rock fort and locks.

## Food

### Dindigul Biryani
Dindigul biryani uses seeraga samba rice and small pieces of mutton.
Thalappakatti biryani is the original Dindigul biryani, served for lunch from 12pm.

## Transport

### Railway
Dindigul junction connects to Chennai and Tiruchirappalli trains.

### Town buses
Town buses leave from the central bus stand every ten minutes.

## Slang

### Local words
'Vaanga' welcomes you in; shopkeepers use it constantly.

## Safety

### Rock fort
The rock fort climb closes at 6pm; carry water and avoid the steps after dark.

## Lifestyle

### Locks and markets
Dindigul locks are sold in the old market street near the rock fort.
";
}
