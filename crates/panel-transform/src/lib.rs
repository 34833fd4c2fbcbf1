//! Record-level transformations for survey microdata.
//!
//! - [`score`]: locale-aware score parsing with the zero sentinel
//! - [`cohort`]: STRICT / PROXY / ALL_DATA cohort filtering
//! - [`geo`]: raw geographic values to canonical states or regions
//! - [`network`]: administrative network classification
//! - [`country`]: participant-country filtering
//! - [`record`]: all of the above applied to one record

pub mod cohort;
pub mod country;
pub mod geo;
pub mod network;
pub mod record;
pub mod score;

pub use cohort::CohortFilter;
pub use country::CountryFilter;
pub use geo::{GeoResolution, GeoResolver};
pub use network::NetworkClassifier;
pub use record::{RecordOutcome, RecordTransformer};
pub use score::{MissingReason, ScoreNormalizer, ScoreValue, normalize, parse_decimal};
