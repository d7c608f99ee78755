//! Structured field extraction for legal and tax notices.
//!
//! Several recognition passes over the same document (different OCR
//! languages, a translation) are normalized, mined for candidate values,
//! validated, and resolved per field into one [`DocumentAnalysisResult`].

pub mod aggregate;
pub mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod lexicon;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod scheme;
pub mod validate;

pub use config::{CriticalityWeights, EngineConfig};
pub use error::{AnalysisError, ConfigError, EngineError, MalformedInput};
pub use lexicon::Lexicon;
pub use model::{
    AggregatedField, DocumentAnalysisResult, FieldCandidate, FieldKind, FieldValue, Money,
    RecognizedText, Resolution, StatutoryCitation, ValidationStatus,
};
pub use pipeline::Engine;
