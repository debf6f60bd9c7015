//! The screening core: field normalization, result normalization, and
//! risk classification. Pure logic — no I/O, single source of truth
//! for thresholds and field-priority order.

pub mod normalize;
pub mod risk;
pub mod vitals;

pub use normalize::{normalize, ResultBasis, ScreeningResult};
pub use risk::RiskLevel;
pub use vitals::{Gender, RawVitals, ValidationError, VitalsInput};
