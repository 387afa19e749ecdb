//! Analysis layer: metrics, correction, validation, shift detection, kit
//! statistics.
//!
//! Architecture:
//! ```text
//!   mean spectra per id (data::aggregate)
//!        │
//!        ├──────────────► correction   reference − new, averaged over ids
//!        ▼
//!   ┌───────────┐      ┌──────────┐
//!   │ validator │ ───► │ metrics  │  pearson / rms / max |Δ| / mean Δ
//!   └───────────┘      └──────────┘
//!        │  ├──► region   same metrics on channel sub-bands
//!        │  └──► shift    cross-correlation over ±max_shift
//!        ▼
//!   ┌──────────┐
//!   │ summary  │  kit counts, means, worst standard
//!   └──────────┘
//!
//!   diagnostics   grades and white-standard checks for reporting
//! ```

pub mod correction;
pub mod diagnostics;
pub mod metrics;
pub mod region;
pub mod shift;
pub mod summary;
pub mod validator;
