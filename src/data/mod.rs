/// Data layer: measurement tables, id matching, replicate averaging.
///
/// Architecture:
/// ```text
///  records from an instrument export (loaded elsewhere)
///        │
///        ▼
///   ┌───────────────┐
///   │ SpectrumTable │  Vec<MeasurementRecord>, id index, channel count
///   └───────────────┘
///        │
///        ├──────────────► filter     select one lamp / a subset of ids
///        ▼
///   ┌──────────┐
///   │ matcher  │  ids present in both tables
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  mean spectrum per id
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod matcher;
pub mod model;
