/// Data layer: core types, loading, and the subject filter stages.
///
/// Architecture:
/// ```text
///  motion_summary_data.csv          mriqcrp102.txt
///        │                               │
///        ▼                               ▼
///   ┌──────────┐                   ┌──────────┐
///   │  loader   │ → MotionSummary  │  loader   │ → Vec<QcRecord>
///   └──────────┘                   └──────────┘
///        │                               │
///        ▼                               │
///   ┌──────────┐                         │
///   │  filter   │  missing FD → ≥600 s → outliers
///   └──────────┘                         │
///        │                               ▼
///        └─────────────────────────► ┌──────┐
///                                    │  qc   │  join → policy → final set
///                                    └──────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod qc;
