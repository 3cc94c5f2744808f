use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Cell – a single value in a table column
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell mirroring the dtypes a dataframe infers.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::String(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v:.4}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

impl Cell {
    /// Guess the type of a raw text field.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Cell::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Cell::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Cell::Float(f);
        }
        Cell::String(s.to_string())
    }

    /// Coerce to a number. Empty cells, `NaN` and free text become `None`.
    pub fn to_numeric(&self) -> Option<f64> {
        let v = match self {
            Cell::Integer(i) => *i as f64,
            Cell::Float(v) => *v,
            Cell::String(s) => s.trim().parse::<f64>().ok()?,
            Cell::Null => return None,
        };
        (!v.is_nan()).then_some(v)
    }
}

// ---------------------------------------------------------------------------
// SubjectRecord – one row of the motion summary
// ---------------------------------------------------------------------------

/// One subject of the motion summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    /// Subject key in joined form (`NDARINV...`).
    pub sub: String,
    /// Mean frame displacement over the frames kept after censoring.
    pub remaining_frame_mean_fd: Cell,
    /// Usable scan time in seconds.
    pub remaining_seconds: Cell,
    /// Every other column: column_name → value.
    pub metadata: BTreeMap<String, Cell>,
}

impl SubjectRecord {
    /// Mean FD coerced to a number, `None` when missing.
    pub fn mean_fd(&self) -> Option<f64> {
        self.remaining_frame_mean_fd.to_numeric()
    }

    /// Remaining scan time truncated toward zero, `None` when missing.
    pub fn whole_seconds(&self) -> Option<i64> {
        self.remaining_seconds
            .to_numeric()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    }
}

// ---------------------------------------------------------------------------
// MotionSummary – the complete loaded table
// ---------------------------------------------------------------------------

/// The parsed motion summary table.
#[derive(Debug, Clone, Default)]
pub struct MotionSummary {
    pub records: Vec<SubjectRecord>,
}

impl MotionSummary {
    pub fn from_records(records: Vec<SubjectRecord>) -> Self {
        MotionSummary { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// QC table rows
// ---------------------------------------------------------------------------

/// One row of the imaging QC release table, as loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct QcRecord {
    /// Subject key, already stripped of `_`.
    pub subjectkey: String,
    pub t1_ok: Cell,
    pub t1_good: Cell,
    pub rsfmri_ok: Cell,
    pub rsfmri_good: Cell,
}

impl QcRecord {
    /// Coerce all four counters; `None` if any of them is missing.
    pub fn counters(&self) -> Option<QcCounters> {
        Some(QcCounters {
            t1_ok: self.t1_ok.to_numeric()?,
            t1_good: self.t1_good.to_numeric()?,
            rsfmri_ok: self.rsfmri_ok.to_numeric()?,
            rsfmri_good: self.rsfmri_good.to_numeric()?,
        })
    }
}

/// Numeric QC counters of a subject whose four fields all coerced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcCounters {
    pub t1_ok: f64,
    pub t1_good: f64,
    pub rsfmri_ok: f64,
    pub rsfmri_good: f64,
}
