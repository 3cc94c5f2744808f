use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{QcCounters, QcRecord, SubjectRecord};

// ---------------------------------------------------------------------------
// Inclusion policy
// ---------------------------------------------------------------------------

/// Which pair of QC counters a subject must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionPolicy {
    /// Full-quality series: `t1_good > 0 && rsfmri_good > 1`.
    #[default]
    Good,
    /// Protocol-compliant series only: `t1_ok > 0 && rsfmri_ok > 1`.
    Ok,
}

impl InclusionPolicy {
    /// At least one T1 and two resting-state series (two 5-minute runs make
    /// the 10 minutes required upstream).
    pub fn admits(self, c: &QcCounters) -> bool {
        match self {
            InclusionPolicy::Good => c.t1_good > 0.0 && c.rsfmri_good > 1.0,
            InclusionPolicy::Ok => c.t1_ok > 0.0 && c.rsfmri_ok > 1.0,
        }
    }

    pub fn alternate(self) -> Self {
        match self {
            InclusionPolicy::Good => InclusionPolicy::Ok,
            InclusionPolicy::Ok => InclusionPolicy::Good,
        }
    }
}

// ---------------------------------------------------------------------------
// Join + filter
// ---------------------------------------------------------------------------

/// A QC row joined to the current subject set with all counters numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedQc {
    pub subjectkey: String,
    pub counters: QcCounters,
}

/// Inner-join the QC table onto `subjects` and drop rows with any counter
/// missing after numeric coercion.
pub fn join_complete(qc: &[QcRecord], subjects: &[SubjectRecord]) -> Vec<JoinedQc> {
    let keys: BTreeSet<&str> = subjects.iter().map(|s| s.sub.as_str()).collect();
    qc.iter()
        .filter(|row| keys.contains(row.subjectkey.as_str()))
        .filter_map(|row| {
            Some(JoinedQc {
                subjectkey: row.subjectkey.clone(),
                counters: row.counters()?,
            })
        })
        .collect()
}

/// Keys of the joined rows the policy admits.
pub fn passing_keys(joined: &[JoinedQc], policy: InclusionPolicy) -> BTreeSet<String> {
    joined
        .iter()
        .filter(|row| policy.admits(&row.counters))
        .map(|row| row.subjectkey.clone())
        .collect()
}

/// Subjects whose key passed QC, in subject order.
pub fn retain_passing(subjects: &[SubjectRecord], passing: &BTreeSet<String>) -> Vec<SubjectRecord> {
    subjects
        .iter()
        .filter(|s| passing.contains(&s.sub))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Cell;
    use std::collections::BTreeMap;

    fn qc_row(key: &str, t1_ok: Cell, t1_good: Cell, rs_ok: Cell, rs_good: Cell) -> QcRecord {
        QcRecord {
            subjectkey: key.to_string(),
            t1_ok,
            t1_good,
            rsfmri_ok: rs_ok,
            rsfmri_good: rs_good,
        }
    }

    fn subject(sub: &str) -> SubjectRecord {
        SubjectRecord {
            sub: sub.to_string(),
            remaining_frame_mean_fd: Cell::Float(0.1),
            remaining_seconds: Cell::Integer(900),
            metadata: BTreeMap::new(),
        }
    }

    fn counters(t1_ok: f64, t1_good: f64, rs_ok: f64, rs_good: f64) -> QcCounters {
        QcCounters {
            t1_ok,
            t1_good,
            rsfmri_ok: rs_ok,
            rsfmri_good: rs_good,
        }
    }

    #[test]
    fn zero_good_t1_is_always_excluded() {
        let c = counters(9.0, 0.0, 9.0, 9.0);
        assert!(!InclusionPolicy::Good.admits(&c));
        assert!(InclusionPolicy::Ok.admits(&c));
    }

    #[test]
    fn minimal_good_counts_are_included() {
        assert!(InclusionPolicy::Good.admits(&counters(0.0, 1.0, 0.0, 2.0)));
        assert!(!InclusionPolicy::Good.admits(&counters(1.0, 1.0, 2.0, 1.0)));
    }

    #[test]
    fn join_is_inner_and_drops_incomplete_rows() {
        let subjects = vec![subject("NDARINVA"), subject("NDARINVB"), subject("NDARINVC")];
        let qc = vec![
            qc_row("NDARINVA", Cell::Integer(1), Cell::Integer(1), Cell::Integer(2), Cell::Integer(2)),
            qc_row("NDARINVB", Cell::Integer(1), Cell::String("x".into()), Cell::Integer(2), Cell::Integer(2)),
            qc_row("NDARINVZ", Cell::Integer(1), Cell::Integer(1), Cell::Integer(2), Cell::Integer(2)),
        ];
        let joined = join_complete(&qc, &subjects);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].subjectkey, "NDARINVA");
    }

    #[test]
    fn retain_keeps_subject_order() {
        let subjects = vec![subject("NDARINVC"), subject("NDARINVA"), subject("NDARINVB")];
        let passing: BTreeSet<String> = ["NDARINVA", "NDARINVC"].iter().map(|s| s.to_string()).collect();
        let kept: Vec<String> = retain_passing(&subjects, &passing).into_iter().map(|s| s.sub).collect();
        assert_eq!(kept, ["NDARINVC", "NDARINVA"]);
    }
}
