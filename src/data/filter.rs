use super::model::SubjectRecord;
use crate::stats::find_anomalies;

/// Minimum usable scan time (10 minutes).
pub const MIN_REMAINING_SECONDS: i64 = 600;

// ---------------------------------------------------------------------------
// Subject filter stages
// ---------------------------------------------------------------------------
//
// Every stage takes the previous stage's records and returns the survivors in
// their original order. No stage ever adds a record.

/// Drop subjects whose mean FD is missing or not a number.
pub fn drop_missing_fd(records: &[SubjectRecord]) -> Vec<SubjectRecord> {
    records
        .iter()
        .filter(|r| r.mean_fd().is_some())
        .cloned()
        .collect()
}

/// Keep subjects with at least [`MIN_REMAINING_SECONDS`] of usable scan time.
/// Durations are truncated to whole seconds; non-numeric durations are dropped.
pub fn min_scan_duration(records: &[SubjectRecord]) -> Vec<SubjectRecord> {
    records
        .iter()
        .filter(|r| r.whole_seconds().is_some_and(|s| s >= MIN_REMAINING_SECONDS))
        .cloned()
        .collect()
}

/// Mean FD of every record that has one, in record order.
pub fn mean_fd_column(records: &[SubjectRecord]) -> Vec<f64> {
    records.iter().filter_map(SubjectRecord::mean_fd).collect()
}

/// Drop subjects whose mean FD is a z-score outlier of this set.
///
/// Removal matches on the flagged *value*: every subject sharing a flagged
/// mean FD goes, whichever row produced the flag.
pub fn drop_outliers(records: &[SubjectRecord]) -> (Vec<SubjectRecord>, Vec<f64>) {
    let anomalies = find_anomalies(&mean_fd_column(records));
    let kept = records
        .iter()
        .filter(|r| match r.mean_fd() {
            Some(v) => !anomalies.contains(&v),
            None => true,
        })
        .cloned()
        .collect();
    (kept, anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Cell;
    use std::collections::BTreeMap;

    fn subject(sub: &str, fd: Cell, seconds: Cell) -> SubjectRecord {
        SubjectRecord {
            sub: sub.to_string(),
            remaining_frame_mean_fd: fd,
            remaining_seconds: seconds,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_fd_rows_are_dropped() {
        let rows = vec![
            subject("NDARINVA", Cell::Float(0.1), Cell::Integer(700)),
            subject("NDARINVB", Cell::Null, Cell::Integer(700)),
            subject("NDARINVC", Cell::String("nan?".into()), Cell::Integer(700)),
            subject("NDARINVD", Cell::String("0.3".into()), Cell::Integer(700)),
        ];
        let kept = drop_missing_fd(&rows);
        let subs: Vec<&str> = kept.iter().map(|r| r.sub.as_str()).collect();
        assert_eq!(subs, ["NDARINVA", "NDARINVD"]);
        assert_eq!(drop_missing_fd(&kept), kept);
    }

    #[test]
    fn duration_threshold_is_inclusive_and_truncating() {
        let rows = vec![
            subject("NDARINVA", Cell::Float(0.1), Cell::Integer(600)),
            subject("NDARINVB", Cell::Float(0.1), Cell::Float(599.99)),
            subject("NDARINVC", Cell::Float(0.1), Cell::Float(600.4)),
            subject("NDARINVD", Cell::Float(0.1), Cell::String("long".into())),
            subject("NDARINVE", Cell::Float(0.1), Cell::Null),
        ];
        let subs: Vec<String> = min_scan_duration(&rows).into_iter().map(|r| r.sub).collect();
        assert_eq!(subs, ["NDARINVA", "NDARINVC"]);
    }

    #[test]
    fn outlier_removal_matches_by_value() {
        // NDARINVDUP shares the flagged value with NDARINVOUT and is removed too
        let mut rows: Vec<SubjectRecord> = (0..300)
            .map(|i| {
                subject(
                    &format!("NDARINV{i:04}"),
                    Cell::Float(0.1 + (i % 7) as f64 * 0.005),
                    Cell::Integer(900),
                )
            })
            .collect();
        rows.push(subject("NDARINVOUT", Cell::Float(3.5), Cell::Integer(900)));
        rows.push(subject("NDARINVDUP", Cell::Float(3.5), Cell::Integer(900)));

        let (kept, anomalies) = drop_outliers(&rows);
        assert_eq!(anomalies, vec![3.5, 3.5]);
        assert_eq!(kept.len(), 300);
        assert!(kept.iter().all(|r| r.sub != "NDARINVOUT" && r.sub != "NDARINVDUP"));
    }

    #[test]
    fn outlier_removal_on_empty_set() {
        let (kept, anomalies) = drop_outliers(&[]);
        assert!(kept.is_empty());
        assert!(anomalies.is_empty());
    }
}
