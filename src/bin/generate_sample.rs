//! Writes a synthetic release into `data/` so the pipeline can run without
//! the restricted NDA files.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Right-skewed, strictly positive FD value.
    fn mean_fd(&mut self, median: f64, spread: f64) -> f64 {
        self.gauss(median.ln(), spread).exp()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Random NDA GUID body, e.g. `INVX8CRJYVP`.
fn guid_body(rng: &mut SimpleRng) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";
    let tail: String = (0..8)
        .map(|_| ALPHABET[(rng.next_u64() % ALPHABET.len() as u64) as usize] as char)
        .collect();
    format!("INV{tail}")
}

fn create(path: &Path) -> BufWriter<File> {
    BufWriter::new(File::create(path).expect("Failed to create output file"))
}

const REFERENCE_SUBJECTS: usize = 500;
const TARGET_SUBJECTS: usize = 1200;

fn main() {
    let mut rng = SimpleRng::new(42);
    let data = Path::new("data");
    fs::create_dir_all(data).expect("Failed to create data/");

    // Reference cohort: one mean FD per line
    let mut out = create(&data.join("HCP500_rfMRI_motion.txt"));
    for _ in 0..REFERENCE_SUBJECTS {
        writeln!(out, "{:.6}", rng.mean_fd(0.09, 0.35)).unwrap();
    }
    out.flush().unwrap();

    // Target cohort: motion summary, FD vector and QC table share subjects
    let mut summary = create(&data.join("motion_summary_data.csv"));
    let mut fds = create(&data.join("mean_FDs.txt"));
    let mut qc = create(&data.join("mriqcrp102.txt"));

    writeln!(summary, "sub,remaining_frame_mean_FD,remaining_seconds,site").unwrap();
    writeln!(
        qc,
        "\"subjectkey\"\t\"interview_age\"\t\"iqc_t1_ok_ser\"\t\"iqc_t1_good_ser\"\t\"iqc_rsfmri_ok_ser\"\t\"iqc_rsfmri_good_ser\""
    )
    .unwrap();
    writeln!(
        qc,
        "\"The NDAR Global Unique Identifier (GUID) for research subject\"\t\"Age in months\"\t\"T1 series passing protocol compliance\"\t\"T1 series passing QC\"\t\"rsfMRI series passing protocol compliance\"\t\"rsfMRI series passing QC\""
    )
    .unwrap();

    let mut written = 0usize;
    let mut used = BTreeSet::new();
    for i in 0..TARGET_SUBJECTS {
        // subject keys must be unique in the summary
        let body = loop {
            let candidate = guid_body(&mut rng);
            if used.insert(candidate.clone()) {
                break candidate;
            }
        };
        let site = format!("site{:02}", i % 21 + 1);

        // a handful of heavy movers to be caught as outliers
        let fd = if i % 400 == 7 {
            rng.mean_fd(1.5, 0.1)
        } else {
            rng.mean_fd(0.14, 0.45)
        };
        let seconds = (rng.gauss(900.0, 250.0).clamp(0.0, 1500.0)).round() as i64;

        if rng.chance(0.03) {
            writeln!(summary, "NDAR{body},,{seconds},{site}").unwrap();
        } else {
            writeln!(summary, "NDAR{body},{fd:.6},{seconds},{site}").unwrap();
            writeln!(fds, "{fd:.6}").unwrap();
        }

        if rng.chance(0.02) {
            continue; // subject absent from the QC release
        }
        let t1_ok = if rng.chance(0.97) { 1 } else { 0 };
        let t1_good = if t1_ok == 1 && rng.chance(0.95) { 1 } else { 0 };
        let rs_ok = (rng.next_u64() % 5) as i64;
        let rs_good = (rs_ok - (rng.next_u64() % 2) as i64).max(0);
        let rs_good = if rng.chance(0.02) {
            String::new()
        } else {
            rs_good.to_string()
        };
        let age = 108 + (rng.next_u64() % 24);
        writeln!(
            qc,
            "\"NDAR_{body}\"\t\"{age}\"\t\"{t1_ok}\"\t\"{t1_good}\"\t\"{rs_ok}\"\t\"{rs_good}\""
        )
        .unwrap();
        written += 1;
    }

    summary.flush().unwrap();
    fds.flush().unwrap();
    qc.flush().unwrap();

    println!(
        "Wrote {REFERENCE_SUBJECTS} reference and {TARGET_SUBJECTS} target subjects ({written} with QC rows) to {}",
        data.display()
    );
}
