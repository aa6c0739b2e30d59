//! Writes `sample_cpt.gef`, a synthetic sounding through a Holocene sequence
//! of sand, clay, peat and Pleistocene sand, for trying out the classifier.

use std::fmt::Write as _;

use anyhow::{Context, Result};

/// Depth (m) at which each unit starts, with typical `qc` (MPa) and `Rf` (%).
const UNITS: &[(f64, f64, f64)] = &[
    (0.0, 4.0, 0.9),  // made ground / sand
    (1.8, 0.6, 3.8),  // clay
    (4.5, 0.25, 7.5), // peat
    (6.0, 0.8, 3.2),  // clay
    (9.5, 18.0, 0.6), // sand
];

const FINAL_DEPTH: f64 = 14.0;
const STEP: f64 = 0.02;

/// SplitMix64, enough for repeatable scatter around the unit means.
struct Noise(u64);

impl Noise {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Relative scatter, roughly normal with the given spread (Irwin-Hall).
    fn scatter(&mut self, spread: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.uniform()).sum();
        1.0 + spread * (sum - 6.0)
    }
}

fn unit_at(depth: f64) -> (f64, f64) {
    UNITS
        .iter()
        .rev()
        .find(|(top, _, _)| depth >= *top)
        .map(|&(_, qc, rf)| (qc, rf))
        .unwrap_or((UNITS[0].1, UNITS[0].2))
}

fn main() -> Result<()> {
    let mut noise = Noise(42);

    let mut gef = String::new();
    gef.push_str("#GEFID= 1, 1, 0\n");
    gef.push_str("#TESTID= SYNTH001\n");
    gef.push_str("#COLUMNINFO= 1, m, penetration length, 1\n");
    gef.push_str("#COLUMNINFO= 2, MPa, cone resistance, 2\n");
    gef.push_str("#COLUMNINFO= 3, MPa, sleeve friction, 3\n");
    gef.push_str("#COLUMNINFO= 4, %, friction ratio, 4\n");
    gef.push_str("#COLUMNVOID= 2, -9999.000\n");
    gef.push_str("#COLUMNVOID= 3, -9999.000\n");
    gef.push_str("#XYID= 31000, 155000.00, 463000.00, 0.01, 0.01\n");
    gef.push_str("#ZID= 31000, 0.80, 0.01\n");
    gef.push_str("#EOH=\n");

    let rows = (FINAL_DEPTH / STEP).round() as usize;
    for i in 0..=rows {
        let depth = i as f64 * STEP;
        let (qc_mean, rf_mean) = unit_at(depth);
        let qc = (qc_mean * noise.scatter(0.12)).max(0.05);
        let rf = (rf_mean * noise.scatter(0.1)).max(0.1);
        let fs = qc * rf / 100.0;
        // A few dropped readings, as a real cone occasionally produces.
        let qc_text = if noise.uniform() < 0.01 {
            "-9999.000".to_string()
        } else {
            format!("{qc:.3}")
        };
        writeln!(gef, "{depth:.2} {qc_text} {fs:.4} {rf:.2}")?;
    }

    let output_path = "sample_cpt.gef";
    std::fs::write(output_path, gef).context("writing sample CPT")?;
    println!("Wrote {} samples to {output_path}", rows + 1);
    Ok(())
}
