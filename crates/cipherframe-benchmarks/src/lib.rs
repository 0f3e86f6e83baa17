#![warn(missing_docs)]
//! # cipherframe-benchmarks
//!
//! ## Purpose
//! Deterministic workload generators for the NFR smoke tests.
//!
//! ## Responsibilities
//! - Build large per-frame CSV datasets shaped like engine output.
//! - Build long progress event sequences for the job state machine.

use std::fmt::Write;

use cipherframe_core::JobEvent;

/// Header of a full encryption dataset.
pub const DATASET_HEADER: &str = "Frame,Entropy,Entropy_R,Entropy_G,Entropy_B,NPCR,UACI,MSE,\
Correlation_Horizontal,Correlation_Vertical,Correlation_Diagonal,Time";

/// CSV text with `frames` frame rows, a blank separator row and a `Mean` row.
pub fn synthetic_dataset(frames: usize) -> String {
    let mut csv = String::with_capacity(frames * 96);
    csv.push_str(DATASET_HEADER);
    csv.push('\n');
    for frame in 0..frames {
        let jitter = (frame % 17) as f64 / 1_000.0;
        let _ = writeln!(
            csv,
            "{frame},{:.4},{:.4},{:.4},{:.4},{:.3},{:.3},{:.4},{:.4},{:.4},{:.4},{:.4}",
            7.99 - jitter,
            7.98 - jitter,
            7.97 - jitter,
            7.99 - jitter,
            99.6 - jitter,
            33.4 + jitter,
            0.01 + jitter,
            0.002 + jitter,
            -0.003 - jitter,
            0.001,
            0.040 + jitter / 10.0,
        );
    }
    csv.push_str(",,,,,,,,,,,\n");
    csv.push_str("Mean,7.98,7.97,7.96,7.98,99.59,33.41,0.018,0.01,-0.011,0.001,0.0408\n");
    csv
}

/// `count` running events followed by one terminal success event.
pub fn progress_events(count: usize) -> Vec<JobEvent> {
    let mut events: Vec<JobEvent> = (0..count)
        .map(|frame| JobEvent::running(format!("Encrypting frame {frame}/{count}")))
        .collect();
    events.push(JobEvent::success("done", Default::default()));
    events
}
