#![warn(missing_docs)]
//! # cipherframe-metrics
//!
//! ## Purpose
//! Turns the per-frame measurement dataset of a finished job into bounded
//! 0-100 quality scores with a pass/fail classification per metric.
//!
//! ## Responsibilities
//! - Hold the static metric table ([`METRIC_DEFINITIONS`]) keyed by [`MetricId`].
//! - Apply the normalization rule of each [`MetricFamily`].
//! - Parse CSV datasets into [`MetricDataset`] and read the summary row.
//! - Label known video resolutions.
//!
//! ## Data flow
//! CSV reader -> [`MetricDataset`] -> summary [`MetricSample`] -> [`evaluate`]
//! per definition -> [`MetricReport`] -> [`FileReport`] per input file.
//!
//! ## Ownership and lifetimes
//! Definitions are `'static`. Datasets own their rows; reports own their
//! values and borrow nothing.
//!
//! ## Error model
//! Dataset problems (missing column, unparsable number, no rows) return
//! [`MetricsError`]. Scoring itself is total.
//!
//! ## Security and privacy notes
//! Only numeric measurements pass through this crate.
//!
//! ## Example
//! ```rust
//! use cipherframe_metrics::{deviation_score, resolution_label};
//!
//! assert_eq!(deviation_score(33.0, 0.0, 100.0, 33.0), 100.0);
//! assert_eq!(resolution_label(1920, 1080), "1080p");
//! ```

mod dataset;

use cipherframe_core::JobResult;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use dataset::{FRAME_COLUMN, MetricDataset, MetricSample};

/// Combined entropy above which a file counts as well encrypted.
pub const ENTROPY_GOOD_ABOVE: f64 = 7.9;
/// Theoretical maximum entropy of an 8-bit channel.
pub const ENTROPY_MAX: f64 = 8.0;
/// Normalized score at or above which a scored metric is good.
pub const GOOD_SCORE: f64 = 50.0;

/// Identity of one displayed metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricId {
    /// Information entropy, combined and per RGB channel.
    Entropy,
    /// Number of pixels change rate.
    Npcr,
    /// Unified average changing intensity.
    Uaci,
    /// Mean squared error.
    Mse,
    /// Correlation of horizontally adjacent pixels.
    CorrelationHorizontal,
    /// Correlation of vertically adjacent pixels.
    CorrelationVertical,
    /// Correlation of diagonally adjacent pixels.
    CorrelationDiagonal,
    /// Processing time per frame.
    Time,
}

impl MetricId {
    /// Every metric in display order.
    pub const ALL: [MetricId; 8] = [
        MetricId::Entropy,
        MetricId::Npcr,
        MetricId::Uaci,
        MetricId::Mse,
        MetricId::CorrelationHorizontal,
        MetricId::CorrelationVertical,
        MetricId::CorrelationDiagonal,
        MetricId::Time,
    ];

    /// Static definition of this metric.
    pub fn definition(&self) -> &'static MetricDefinition {
        let index = match self {
            MetricId::Entropy => 0,
            MetricId::Npcr => 1,
            MetricId::Uaci => 2,
            MetricId::Mse => 3,
            MetricId::CorrelationHorizontal => 4,
            MetricId::CorrelationVertical => 5,
            MetricId::CorrelationDiagonal => 6,
            MetricId::Time => 7,
        };
        &METRIC_DEFINITIONS[index]
    }
}

/// Normalization rule of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MetricFamily {
    /// `score = clamp(v / max * 100)`; good when the raw value reaches the threshold.
    Linear {
        /// Value mapped to 100.
        max: f64,
        /// Raw value at or above which the metric is good.
        good_at_least: f64,
    },
    /// Linear rule per channel; good when combined entropy exceeds the threshold.
    Entropy {
        /// Value mapped to 100.
        max: f64,
        /// Combined value above which the metric is good.
        good_above: f64,
    },
    /// Rewards closeness to an ideal value from either side.
    DeviationFromIdeal {
        /// Lower clamp bound.
        min: f64,
        /// Upper clamp bound.
        max: f64,
        /// Value mapped to 100.
        ideal: f64,
    },
    /// `score = exp(-v) * 100`.
    ExponentialDecay,
    /// Rewards closeness to zero on a signed range.
    ClosenessToZero {
        /// Lower clamp bound.
        min: f64,
        /// Upper clamp bound.
        max: f64,
    },
    /// Good when the value does not exceed the fastest baseline sample.
    ThresholdVsBaseline,
}

/// One row of the static metric table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDefinition {
    /// Metric identity.
    pub id: MetricId,
    /// Display name.
    pub label: &'static str,
    /// Dataset columns read by this metric; entropy reads four.
    pub columns: &'static [&'static str],
    /// Normalization rule.
    pub family: MetricFamily,
    /// Ideal-value hint shown next to the score.
    pub ideal_description: &'static str,
}

/// Process-wide metric table in display order.
pub static METRIC_DEFINITIONS: [MetricDefinition; 8] = [
    MetricDefinition {
        id: MetricId::Entropy,
        label: "Entropy",
        columns: &["Entropy", "Entropy_R", "Entropy_G", "Entropy_B"],
        family: MetricFamily::Entropy {
            max: ENTROPY_MAX,
            good_above: ENTROPY_GOOD_ABOVE,
        },
        ideal_description: "ideal: close to 8",
    },
    MetricDefinition {
        id: MetricId::Npcr,
        label: "NPCR",
        columns: &["NPCR"],
        family: MetricFamily::Linear {
            max: 100.0,
            good_at_least: 99.0,
        },
        ideal_description: "ideal: close to 100%",
    },
    MetricDefinition {
        id: MetricId::Uaci,
        label: "UACI",
        columns: &["UACI"],
        family: MetricFamily::DeviationFromIdeal {
            min: 0.0,
            max: 100.0,
            ideal: 33.0,
        },
        ideal_description: "ideal: close to 33%",
    },
    MetricDefinition {
        id: MetricId::Mse,
        label: "MSE",
        columns: &["MSE"],
        family: MetricFamily::ExponentialDecay,
        ideal_description: "ideal: close to 0",
    },
    MetricDefinition {
        id: MetricId::CorrelationHorizontal,
        label: "Horizontal correlation",
        columns: &["Correlation_Horizontal"],
        family: MetricFamily::ClosenessToZero {
            min: -1.0,
            max: 1.0,
        },
        ideal_description: "ideal: close to 0",
    },
    MetricDefinition {
        id: MetricId::CorrelationVertical,
        label: "Vertical correlation",
        columns: &["Correlation_Vertical"],
        family: MetricFamily::ClosenessToZero {
            min: -1.0,
            max: 1.0,
        },
        ideal_description: "ideal: close to 0",
    },
    MetricDefinition {
        id: MetricId::CorrelationDiagonal,
        label: "Diagonal correlation",
        columns: &["Correlation_Diagonal"],
        family: MetricFamily::ClosenessToZero {
            min: -1.0,
            max: 1.0,
        },
        ideal_description: "ideal: close to 0",
    },
    MetricDefinition {
        id: MetricId::Time,
        label: "Time per frame",
        columns: &["Time"],
        family: MetricFamily::ThresholdVsBaseline,
        ideal_description: "ideal: at or below baseline",
    },
];

/// Raw or normalized value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MetricValue {
    /// Single value.
    Scalar(f64),
    /// Combined value plus one value per RGB channel.
    Channels {
        /// All channels together.
        combined: f64,
        /// Red channel.
        red: f64,
        /// Green channel.
        green: f64,
        /// Blue channel.
        blue: f64,
    },
}

impl MetricValue {
    /// The scalar, or the combined value for channel tuples.
    pub fn primary(&self) -> f64 {
        match self {
            MetricValue::Scalar(value) => *value,
            MetricValue::Channels { combined, .. } => *combined,
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            MetricValue::Scalar(value) => MetricValue::Scalar(f(value)),
            MetricValue::Channels {
                combined,
                red,
                green,
                blue,
            } => MetricValue::Channels {
                combined: f(combined),
                red: f(red),
                green: f(green),
                blue: f(blue),
            },
        }
    }
}

/// Display-ready evaluation of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    /// Metric identity.
    pub metric: MetricId,
    /// Value read from the dataset.
    pub raw: MetricValue,
    /// Normalized 0-100 score; `None` for timing metrics.
    pub score: Option<MetricValue>,
    /// Pass/fail classification.
    pub is_good: bool,
    /// Ideal-value hint.
    pub ideal_description: &'static str,
    /// Fastest baseline sample; timing metrics only.
    pub baseline: Option<f64>,
}

/// Every metric reported for one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    /// Position of the file in the job.
    pub index: usize,
    /// Input file name, when the engine reported one.
    pub file_name: Option<String>,
    /// Video resolution as `(width, height)`.
    pub resolution: Option<(u32, u32)>,
    /// Resolution label such as `1080p`; empty when unknown.
    pub resolution_label: &'static str,
    /// Reports for the metrics present in the dataset, in table order.
    pub reports: Vec<MetricReport>,
}

impl FileReport {
    /// Report for one metric, if the dataset carried it.
    pub fn report(&self, metric: MetricId) -> Option<&MetricReport> {
        self.reports.iter().find(|report| report.metric == metric)
    }
}

/// `clamp(value / max * 100, 0, 100)`.
pub fn linear_score(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

/// Score for closeness to `ideal` within `[min, max]`.
///
/// Symmetric around `ideal` and non-increasing in the deviation.
pub fn deviation_score(value: f64, min: f64, max: f64, ideal: f64) -> f64 {
    let clamped = value.clamp(min, max);
    let deviation = (clamped - ideal).abs();
    let max_deviation = (ideal - min).max(max - ideal);
    if max_deviation <= 0.0 {
        return 100.0;
    }
    ((1.0 - deviation / max_deviation) * 100.0).clamp(0.0, 100.0)
}

/// `clamp(exp(-value) * 100, 0, 100)`.
pub fn exponential_decay_score(value: f64) -> f64 {
    ((-value).exp() * 100.0).clamp(0.0, 100.0)
}

/// Score for closeness to zero on the signed range `[min, max]`.
pub fn closeness_to_zero_score(value: f64, min: f64, max: f64) -> f64 {
    let bound = min.abs().max(max.abs());
    if bound <= 0.0 {
        return 100.0;
    }
    let clamped = value.clamp(min, max);
    ((1.0 - clamped.abs() / bound) * 100.0).clamp(0.0, 100.0)
}

/// Fastest (minimum) finite baseline sample.
pub fn baseline_speed(samples: &[f64]) -> Option<f64> {
    samples
        .iter()
        .copied()
        .filter(|sample| sample.is_finite())
        .reduce(f64::min)
}

/// Known resolution label, independent of orientation; `""` when unknown.
pub fn resolution_label(width: u32, height: u32) -> &'static str {
    let (short, long) = if width <= height {
        (width, height)
    } else {
        (height, width)
    };
    match (short, long) {
        (240, 320) => "240p",
        (720, 1280) => "720p",
        (1080, 1920) => "1080p",
        (1440, 2560) => "1440p",
        (2160, 3840) => "2160p",
        _ => "",
    }
}

/// Evaluates one metric against a summary row.
///
/// # Errors
/// Returns [`MetricsError::MissingColumn`] or [`MetricsError::InvalidNumber`]
/// when the row lacks a usable value for the metric.
pub fn evaluate(
    definition: &MetricDefinition,
    sample: &MetricSample,
    baseline_speeds: &[f64],
) -> Result<MetricReport, MetricsError> {
    let raw = read_value(definition, sample)?;

    let (score, is_good, baseline) = match definition.family {
        MetricFamily::Linear { max, good_at_least } => {
            let score = raw.map(|value| linear_score(value, max));
            (Some(score), raw.primary() >= good_at_least, None)
        }
        MetricFamily::Entropy { max, good_above } => {
            let score = raw.map(|value| linear_score(value, max));
            (Some(score), raw.primary() > good_above, None)
        }
        MetricFamily::DeviationFromIdeal { min, max, ideal } => {
            let score = raw.map(|value| deviation_score(value, min, max, ideal));
            (Some(score), score.primary() >= GOOD_SCORE, None)
        }
        MetricFamily::ExponentialDecay => {
            let score = raw.map(exponential_decay_score);
            (Some(score), score.primary() >= GOOD_SCORE, None)
        }
        MetricFamily::ClosenessToZero { min, max } => {
            let score = raw.map(|value| closeness_to_zero_score(value, min, max));
            (Some(score), score.primary() >= GOOD_SCORE, None)
        }
        MetricFamily::ThresholdVsBaseline => {
            let baseline = baseline_speed(baseline_speeds);
            let is_good = baseline.is_some_and(|baseline| raw.primary() <= baseline);
            (None, is_good, baseline)
        }
    };

    debug!(metric = definition.label, is_good, "metric evaluated");
    Ok(MetricReport {
        metric: definition.id,
        raw,
        score,
        is_good,
        ideal_description: definition.ideal_description,
        baseline,
    })
}

fn read_value(
    definition: &MetricDefinition,
    sample: &MetricSample,
) -> Result<MetricValue, MetricsError> {
    match definition.columns {
        [combined, red, green, blue] => Ok(MetricValue::Channels {
            combined: sample.number(combined)?,
            red: sample.number(red)?,
            green: sample.number(green)?,
            blue: sample.number(blue)?,
        }),
        [column] => Ok(MetricValue::Scalar(sample.number(column)?)),
        columns => Err(MetricsError::MissingColumn(columns.join(","))),
    }
}

/// Evaluates every metric present in a file's dataset.
///
/// Metrics whose columns are absent are skipped, so processing and evaluation
/// datasets with different column sets share one code path.
///
/// # Errors
/// Returns [`MetricsError::EmptyDataset`] when no summary row exists and
/// [`MetricsError::InvalidNumber`] when a present column holds a non-number.
pub fn analyze_file(
    dataset: &MetricDataset,
    resolution: Option<(u32, u32)>,
    baseline_speeds: &[f64],
) -> Result<FileReport, MetricsError> {
    let summary = dataset.summary()?;
    let mut reports = Vec::new();
    for definition in &METRIC_DEFINITIONS {
        if !definition
            .columns
            .iter()
            .all(|column| dataset.has_column(column))
        {
            debug!(metric = definition.label, "metric absent from dataset");
            continue;
        }
        reports.push(evaluate(definition, summary, baseline_speeds)?);
    }

    Ok(FileReport {
        index: 0,
        file_name: None,
        resolution,
        resolution_label: resolution
            .map(|(width, height)| resolution_label(width, height))
            .unwrap_or(""),
        reports,
    })
}

/// Builds one [`FileReport`] per dataset of a finished job.
///
/// Datasets are paired with the job's resolutions, baseline timings and file
/// names by position; missing entries leave the matching field empty.
///
/// # Errors
/// Propagates the first [`analyze_file`] error.
pub fn analyze_result(
    result: &JobResult,
    datasets: &[MetricDataset],
) -> Result<Vec<FileReport>, MetricsError> {
    datasets
        .iter()
        .enumerate()
        .map(|(index, dataset)| {
            let resolution = result.resolutions.get(index).copied();
            let baseline = result
                .baseline_speeds
                .get(index)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut report = analyze_file(dataset, resolution, baseline)?;
            report.index = index;
            report.file_name = result.input_files.get(index).cloned();
            Ok(report)
        })
        .collect()
}

/// Dataset and evaluation errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Dataset file could not be read.
    #[error("dataset io failure: {0}")]
    Io(#[from] std::io::Error),
    /// CSV could not be read.
    #[error("dataset read failure: {0}")]
    Csv(#[from] csv::Error),
    /// Required column is not in the dataset.
    #[error("dataset is missing column {0}")]
    MissingColumn(String),
    /// Column value is not a finite number.
    #[error("column {column} holds a non-numeric value {value:?}")]
    InvalidNumber {
        /// Column name.
        column: String,
        /// Offending cell text.
        value: String,
    },
    /// No frame rows remained after filtering.
    #[error("dataset has no frame rows")]
    EmptyDataset,
}
