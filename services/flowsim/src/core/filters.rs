//! Integer filters applied to raw sensor samples
//!
//! Both filters work purely on `i32` values: the low-pass filter uses a
//! fixed-point alpha scaled by 1024, the median filter keeps a chronological
//! ring next to a sorted copy of the same window.

use std::fmt;
use std::str::FromStr;

use crate::error::FlowSimError;

/// Fixed-point scale of the low-pass alpha
pub const ALPHA_SCALE: i32 = 1024;

/// Window used when a median filter is configured with a non-positive size
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Largest accepted median window
pub const MAX_WINDOW_SIZE: usize = 4096;

/// Configured filter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    Median,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowPass => "low_pass",
            Self::Median => "median",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = FlowSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low_pass" => Ok(Self::LowPass),
            "median" => Ok(Self::Median),
            other => Err(FlowSimError::config(format!(
                "unknown filter type '{}' (expected low_pass or median)",
                other
            ))),
        }
    }
}

/// Exponential moving average on integers
///
/// `y[n] = y[n-1] + ((x[n] - y[n-1]) * alpha_scaled) / 1024`, with the
/// division truncating toward zero.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha_scaled: i32,
    prev: i32,
    initialized: bool,
}

impl LowPassFilter {
    /// Create a filter; alpha is clamped to `[0, 1]`
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        };

        Self {
            alpha_scaled: (alpha * f64::from(ALPHA_SCALE)).round() as i32,
            prev: 0,
            initialized: false,
        }
    }

    pub fn alpha_scaled(&self) -> i32 {
        self.alpha_scaled
    }

    pub fn initialize(&mut self, seed: i32) {
        self.prev = seed;
        self.initialized = true;
    }

    pub fn process(&mut self, raw: i32) -> i32 {
        if !self.initialized {
            self.initialize(raw);
            return raw;
        }

        let diff = i64::from(raw) - i64::from(self.prev);
        let adjustment = diff * i64::from(self.alpha_scaled) / i64::from(ALPHA_SCALE);
        // alpha_scaled <= 1024 keeps the output between prev and raw
        self.prev = (i64::from(self.prev) + adjustment) as i32;
        self.prev
    }
}

/// Sliding-window median
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window_size: usize,
    /// Chronological order, overwritten at `head`
    ring: Vec<i32>,
    /// Numerical order of the live window
    sorted: Vec<i32>,
    head: usize,
    count: usize,
}

impl MedianFilter {
    /// Create a filter; a non-positive window falls back to 5 and larger
    /// windows are capped at [`MAX_WINDOW_SIZE`]
    pub fn new(window_size: i32) -> Self {
        let window_size = if window_size <= 0 {
            DEFAULT_WINDOW_SIZE
        } else {
            (window_size as usize).min(MAX_WINDOW_SIZE)
        };

        Self {
            window_size,
            ring: vec![0; window_size],
            sorted: Vec::with_capacity(window_size),
            head: 0,
            count: 0,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Fill the whole window with `seed`
    pub fn initialize(&mut self, seed: i32) {
        self.ring.fill(seed);
        self.sorted.clear();
        self.sorted.resize(self.window_size, seed);
        self.head = 0;
        self.count = self.window_size;
    }

    pub fn process(&mut self, raw: i32) -> i32 {
        if self.count == self.window_size {
            let oldest = self.ring[self.head];
            let idx = self.sorted.partition_point(|&v| v < oldest);
            if self.sorted.get(idx) == Some(&oldest) {
                self.sorted.remove(idx);
            }
        } else {
            self.count += 1;
        }

        self.ring[self.head] = raw;
        self.head = (self.head + 1) % self.window_size;

        let idx = self.sorted.partition_point(|&v| v < raw);
        self.sorted.insert(idx, raw);

        self.median()
    }

    fn median(&self) -> i32 {
        let n = self.sorted.len();
        if n == 0 {
            return 0;
        }

        let mid = n / 2;
        if n % 2 == 0 {
            let sum = i64::from(self.sorted[mid - 1]) + i64::from(self.sorted[mid]);
            (sum / 2) as i32
        } else {
            self.sorted[mid]
        }
    }
}

/// A filter selected by its configured type
#[derive(Debug, Clone)]
pub enum Filter {
    LowPass(LowPassFilter),
    Median(MedianFilter),
}

impl Filter {
    /// Build a filter of `kind`; only the parameter matching the kind is used
    pub fn new(kind: FilterKind, alpha: f64, window_size: i32) -> Self {
        match kind {
            FilterKind::LowPass => Self::LowPass(LowPassFilter::new(alpha)),
            FilterKind::Median => Self::Median(MedianFilter::new(window_size)),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::LowPass(_) => FilterKind::LowPass,
            Self::Median(_) => FilterKind::Median,
        }
    }

    pub fn process(&mut self, raw: i32) -> i32 {
        match self {
            Self::LowPass(f) => f.process(raw),
            Self::Median(f) => f.process(raw),
        }
    }

    pub fn initialize(&mut self, seed: i32) {
        match self {
            Self::LowPass(f) => f.initialize(seed),
            Self::Median(f) => f.initialize(seed),
        }
    }
}

/// Filters for one channel, applied in configuration order
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn kinds(&self) -> Vec<FilterKind> {
        self.filters.iter().map(Filter::kind).collect()
    }

    /// Run `raw` through every filter, each consuming the previous output
    pub fn process(&mut self, raw: i32) -> i32 {
        self.filters
            .iter_mut()
            .fold(raw, |value, filter| filter.process(value))
    }

    pub fn initialize(&mut self, seed: i32) {
        for filter in &mut self.filters {
            filter.initialize(seed);
        }
    }
}
