//! Fixed-length trailing windows over aligned series.
//!
//! For a window of length `w`, index `t` owns the slice `data[t-w+1..=t]`
//! once `t >= w - 1`. Earlier indices own no slice and rolling transforms
//! fill them with a caller-supplied sentinel. Slices borrow the input, so no
//! history is copied between steps.
//!
//! Every per-index computation is independent of every other, so
//! [`WindowBuffer::map_windows`] and friends fan the indices out over rayon
//! when the `parallel` feature is enabled. The output order is the input
//! order in both modes.

use crate::errors::{validate_equal_length, validate_window, AnalysisError, AnalysisResult};
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rolling window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowSpec {
    /// Number of observations in each window
    pub window: usize,
}

impl WindowSpec {
    /// Creates a window specification. The window must be positive.
    pub fn new(window: usize) -> AnalysisResult<Self> {
        if window == 0 {
            return Err(AnalysisError::InvalidParameter {
                parameter: "window".to_string(),
                value: 0.0,
                constraint: "a positive integer".to_string(),
            });
        }
        Ok(Self { window })
    }

    /// First index that has a full window behind it.
    #[inline]
    pub fn first_index(&self) -> usize {
        self.window - 1
    }
}

/// Runs `func` for every index in `first..len` and places the results after a
/// run of `first` fill values.
pub(crate) fn collect_rolling<T, F>(len: usize, first: usize, fill: T, func: F) -> Vec<T>
where
    T: Clone + Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let mut out = Vec::with_capacity(len);
    out.resize(first.min(len), fill);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let computed: Vec<T> = (first..len).into_par_iter().map(&func).collect();
        out.extend(computed);
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.extend((first..len).map(&func));
    }

    out
}

/// Tally of windows whose collaborator failed during one rolling run.
#[derive(Debug, Default)]
pub(crate) struct DegradedWindows {
    count: AtomicUsize,
}

impl DegradedWindows {
    /// Logs the failure of the window ending at `t` and counts it.
    pub(crate) fn record(&self, transform: &str, t: usize, error: &AnalysisError) {
        log::warn!("{}: window ending at index {} degraded: {}", transform, t, error);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of degraded windows so far.
    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Emits the end-of-run summary when anything degraded.
    pub(crate) fn report(&self, transform: &str, windows: usize) {
        let degraded = self.count();
        if degraded > 0 {
            log::warn!(
                "{}: {} of {} windows degraded to sentinel rows",
                transform,
                degraded,
                windows
            );
        }
    }
}

/// Trailing windows over a single series.
#[derive(Debug, Clone, Copy)]
pub struct WindowBuffer<'a> {
    data: &'a [f64],
    spec: WindowSpec,
}

impl<'a> WindowBuffer<'a> {
    /// Fails fast when the series is empty or shorter than the window.
    pub fn new(data: &'a [f64], spec: WindowSpec) -> AnalysisResult<Self> {
        validate_window(data.len(), spec.window)?;
        Ok(Self { data, spec })
    }

    /// Window length.
    pub fn window(&self) -> usize {
        self.spec.window
    }

    /// Length of the underlying series.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// First index with a full window.
    pub fn first_index(&self) -> usize {
        self.spec.first_index()
    }

    /// The window ending at `t`, or `None` during warm-up / past the end.
    #[inline]
    pub fn slice_at(&self, t: usize) -> Option<&'a [f64]> {
        if t < self.first_index() || t >= self.data.len() {
            return None;
        }
        Some(&self.data[t + 1 - self.spec.window..=t])
    }

    /// Iterates `(t, window)` pairs for every computable index.
    pub fn windows(&self) -> impl Iterator<Item = (usize, &'a [f64])> + 'a {
        let first = self.first_index();
        self.data
            .windows(self.spec.window)
            .enumerate()
            .map(move |(i, slice)| (i + first, slice))
    }

    /// Maps every window to a value, producing one output per input index.
    ///
    /// Warm-up indices receive `fill`.
    pub fn map_windows<T, F>(&self, fill: T, func: F) -> Vec<T>
    where
        T: Clone + Send,
        F: Fn(usize, &[f64]) -> T + Sync + Send,
    {
        let data = self.data;
        let window = self.spec.window;
        collect_rolling(data.len(), self.first_index(), fill, |t| {
            func(t, &data[t + 1 - window..=t])
        })
    }
}

/// Trailing windows over two aligned series (`x`, `y`).
#[derive(Debug, Clone, Copy)]
pub struct PairedWindowBuffer<'a> {
    x: &'a [f64],
    y: &'a [f64],
    spec: WindowSpec,
}

impl<'a> PairedWindowBuffer<'a> {
    /// Fails fast on misaligned or too-short inputs.
    pub fn new(x: &'a [f64], y: &'a [f64], spec: WindowSpec) -> AnalysisResult<Self> {
        validate_equal_length(x, y)?;
        validate_window(x.len(), spec.window)?;
        Ok(Self { x, y, spec })
    }

    /// Length of the aligned series.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// First index with a full window.
    pub fn first_index(&self) -> usize {
        self.spec.first_index()
    }

    /// The `(x, y)` windows ending at `t`.
    pub fn slice_at(&self, t: usize) -> Option<(&'a [f64], &'a [f64])> {
        if t < self.first_index() || t >= self.x.len() {
            return None;
        }
        let start = t + 1 - self.spec.window;
        Some((&self.x[start..=t], &self.y[start..=t]))
    }

    /// Maps every paired window to a value; warm-up indices receive `fill`.
    pub fn map_windows<T, F>(&self, fill: T, func: F) -> Vec<T>
    where
        T: Clone + Send,
        F: Fn(usize, &[f64], &[f64]) -> T + Sync + Send,
    {
        let (x, y) = (self.x, self.y);
        let window = self.spec.window;
        collect_rolling(x.len(), self.first_index(), fill, |t| {
            let start = t + 1 - window;
            func(t, &x[start..=t], &y[start..=t])
        })
    }
}

/// Trailing windows over `n_vars` aligned series.
#[derive(Debug, Clone)]
pub struct MultiWindowBuffer<'a> {
    columns: Vec<&'a [f64]>,
    spec: WindowSpec,
}

impl<'a> MultiWindowBuffer<'a> {
    /// Fails fast on an empty column set, misaligned columns or short data.
    pub fn new(columns: &[&'a [f64]], spec: WindowSpec) -> AnalysisResult<Self> {
        let first = columns.first().ok_or(AnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        })?;
        for column in &columns[1..] {
            validate_equal_length(first, column)?;
        }
        validate_window(first.len(), spec.window)?;
        Ok(Self {
            columns: columns.to_vec(),
            spec,
        })
    }

    /// Number of series.
    pub fn n_vars(&self) -> usize {
        self.columns.len()
    }

    /// Length of the aligned series.
    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.columns[0].is_empty()
    }

    /// First index with a full window.
    pub fn first_index(&self) -> usize {
        self.spec.first_index()
    }

    /// One window per column, all ending at `t`.
    pub fn slice_at(&self, t: usize) -> Option<Vec<&'a [f64]>> {
        if t < self.first_index() || t >= self.len() {
            return None;
        }
        let start = t + 1 - self.spec.window;
        Some(self.columns.iter().map(|c| &c[start..=t]).collect())
    }

    /// Maps every multi-column window to a value; warm-up indices receive `fill`.
    pub fn map_windows<T, F>(&self, fill: T, func: F) -> Vec<T>
    where
        T: Clone + Send,
        F: Fn(usize, &[&[f64]]) -> T + Sync + Send,
    {
        let window = self.spec.window;
        let columns = &self.columns;
        collect_rolling(self.len(), self.first_index(), fill, |t| {
            let start = t + 1 - window;
            let slices: Vec<&[f64]> = columns.iter().map(|c| &c[start..=t]).collect();
            func(t, &slices)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_contract() {
        let data: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let buffer = WindowBuffer::new(&data, WindowSpec::new(3).unwrap()).unwrap();

        assert_eq!(buffer.first_index(), 2);
        assert!(buffer.slice_at(0).is_none());
        assert!(buffer.slice_at(1).is_none());
        assert_eq!(buffer.slice_at(2), Some(&[0.0, 1.0, 2.0][..]));
        assert_eq!(buffer.slice_at(5), Some(&[3.0, 4.0, 5.0][..]));
        assert!(buffer.slice_at(6).is_none());

        for (t, slice) in buffer.windows() {
            assert_eq!(slice.len(), 3);
            assert_eq!(slice[2], t as f64);
        }
        assert_eq!(buffer.windows().count(), 4);
    }

    #[test]
    fn test_window_equal_to_length() {
        let data = vec![1.0, 2.0, 3.0];
        let buffer = WindowBuffer::new(&data, WindowSpec::new(3).unwrap()).unwrap();
        assert_eq!(buffer.windows().count(), 1);
        assert_eq!(buffer.slice_at(2), Some(&data[..]));
    }

    #[test]
    fn test_shape_errors() {
        let data = vec![1.0, 2.0];
        assert!(WindowSpec::new(0).is_err());
        assert!(matches!(
            WindowBuffer::new(&data, WindowSpec { window: 3 }),
            Err(AnalysisError::InsufficientData {
                required: 3,
                actual: 2
            })
        ));
        assert!(WindowBuffer::new(&[], WindowSpec { window: 1 }).is_err());
        assert!(matches!(
            PairedWindowBuffer::new(&[1.0, 2.0], &[1.0], WindowSpec { window: 1 }),
            Err(AnalysisError::LengthMismatch { .. })
        ));
        assert!(MultiWindowBuffer::new(&[], WindowSpec { window: 1 }).is_err());
    }

    #[test]
    fn test_map_windows_fills_warm_up() {
        let data: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        let buffer = WindowBuffer::new(&data, WindowSpec::new(2).unwrap()).unwrap();
        let sums = buffer.map_windows(f64::NAN, |_, w| w.iter().sum::<f64>());

        assert_eq!(sums.len(), 5);
        assert!(sums[0].is_nan());
        assert_eq!(&sums[1..], &[3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_paired_and_multi_windows() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y = vec![10.0, 20.0, 30.0, 40.0];
        let paired = PairedWindowBuffer::new(&x, &y, WindowSpec::new(2).unwrap()).unwrap();
        assert_eq!(paired.slice_at(3), Some((&x[2..4], &y[2..4])));
        let spreads = paired.map_windows(f64::NAN, |_, xs, ys| ys[1] - xs[1]);
        assert!(spreads[0].is_nan());
        assert_eq!(spreads[3], 36.0);

        let multi = MultiWindowBuffer::new(&[&x, &y], WindowSpec::new(3).unwrap()).unwrap();
        assert_eq!(multi.n_vars(), 2);
        let slices = multi.slice_at(2).unwrap();
        assert_eq!(slices[1], &[10.0, 20.0, 30.0][..]);
        let lasts = multi.map_windows(None, |t, cols| Some((t, cols[0][2])));
        assert_eq!(lasts[1], None);
        assert_eq!(lasts[3], Some((3, 4.0)));
    }

    #[test]
    fn test_degraded_window_count() {
        let degraded = DegradedWindows::default();
        let data: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let buffer = WindowBuffer::new(&data, WindowSpec::new(2).unwrap()).unwrap();
        let out = buffer.map_windows(f64::NAN, |t, w| {
            if t % 3 == 0 {
                degraded.record(
                    "test",
                    t,
                    &AnalysisError::InsufficientData {
                        required: 3,
                        actual: 2,
                    },
                );
                f64::NAN
            } else {
                w[1]
            }
        });
        assert_eq!(degraded.count(), 2);
        assert!(out[3].is_nan() && out[6].is_nan());
        assert_eq!(out[4], 4.0);
    }
}
