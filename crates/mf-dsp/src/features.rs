use mf_core::config::SelectionStrategy;
use mf_core::record::{ChannelFeatures, FeatureRecord};
use mf_core::traits::MagnitudeTransform;
use mf_core::window::{Axis, WindowBuffer};

use crate::error::FeatureError;
use crate::fft::RealFftTransform;
use crate::freq_table::FrequencyIndexTable;

/// Extract the per-channel mean, dominant amplitude and dominant
/// frequency label from a window.
///
/// Owns the transform and a magnitude scratch buffer. Both are only
/// reachable through `&mut self`, so one channel computation finishes
/// before the next one can touch them.
///
/// # Example
/// ```
/// use mf_core::config::SelectionStrategy;
/// use mf_core::window::{Axis, WindowBuffer};
/// use mf_dsp::features::FeatureExtractor;
/// use mf_dsp::freq_table::FrequencyIndexTable;
///
/// let mut window = WindowBuffer::new(8);
/// for i in 0..8 {
///     window.append([i, 0, 0, 0, 0, 0]);
/// }
/// let table = FrequencyIndexTable::build(window.fill());
/// let mut extractor = FeatureExtractor::new(SelectionStrategy::Spectral, 8);
/// let record = extractor.process(&window, &table).unwrap();
/// assert_eq!(record.get(Axis::GyroX).mean, 3);
/// ```
pub struct FeatureExtractor<F: MagnitudeTransform = RealFftTransform> {
    strategy: SelectionStrategy,
    transform: F,
    /// Sortie de la transformée, réutilisée canal après canal.
    magnitudes: Vec<i16>,
}

impl FeatureExtractor<RealFftTransform> {
    /// Extractor backed by [`RealFftTransform`], pre-planned for `capacity`.
    #[must_use]
    pub fn new(strategy: SelectionStrategy, capacity: usize) -> Self {
        let mut transform = RealFftTransform::new();
        transform.prepare(capacity);
        Self::with_transform(strategy, capacity, transform)
    }
}

impl<F: MagnitudeTransform> FeatureExtractor<F> {
    /// Extractor over any transform implementation.
    #[must_use]
    pub fn with_transform(strategy: SelectionStrategy, capacity: usize, transform: F) -> Self {
        Self {
            strategy,
            transform,
            magnitudes: vec![0; capacity],
        }
    }

    #[must_use]
    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: SelectionStrategy) {
        self.strategy = strategy;
    }

    /// Compute a full record from the valid part of `window`.
    ///
    /// `table` must have been built for `window.fill()`; it is shared by
    /// all six channels. The window is only read.
    ///
    /// # Errors
    /// [`FeatureError::EmptyWindow`] if `fill == 0`,
    /// [`FeatureError::TableLength`] if `table` does not match `fill`.
    pub fn process(
        &mut self,
        window: &WindowBuffer,
        table: &FrequencyIndexTable,
    ) -> Result<FeatureRecord, FeatureError> {
        let fill = window.fill();
        if fill == 0 {
            return Err(FeatureError::EmptyWindow);
        }
        if table.len() != fill {
            return Err(FeatureError::TableLength {
                table: table.len(),
                fill,
            });
        }

        let mut record = FeatureRecord::default();
        for axis in Axis::ALL {
            *record.get_mut(axis) = self.channel_features(window.channel(axis), table);
        }
        Ok(record)
    }

    /// Features of a single channel. `samples` must not be empty.
    pub fn channel_features(
        &mut self,
        samples: &[i16],
        table: &FrequencyIndexTable,
    ) -> ChannelFeatures {
        let mean = mean(samples);

        let (index, amplitude) = match self.strategy {
            SelectionStrategy::Spectral => {
                let n = samples.len();
                if self.magnitudes.len() < n {
                    self.magnitudes.resize(n, 0);
                }
                let mags = &mut self.magnitudes[..n];
                self.transform.transform(samples, mags);
                let index = dominant_index(mags);
                (index, mags.get(index).copied().unwrap_or(0))
            }
            SelectionStrategy::Legacy => {
                let index = dominant_index(samples);
                (index, samples.get(index).copied().unwrap_or(0))
            }
        };

        ChannelFeatures {
            amplitude,
            label: table.label(index),
            mean,
        }
    }
}

/// Moyenne entière, tronquée vers zéro, accumulée sur 32 bits.
///
/// An empty slice is a caller bug: it trips a debug assertion and
/// returns 0 in release builds.
///
/// # Example
/// ```
/// use mf_dsp::features::mean;
/// assert_eq!(mean(&[4, 4, 4, 4]), 4);
/// assert_eq!(mean(&[1, 2]), 1);
/// assert_eq!(mean(&[-1, -2]), -1);
/// ```
#[must_use]
pub fn mean(values: &[i16]) -> i16 {
    debug_assert!(!values.is_empty(), "mean of an empty window");
    if values.is_empty() {
        return 0;
    }
    let sum: i32 = values.iter().map(|&v| i32::from(v)).sum();
    (sum / values.len() as i32) as i16
}

/// Index of the largest value in `[1, len/2)`, first maximum wins.
///
/// Bin 0 is never selected: it carries the DC component and would win for
/// any channel with an offset. For `len` of 2 or 3 the search range is
/// empty and the result is 1; a single-sample window has only bin 0.
///
/// # Example
/// ```
/// use mf_dsp::features::dominant_index;
/// assert_eq!(dominant_index(&[100, 5, 3, 2]), 1);
/// assert_eq!(dominant_index(&[0, 1, 9, 4, 0, 0, 0, 0]), 2);
/// ```
#[must_use]
pub fn dominant_index(values: &[i16]) -> usize {
    if values.len() < 2 {
        return 0;
    }
    let mut max = values[1];
    let mut max_index = 1;
    for (i, &v) in values.iter().enumerate().take(values.len() / 2).skip(1) {
        if v > max {
            max = v;
            max_index = i;
        }
    }
    max_index
}
