/// Signed frequency label of every transform bin, for one window length.
///
/// Le premier demi-tableau porte les fréquences positives, le second les
/// négatives, comme la disposition standard d'une FFT. Labels are raw bin
/// positions: no sample-rate scaling is applied, a one-second window
/// makes them read directly as Hz.
///
/// # Example
/// ```
/// use mf_dsp::freq_table::FrequencyIndexTable;
/// let table = FrequencyIndexTable::build(8);
/// assert_eq!(table.labels(), &[0, 1, 2, 3, -4, -3, -2, -1]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyIndexTable {
    labels: Vec<i8>,
}

impl FrequencyIndexTable {
    /// Build the table for a window of `n` samples.
    ///
    /// Even `n`: `[0, n/2)` maps to `i`, `[n/2, n)` to `i - n`.
    /// Odd `n`: with `split = (n-1)/2`, `i <= split` maps to `i`, the rest
    /// to `i - 2*split - 1`.
    ///
    /// `n` must stay at or below 255 so labels fit in an `i8`; the config
    /// loader clamps the window capacity accordingly.
    #[must_use]
    pub fn build(n: usize) -> Self {
        debug_assert!(n <= 255, "window length {n} overflows i8 labels");
        let labels = if n.is_multiple_of(2) {
            let half = n / 2;
            (0..n)
                .map(|i| if i < half { i as i64 } else { i as i64 - n as i64 })
                .map(|v| v as i8)
                .collect()
        } else {
            let split = (n.saturating_sub(1) / 2) as i64;
            (0..n as i64)
                .map(|i| if i <= split { i } else { i - 2 * split - 1 })
                .map(|v| v as i8)
                .collect()
        };
        Self { labels }
    }

    /// Label of bin `index`, or 0 past the end.
    #[inline]
    #[must_use]
    pub fn label(&self, index: usize) -> i8 {
        self.labels.get(index).copied().unwrap_or(0)
    }

    /// Window length this table was built for.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels in bin order.
    #[must_use]
    pub fn labels(&self) -> &[i8] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_length_layout() {
        assert_eq!(FrequencyIndexTable::build(8).labels(), &[0, 1, 2, 3, -4, -3, -2, -1]);
        assert_eq!(FrequencyIndexTable::build(2).labels(), &[0, -1]);
    }

    #[test]
    fn odd_length_layout() {
        assert_eq!(
            FrequencyIndexTable::build(9).labels(),
            &[0, 1, 2, 3, 4, -4, -3, -2, -1]
        );
        assert_eq!(FrequencyIndexTable::build(1).labels(), &[0]);
        assert_eq!(FrequencyIndexTable::build(3).labels(), &[0, 1, -1]);
    }

    #[test]
    fn depends_only_on_length() {
        assert_eq!(FrequencyIndexTable::build(128), FrequencyIndexTable::build(128));
        assert!(FrequencyIndexTable::build(0).is_empty());
    }

    #[test]
    fn full_window_labels_fit() {
        let table = FrequencyIndexTable::build(128);
        assert_eq!(table.len(), 128);
        assert_eq!(table.label(63), 63);
        assert_eq!(table.label(64), -64);
        assert_eq!(table.label(127), -1);
        assert_eq!(table.label(500), 0);

        let widest = FrequencyIndexTable::build(255);
        assert_eq!(widest.label(127), 127);
        assert_eq!(widest.label(128), -127);
    }
}
