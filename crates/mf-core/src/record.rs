use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::window::Axis;

/// Taille fixe du payload radio, terminateur inclus.
pub const RECORD_LEN: usize = 31;

/// Number of numeric fields carried by a record (three per channel).
pub const FIELD_COUNT: usize = 18;

const AMP_OFFSET: usize = 0;
const LABEL_OFFSET: usize = 12;
const MEAN_OFFSET: usize = 18;
const TERMINATOR_OFFSET: usize = 30;

/// Features of a single channel for one epoch.
///
/// # Example
/// ```
/// use mf_core::record::ChannelFeatures;
/// let f = ChannelFeatures::default();
/// assert_eq!((f.amplitude, f.label, f.mean), (0, 0, 0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelFeatures {
    /// Magnitude at the dominant bin.
    pub amplitude: i16,
    /// Signed frequency label of the dominant bin.
    pub label: i8,
    /// Moyenne tronquée vers zéro.
    pub mean: i16,
}

/// Résultat de l'extraction pour une époque.
///
/// Taille fixe, Copy, jamais alloué dynamiquement. The scheduler keeps a
/// single instance and overwrites it in place every epoch.
///
/// # Example
/// ```
/// use mf_core::record::{FeatureRecord, RECORD_LEN};
/// let record = FeatureRecord::default();
/// let bytes = record.to_bytes();
/// assert_eq!(bytes.len(), RECORD_LEN);
/// assert_eq!(bytes[RECORD_LEN - 1], 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeatureRecord {
    /// One entry per axis, in [`Axis::ALL`] order.
    pub channels: [ChannelFeatures; 6],
}

impl FeatureRecord {
    /// Features of one axis.
    #[inline]
    #[must_use]
    pub fn get(&self, axis: Axis) -> &ChannelFeatures {
        &self.channels[axis.index()]
    }

    /// Mutable access used by the extractor.
    #[inline]
    pub fn get_mut(&mut self, axis: Axis) -> &mut ChannelFeatures {
        &mut self.channels[axis.index()]
    }

    /// The 18 numeric fields in wire order: six amplitudes, six labels,
    /// six means.
    #[must_use]
    pub fn fields(&self) -> [i32; FIELD_COUNT] {
        let mut out = [0i32; FIELD_COUNT];
        for (i, ch) in self.channels.iter().enumerate() {
            out[i] = i32::from(ch.amplitude);
            out[6 + i] = i32::from(ch.label);
            out[12 + i] = i32::from(ch.mean);
        }
        out
    }

    /// Encode into the fixed little-endian payload.
    ///
    /// ```text
    /// [0..12)  6 x i16 amplitude
    /// [12..18) 6 x i8  label
    /// [18..30) 6 x i16 mean
    /// [30]     0x00
    /// ```
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        for (i, ch) in self.channels.iter().enumerate() {
            let amp = AMP_OFFSET + i * 2;
            buf[amp..amp + 2].copy_from_slice(&ch.amplitude.to_le_bytes());
            buf[LABEL_OFFSET + i] = ch.label.to_le_bytes()[0];
            let mean = MEAN_OFFSET + i * 2;
            buf[mean..mean + 2].copy_from_slice(&ch.mean.to_le_bytes());
        }
        buf[TERMINATOR_OFFSET] = 0;
        buf
    }

    /// Decode a payload produced by [`FeatureRecord::to_bytes`].
    ///
    /// # Errors
    /// Returns [`CoreError::PayloadLength`] if `buf` is not exactly
    /// [`RECORD_LEN`] bytes, [`CoreError::Terminator`] if the last byte is
    /// not zero.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, CoreError> {
        if buf.len() != RECORD_LEN {
            return Err(CoreError::PayloadLength {
                actual: buf.len(),
                expected: RECORD_LEN,
            });
        }
        if buf[TERMINATOR_OFFSET] != 0 {
            return Err(CoreError::Terminator(buf[TERMINATOR_OFFSET]));
        }

        let mut record = Self::default();
        for (i, ch) in record.channels.iter_mut().enumerate() {
            let amp = AMP_OFFSET + i * 2;
            ch.amplitude = i16::from_le_bytes([buf[amp], buf[amp + 1]]);
            ch.label = i8::from_le_bytes([buf[LABEL_OFFSET + i]]);
            let mean = MEAN_OFFSET + i * 2;
            ch.mean = i16::from_le_bytes([buf[mean], buf[mean + 1]]);
        }
        Ok(record)
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.fields().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}
