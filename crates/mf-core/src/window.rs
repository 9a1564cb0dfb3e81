use serde::{Deserialize, Serialize};

/// One of the six motion channels, in record order.
///
/// # Example
/// ```
/// use mf_core::window::Axis;
/// assert_eq!(Axis::ALL.len(), 6);
/// assert_eq!(Axis::AccelX.index(), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Axis {
    /// Gyroscope X.
    GyroX,
    /// Gyroscope Y.
    GyroY,
    /// Gyroscope Z.
    GyroZ,
    /// Accéléromètre X.
    AccelX,
    /// Accéléromètre Y.
    AccelY,
    /// Accéléromètre Z.
    AccelZ,
}

impl Axis {
    /// All channels in record order.
    pub const ALL: [Axis; 6] = [
        Axis::GyroX,
        Axis::GyroY,
        Axis::GyroZ,
        Axis::AccelX,
        Axis::AccelY,
        Axis::AccelZ,
    ];

    /// Position of this channel in a six-sample group.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// `true` for the three gyroscope channels.
    #[inline]
    #[must_use]
    pub fn is_gyro(self) -> bool {
        matches!(self, Axis::GyroX | Axis::GyroY | Axis::GyroZ)
    }

    /// Short lowercase name, used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Axis::GyroX => "gyro_x",
            Axis::GyroY => "gyro_y",
            Axis::GyroZ => "gyro_z",
            Axis::AccelX => "acc_x",
            Axis::AccelY => "acc_y",
            Axis::AccelZ => "acc_z",
        }
    }
}

/// Outcome of [`WindowBuffer::append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendResult {
    /// The group was written at the previous `fill` position.
    Stored,
    /// The window is at capacity; nothing was written.
    Full,
}

/// Fenêtre d'échantillons six canaux. Pré-allouée, jamais redimensionnée.
///
/// All six channels share a single `fill` cursor: a sampling tick writes
/// one value per channel as a group, so every channel always holds the
/// same number of valid samples.
///
/// # Example
/// ```
/// use mf_core::window::{AppendResult, Axis, WindowBuffer};
/// let mut window = WindowBuffer::new(2);
/// assert_eq!(window.append([1, 2, 3, 4, 5, 6]), AppendResult::Stored);
/// assert_eq!(window.append([1, 2, 3, 4, 5, 6]), AppendResult::Stored);
/// assert_eq!(window.append([9; 6]), AppendResult::Full);
/// assert_eq!(window.channel(Axis::GyroZ), &[3, 3]);
/// ```
#[derive(Clone, Debug)]
pub struct WindowBuffer {
    /// One row per axis, each `capacity` long.
    channels: [Vec<i16>; 6],
    /// Nombre d'échantillons valides, dans [0, capacity].
    fill: usize,
    capacity: usize,
}

impl WindowBuffer {
    /// Crée une fenêtre pré-allouée de `capacity` échantillons par canal.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| vec![0i16; capacity]),
            fill: 0,
            capacity,
        }
    }

    /// Write one six-axis group at the fill cursor.
    ///
    /// Returns [`AppendResult::Full`] without touching the buffer once
    /// `fill == capacity`; that is the steady state while the epoch tick
    /// has not rolled the window over yet.
    #[inline]
    pub fn append(&mut self, sample: [i16; 6]) -> AppendResult {
        if self.fill >= self.capacity {
            return AppendResult::Full;
        }
        for (row, value) in self.channels.iter_mut().zip(sample) {
            row[self.fill] = value;
        }
        self.fill += 1;
        AppendResult::Stored
    }

    /// Rewind the fill cursor. Old values stay in place but are stale.
    #[inline]
    pub fn reset(&mut self) {
        self.fill = 0;
    }

    /// Valid samples of one channel (`fill` long).
    #[inline]
    #[must_use]
    pub fn channel(&self, axis: Axis) -> &[i16] {
        &self.channels[axis.index()][..self.fill]
    }

    /// Number of valid samples per channel.
    #[inline]
    #[must_use]
    pub fn fill(&self) -> usize {
        self.fill
    }

    /// Fixed capacity `N`.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.fill >= self.capacity
    }
}
