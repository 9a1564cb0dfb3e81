use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Where the dominant bin and its amplitude are read from.
///
/// # Example
/// ```
/// use mf_core::config::SelectionStrategy;
/// assert_eq!(SelectionStrategy::default(), SelectionStrategy::Spectral);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SelectionStrategy {
    /// Argmax over the transform magnitudes.
    #[default]
    Spectral,
    /// Argmax over the raw window samples; the transform is skipped.
    Legacy,
}

/// Parameters of the simulated sensor used by the desktop binary.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Fréquence des axes gyro, en Hz.
    pub gyro_hz: f32,
    /// Fréquence des axes accéléromètre, en Hz.
    pub accel_hz: f32,
    /// Amplitude brute des axes gyro.
    pub gyro_amplitude: f32,
    /// Amplitude brute des axes accéléromètre.
    pub accel_amplitude: f32,
    /// Constant raw offset added to accel-Z (gravity).
    pub accel_z_offset: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gyro_hz: 3.0,
            accel_hz: 5.0,
            gyro_amplitude: 8000.0,
            accel_amplitude: 1500.0,
            accel_z_offset: 4096.0,
        }
    }
}

/// Configuration complète du pipeline.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use mf_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.capacity, 128);
/// assert_eq!(config.sampling_period().as_millis(), 8);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    // === Fenêtre ===
    /// Samples per channel per window (`N`). Labels must fit in an i8.
    pub capacity: usize,
    /// Epoch tick period in milliseconds.
    pub epoch_ms: u64,

    // === Capteur ===
    /// Raw gyro readings are divided by this before storage.
    pub gyro_divisor: i16,
    /// Raw accel readings are divided by this before storage.
    pub accel_divisor: i16,

    // === Extraction ===
    /// Source of the dominant bin.
    pub selection: SelectionStrategy,

    // === Radio ===
    /// Opaque routing constant passed to the transmitter.
    pub channel_id: u8,

    // === Simulation ===
    pub simulation: SimulationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            epoch_ms: 1000,
            gyro_divisor: 256,
            accel_divisor: 2,
            selection: SelectionStrategy::Spectral,
            channel_id: 37,
            simulation: SimulationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        // Above 255 the bin labels overflow an i8.
        self.capacity = self.capacity.clamp(2, 255);
        self.epoch_ms = self.epoch_ms.clamp(10, 60_000);
        self.gyro_divisor = self.gyro_divisor.max(1);
        self.accel_divisor = self.accel_divisor.max(1);
        self.simulation.gyro_amplitude = self.simulation.gyro_amplitude.clamp(0.0, 32_767.0);
        self.simulation.accel_amplitude = self.simulation.accel_amplitude.clamp(0.0, 32_767.0);
        self.simulation.gyro_hz = self.simulation.gyro_hz.max(0.0);
        self.simulation.accel_hz = self.simulation.accel_hz.max(0.0);
    }

    /// Période du tick d'échantillonnage : `ceil(epoch / N)`.
    #[must_use]
    pub fn sampling_period(&self) -> Duration {
        let n = self.capacity.max(1) as u64;
        Duration::from_millis(self.epoch_ms.div_ceil(n))
    }

    /// Période du tick d'époque.
    #[must_use]
    pub fn epoch_period(&self) -> Duration {
        Duration::from_millis(self.epoch_ms)
    }

    /// Divisor applied to a raw reading of `axis`.
    #[must_use]
    pub fn divisor_for(&self, axis: crate::window::Axis) -> i16 {
        if axis.is_gyro() {
            self.gyro_divisor
        } else {
            self.accel_divisor
        }
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    window: Option<WindowSection>,
    sensor: Option<SensorSection>,
    extractor: Option<ExtractorSection>,
    radio: Option<RadioSection>,
    simulation: Option<SimulationSection>,
}

#[derive(Deserialize)]
struct WindowSection {
    capacity: Option<usize>,
    epoch_ms: Option<u64>,
}

#[derive(Deserialize)]
struct SensorSection {
    gyro_divisor: Option<i16>,
    accel_divisor: Option<i16>,
}

#[derive(Deserialize)]
struct ExtractorSection {
    selection: Option<SelectionStrategy>,
}

#[derive(Deserialize)]
struct RadioSection {
    channel_id: Option<u8>,
}

#[derive(Deserialize)]
struct SimulationSection {
    gyro_hz: Option<f32>,
    accel_hz: Option<f32>,
    gyro_amplitude: Option<f32>,
    accel_amplitude: Option<f32>,
    accel_z_offset: Option<f32>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use mf_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use mf_core::config::{parse_config, SelectionStrategy};
/// let config = parse_config("[extractor]\nselection = \"Legacy\"\n").unwrap();
/// assert_eq!(config.selection, SelectionStrategy::Legacy);
/// assert_eq!(config.capacity, 128);
/// ```
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = PipelineConfig::default();

    if let Some(w) = file.window {
        if let Some(v) = w.capacity {
            config.capacity = v;
        }
        if let Some(v) = w.epoch_ms {
            config.epoch_ms = v;
        }
    }
    if let Some(s) = file.sensor {
        if let Some(v) = s.gyro_divisor {
            config.gyro_divisor = v;
        }
        if let Some(v) = s.accel_divisor {
            config.accel_divisor = v;
        }
    }
    if let Some(e) = file.extractor
        && let Some(v) = e.selection
    {
        config.selection = v;
    }
    if let Some(r) = file.radio
        && let Some(v) = r.channel_id
    {
        config.channel_id = v;
    }
    if let Some(s) = file.simulation {
        if let Some(v) = s.gyro_hz {
            config.simulation.gyro_hz = v;
        }
        if let Some(v) = s.accel_hz {
            config.simulation.accel_hz = v;
        }
        if let Some(v) = s.gyro_amplitude {
            config.simulation.gyro_amplitude = v;
        }
        if let Some(v) = s.accel_amplitude {
            config.simulation.accel_amplitude = v;
        }
        if let Some(v) = s.accel_z_offset {
            config.simulation.accel_z_offset = v;
        }
    }

    config.clamp_all();
    Ok(config)
}
