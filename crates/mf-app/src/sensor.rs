use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use csv::ReaderBuilder;
use mf_core::config::{PipelineConfig, SimulationConfig};
use mf_core::traits::MotionSensor;
use mf_core::window::Axis;
use mf_core::CoreError;

/// Capteur synthétique : une sinusoïde par axe, déterministe.
///
/// Each axis gets a small phase offset so the three axes of a sensor are
/// not identical. The sample clock advances once per six-axis group
/// (after accel-Z is read).
pub struct SimulatedSensor {
    config: SimulationConfig,
    sample_rate_hz: f32,
    tick: u64,
    active: bool,
}

impl SimulatedSensor {
    #[must_use]
    pub fn new(config: SimulationConfig, sample_rate_hz: f32) -> Self {
        Self {
            config,
            sample_rate_hz: sample_rate_hz.max(1.0),
            tick: 0,
            active: false,
        }
    }

    /// Sensor sampled at the pipeline's tick rate, `1 / sampling_period`.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.simulation.clone(), tick_rate_hz(config))
    }

    #[must_use]
    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    fn value(&self, axis: Axis) -> f32 {
        let t = self.tick as f32 / self.sample_rate_hz;
        let phase = axis.index() as f32 * 0.7;
        let (hz, amplitude) = if axis.is_gyro() {
            (self.config.gyro_hz, self.config.gyro_amplitude)
        } else {
            (self.config.accel_hz, self.config.accel_amplitude)
        };
        let offset = if axis == Axis::AccelZ {
            self.config.accel_z_offset
        } else {
            0.0
        };
        offset + amplitude * (2.0 * std::f32::consts::PI * hz * t + phase).sin()
    }
}

impl MotionSensor for SimulatedSensor {
    fn activate(&mut self) -> Result<(), CoreError> {
        self.active = true;
        log::debug!("Capteur simulé activé @ {} Hz", self.sample_rate_hz);
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn reconfigure(&mut self, config: &PipelineConfig) {
        self.config = config.simulation.clone();
        self.sample_rate_hz = tick_rate_hz(config).max(1.0);
        log::debug!("Simulation reconfigurée @ {} Hz", self.sample_rate_hz);
    }

    fn read_axis(&mut self, axis: Axis) -> Result<i16, CoreError> {
        if !self.active {
            return Err(CoreError::Sensor("capteur simulé inactif".into()));
        }
        let value = self.value(axis);
        if axis == Axis::AccelZ {
            self.tick += 1;
        }
        Ok(value.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16)
    }
}

fn tick_rate_hz(config: &PipelineConfig) -> f32 {
    1.0 / config.sampling_period().as_secs_f32().max(f32::EPSILON)
}

/// Replays recorded raw samples in a loop.
pub struct ReplaySensor {
    rows: Vec<[i16; 6]>,
    cursor: usize,
    active: bool,
}

impl ReplaySensor {
    /// # Errors
    /// Returns an error if `rows` is empty.
    pub fn new(rows: Vec<[i16; 6]>) -> Result<Self> {
        ensure!(!rows.is_empty(), "Aucune ligne à rejouer");
        Ok(Self {
            rows,
            cursor: 0,
            active: false,
        })
    }

    /// Load the CSV at `path` (see [`load_rows`]).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds no row.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let rows = load_rows(path)?;
        log::info!("{} échantillons chargés depuis {}", rows.len(), path.display());
        Self::new(rows)
    }
}

impl MotionSensor for ReplaySensor {
    fn activate(&mut self) -> Result<(), CoreError> {
        self.active = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn read_axis(&mut self, axis: Axis) -> Result<i16, CoreError> {
        if !self.active {
            return Err(CoreError::Sensor("rejeu inactif".into()));
        }
        let value = self.rows[self.cursor][axis.index()];
        if axis == Axis::AccelZ {
            self.cursor = (self.cursor + 1) % self.rows.len();
        }
        Ok(value)
    }
}

/// Charge des échantillons bruts depuis un CSV `gx,gy,gz,ax,ay,az`.
///
/// The first line is a header. Values are raw sensor units, before the
/// gyro/accel divisors.
///
/// # Errors
/// Returns an error if the file cannot be opened, a row has fewer than
/// six columns, a value is not an i16, or the file holds no data.
pub fn load_rows(path: &Path) -> Result<Vec<[i16; 6]>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir le CSV {}", path.display()))?;

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Ligne {} invalide dans {}", row_idx + 1, path.display()))?;
        if record.len() < 6 {
            bail!("La ligne {} n'a pas 6 colonnes", row_idx + 1);
        }
        let mut row = [0i16; 6];
        for (col, slot) in row.iter_mut().enumerate() {
            *slot = record[col].parse().with_context(|| {
                format!("Valeur '{}' invalide (ligne {}, colonne {})", &record[col], row_idx + 1, col + 1)
            })?;
        }
        rows.push(row);
    }

    ensure!(!rows.is_empty(), "Le CSV {} ne contient pas de données", path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mf_core::traits::Transmitter;
    use mf_dsp::scheduler::Scheduler;

    use super::*;

    struct Discard;
    impl Transmitter for Discard {
        fn send(&mut self, _channel_id: u8, _payload: &[u8]) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn read_group(sensor: &mut impl MotionSensor) -> [i16; 6] {
        let mut out = [0i16; 6];
        for axis in Axis::ALL {
            out[axis.index()] = sensor.read_axis(axis).unwrap_or(i16::MIN);
        }
        out
    }

    #[test]
    fn simulated_needs_activation() {
        let mut sensor = SimulatedSensor::new(SimulationConfig::default(), 128.0);
        assert!(sensor.read_axis(Axis::GyroX).is_err());
        assert!(sensor.activate().is_ok());
        assert!(sensor.read_axis(Axis::GyroX).is_ok());
    }

    #[test]
    fn simulated_accel_z_carries_offset() {
        let config = SimulationConfig {
            accel_amplitude: 0.0,
            accel_z_offset: 4096.0,
            ..SimulationConfig::default()
        };
        let mut sensor = SimulatedSensor::new(config, 128.0);
        assert!(sensor.activate().is_ok());
        let group = read_group(&mut sensor);
        assert_eq!(group[Axis::AccelZ.index()], 4096);
        assert_eq!(group[Axis::AccelX.index()], 0);
    }

    #[test]
    fn simulated_is_deterministic() {
        let mut a = SimulatedSensor::new(SimulationConfig::default(), 128.0);
        let mut b = SimulatedSensor::new(SimulationConfig::default(), 128.0);
        assert!(a.activate().is_ok() && b.activate().is_ok());
        for _ in 0..10 {
            assert_eq!(read_group(&mut a), read_group(&mut b));
        }
    }

    #[test]
    fn rate_follows_the_sampling_period() {
        let mut config = PipelineConfig::default();
        let mut sensor = SimulatedSensor::from_config(&config);
        assert!((sensor.sample_rate_hz() - 125.0).abs() < 0.01);

        config.capacity = 50;
        config.epoch_ms = 500;
        sensor.reconfigure(&config);
        assert!((sensor.sample_rate_hz() - 100.0).abs() < 0.01);
    }

    #[test]
    fn reloaded_simulation_reaches_the_window() {
        let mut quiet = PipelineConfig::default();
        quiet.simulation.gyro_amplitude = 0.0;
        let mut scheduler = Scheduler::new(
            quiet.clone(),
            SimulatedSensor::from_config(&quiet),
            Discard,
        );

        let mut loud = quiet;
        loud.simulation.gyro_amplitude = 8000.0;
        assert!(scheduler.reconfigure(loud));
        assert!(scheduler.on_toggle().is_ok());
        for _ in 0..10 {
            scheduler.on_sample_tick();
        }
        let gyro = scheduler.window().channel(Axis::GyroX);
        assert_eq!(gyro.len(), 10);
        assert!(gyro.iter().any(|&v| v != 0), "{gyro:?}");
    }

    #[test]
    fn replay_loops() {
        let mut sensor = match ReplaySensor::new(vec![[1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12]]) {
            Ok(s) => s,
            Err(e) => panic!("{e}"),
        };
        assert!(sensor.activate().is_ok());
        assert_eq!(read_group(&mut sensor), [1, 2, 3, 4, 5, 6]);
        assert_eq!(read_group(&mut sensor), [7, 8, 9, 10, 11, 12]);
        assert_eq!(read_group(&mut sensor), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn empty_replay_is_rejected() {
        assert!(ReplaySensor::new(Vec::new()).is_err());
    }

    #[test]
    fn csv_rows_are_parsed() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("tempfile: {e}"),
        };
        let _ = writeln!(file, "gx,gy,gz,ax,ay,az\n100, -200, 300, 4000, 0, -4000\n1,2,3,4,5,6");
        let rows = match load_rows(file.path()) {
            Ok(rows) => rows,
            Err(e) => panic!("{e:#}"),
        };
        assert_eq!(rows, vec![[100, -200, 300, 4000, 0, -4000], [1, 2, 3, 4, 5, 6]]);
    }

    #[test]
    fn csv_errors_are_reported() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("tempfile: {e}"),
        };
        let _ = writeln!(file, "gx,gy,gz,ax,ay,az\n1,2,3,4,5,99999");
        let Err(err) = load_rows(file.path()) else {
            panic!("out-of-range value must be rejected");
        };
        assert!(format!("{err:#}").contains("colonne 6"));

        let mut header_only = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("tempfile: {e}"),
        };
        let _ = writeln!(header_only, "gx,gy,gz,ax,ay,az");
        assert!(load_rows(header_only.path()).is_err());
    }
}
