use std::time::Duration;

use mf_core::config::PipelineConfig;
use mf_core::record::FeatureRecord;
use mf_core::traits::{MotionSensor, Transmitter};
use mf_core::window::{AppendResult, Axis, WindowBuffer};
use mf_core::CoreError;

use crate::features::FeatureExtractor;
use crate::freq_table::FrequencyIndexTable;

/// Scheduler mode.
///
/// # Example
/// ```
/// use mf_dsp::scheduler::Mode;
/// assert_ne!(Mode::Idle, Mode::Running);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Aucun timer armé, fenêtre inerte.
    Idle,
    /// Sampling and epoch ticks armed, window accepting samples.
    Running,
}

/// State of one periodic trigger, as seen by whoever delivers ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSlot {
    period: Duration,
    armed: bool,
    /// Nombre de ré-armements depuis le dernier armement.
    rearms: u64,
}

impl TimerSlot {
    fn new(period: Duration) -> Self {
        Self {
            period,
            armed: false,
            rearms: 0,
        }
    }

    fn arm(&mut self) {
        self.armed = true;
        self.rearms = 0;
    }

    fn rearm(&mut self) {
        if self.armed {
            self.rearms += 1;
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Ticks handled and re-armed since the slot was last armed.
    #[must_use]
    pub fn rearms(&self) -> u64 {
        self.rearms
    }
}

/// The two periodic triggers driven by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timers {
    pub sampling: TimerSlot,
    pub epoch: TimerSlot,
}

/// Outcome of [`Scheduler::on_sample_tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The scaled sample was appended.
    Stored,
    /// The window is full; the sample was discarded.
    Full,
    /// The sensor failed to deliver one of the six axes.
    Dropped,
    /// Tick delivered while Idle.
    Ignored,
}

/// Outcome of [`Scheduler::on_epoch_tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpochOutcome {
    /// A record was computed and handed to the transmitter.
    Emitted(FeatureRecord),
    /// No sample since the last epoch; nothing computed.
    Empty,
    /// Extraction failed; the scheduler went back to Idle.
    Halted,
    /// Tick delivered while Idle.
    Ignored,
}

/// Counters of the current session (reset on every Idle to Running).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub epochs_emitted: u64,
    pub samples_stored: u64,
    /// Samples that arrived while the window was full.
    pub samples_full: u64,
    pub read_failures: u64,
    pub transmit_failures: u64,
}

/// Machine à états échantillonnage / époque.
///
/// Each entry point runs to completion and is a transition over the
/// explicit state held here; nothing is global. Timer delivery is the
/// caller's job: it reads [`Scheduler::timers`] after every call to know
/// which ticks to keep delivering.
///
/// # Example
/// ```
/// use mf_core::config::PipelineConfig;
/// use mf_core::traits::{MotionSensor, Transmitter};
/// use mf_core::window::Axis;
/// use mf_core::CoreError;
/// use mf_dsp::scheduler::{Mode, Scheduler};
///
/// struct Still;
/// impl MotionSensor for Still {
///     fn activate(&mut self) -> Result<(), CoreError> { Ok(()) }
///     fn deactivate(&mut self) {}
///     fn read_axis(&mut self, _axis: Axis) -> Result<i16, CoreError> { Ok(512) }
/// }
/// struct Discard;
/// impl Transmitter for Discard {
///     fn send(&mut self, _id: u8, _payload: &[u8]) -> Result<(), CoreError> { Ok(()) }
/// }
///
/// let mut scheduler = Scheduler::new(PipelineConfig::default(), Still, Discard);
/// scheduler.on_toggle().unwrap();
/// assert_eq!(scheduler.mode(), Mode::Running);
/// scheduler.on_sample_tick();
/// assert_eq!(scheduler.fill(), 1);
/// ```
pub struct Scheduler<S: MotionSensor, T: Transmitter> {
    config: PipelineConfig,
    mode: Mode,
    window: WindowBuffer,
    extractor: FeatureExtractor,
    /// Unique record, réécrit à chaque époque.
    record: FeatureRecord,
    sensor: S,
    transmitter: T,
    timers: Timers,
    stats: SessionStats,
}

impl<S: MotionSensor, T: Transmitter> Scheduler<S, T> {
    /// Create an Idle scheduler owning its capabilities.
    ///
    /// `config` goes through [`PipelineConfig::clamp_all`] first, so a
    /// hand-built config cannot push labels out of the i8 range.
    #[must_use]
    pub fn new(mut config: PipelineConfig, sensor: S, transmitter: T) -> Self {
        config.clamp_all();
        Self {
            mode: Mode::Idle,
            window: WindowBuffer::new(config.capacity),
            extractor: FeatureExtractor::new(config.selection, config.capacity),
            record: FeatureRecord::default(),
            sensor,
            transmitter,
            timers: Timers {
                sampling: TimerSlot::new(config.sampling_period()),
                epoch: TimerSlot::new(config.epoch_period()),
            },
            stats: SessionStats::default(),
            config,
        }
    }

    /// Idle ↔ Running.
    ///
    /// Starting resets the window, activates the sensor and arms both
    /// ticks. Stopping is [`Scheduler::stop`].
    ///
    /// # Errors
    /// Returns the sensor error if activation fails; the scheduler then
    /// stays Idle with no timer armed.
    pub fn on_toggle(&mut self) -> Result<Mode, CoreError> {
        match self.mode {
            Mode::Idle => self.start()?,
            Mode::Running => self.stop(),
        }
        Ok(self.mode)
    }

    fn start(&mut self) -> Result<(), CoreError> {
        self.window.reset();
        self.sensor.activate()?;
        self.stats = SessionStats::default();
        self.timers.sampling.arm();
        self.timers.epoch.arm();
        self.mode = Mode::Running;
        log::info!(
            "Échantillonnage démarré : N={}, tick {:?}, époque {:?}",
            self.config.capacity,
            self.timers.sampling.period(),
            self.timers.epoch.period()
        );
        Ok(())
    }

    /// Back to Idle: disarm both ticks, deactivate the sensor, reset the
    /// window. No-op when already Idle.
    pub fn stop(&mut self) {
        if self.mode == Mode::Idle {
            return;
        }
        self.timers.sampling.disarm();
        self.timers.epoch.disarm();
        self.sensor.deactivate();
        self.window.reset();
        self.mode = Mode::Idle;
        log::info!(
            "Échantillonnage arrêté après {} époques",
            self.stats.epochs_emitted
        );
    }

    /// Read, scale and store one six-axis sample.
    pub fn on_sample_tick(&mut self) -> SampleOutcome {
        if self.mode != Mode::Running {
            return SampleOutcome::Ignored;
        }

        let outcome = match self.read_sample() {
            Ok(sample) => match self.window.append(sample) {
                AppendResult::Stored => {
                    self.stats.samples_stored += 1;
                    SampleOutcome::Stored
                }
                AppendResult::Full => {
                    self.stats.samples_full += 1;
                    SampleOutcome::Full
                }
            },
            Err(e) => {
                self.stats.read_failures += 1;
                log::debug!("Lecture capteur perdue : {e}");
                SampleOutcome::Dropped
            }
        };

        self.timers.sampling.rearm();
        outcome
    }

    /// Six readings, each divided by its axis divisor. Any failed axis
    /// drops the whole group so channels stay aligned.
    fn read_sample(&mut self) -> Result<[i16; 6], CoreError> {
        let mut sample = [0i16; 6];
        for axis in Axis::ALL {
            let raw = self.sensor.read_axis(axis)?;
            sample[axis.index()] = raw / self.config.divisor_for(axis).max(1);
        }
        Ok(sample)
    }

    /// Extract, reset and transmit if the window holds anything; always
    /// re-arm.
    pub fn on_epoch_tick(&mut self) -> EpochOutcome {
        if self.mode != Mode::Running {
            return EpochOutcome::Ignored;
        }

        let fill = self.window.fill();
        if fill == 0 {
            self.timers.epoch.rearm();
            return EpochOutcome::Empty;
        }

        if log::log_enabled!(log::Level::Trace) {
            for axis in Axis::ALL {
                log::trace!("{} = {:?}", axis.name(), self.window.channel(axis));
            }
            log::trace!("fill = {fill}");
        }

        // Une seule table par époque, partagée par les six canaux.
        let table = FrequencyIndexTable::build(fill);
        let record = match self.extractor.process(&self.window, &table) {
            Ok(record) => record,
            Err(e) => {
                log::error!("Extraction impossible, retour à l'arrêt : {e}");
                self.stop();
                return EpochOutcome::Halted;
            }
        };

        self.record = record;
        self.window.reset();
        log::debug!("SendBuff = [{}]", self.record);

        if let Err(e) = self
            .transmitter
            .send(self.config.channel_id, &self.record.to_bytes())
        {
            self.stats.transmit_failures += 1;
            log::warn!("Émission perdue : {e}");
        }
        self.stats.epochs_emitted += 1;

        self.timers.epoch.rearm();
        EpochOutcome::Emitted(self.record)
    }

    /// Replace the configuration. Only accepted while Idle.
    ///
    /// The config is clamped, then handed to the sensor as well. Returns
    /// `false` and changes nothing while Running.
    pub fn reconfigure(&mut self, mut config: PipelineConfig) -> bool {
        if self.mode != Mode::Idle {
            return false;
        }
        config.clamp_all();
        if config.capacity != self.window.capacity() {
            self.window = WindowBuffer::new(config.capacity);
            self.extractor = FeatureExtractor::new(config.selection, config.capacity);
        } else {
            self.extractor.set_strategy(config.selection);
        }
        self.timers = Timers {
            sampling: TimerSlot::new(config.sampling_period()),
            epoch: TimerSlot::new(config.epoch_period()),
        };
        self.sensor.reconfigure(&config);
        self.config = config;
        true
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Valid samples in the current window.
    #[must_use]
    pub fn fill(&self) -> usize {
        self.window.fill()
    }

    #[must_use]
    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    #[must_use]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The record emitted at the last epoch (default before the first).
    #[must_use]
    pub fn last_record(&self) -> &FeatureRecord {
        &self.record
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    #[must_use]
    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }
}
