use std::time::{Duration, Instant};

use flume::RecvTimeoutError;
use mf_core::config::PipelineConfig;
use mf_core::traits::{MotionSensor, Transmitter};
use mf_dsp::scheduler::{EpochOutcome, Mode, SampleOutcome, Scheduler};

/// Commandes envoyées au dispatcher (stdin, Ctrl-C, hot-reload).
#[derive(Debug, Clone)]
pub enum Command {
    /// User button: Idle ↔ Running.
    Toggle,
    /// New configuration, applied at the next Idle.
    Reload(PipelineConfig),
    Quit,
}

/// Prochaine échéance d'un tick périodique.
///
/// Re-arms from the previous deadline so the cadence does not drift. A
/// tick more than one period late restarts from `now` instead of firing
/// a burst of catch-up ticks.
fn next_deadline(prev: Instant, period: Duration, now: Instant) -> Instant {
    let next = prev + period;
    if now.saturating_duration_since(next) > period {
        now + period
    } else {
        next
    }
}

/// Dispatcher mono-thread : commandes et ticks, un événement à la fois.
///
/// Every scheduler entry point runs to completion before the next event
/// is looked at, so the scheduler never sees two events at once.
pub struct Runtime<S: MotionSensor, T: Transmitter> {
    scheduler: Scheduler<S, T>,
    commands: flume::Receiver<Command>,
    /// Config reçue pendant Running, en attente du prochain Idle.
    pending: Option<PipelineConfig>,
    sampling_at: Option<Instant>,
    epoch_at: Option<Instant>,
    commands_open: bool,
}

impl<S: MotionSensor, T: Transmitter> Runtime<S, T> {
    #[must_use]
    pub fn new(scheduler: Scheduler<S, T>, commands: flume::Receiver<Command>) -> Self {
        Self {
            scheduler,
            commands,
            pending: None,
            sampling_at: None,
            epoch_at: None,
            commands_open: true,
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<S, T> {
        &self.scheduler
    }

    /// Toggle to Running right away (`--autostart`).
    ///
    /// # Errors
    /// Returns the sensor activation error.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.scheduler.mode() == Mode::Idle {
            self.scheduler.on_toggle()?;
            self.sync_deadlines(Instant::now());
        }
        Ok(())
    }

    /// Dispatch until [`Command::Quit`], until `until` passes, or until the
    /// command channel closes while nothing is armed.
    ///
    /// The scheduler is stopped on the way out.
    pub fn run(&mut self, until: Option<Instant>) {
        loop {
            let next = [self.sampling_at, self.epoch_at, until]
                .into_iter()
                .flatten()
                .min();

            let event = match (self.commands_open, next) {
                (true, Some(deadline)) => self.commands.recv_deadline(deadline),
                (true, None) => self.commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
                (false, Some(deadline)) => {
                    std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    Err(RecvTimeoutError::Timeout)
                }
                (false, None) => break,
            };

            match event {
                Ok(Command::Quit) => {
                    log::info!("Arrêt demandé");
                    break;
                }
                Ok(cmd) => self.handle_command(cmd),
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("Canal de commandes fermé");
                    self.commands_open = false;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let now = Instant::now();
            if until.is_some_and(|u| now >= u) {
                log::info!("Durée écoulée");
                break;
            }
            self.fire_due(now);
        }

        self.scheduler.stop();
        self.apply_pending();
        let stats = self.scheduler.stats();
        log::info!(
            "Session : {} époques, {} échantillons, {} pertes capteur, {} pertes radio",
            stats.epochs_emitted,
            stats.samples_stored,
            stats.read_failures,
            stats.transmit_failures
        );
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Toggle => match self.scheduler.on_toggle() {
                Ok(mode) => log::info!("Mode : {mode:?}"),
                Err(e) => log::error!("Démarrage impossible : {e}"),
            },
            Command::Reload(config) => {
                if self.scheduler.mode() == Mode::Running {
                    log::info!("Nouvelle config en attente du prochain arrêt");
                }
                self.pending = Some(config);
            }
            Command::Quit => {}
        }
        self.after_transition(Instant::now());
    }

    /// Deliver every tick whose deadline has passed. Sampling goes first
    /// so a sample due at the same instant lands in the closing window.
    fn fire_due(&mut self, now: Instant) {
        if let Some(at) = self.sampling_at
            && at <= now
        {
            if self.scheduler.on_sample_tick() == SampleOutcome::Full {
                log::trace!("Fenêtre pleine, échantillon ignoré");
            }
            let period = self.scheduler.timers().sampling.period();
            self.sampling_at = Some(next_deadline(at, period, now));
        }

        if let Some(at) = self.epoch_at
            && at <= now
        {
            match self.scheduler.on_epoch_tick() {
                EpochOutcome::Emitted(record) => log::debug!("Époque : [{record}]"),
                EpochOutcome::Empty => log::debug!("Époque vide"),
                EpochOutcome::Halted => log::warn!("Scheduler arrêté sur erreur d'extraction"),
                EpochOutcome::Ignored => {}
            }
            let period = self.scheduler.timers().epoch.period();
            self.epoch_at = Some(next_deadline(at, period, now));
        }

        self.after_transition(now);
    }

    fn after_transition(&mut self, now: Instant) {
        if self.scheduler.mode() == Mode::Idle {
            self.apply_pending();
        }
        self.sync_deadlines(now);
    }

    fn apply_pending(&mut self) {
        if let Some(config) = self.pending.take() {
            if self.scheduler.reconfigure(config.clone()) {
                log::info!(
                    "Config appliquée : N={}, époque {} ms, {:?}",
                    config.capacity,
                    config.epoch_ms,
                    config.selection
                );
            } else {
                self.pending = Some(config);
            }
        }
    }

    /// Follow the scheduler's armed/disarmed timers: newly armed slots get
    /// a first deadline one period from `now`, disarmed ones none.
    fn sync_deadlines(&mut self, now: Instant) {
        let timers = *self.scheduler.timers();
        self.sampling_at = if timers.sampling.is_armed() {
            Some(self.sampling_at.unwrap_or(now + timers.sampling.period()))
        } else {
            None
        };
        self.epoch_at = if timers.epoch.is_armed() {
            Some(self.epoch_at.unwrap_or(now + timers.epoch.period()))
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use mf_core::window::Axis;
    use mf_core::CoreError;

    use super::*;

    struct Constant;
    impl MotionSensor for Constant {
        fn activate(&mut self) -> Result<(), CoreError> {
            Ok(())
        }
        fn deactivate(&mut self) {}
        fn read_axis(&mut self, axis: Axis) -> Result<i16, CoreError> {
            Ok(if axis.is_gyro() { 2560 } else { 400 })
        }
    }

    #[derive(Default)]
    struct Sink(Vec<Vec<u8>>);
    impl Transmitter for Sink {
        fn send(&mut self, _channel_id: u8, payload: &[u8]) -> Result<(), CoreError> {
            self.0.push(payload.to_vec());
            Ok(())
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            capacity: 4,
            epoch_ms: 40,
            ..PipelineConfig::default()
        }
    }

    fn runtime(config: PipelineConfig) -> (Runtime<Constant, Sink>, flume::Sender<Command>) {
        let (tx, rx) = flume::unbounded();
        let scheduler = Scheduler::new(config, Constant, Sink::default());
        (Runtime::new(scheduler, rx), tx)
    }

    #[test]
    fn catch_up_rule() {
        let t0 = Instant::now();
        let p = Duration::from_millis(10);
        assert_eq!(next_deadline(t0, p, t0), t0 + p);
        assert_eq!(next_deadline(t0, p, t0 + Duration::from_millis(15)), t0 + p);
        let late = t0 + Duration::from_millis(50);
        assert_eq!(next_deadline(t0, p, late), late + p);
    }

    #[test]
    fn short_run_emits_records() {
        let (mut rt, _tx) = runtime(fast_config());
        assert!(rt.start().is_ok());
        rt.run(Some(Instant::now() + Duration::from_millis(150)));

        assert_eq!(rt.scheduler().mode(), Mode::Idle);
        let sent = &rt.scheduler().transmitter().0;
        assert!(sent.len() >= 2, "{} records", sent.len());
        assert!(sent.iter().all(|p| p.len() == mf_core::record::RECORD_LEN));
        assert_eq!(rt.scheduler().last_record().get(Axis::GyroX).mean, 10);
    }

    #[test]
    fn quit_returns_immediately() {
        let (mut rt, tx) = runtime(fast_config());
        assert!(tx.send(Command::Toggle).is_ok());
        assert!(tx.send(Command::Quit).is_ok());
        let started = Instant::now();
        rt.run(None);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(rt.scheduler().mode(), Mode::Idle);
    }

    #[test]
    fn closed_channel_while_idle_ends_the_run() {
        let (mut rt, tx) = runtime(fast_config());
        drop(tx);
        rt.run(None);
        assert_eq!(rt.scheduler().mode(), Mode::Idle);
    }

    #[test]
    fn reload_waits_for_idle() {
        let (mut rt, tx) = runtime(fast_config());
        let mut wide = fast_config();
        wide.capacity = 8;

        assert!(tx.send(Command::Toggle).is_ok());
        assert!(tx.send(Command::Reload(wide)).is_ok());
        rt.run(Some(Instant::now() + Duration::from_millis(30)));
        // stopped by the deadline, so the pending config lands on exit
        assert_eq!(rt.scheduler().config().capacity, 8);

        let mut narrow = fast_config();
        narrow.capacity = 2;
        assert!(tx.send(Command::Reload(narrow)).is_ok());
        assert!(tx.send(Command::Quit).is_ok());
        rt.run(None);
        assert_eq!(rt.scheduler().window().capacity(), 2);
    }

    #[test]
    fn toggle_off_applies_pending_config() {
        let (mut rt, tx) = runtime(fast_config());
        let mut legacy = fast_config();
        legacy.selection = mf_core::config::SelectionStrategy::Legacy;

        assert!(tx.send(Command::Toggle).is_ok());
        assert!(tx.send(Command::Reload(legacy)).is_ok());
        assert!(tx.send(Command::Toggle).is_ok());
        rt.run(Some(Instant::now() + Duration::from_millis(20)));
        assert_eq!(
            rt.scheduler().config().selection,
            mf_core::config::SelectionStrategy::Legacy
        );
    }
}
