use crate::config::PipelineConfig;
use crate::error::CoreError;
use crate::window::Axis;

/// Capteur de mouvement six axes.
///
/// Implémenté par : `SimulatedSensor`, `ReplaySensor`.
///
/// # Example
/// ```
/// use mf_core::traits::MotionSensor;
/// use mf_core::window::Axis;
/// use mf_core::CoreError;
///
/// struct Still;
/// impl MotionSensor for Still {
///     fn activate(&mut self) -> Result<(), CoreError> { Ok(()) }
///     fn deactivate(&mut self) {}
///     fn read_axis(&mut self, _axis: Axis) -> Result<i16, CoreError> { Ok(0) }
/// }
/// ```
pub trait MotionSensor {
    /// Power the sensor up. Called on the Idle to Running transition.
    ///
    /// # Errors
    /// Returns [`CoreError::Sensor`] if the device cannot be enabled.
    fn activate(&mut self) -> Result<(), CoreError>;

    /// Power the sensor down. Called on the Running to Idle transition.
    fn deactivate(&mut self);

    /// Lecture brute, non mise à l'échelle, d'un axe.
    ///
    /// Called six times per sampling tick, once per [`Axis`].
    ///
    /// # Errors
    /// Returns [`CoreError::Sensor`] if no reading is available.
    fn read_axis(&mut self, axis: Axis) -> Result<i16, CoreError>;

    /// Prise en compte d'une nouvelle configuration.
    ///
    /// Called by the scheduler while Idle, after it accepted `config`.
    /// Sensors with no tunable state keep the default no-op.
    fn reconfigure(&mut self, config: &PipelineConfig) {
        let _ = config;
    }
}

/// Émetteur best-effort d'un payload de taille fixe.
///
/// # Example
/// ```
/// use mf_core::traits::Transmitter;
/// use mf_core::CoreError;
///
/// struct Discard;
/// impl Transmitter for Discard {
///     fn send(&mut self, _channel_id: u8, _payload: &[u8]) -> Result<(), CoreError> { Ok(()) }
/// }
/// ```
pub trait Transmitter {
    /// Broadcast `payload` on the opaque routing `channel_id`.
    ///
    /// No acknowledgment, no retry.
    ///
    /// # Errors
    /// Returns [`CoreError::Transmit`] if the payload could not be handed
    /// to the radio.
    fn send(&mut self, channel_id: u8, payload: &[u8]) -> Result<(), CoreError>;
}

/// Transformée réelle vers magnitudes, longueur préservée.
///
/// CONTRAT : `output.len() == samples.len()`. `&mut self` gives the
/// implementation exclusive use of its scratch buffers for one call.
///
/// # Example
/// ```
/// use mf_core::traits::MagnitudeTransform;
///
/// struct Abs;
/// impl MagnitudeTransform for Abs {
///     fn transform(&mut self, samples: &[i16], output: &mut [i16]) {
///         for (o, s) in output.iter_mut().zip(samples) { *o = s.saturating_abs(); }
///     }
/// }
/// let mut out = [0i16; 2];
/// Abs.transform(&[-3, 4], &mut out);
/// assert_eq!(out, [3, 4]);
/// ```
pub trait MagnitudeTransform {
    /// Écrit dans `output` la magnitude de chaque bin de `samples`.
    fn transform(&mut self, samples: &[i16], output: &mut [i16]);
}

impl<S: MotionSensor + ?Sized> MotionSensor for Box<S> {
    fn activate(&mut self) -> Result<(), CoreError> {
        (**self).activate()
    }

    fn deactivate(&mut self) {
        (**self).deactivate();
    }

    fn read_axis(&mut self, axis: Axis) -> Result<i16, CoreError> {
        (**self).read_axis(axis)
    }

    fn reconfigure(&mut self, config: &PipelineConfig) {
        (**self).reconfigure(config);
    }
}

impl<T: Transmitter + ?Sized> Transmitter for Box<T> {
    fn send(&mut self, channel_id: u8, payload: &[u8]) -> Result<(), CoreError> {
        (**self).send(channel_id, payload)
    }
}
