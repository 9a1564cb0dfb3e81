use thiserror::Error;

/// Errors originating from the core module and the capability traits.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The motion sensor could not be activated or read.
    #[error("Capteur indisponible : {0}")]
    Sensor(String),

    /// The transmitter refused or failed to send a payload.
    #[error("Échec d'émission : {0}")]
    Transmit(String),

    /// A wire payload does not have the fixed record size.
    #[error("Taille de payload invalide : {actual} octets (attendu {expected})")]
    PayloadLength {
        /// Bytes received.
        actual: usize,
        /// Bytes required by the record layout.
        expected: usize,
    },

    /// The trailing framing byte of a payload is not zero.
    #[error("Terminateur de payload invalide : {0:#04x}")]
    Terminator(u8),
}
