use thiserror::Error;

/// Errors originating from the feature extractor.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FeatureError {
    /// The window holds no sample; there is nothing to average.
    #[error("Fenêtre vide : aucune feature à extraire")]
    EmptyWindow,

    /// The frequency table was built for another window length.
    #[error("Table de fréquences de longueur {table}, fenêtre de {fill} échantillons")]
    TableLength {
        /// Length of the table passed in.
        table: usize,
        /// Valid samples in the window.
        fill: usize,
    },
}
