use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};

/// Origine des échantillons bruts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Sinusoïdes synthétiques (section [simulation]).
    Sim,
    /// Rejeu en boucle d'un CSV gx,gy,gz,ax,ay,az.
    Replay,
}

/// Destination des records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Hex dump in the log.
    Log,
    /// One JSON line per record on stdout.
    Json,
    /// Raw 31-byte datagram.
    Udp,
}

/// motionfeat : extraction de features spectrales sur capteur de mouvement 6 axes.
///
/// Tapez `t` + Entrée pour basculer Idle/Running, `q` pour quitter.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Source capteur : sim ou replay.
    #[arg(long, value_enum, default_value_t = SourceKind::Sim)]
    pub source: SourceKind,

    /// CSV à rejouer (requis avec --source replay).
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Sortie des records : log, json ou udp.
    #[arg(long, value_enum, default_value_t = SinkKind::Log)]
    pub sink: SinkKind,

    /// Adresse cible pour --sink udp.
    #[arg(long, default_value = "127.0.0.1:5037")]
    pub udp_target: SocketAddr,

    /// Démarrer directement en Running, sans attendre un toggle.
    #[arg(long, default_value_t = false)]
    pub autostart: bool,

    /// Arrêter le programme après ce nombre de secondes.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Check flag combinations clap cannot express.
    ///
    /// # Errors
    /// Returns an error if `--source replay` has no `--replay` file, or if
    /// `--duration` is not a positive number that fits a [`Duration`].
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source == SourceKind::Replay && self.replay.is_none() {
            anyhow::bail!("--source replay requiert --replay <CSV>.");
        }
        self.run_duration()?;
        Ok(())
    }

    /// `--duration` as a [`Duration`], if given.
    ///
    /// # Errors
    /// Returns an error for a non-positive, non-finite or oversized value.
    pub fn run_duration(&self) -> anyhow::Result<Option<Duration>> {
        let Some(d) = self.duration else {
            return Ok(None);
        };
        if !(d.is_finite() && d > 0.0) {
            anyhow::bail!("--duration doit être un nombre positif (reçu {d}).");
        }
        match Duration::try_from_secs_f64(d) {
            Ok(duration) => Ok(Some(duration)),
            Err(e) => anyhow::bail!("--duration hors limites ({d} s) : {e}"),
        }
    }

    /// Instant at which the run stops, counted from `now`.
    ///
    /// # Errors
    /// Returns an error if `--duration` is invalid or overflows the clock.
    pub fn deadline(&self, now: Instant) -> anyhow::Result<Option<Instant>> {
        self.run_duration()?
            .map(|d| {
                now.checked_add(d)
                    .with_context(|| format!("--duration trop grande ({} s)", d.as_secs()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Cli> {
        Cli::try_parse_from(std::iter::once("motionfeat").chain(args.iter().copied())).ok()
    }

    #[test]
    fn defaults() {
        let Some(cli) = parse(&[]) else {
            panic!("defaults must parse");
        };
        assert_eq!(cli.source, SourceKind::Sim);
        assert_eq!(cli.sink, SinkKind::Log);
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert!(!cli.autostart);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn replay_requires_a_file() {
        let Some(cli) = parse(&["--source", "replay"]) else {
            panic!("must parse");
        };
        assert!(cli.validate().is_err());

        let Some(cli) = parse(&["--source", "replay", "--replay", "walk.csv", "--sink", "json"]) else {
            panic!("must parse");
        };
        assert!(cli.validate().is_ok());
        assert_eq!(cli.sink, SinkKind::Json);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(parse(&["--sink", "ble"]).is_none());
        assert!(parse(&["--udp-target", "nowhere"]).is_none());
        let Some(cli) = parse(&["--duration", "0"]) else {
            panic!("must parse");
        };
        assert!(cli.validate().is_err());
    }

    #[test]
    fn huge_duration_is_an_error_not_a_panic() {
        let Some(cli) = parse(&["--duration", "1e20"]) else {
            panic!("must parse");
        };
        assert!(cli.validate().is_err());
        assert!(cli.deadline(Instant::now()).is_err());

        // fits a Duration but not the monotonic clock
        let Some(cli) = parse(&["--duration", "1e19"]) else {
            panic!("must parse");
        };
        assert!(cli.deadline(Instant::now()).is_err());
    }

    #[test]
    fn deadline_is_relative_to_now() {
        let Some(cli) = parse(&["--duration", "1.5"]) else {
            panic!("must parse");
        };
        let now = Instant::now();
        let deadline = cli.deadline(now).ok().flatten();
        assert_eq!(deadline, Some(now + Duration::from_millis(1500)));

        let Some(cli) = parse(&[]) else {
            panic!("must parse");
        };
        assert!(matches!(cli.deadline(now), Ok(None)));
    }
}
