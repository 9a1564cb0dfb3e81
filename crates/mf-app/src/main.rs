use std::io::BufRead;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use mf_core::config::PipelineConfig;
use mf_core::traits::{MotionSensor, Transmitter};
use mf_dsp::scheduler::Scheduler;

pub mod cli;
pub mod hotreload;
pub mod radio;
pub mod runtime;
pub mod sensor;

use runtime::{Command, Runtime};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    // 3. Valider les combinaisons de flags
    cli.validate()?;

    // 4. Charger la config
    let config = resolve_config(&cli)?;

    // 5. Capteur et radio
    let sensor = build_sensor(&cli, &config)?;
    let transmitter = build_transmitter(&cli)?;

    // 6. Canal de commandes : stdin, Ctrl-C, hot-reload
    let (tx, rx) = flume::unbounded();
    spawn_stdin_reader(tx.clone())?;
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Command::Quit);
    })
    .context("Impossible d'installer le handler Ctrl-C")?;
    let _watcher = if cli.config.exists() {
        Some(hotreload::spawn_config_watcher(&cli.config, tx.clone())?)
    } else {
        None
    };
    drop(tx);

    // 7. Boucle principale
    let scheduler = Scheduler::new(config, sensor, transmitter);
    let mut runtime = Runtime::new(scheduler, rx);
    if cli.autostart {
        runtime.start()?;
    } else {
        log::info!("Idle. Tapez « t » + Entrée pour démarrer, « q » pour quitter.");
    }
    let until = cli.deadline(Instant::now())?;
    runtime.run(until);

    Ok(())
}

/// Config file when present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<PipelineConfig> {
    if cli.config.exists() {
        mf_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(PipelineConfig::default())
    }
}

fn build_sensor(cli: &cli::Cli, config: &PipelineConfig) -> Result<Box<dyn MotionSensor>> {
    match cli.source {
        cli::SourceKind::Sim => Ok(Box::new(sensor::SimulatedSensor::from_config(config))),
        cli::SourceKind::Replay => {
            let path = cli
                .replay
                .as_deref()
                .context("--source replay requiert --replay <CSV>")?;
            Ok(Box::new(sensor::ReplaySensor::from_csv(path)?))
        }
    }
}

fn build_transmitter(cli: &cli::Cli) -> Result<Box<dyn Transmitter>> {
    Ok(match cli.sink {
        cli::SinkKind::Log => Box::new(radio::LogTransmitter::default()),
        cli::SinkKind::Json => Box::new(radio::JsonTransmitter::new(std::io::stdout())),
        cli::SinkKind::Udp => Box::new(radio::UdpTransmitter::new(cli.udp_target)?),
    })
}

/// One command per stdin line: `t` toggles, `q` quits. EOF closes the
/// reader's end of the channel.
fn spawn_stdin_reader(tx: flume::Sender<Command>) -> Result<()> {
    std::thread::Builder::new()
        .name("mf-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let cmd = match line.trim() {
                    "" | "t" | "toggle" => Command::Toggle,
                    "q" | "quit" => Command::Quit,
                    other => {
                        log::warn!("Commande inconnue : {other}");
                        continue;
                    }
                };
                if tx.send(cmd).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}
