use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::error;

use greentrace::{
    data_dir, init_logging,
    leaderboard::Movement,
    scanner::{CaptureDevice, MisreadInjection, ScannerEvent, ScriptedDevice},
    scoring::Dimension,
    App,
};

#[derive(Parser)]
#[command(name = "greentrace", version, about = "Barcode confirmation and green scores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a product and record the result
    Score {
        product: String,
        #[arg(default_value = "Food & Beverage")]
        category: String,
        /// Attribute the score to a vendor for the leaderboard
        #[arg(long)]
        vendor: Option<String>,
    },
    /// Replay a recorded detection script through the scanner and confirm its code
    Scan {
        script: PathBuf,
        /// Seed for misread injection
        #[arg(long)]
        seed: Option<u64>,
        /// Fraction of frames corrupted into misreads
        #[arg(long, value_parser = parse_rate)]
        misread_rate: Option<f64>,
        /// Delay between replayed frames
        #[arg(long, default_value_t = 33)]
        frame_interval_ms: u64,
    },
    /// Most recently confirmed scans
    History {
        #[arg(default_value_t = 20)]
        limit: usize,
    },
    /// Vendors ranked by average green score
    Leaderboard,
}

const DEFAULT_MISREAD_RATE: f64 = 0.1;

fn parse_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is outside 0..=1"))
    }
}

fn idle_device() -> Arc<dyn CaptureDevice> {
    Arc::new(ScriptedDevice::new(Vec::new()))
}

async fn run(command: Command) -> Result<()> {
    let dir = data_dir();

    match command {
        Command::Score {
            product,
            category,
            vendor,
        } => {
            let app = App::open(&dir, idle_device())?;
            let (score, _) = app
                .score_and_record(&product, &category, vendor.as_deref())
                .await?;
            println!(
                "{} ({}): {}/100 [{}]",
                score.product_name,
                score.category,
                score.score,
                score.source.as_str()
            );
            for dimension in Dimension::ALL {
                println!(
                    "  {:<20} {:<15} {:>2}/{}",
                    dimension.as_str(),
                    score.classification.label(dimension).unwrap_or("-"),
                    score.breakdown.get(dimension),
                    dimension.max_points()
                );
            }
        }
        Command::Scan {
            script,
            seed,
            misread_rate,
            frame_interval_ms,
        } => {
            let mut device = ScriptedDevice::from_file(&script)?
                .with_frame_interval(Duration::from_millis(frame_interval_ms));
            if seed.is_some() || misread_rate.is_some() {
                device = device.with_misreads(MisreadInjection {
                    seed: seed.unwrap_or_default(),
                    rate: misread_rate.unwrap_or(DEFAULT_MISREAD_RATE),
                });
            }
            let app = App::open(&dir, Arc::new(device))?;
            let mut events = app.scanner().subscribe();
            app.scanner().initialize().await?;

            loop {
                match events.recv().await {
                    Ok(ScannerEvent::CandidateReady { code, confidence }) => {
                        println!("Candidate {code} (confidence {confidence:.2})");
                        break;
                    }
                    Ok(ScannerEvent::StreamEnded) | Ok(ScannerEvent::Closed) | Err(_) => break,
                    Ok(ScannerEvent::Failed { message }) => bail!(message),
                    Ok(ScannerEvent::Confirmed { .. }) => {}
                }
            }

            match app.confirm_scan().await? {
                Some(record) => println!("Confirmed {} in session {}", record.code, record.session_id),
                None => println!("No code confirmed"),
            }
            app.shutdown().await;
        }
        Command::History { limit } => {
            let app = App::open(&dir, idle_device())?;
            let scans = app.history(limit).await?;
            if scans.is_empty() {
                println!("No scans recorded");
            }
            for scan in scans {
                println!(
                    "{}  {:<13}  {:.2}  {}",
                    scan.confirmed_at.format("%Y-%m-%d %H:%M:%S"),
                    scan.code,
                    scan.confidence,
                    scan.session_id
                );
            }
        }
        Command::Leaderboard => {
            let app = App::open(&dir, idle_device())?;
            let board = app.leaderboard().await?;
            if board.is_empty() {
                println!("No vendor scores recorded");
            }
            for entry in board {
                let marker = match entry.movement {
                    Movement::Up => "+",
                    Movement::Down => "-",
                    Movement::Same => "=",
                    Movement::New => "*",
                };
                println!("{:>3}. {} {:<30} {:>3}", entry.rank, marker, entry.name, entry.score);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Command failed: {err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_takes_optional_category_and_vendor() {
        let cli = Cli::try_parse_from(["greentrace", "score", "mawa cake", "--vendor", "Green Co"])
            .unwrap();
        match cli.command {
            Command::Score {
                product,
                category,
                vendor,
            } => {
                assert_eq!(product, "mawa cake");
                assert_eq!(category, "Food & Beverage");
                assert_eq!(vendor.as_deref(), Some("Green Co"));
            }
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn misread_rate_must_be_a_fraction() {
        assert!(Cli::try_parse_from(["greentrace", "scan", "s.json", "--misread-rate", "1.5"]).is_err());
        assert!(Cli::try_parse_from(["greentrace", "scan", "s.json", "--misread-rate", "x"]).is_err());

        let cli = Cli::try_parse_from(["greentrace", "scan", "s.json", "--seed", "7", "--misread-rate", "0.25"])
            .unwrap();
        match cli.command {
            Command::Scan {
                seed,
                misread_rate,
                frame_interval_ms,
                ..
            } => {
                assert_eq!(seed, Some(7));
                assert_eq!(misread_rate, Some(0.25));
                assert_eq!(frame_interval_ms, 33);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn history_limit_defaults_and_rejects_garbage() {
        match Cli::try_parse_from(["greentrace", "history"]).unwrap().command {
            Command::History { limit } => assert_eq!(limit, 20),
            _ => panic!("expected history"),
        }
        assert!(Cli::try_parse_from(["greentrace", "history", "-3"]).is_err());
        assert!(Cli::try_parse_from(["greentrace", "frobnicate"]).is_err());
    }
}
