use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use ptouch::config::load_config;
use ptouch::error::{PrintError, StatusError};
use ptouch::printer::discovery::scan_for_printers;
use ptouch::printer::image_proc::{Bitmap, Conversion};
use ptouch::printer::status::{MediaType, StatusType};
use ptouch::printer::{DeviceStatus, Session};

#[derive(Parser, Debug)]
#[command(name = "ptouch-print")]
#[command(author, version, about = "Print labels on a Brother P-touch over USB", long_about = None)]
struct Cli {
    /// List attached printers without claiming them
    #[arg(long)]
    list: bool,

    /// Show the loaded tape and printer status, then exit
    #[arg(long)]
    info: bool,

    /// Print --info as JSON
    #[arg(long, requires = "info")]
    json: bool,

    /// Black and white image to print; repeat to print several in order
    #[arg(long = "image", value_name = "FILE")]
    images: Vec<PathBuf>,

    /// Print a cut mark after each image (or on its own)
    #[arg(long)]
    cutmark: bool,

    /// Gray level below which pixels print black
    #[arg(long, default_value_t = 128, conflicts_with = "dither")]
    threshold: u8,

    /// Dither grayscale images instead of thresholding
    #[arg(long)]
    dither: bool,

    /// Leave the label in the printer instead of cutting it
    #[arg(long)]
    no_eject: bool,
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("status query failed: {0}")]
    Status(#[from] StatusError),

    #[error("could not load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Info<'a> {
    device: &'static str,
    device_max_px: u32,
    media: MediaType,
    status_type: StatusType,
    #[serde(flatten)]
    status: &'a DeviceStatus,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ptouch=info")),
        )
        .init();

    let cli = Cli::parse();

    for warning in ptouch::platform::check_prerequisites() {
        tracing::warn!("{warning}");
    }

    if cli.list {
        return match scan_for_printers() {
            Ok(printers) if printers.is_empty() => {
                println!("No P-touch printers attached");
                ExitCode::SUCCESS
            }
            Ok(printers) => {
                for p in printers {
                    println!(
                        "{} ({:04x}:{:04x}) on {}",
                        p.model_name, p.vendor_id, p.product_id, p.location
                    );
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("{e}");
                ExitCode::from(5)
            }
        };
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };

    let mut session = match ptouch::open_session(&config) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(5);
        }
    };

    let result = run(&mut session, &cli);
    session.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(session: &mut Session, cli: &Cli) -> Result<(), RunError> {
    session.init()?;
    let report = session.query_status()?;

    if cli.info {
        return print_info(session, cli.json);
    }

    tracing::info!(
        "{} with {}mm tape ({}px)",
        session.device().name,
        report.status.tape_width_mm,
        report.status.tape_width_px
    );

    let conversion = if cli.dither {
        Conversion::Dither
    } else {
        Conversion::Threshold(cli.threshold)
    };

    for path in &cli.images {
        let img = image::open(path).map_err(|source| RunError::Image {
            path: path.clone(),
            source,
        })?;
        let bitmap = Bitmap::from_luma(&img.to_luma8(), conversion);
        tracing::info!(
            "Printing {} ({}px x {}px)",
            path.display(),
            bitmap.width(),
            bitmap.height()
        );
        session.print_bitmap(&bitmap)?;
        if cli.cutmark {
            session.print_cutmark()?;
        }
    }

    if cli.images.is_empty() && cli.cutmark {
        session.print_cutmark()?;
    }

    if !cli.no_eject {
        session.finish()?;
    }
    Ok(())
}

fn print_info(session: &Session, json: bool) -> Result<(), RunError> {
    let status = session.status();
    if json {
        let info = Info {
            device: session.device().name,
            device_max_px: session.device().max_px,
            media: status.media(),
            status_type: status.status_type(),
            status,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", session.device().name);
    println!("tape width: {}mm", status.tape_width_mm);
    match status.max_width() {
        Some(px) => println!("maximum printing width for this tape is {px}px"),
        None => println!("maximum printing width for this tape is unknown"),
    }
    println!("media type: {:?}", status.media());
    if status.has_errors() {
        println!(
            "errors: {:?} {:?}",
            status.error_info_1(),
            status.error_info_2()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_failures_are_reported_as_status_queries() {
        let err = RunError::from(StatusError::Timeout { attempts: 10 });
        assert!(matches!(err, RunError::Status(_)));
        assert!(err.to_string().starts_with("status query failed: "));
    }

    #[test]
    fn print_failures_pass_through_unchanged() {
        let source = PrintError::UnknownTapeWidth { mm: 99 };
        let err = RunError::from(source.clone());
        assert_eq!(err.to_string(), source.to_string());
    }
}
