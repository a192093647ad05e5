use chrono::{Local, NaiveDate};
use drift_akaze::AkazeMatcher;
use drift_core::{ArtifactStore, Notifier, Reporter};
use drift_draw::SideBySide;
use drift_watch::{
    run_log, Batch, ConfigError, FrameStore, LogNotifier, SendmailNotifier, WatchConfig,
};
use log::*;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Clone)]
#[structopt(
    name = "drift-watch",
    about = "Compares yesterday's and today's frame of every camera and alerts on moved cameras"
)]
struct Opt {
    /// The key=value configuration file.
    #[structopt(short, long, default_value = "/mnt/config/config.txt")]
    config: PathBuf,
    /// The directory holding one `YYYYMMDD` directory of frames per day.
    #[structopt(short, long, default_value = "/mnt/frame")]
    frames: PathBuf,
    /// The day to check in `YYYYMMDD` format, compared against the day before.
    ///
    /// Defaults to today in local time.
    #[structopt(short, long, parse(try_from_str = parse_date))]
    date: Option<NaiveDate>,
    /// Log alerts instead of sending e-mail.
    #[structopt(long)]
    dry_run: bool,
    /// Also append the log to a dated run log file in this directory.
    #[structopt(long, parse(from_os_str))]
    log_dir: Option<PathBuf>,
}

fn parse_date(s: &str) -> chrono::ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
}

fn main() {
    let opt = Opt::from_args();
    let today = opt.date.unwrap_or_else(|| Local::now().date_naive());
    if let Err(e) = run_log::init(opt.log_dir.as_deref(), today) {
        eprintln!("unable to install logger: {}", e);
    }

    if let Err(e) = run(&opt, today) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: &Opt, today: NaiveDate) -> Result<(), ConfigError> {
    let config = WatchConfig::load(&opt.config)?;

    let notifier: Box<dyn Notifier> = if opt.dry_run || config.receivers.is_empty() {
        info!("alerts are only logged");
        Box::new(LogNotifier)
    } else {
        Box::new(SendmailNotifier::new(
            &config.sendmail,
            config.sender.clone(),
            config.receivers.clone(),
        ))
    };
    let store = ArtifactStore::new(config.artifact_root(&opt.frames));
    info!("artifacts go to {}", store.root().display());

    let batch = Batch {
        provider: AkazeMatcher::new(config.akaze_threshold, config.match_better_by),
        reporter: Reporter::new(config.alert_policy(), store, SideBySide, notifier.as_ref()),
        frames: FrameStore::new(&opt.frames),
        threshold: config.threshold,
    };
    let summary = batch.run_day(today);
    info!(
        "{}: compared {}, moved {}, stable {}, skipped {}, failed alerts {}, failed artifacts {}",
        today,
        summary.compared,
        summary.moved,
        summary.stable,
        summary.skipped,
        summary.notify_failures,
        summary.artifact_failures
    );
    Ok(())
}
