use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, instrument};
use tracing_error::{ErrorLayer, ExtractSpanTrace, TracedError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tabula::controller::Controller;
use tabula::dataset::{Dataset, LoadOptions, expand_path};
use tabula::demo::Demo;
use tabula::domain::{SortCycle, TVConfig, TVError};
use tabula::model::{Model, Status};
use tabula::schema::Bands;
use tabula::ui::TableUI;

#[derive(Parser, Debug)]
#[command(version, about = "A tui table viewer with sorting, filters, selection and csv export.")]
struct Args {
    /// Csv, parquet or arrow file to show. Without it a demo dataset is shown.
    path: Option<String>,

    /// Demo dataset used when no path is given
    #[arg(long, value_enum, default_value_t = Demo::Freelancers)]
    demo: Demo,

    /// Column holding unique record ids, defaults to the row number
    #[arg(long)]
    id_column: Option<String>,

    /// Column label override, e.g. --label full_name="Full Name"
    #[arg(long = "label", value_parser = parse_label)]
    labels: Vec<(String, String)>,

    /// Column only shown in the expanded row details
    #[arg(long)]
    detail: Vec<String>,

    /// Column left out of the csv export
    #[arg(long)]
    no_export: Vec<String>,

    /// Color a numeric column by value, e.g. --band salary=50000:75000
    #[arg(long = "band", value_parser = parse_band)]
    bands: Vec<(String, Bands)>,

    /// Where the csv export is written
    #[arg(long, default_value = "table_data.csv")]
    export_path: String,

    /// Sorting a column a third time removes the sort
    #[arg(long)]
    tri_state_sort: bool,

    #[arg(long, default_value_t = 32)]
    max_column_width: usize,

    /// Event poll timeout in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Write logs to this file, filtered by RUST_LOG (default info)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, label)) if !field.is_empty() && !label.is_empty() => {
            Ok((field.to_string(), label.to_string()))
        }
        _ => Err(format!("expected field=Label, got \"{s}\"")),
    }
}

fn parse_band(s: &str) -> Result<(String, Bands), String> {
    let err = || format!("expected field=low:high, got \"{s}\"");
    let (field, range) = s.split_once('=').ok_or_else(err)?;
    let (low, high) = range.split_once(':').ok_or_else(err)?;
    let low: f64 = low.trim().parse().map_err(|_| err())?;
    let high: f64 = high.trim().parse().map_err(|_| err())?;
    if field.is_empty() || low > high {
        return Err(err());
    }
    Ok((field.to_string(), Bands { low, high }))
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.log_file.as_ref()) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            let mut err: Option<&(dyn std::error::Error + 'static)> = Some(&e);
            while let Some(cause) = err {
                if let Some(trace) = cause.span_trace() {
                    eprintln!("{trace}");
                    break;
                }
                err = cause.source();
            }
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), TVError> {
    let fmt_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn load_dataset(args: &Args) -> Result<Dataset, TVError> {
    match &args.path {
        Some(path) => {
            let options = LoadOptions {
                id_column: args.id_column.clone(),
                labels: args.labels.iter().cloned().collect::<HashMap<_, _>>(),
                detail: args.detail.clone(),
                hidden_from_export: args.no_export.clone(),
                bands: args.bands.iter().cloned().collect::<HashMap<_, _>>(),
            };
            Dataset::load(&expand_path(path)?, &options)
        }
        None => args.demo.load(),
    }
}

#[instrument(skip(args))]
fn run(args: Args) -> Result<(), TracedError<TVError>> {
    let dataset = load_dataset(&args)?;

    let cfg = TVConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_max_column_width(args.max_column_width)
        .with_export_path(expand_path(&args.export_path)?)
        .with_sort_cycle(if args.tri_state_sort {
            SortCycle::TriState
        } else {
            SortCycle::Toggle
        });
    info!("Starting tabula with {:?}", cfg);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), TVError> {
        let size = terminal.size()?;
        let mut model = Model::init(&cfg, dataset, size.width as usize, size.height as usize)?;
        let mut ui = TableUI::new();
        let controller = Controller::new(&cfg);

        while model.status != Status::QUITTING {
            // Render the current view
            terminal.draw(|f| ui.draw(&model, f))?;

            // Handle events and map to a Message
            let message = controller.handle_event(&model)?;
            model.update(message)?;
        }
        Ok(())
    })();
    ratatui::restore();

    result?;
    Ok(())
}
