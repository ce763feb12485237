use chrono::Local;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use opsreport::config::{config_dir, load_config, resolve_path, CONFIG_TEMPLATE};
use opsreport::export::export_file_name;
use opsreport::pdf::Printer;
use opsreport::report::{SlotKind, SummaryMetrics};
use opsreport::source;
use opsreport::{Config, Dashboard, DatasetId, ReportError, Result, SourceKind, TimeRange};

#[derive(Parser)]
#[command(name = "opsreport")]
#[command(version, about = "Operational reports for accounts payable", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config or ~/.opsreport)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Show config and data source status
    Status,

    /// Show one page of a report
    Show {
        /// Dataset: aging, compliance, sla, trends
        dataset: String,

        /// Filter in format "slot=value" (can be repeated)
        #[arg(short, long, value_name = "SLOT=VALUE")]
        filter: Vec<String>,

        /// Page number, 1-based
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Time range for trends: week, month, quarter, year
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Show the headline KPIs
    Summary {
        /// Time range for released/pending: week, month, quarter, year
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Export the filtered rows of a report
    Export {
        /// Dataset: aging, compliance, sla, trends
        dataset: String,

        /// Filter in format "slot=value" (can be repeated)
        #[arg(short, long, value_name = "SLOT=VALUE")]
        filter: Vec<String>,

        /// Output format: csv or pdf
        #[arg(long, default_value = "csv")]
        format: String,

        /// Custom output file path (default: output_dir/<dataset>_<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write delimited text to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,

        /// Time range for trends: week, month, quarter, year
        #[arg(short, long)]
        range: Option<String>,
    },

    /// List the filter slots of a report
    Filters {
        /// Dataset: aging, compliance, sla, trends
        dataset: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Csv,
    Pdf,
}

impl std::str::FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ReportError::InvalidFormat(s.to_string())),
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Show {
            dataset,
            filter,
            page,
            range,
        } => cmd_show(&cfg_dir, &dataset, &filter, page, range.as_deref()),
        Commands::Summary { range } => cmd_summary(&cfg_dir, range.as_deref()),
        Commands::Export {
            dataset,
            filter,
            format,
            output,
            stdout,
            range,
        } => cmd_export(
            &cfg_dir,
            &dataset,
            &filter,
            &format,
            output,
            stdout,
            range.as_deref(),
        ),
        Commands::Filters { dataset } => cmd_filters(&dataset),
    }
}

/// `RUST_LOG` takes precedence over the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(ReportError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("exports"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized opsreport config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your data source:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Check the setup:                opsreport status");
    println!();
    println!("Then look at your first report:");
    println!("  opsreport show aging --filter status=overdue");

    Ok(())
}

fn load(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(ReportError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    load_config(cfg_dir)
}

fn parse_range(range: Option<&str>, config: &Config) -> Result<TimeRange> {
    match range {
        Some(r) => r.parse(),
        None => Ok(config.report.default_range),
    }
}

fn parse_filter(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once('=') {
        Some((slot, value)) if !slot.trim().is_empty() => Ok((slot.trim(), value)),
        _ => Err(ReportError::InvalidFilterSpec(spec.to_string())),
    }
}

/// Fetch everything and apply the requested filters to one dataset's view.
fn build_dashboard(
    cfg_dir: &Path,
    config: &Config,
    dataset: DatasetId,
    filters: &[String],
    range: TimeRange,
) -> Result<Dashboard> {
    // Validate user input before touching the source
    let specs = filters
        .iter()
        .map(|f| parse_filter(f))
        .collect::<Result<Vec<_>>>()?;

    let source = source::from_config(config, cfg_dir)?;
    let mut dashboard = Dashboard::new(config.report.page_size, range);
    dashboard.refresh(source.as_ref());

    let view = dashboard.view_mut(dataset);
    for (slot, value) in specs {
        view.set_filter(slot, value)?;
    }
    Ok(dashboard)
}

/// Show config and data source status
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = load(cfg_dir)?;

    println!("Report Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    match config.source.kind {
        SourceKind::Http => {
            println!("Source:           http");
            if let Some(url) = &config.source.base_url {
                println!("Base URL:         {url}");
            }
            println!(
                "Auth token:       {}",
                if config.source.token.is_some() {
                    "set"
                } else {
                    "none"
                }
            );
            println!("Timeout:          {}s", config.source.timeout_secs);
        }
        SourceKind::Fixtures => {
            println!("Source:           fixtures");
            if let Some(dir) = &config.source.fixtures_dir {
                println!("Fixtures:         {}", resolve_path(dir, cfg_dir).display());
            }
        }
    }
    println!("Page size:        {}", config.report.page_size);
    println!("Default range:    {}", config.report.default_range);
    println!(
        "Export directory: {}",
        resolve_path(&config.export.output_dir, cfg_dir).display()
    );
    println!("Delimiter:        {:?}", config.export.delimiter);

    let printer = Printer::from_settings(&config.print);
    let typst = match printer.check_available() {
        Ok(()) => "available",
        Err(_) => "not found",
    };
    println!("Typst:            {} ({typst})", config.print.typst_bin);
    println!("Print cleanup:    {}s", config.print.cleanup_timeout_secs);

    Ok(())
}

/// Show one page of a report
fn cmd_show(
    cfg_dir: &Path,
    dataset: &str,
    filters: &[String],
    page: usize,
    range: Option<&str>,
) -> Result<()> {
    let dataset: DatasetId = dataset.parse()?;
    let config = load(cfg_dir)?;
    let range = parse_range(range, &config)?;

    let mut dashboard = build_dashboard(cfg_dir, &config, dataset, filters, range)?;
    let view = dashboard.view_mut(dataset);
    view.set_page(page);

    let records = view.visible_records()?;
    let info = view.pagination_info();

    println!("{}", dataset.title());
    if records.rows.is_empty() {
        println!("No rows to show.");
    } else {
        let mut builder = Builder::default();
        builder.push_record(records.headers.clone());
        for row in records.rows {
            builder.push_record(row);
        }
        let table = builder.build().with(Style::rounded()).to_string();
        println!("{table}");
    }

    let first = if info.start_index < info.end_index {
        info.start_index + 1
    } else {
        0
    };
    println!(
        "Showing {}-{} of {} (page {}/{})",
        first,
        info.end_index,
        info.total_items,
        info.current_page,
        info.total_pages
    );

    Ok(())
}

fn format_money(value: f64, currency_symbol: &str) -> String {
    let rounded = value.round() as i64;
    format!("{}{}", currency_symbol, format_grouped_int(rounded))
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

fn print_summary(summary: &SummaryMetrics, range: TimeRange, currency_symbol: &str) {
    println!("Operational Summary ({range})");
    println!("{}", "-".repeat(50));
    println!(
        "Total outstanding:  {}",
        format_money(summary.total_outstanding, currency_symbol)
    );
    println!("Compliance rate:    {:.1}%", summary.overall_compliance_rate);
    println!("SLA breaches:       {}", summary.total_breaches);
    println!("Avg delay:          {:.1} days", summary.avg_delay_across_all);
    println!(
        "Released:           {}",
        format_money(summary.released, currency_symbol)
    );
    println!(
        "Pending:            {}",
        format_money(summary.pending, currency_symbol)
    );
}

/// Show the headline KPIs
fn cmd_summary(cfg_dir: &Path, range: Option<&str>) -> Result<()> {
    let config = load(cfg_dir)?;
    let range = parse_range(range, &config)?;

    let source = source::from_config(&config, cfg_dir)?;
    let mut dashboard = Dashboard::new(config.report.page_size, range);
    dashboard.refresh(source.as_ref());

    print_summary(dashboard.summary(), range, &config.report.currency_symbol);
    Ok(())
}

/// Export the filtered rows of a report
fn cmd_export(
    cfg_dir: &Path,
    dataset: &str,
    filters: &[String],
    format: &str,
    output: Option<PathBuf>,
    stdout: bool,
    range: Option<&str>,
) -> Result<()> {
    let dataset: DatasetId = dataset.parse()?;
    let format: ExportFormat = format.parse()?;
    let config = load(cfg_dir)?;
    let range = parse_range(range, &config)?;
    let delimiter = config.delimiter()?;

    if stdout && format == ExportFormat::Pdf {
        return Err(ReportError::InvalidSetting {
            key: "--stdout".to_string(),
            reason: "only csv exports can be written to stdout".to_string(),
        });
    }

    let dashboard = build_dashboard(cfg_dir, &config, dataset, filters, range)?;
    let row_count = dashboard.view(dataset).pagination_info().total_items;
    let today = Local::now().date_naive();
    let extension = match format {
        ExportFormat::Csv => "csv",
        ExportFormat::Pdf => "pdf",
    };
    let path = output.unwrap_or_else(|| {
        resolve_path(&config.export.output_dir, cfg_dir).join(export_file_name(
            dataset, today, extension,
        ))
    });

    match format {
        ExportFormat::Csv => {
            let text = dashboard.export_delimited(dataset, delimiter)?;
            if stdout {
                if !text.is_empty() {
                    println!("{text}");
                }
                return Ok(());
            }
            if text.is_empty() {
                println!("No rows to export; {} not written", path.display());
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&path, text)?;
            println!("Exported {} rows to {}", row_count, path.display());
        }
        ExportFormat::Pdf => {
            let printer = Printer::from_settings(&config.print);
            printer.check_available()?;
            dashboard.trigger_print_export(dataset, &printer, path.clone());
            printer.wait_all();

            if path.exists() {
                println!("Printed {} rows to {}", row_count, path.display());
            } else {
                eprintln!(
                    "Print export did not produce {}; rerun with -v for details",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "SLOT")]
    slot: String,
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "VALUES")]
    values: String,
}

/// List the filter slots of a report
fn cmd_filters(dataset: &str) -> Result<()> {
    let dataset: DatasetId = dataset.parse()?;
    let dashboard = Dashboard::new(1, TimeRange::default());

    let rows: Vec<SlotRow> = dashboard
        .view(dataset)
        .slots()
        .iter()
        .map(|spec| SlotRow {
            slot: spec.name.to_string(),
            field: spec.field.to_string(),
            values: match spec.kind {
                SlotKind::Text => "text (case-insensitive substring)".to_string(),
                SlotKind::Bucket(names) => format!("all, {}", names.join(", ")),
            },
        })
        .collect();

    println!("{} filters", dataset.title());
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!("Usage: opsreport show {dataset} --filter <slot>=<value>");

    Ok(())
}
