use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use delinquency::annotation::{AnnotatedRow, Annotation, AnnotationStore};
use delinquency::auth::RoleCheck;
use delinquency::config::{config_dir, load_config, Config, Settings, CONFIG_TEMPLATE};
use delinquency::data::{export_records, normalize_code, AccountState, Dataset, Loader};
use delinquency::error::{DelinquencyError, Result};
use delinquency::format::MoneyFormat;
use delinquency::report::{
    Dashboard, Filter, RankedTable, ReferenceTotals, ReportContext, ReportVariant, Rollup,
    SummaryRow, Windows,
};

#[derive(Parser)]
#[command(name = "delinquency")]
#[command(version, about = "Billing delinquency reports for hospital accounts", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir for "delinquency")
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// User name for the role check
    #[arg(long, env = "DELINQUENCY_USER", global = true)]
    user: Option<String>,

    /// Access token for the role check
    #[arg(long, env = "DELINQUENCY_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Only attendances in this year
    #[arg(long)]
    year: Option<i32>,

    /// Only this company code
    #[arg(long)]
    company: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Filter {
        Filter::new(self.year, self.company.as_deref().map(normalize_code))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Closed,
    Open,
}

impl From<StateArg> for AccountState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Closed => AccountState::Closed,
            StateArg::Open => AccountState::Open,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    RecentClosed,
    AgedClosed,
    RecentOpen,
    AgedOpen,
}

impl From<VariantArg> for ReportVariant {
    fn from(variant: VariantArg) -> Self {
        match variant {
            VariantArg::RecentClosed => ReportVariant::RecentClosed,
            VariantArg::AgedClosed => ReportVariant::AgedClosed,
            VariantArg::RecentOpen => ReportVariant::RecentOpen,
            VariantArg::AgedOpen => ReportVariant::AgedOpen,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template and data folders
    Init,

    /// Show configuration, data files and available filters
    Status,

    /// Outstanding amount per year, open vs closed accounts
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Last-12-months breakdown by month and attendance type
    Monthly {
        /// Account state to report on
        #[arg(long, value_enum)]
        state: StateArg,

        #[command(flatten)]
        filter: FilterArgs,

        /// Reference date (YYYY-MM-DD, default: latest attendance)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Breakdown by year and attendance type with extra charges
    Annual {
        /// Account state to report on
        #[arg(long, value_enum)]
        state: StateArg,

        /// Only this company code
        #[arg(long)]
        company: Option<String>,
    },

    /// Ranked top offenders with case notes
    Top {
        #[arg(value_enum)]
        variant: VariantArg,

        #[command(flatten)]
        filter: FilterArgs,

        /// Reference date (YYYY-MM-DD, default: latest attendance)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Record the cause and/or status for a ranked patient
    Annotate {
        #[arg(value_enum)]
        variant: VariantArg,

        /// Patient id as listed by 'top'
        patient: String,

        /// Why the balance is outstanding
        #[arg(long)]
        cause: Option<String>,

        /// Current collection status
        #[arg(long)]
        status: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Reference date (YYYY-MM-DD, default: latest attendance)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Show stored case notes for a table
    Notes {
        #[arg(value_enum)]
        variant: VariantArg,
    },

    /// Every section for one filter selection
    Dashboard {
        #[command(flatten)]
        filter: FilterArgs,

        /// Reference date (YYYY-MM-DD, default: latest attendance)
        #[arg(long)]
        as_of: Option<String>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Write the filtered detail records to a CSV file
    Export {
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        command => {
            let session = Session::open(&cfg_dir)?;
            session.authorize(cli.user.as_deref(), cli.token.as_deref())?;
            dispatch(&session, command)
        }
    }
}

fn dispatch(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Init => cmd_init(&session.cfg_dir),
        Commands::Status => cmd_status(session),
        Commands::Summary { filter } => cmd_summary(session, &filter),
        Commands::Monthly {
            state,
            filter,
            as_of,
        } => cmd_monthly(session, state.into(), &filter, as_of.as_deref()),
        Commands::Annual { state, company } => {
            let filter = FilterArgs {
                year: None,
                company,
            };
            cmd_annual(session, state.into(), &filter)
        }
        Commands::Top {
            variant,
            filter,
            as_of,
        } => cmd_top(session, variant.into(), &filter, as_of.as_deref()),
        Commands::Annotate {
            variant,
            patient,
            cause,
            status,
            filter,
            as_of,
        } => cmd_annotate(
            session,
            variant.into(),
            &patient,
            cause,
            status,
            &filter,
            as_of.as_deref(),
        ),
        Commands::Notes { variant } => cmd_notes(session, variant.into()),
        Commands::Dashboard {
            filter,
            as_of,
            json,
        } => cmd_dashboard(session, &filter, as_of.as_deref(), json),
        Commands::Export { output, filter } => cmd_export(session, &output, &filter),
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .init();
}

/// Loaded configuration for every command except `init`
struct Session {
    cfg_dir: PathBuf,
    config: Config,
    settings: Settings,
    money: MoneyFormat,
}

impl Session {
    fn open(cfg_dir: &Path) -> Result<Self> {
        if !cfg_dir.exists() {
            return Err(DelinquencyError::ConfigNotFound(cfg_dir.to_path_buf()));
        }
        let config = load_config(cfg_dir)?;
        let settings = Settings::from_config(&config, cfg_dir)?;
        let money = MoneyFormat::from(&config.display);
        Ok(Self {
            cfg_dir: cfg_dir.to_path_buf(),
            config,
            settings,
            money,
        })
    }

    fn authorize(&self, user: Option<&str>, token: Option<&str>) -> Result<()> {
        match &self.config.auth {
            Some(auth) => RoleCheck::new(auth).verify(user, token),
            None => Ok(()),
        }
    }

    fn loader(&self) -> Loader<'_> {
        Loader::new(&self.settings)
    }

    fn store(&self) -> AnnotationStore {
        AnnotationStore::new(&self.settings)
    }

    fn load(&self) -> Result<(Dataset, ReferenceTotals)> {
        let loader = self.loader();
        let dataset = loader.load_detail()?;
        let totals = ReferenceTotals::load(&loader);
        Ok((dataset, totals))
    }
}

/// A reference date must parse and leave room for the aged window before it
fn parse_as_of(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .ok()
                .filter(|date| Windows::new(*date).is_some())
                .ok_or_else(|| DelinquencyError::InvalidDate(v.to_string()))
        })
        .transpose()
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(DelinquencyError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir.join("data").join("annotations"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized delinquency config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Review the settings:        $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Drop the extracts into:     {}/data/",
        cfg_dir.display()
    );
    println!();
    println!("Then look at the numbers:");
    println!("  delinquency dashboard");

    Ok(())
}

/// Show config, data files and filter options
fn cmd_status(session: &Session) -> Result<()> {
    let settings = &session.settings;
    let loader = session.loader();

    println!("Delinquency Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", session.cfg_dir.display());
    println!("Data directory:   {}", settings.data_dir.display());
    println!(
        "Auth:             {}",
        if session.config.auth.is_some() { "enabled" } else { "disabled" }
    );

    match loader.find_totals_file() {
        Some(path) => println!("Totals file:      {}", path.display()),
        None => println!("Totals file:      not found ({})", settings.totals_file),
    }

    let dataset = match loader.load_detail() {
        Ok(dataset) => dataset,
        Err(DelinquencyError::DetailFileNotFound(_)) => {
            println!("Detail file:      not found");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("Detail file:      {}", dataset.source.display());
    println!("Records:          {}", dataset.records.len());
    if dataset.dropped_rows > 0 {
        println!("Skipped rows:     {}", dataset.dropped_rows);
    }
    if let Some((first, last)) = dataset.date_range() {
        println!(
            "Attendances:      {} to {}",
            first.format("%d/%m/%Y"),
            last.format("%d/%m/%Y")
        );
    }
    let years: Vec<String> = dataset.years().iter().map(|y| y.to_string()).collect();
    println!("Years:            {}", years.join(", "));
    println!("Companies:        {}", dataset.companies().join(", "));

    let missing = dataset.columns.missing();
    if !missing.is_empty() {
        println!("Missing columns:  {}", missing.join(", "));
    }

    let store = session.store();
    println!();
    println!("Case notes:");
    for variant in ReportVariant::ALL {
        let notes = store.load(variant).iter().filter(|n| !n.is_blank()).count();
        println!("  {:<14} {}", variant.slug(), notes);
    }

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "YEAR")]
    year: String,
    #[tabled(rename = "OPEN")]
    open: String,
    #[tabled(rename = "CLOSED")]
    closed: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

#[derive(Tabled)]
struct TopRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "PATIENT")]
    patient: String,
    #[tabled(rename = "OUTSTANDING")]
    outstanding: String,
    #[tabled(rename = "TYPE")]
    attendance_type: String,
    #[tabled(rename = "LAST ATTENDANCE")]
    date: String,
    #[tabled(rename = "RECORD")]
    record_type: String,
    #[tabled(rename = "CAUSE")]
    cause: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct PeriodRow {
    #[tabled(rename = "PERIOD")]
    period: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "ACCOUNTS")]
    count: usize,
    #[tabled(rename = "% BILLED")]
    amount_pct: String,
    #[tabled(rename = "% ACCOUNTS")]
    count_pct: String,
    #[tabled(rename = "EXTRA")]
    extra: String,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "PERIOD")]
    period: String,
    #[tabled(rename = "TYPE")]
    attendance_type: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "ACCOUNTS")]
    count: usize,
}

#[derive(Tabled)]
struct NoteRow {
    #[tabled(rename = "PATIENT")]
    patient: String,
    #[tabled(rename = "MONTH")]
    month: String,
    #[tabled(rename = "CAUSE")]
    cause: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

fn print_summary(rows: &[SummaryRow], money: &MoneyFormat) {
    let rows: Vec<SummaryTableRow> = rows
        .iter()
        .map(|row| SummaryTableRow {
            year: row.label.clone(),
            open: money.money(row.open),
            closed: money.money(row.closed),
            total: money.money(row.total),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_rollup(title: &str, rollup: &Rollup, money: &MoneyFormat) {
    println!("{title}");
    if rollup.is_empty() {
        println!("  No records in this period.");
        return;
    }

    let pct = |value: f64| {
        if rollup.has_reference {
            money.percent(value)
        } else {
            "-".to_string()
        }
    };

    let mut rows: Vec<PeriodRow> = rollup
        .periods
        .iter()
        .map(|p| PeriodRow {
            period: p.period.clone(),
            amount: money.money(p.amount),
            count: p.count,
            amount_pct: pct(p.amount_pct),
            count_pct: pct(p.count_pct),
            extra: p
                .extra
                .as_ref()
                .map(|e| format!("{} ({})", money.abbreviate(e.amount), money.percent(e.amount_pct)))
                .unwrap_or_default(),
        })
        .collect();
    rows.push(PeriodRow {
        period: "Total".to_string(),
        amount: money.money(rollup.total_amount),
        count: rollup.total_count,
        amount_pct: pct(rollup.amount_pct),
        count_pct: pct(rollup.count_pct),
        extra: String::new(),
    });
    println!("{}", Table::new(rows).with(Style::rounded()));

    let by_type: Vec<String> = rollup
        .by_type
        .iter()
        .map(|t| format!("{} {} ({})", t.attendance_type, money.abbreviate(t.amount), t.count))
        .collect();
    println!("By type: {}", by_type.join(", "));

    let buckets: Vec<BucketRow> = rollup
        .buckets
        .iter()
        .map(|b| BucketRow {
            period: b.period.clone(),
            attendance_type: b.attendance_type.clone(),
            amount: money.abbreviate(b.amount),
            count: b.count,
        })
        .collect();
    println!("{}", Table::new(buckets).with(Style::rounded()));
}

/// Log and show what the extract could not provide for this report
fn print_warnings(ctx: &ReportContext) {
    for warning in ctx.warnings() {
        warn!("{warning}");
        println!("Warning: {warning}");
    }
}

fn print_ranked(table: &RankedTable, money: &MoneyFormat) {
    println!("{}", table.title);
    if table.rows.is_empty() {
        println!("  No patients in this table.");
        return;
    }
    let rows: Vec<TopRow> = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, r)| TopRow {
            index: idx + 1,
            patient: r.row.patient_id.clone(),
            outstanding: money.money(r.row.outstanding),
            attendance_type: r.row.attendance_type.clone(),
            date: r.row.attendance_date.format("%d/%m/%Y").to_string(),
            record_type: r.row.record_type.clone(),
            cause: r.cause.clone(),
            status: r.status.clone(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Per-year open/closed summary
fn cmd_summary(session: &Session, filter: &FilterArgs) -> Result<()> {
    let (dataset, totals) = session.load()?;
    let ctx = ReportContext::new(&dataset, &totals, &session.settings).with_filter(filter.to_filter());
    print_warnings(&ctx);
    ctx.require_state()?;

    let rows = ctx.summary();
    if rows.is_empty() {
        warn!("{}", DelinquencyError::NoRecords);
        println!("No records found for the selected filters.");
        return Ok(());
    }
    print_summary(&rows, &session.money);
    Ok(())
}

fn cmd_monthly(
    session: &Session,
    state: AccountState,
    filter: &FilterArgs,
    as_of: Option<&str>,
) -> Result<()> {
    let as_of = parse_as_of(as_of)?;
    let (dataset, totals) = session.load()?;
    let ctx = ReportContext::new(&dataset, &totals, &session.settings)
        .with_filter(filter.to_filter())
        .with_as_of(as_of);
    print_warnings(&ctx);
    ctx.require_state()?;

    let title = format!("Outstanding {state} accounts, last 12 months");
    print_rollup(&title, &ctx.monthly(state), &session.money);
    Ok(())
}

fn cmd_annual(session: &Session, state: AccountState, filter: &FilterArgs) -> Result<()> {
    let (dataset, totals) = session.load()?;
    let ctx = ReportContext::new(&dataset, &totals, &session.settings).with_filter(filter.to_filter());
    print_warnings(&ctx);
    ctx.require_state()?;

    let title = format!("Outstanding {state} accounts by year");
    print_rollup(&title, &ctx.annual(state), &session.money);
    Ok(())
}

fn cmd_top(
    session: &Session,
    variant: ReportVariant,
    filter: &FilterArgs,
    as_of: Option<&str>,
) -> Result<()> {
    let as_of = parse_as_of(as_of)?;
    let (dataset, totals) = session.load()?;
    let ctx = ReportContext::new(&dataset, &totals, &session.settings)
        .with_filter(filter.to_filter())
        .with_as_of(as_of);
    print_warnings(&ctx);
    ctx.require_state()?;

    print_ranked(&ctx.top_table(variant, &session.store()), &session.money);
    Ok(())
}

/// Edit the note on one ranked row, then rewrite that table's note file
fn cmd_annotate(
    session: &Session,
    variant: ReportVariant,
    patient: &str,
    cause: Option<String>,
    status: Option<String>,
    filter: &FilterArgs,
    as_of: Option<&str>,
) -> Result<()> {
    if cause.is_none() && status.is_none() {
        return Err(DelinquencyError::NothingToAnnotate);
    }
    let as_of = parse_as_of(as_of)?;
    let (dataset, totals) = session.load()?;
    let ctx = ReportContext::new(&dataset, &totals, &session.settings)
        .with_filter(filter.to_filter())
        .with_as_of(as_of);
    print_warnings(&ctx);
    ctx.require_state()?;

    let store = session.store();
    let mut table = ctx.top_table(variant, &store);
    let patient = normalize_code(patient);
    let row = table
        .rows
        .iter_mut()
        .find(|r| r.row.patient_id == patient)
        .ok_or_else(|| DelinquencyError::PatientNotRanked {
            patient: patient.clone(),
            variant: variant.to_string(),
        })?;

    if let Some(cause) = cause {
        row.cause = cause;
    }
    if let Some(status) = status {
        row.status = status;
    }

    let notes: Vec<Annotation> = table.rows.iter().map(AnnotatedRow::to_annotation).collect();
    let path = store.save(variant, &notes)?;

    println!("Saved note for patient {patient} in {variant}");
    println!("  File: {}", path.display());
    Ok(())
}

fn cmd_notes(session: &Session, variant: ReportVariant) -> Result<()> {
    let notes: Vec<Annotation> = session
        .store()
        .load(variant)
        .into_iter()
        .filter(|n| !n.is_blank())
        .collect();

    if notes.is_empty() {
        println!("No case notes stored for {variant}.");
        return Ok(());
    }

    let rows: Vec<NoteRow> = notes
        .into_iter()
        .map(|n| NoteRow {
            patient: n.patient_id,
            month: n.attendance_month.unwrap_or_default(),
            cause: n.cause,
            status: n.status,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn cmd_dashboard(
    session: &Session,
    filter: &FilterArgs,
    as_of: Option<&str>,
    json: bool,
) -> Result<()> {
    let as_of = parse_as_of(as_of)?;
    let (dataset, totals) = session.load()?;
    let ctx = ReportContext::new(&dataset, &totals, &session.settings)
        .with_filter(filter.to_filter())
        .with_as_of(as_of);
    let dashboard = Dashboard::build(&ctx, &session.store());

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    let money = &session.money;
    for notice in &dashboard.notices {
        println!("Note: {notice}");
    }
    for warning in &dashboard.warnings {
        println!("Warning: {warning}");
    }
    if let Some(windows) = &dashboard.windows {
        println!(
            "Reference date {} (last 12 months from {})",
            windows.reference.format("%d/%m/%Y"),
            windows.cutoff.format("%d/%m/%Y")
        );
    }
    println!();

    if !dashboard.summary.is_empty() {
        println!("Outstanding by year");
        print_summary(&dashboard.summary, money);
        println!();
    }

    for section in [&dashboard.closed, &dashboard.open].into_iter().flatten() {
        let state = section.state;
        print_rollup(&format!("Outstanding {state} accounts, last 12 months"), &section.monthly, money);
        println!();
        print_rollup(&format!("Outstanding {state} accounts by year"), &section.annual, money);
        println!();
        print_ranked(&section.recent, money);
        println!();
        print_ranked(&section.aged, money);
        println!();
    }

    Ok(())
}

fn cmd_export(session: &Session, output: &Path, filter: &FilterArgs) -> Result<()> {
    let dataset = session.loader().load_detail()?;
    let records = filter.to_filter().apply(&dataset.records);
    if records.is_empty() {
        return Err(DelinquencyError::NoRecords);
    }

    let written = export_records(&records, output)?;
    println!("Exported {} records to {}", written, output.display());
    Ok(())
}
