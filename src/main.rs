use clap::{Parser, ValueEnum};
use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ifc_workbench::export::{export_csv, CsvOptions};
use ifc_workbench::session::Session;
use ifc_workbench::tree::{CustomField, TreeKind};
use ifc_workbench::ui::{AfterLoad, App};
use ifc_workbench::validation::{ReportFormat, Validator, INTEGRITY_ID};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TreeArg {
    Location,
    Class,
    Flat,
    Custom,
}

impl From<TreeArg> for TreeKind {
    fn from(arg: TreeArg) -> Self {
        match arg {
            TreeArg::Location => TreeKind::Location,
            TreeArg::Class => TreeKind::Class,
            TreeArg::Flat => TreeKind::Flat,
            TreeArg::Custom => TreeKind::Custom,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ifc-workbench")]
#[command(about = "IFC Workbench - browse, compare and validate several IFC files of one project")]
#[command(version)]
struct Args {
    /// IFC files of one project
    files: Vec<PathBuf>,

    /// IDS rule document (repeatable)
    #[arg(long, value_name = "FILE")]
    ids: Vec<PathBuf>,

    /// Run every validator after loading
    #[arg(long)]
    validate: bool,

    /// Grouping of the custom tree: class, object-type, file, container, pset:<Set>:<Prop>
    #[arg(long, value_name = "FIELD,...", value_delimiter = ',')]
    custom_tree: Vec<CustomField>,

    /// Property or quantity columns as Set:Member
    #[arg(long, value_name = "SET:MEMBER,...", value_delimiter = ',')]
    columns: Vec<String>,

    /// Export a tree to CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Tree exported with --csv
    #[arg(long, value_enum, default_value = "location")]
    tree: TreeArg,

    /// CSV field separator
    #[arg(long, default_value = ";")]
    separator: char,

    /// Prepend the hierarchy level to each CSV row
    #[arg(long)]
    with_level: bool,

    /// Export validation results to JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Export failed checks as a BCF bundle
    #[arg(long, value_name = "FILE")]
    bcf: Option<PathBuf>,

    /// Validator whose results are exported (defaults to the integrity check)
    #[arg(long, value_name = "ID")]
    validator: Option<String>,

    /// File whose rule results are exported
    #[arg(long, value_name = "NAME")]
    file: Option<String>,

    /// Write logs to this file while the browser runs
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn headless(&self) -> bool {
        self.csv.is_some() || self.json.is_some() || self.bcf.is_some()
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("ifc_workbench=debug")
    } else {
        EnvFilter::new("ifc_workbench=info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true);

    if args.headless() {
        builder.with_writer(std::io::stderr).init();
    } else if let Some(path) = &args.log_file {
        // The terminal belongs to the browser
        let file = File::create(path)?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    Ok(())
}

fn parse_columns(columns: &[String]) -> Result<Vec<(String, String)>> {
    columns
        .iter()
        .map(|column| {
            column
                .split_once(':')
                .filter(|(set, member)| !set.is_empty() && !member.is_empty())
                .map(|(set, member)| (set.to_string(), member.to_string()))
                .ok_or_else(|| eyre!("column '{column}' is not Set:Member"))
        })
        .collect()
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(&args)?;
    debug!(verbose = args.verbose, "logging initialized");

    let columns = parse_columns(&args.columns)?;
    let mut session = if args.custom_tree.is_empty() {
        Session::default()
    } else {
        Session::new(args.custom_tree.clone())
    };

    for path in &args.ids {
        session.validation_mut().add_ids_file(path)?;
    }

    if !args.headless() {
        session.start_load(args.files.clone());
        let app = App::new(session).with_after_load(AfterLoad {
            columns,
            validate: args.validate,
        });
        let terminal = ratatui::init();
        let result = app.run(terminal);
        ratatui::restore();
        return result;
    }

    let summary = session.add_files(&args.files);
    info!("{}", summary.message());
    if session.registry().is_empty() {
        bail!("no IFC file could be loaded");
    }

    if !columns.is_empty() {
        let resolved = columns
            .iter()
            .map(|(set, member)| session.resolve_column(set, member))
            .collect();
        session.set_columns(resolved);
    }

    let wants_report = args.json.is_some() || args.bcf.is_some();
    if args.validate || wants_report {
        let ran = session.validate(None);
        info!(validators = ran, "validation finished");
    }

    if let Some(csv_path) = &args.csv {
        if !args.separator.is_ascii() {
            bail!("separator must be a single ASCII character");
        }
        let options = CsvOptions {
            separator: args.separator as u8,
            header: true,
            level: args.with_level,
        };
        let kind = TreeKind::from(args.tree);
        export_csv(session.tree(kind), &session.cell_context(), options, None, csv_path)?;
        println!("Exported {kind} tree to CSV: {}", csv_path.display());
    }

    if wants_report {
        let validator = args.validator.as_deref().unwrap_or(INTEGRITY_ID);
        let filename = match (session.validation().validator(validator), &args.file) {
            (None, _) => bail!("unknown validator '{validator}'"),
            (Some(Validator::Ids(_)), None) if session.registry().count() == 1 => session
                .registry()
                .filenames()
                .first()
                .map(|name| (*name).to_string()),
            (Some(Validator::Ids(_)), None) => bail!("--file is required with several files open"),
            (Some(_), file) => file.clone(),
        };

        for (path, format) in [(&args.json, ReportFormat::Json), (&args.bcf, ReportFormat::Bcf)] {
            if let Some(path) = path {
                session
                    .validation()
                    .save_results(validator, filename.as_deref(), path, format)?;
                println!("Exported {validator} results to {}", path.display());
            }
        }
    }

    Ok(())
}
