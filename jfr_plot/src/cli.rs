use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::Level;
use rusqlite::Connection;

use crate::config;
use crate::defaults::DATABASE_EXTENSION;
use crate::error::PipelineError;
use crate::filter::filter_names;
use crate::reporting::{report_distribution, report_progression, ReportTemplateConfig};
use crate::store::store_interop::{list_metric_columns, list_tables, open_read_only, MeasurementTable};
use crate::summary::summarize_commits;
use jfr_plot_cli_types::{Cli, CliReportTemplate, Commands};

/// Exit status for requests rejected by validation.
pub const EXIT_RECOVERABLE: u8 = 2;
/// Exit status for everything else.
pub const EXIT_FATAL: u8 = 1;

pub fn handle_calls() -> Result<()> {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(cli, &mut out) {
        Err(e) if is_broken_pipe(&e) => Ok(()),
        res => res,
    }
}

fn is_broken_pipe(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|io| io.kind() == io::ErrorKind::BrokenPipe)
}

/// Maps a failed run to the process exit status.
pub fn exit_code_for(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<PipelineError>() {
        Some(pipeline) if pipeline.is_recoverable() => EXIT_RECOVERABLE,
        _ => EXIT_FATAL,
    }
}

/// A path to an existing file is used as is, anything else names a database
/// `<name>.db` inside `directory`.
pub fn resolve_database_path(database: &str, directory: &Path) -> PathBuf {
    let path = Path::new(database);
    if path.is_file() {
        return path.to_path_buf();
    }
    directory.join(format!("{}.{}", database, DATABASE_EXTENSION))
}

fn open_database(database: Option<&str>) -> Result<(Connection, String)> {
    let Some(database) = database else {
        bail!("No database given. Pass --database with a database name or path.");
    };

    let path = resolve_database_path(database, &config::database_directory());
    if !path.is_file() {
        bail!("Database not found: {}", path.display());
    }
    let conn = open_read_only(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok((conn, database.to_string()))
}

fn template_config(template: CliReportTemplate) -> ReportTemplateConfig {
    ReportTemplateConfig {
        title: template.title,
        template_path: template.template,
        custom_css_path: template.custom_css,
    }
}

/// Executes one parsed command line, writing listings to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    if !cli.command.requires_database() {
        return show_config_info(out);
    }

    // One connection for the whole process, closed when dropped
    let (conn, database) = open_database(cli.database.as_deref())?;

    match cli.command {
        Commands::Tables { filter } => {
            for table in filter_names(list_tables(&conn)?, &filter)? {
                writeln!(out, "{}", table)?;
            }
        }
        Commands::Columns { table } => {
            for column in list_metric_columns(&conn, &table)? {
                writeln!(out, "{}", column)?;
            }
        }
        Commands::Commits { table } => {
            let table = MeasurementTable::open(&conn, &table)?;
            for (commit, date) in table.list_commits()? {
                writeln!(out, "{}\t{}", commit, date)?;
            }
        }
        Commands::Distribution {
            selection,
            output,
            template,
        } => report_distribution(
            &conn,
            &selection.table,
            &selection.column,
            &output,
            &template_config(template),
            &database,
        )?,
        Commands::Progression {
            selection,
            start_commit,
            end_commit,
            statistic,
            output,
            template,
        } => {
            let statistic =
                statistic.unwrap_or_else(|| config::progression_statistic(&selection.table));
            report_progression(
                &conn,
                &selection.table,
                &selection.column,
                statistic,
                &start_commit,
                &end_commit,
                &output,
                &template_config(template),
                &database,
            )?
        }
        Commands::Statistics { selection } => {
            let report = summarize_commits(&conn, &selection.table, &selection.column)?;
            writeln!(out, "{}", report.to_json()?)?;
        }
        Commands::Config {} => show_config_info(out)?,
    }

    Ok(())
}

/// Show configuration information including config paths and resolved values
fn show_config_info(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "jfr-plot Configuration Information")?;
    writeln!(out, "==================================")?;

    match config::system_config_path() {
        Some(path) if path.is_file() => {
            writeln!(out, "User config file: {} (exists)", path.display())?
        }
        Some(path) => writeln!(out, "User config file: {} (not found)", path.display())?,
        None => writeln!(out, "User config file: unknown home directory")?,
    }
    match config::find_local_config() {
        Some(path) => writeln!(out, "Local config file: {}", path.display())?,
        None => writeln!(
            out,
            "Local config file: no {} found",
            config::LOCAL_CONFIG_FILE_NAME
        )?,
    }

    match config::read_hierarchical_config() {
        Ok(_) => {
            writeln!(out, "\nConfiguration loaded successfully")?;
            writeln!(
                out,
                "  Database directory: {}",
                config::database_directory().display()
            )?;
            writeln!(
                out,
                "  Default statistic: {}",
                config::progression_statistic("")
            )?;
            if let Some(title) = config::report_title() {
                writeln!(out, "  Report title: {}", title)?;
            }
            if let Some(template) = config::report_template_path() {
                writeln!(out, "  Report template: {}", template.display())?;
            }
            if let Some(css) = config::report_custom_css_path() {
                writeln!(out, "  Report custom CSS: {}", css.display())?;
            }
        }
        Err(e) => {
            writeln!(out, "\nConfiguration: Error loading - {}", e)?;
        }
    }

    Ok(())
}
