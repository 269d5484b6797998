use std::{
    fs::{self, File},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use anyhow::{bail, Result};
use chrono::Utc;
use itertools::Itertools;
use plotly::{
    box_plot::BoxPoints,
    common::{Font, Mode, Title},
    layout::{Axis, Legend},
    BoxPlot, Configuration, Layout, Plot, Scatter,
};
use rusqlite::Connection;

use crate::{
    assembly::{assemble_distribution, assemble_progression},
    config,
    data::{cell_display, AggregatedPoint, DistributionPoint, DistributionTable, ProgressionTable},
    defaults::{DEFAULT_POINT_JITTER, DEFAULT_TICK_ANGLE},
    stats::ReductionFunc,
};

/// Template settings given on the command line. Unset values fall back to
/// the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ReportTemplateConfig {
    pub title: Option<String>,
    pub template_path: Option<PathBuf>,
    pub custom_css_path: Option<PathBuf>,
}

/// Metadata for rendering report templates
struct ReportMetadata {
    title: String,
    custom_css: String,
    timestamp: String,
    database: String,
}

impl ReportMetadata {
    fn new(title: String, custom_css_content: String, database: &str) -> ReportMetadata {
        ReportMetadata {
            title,
            custom_css: custom_css_content,
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            database: database.to_string(),
        }
    }
}

/// Chart title of a distribution plot.
pub fn distribution_title(table: &str, metric: &str) -> String {
    format!("{}-{} per Commit Value", table, metric)
}

/// Chart title of a trend plot.
pub fn progression_title(table: &str, metric: &str, statistic: ReductionFunc) -> String {
    format!("{} ({})", distribution_title(table, metric), statistic)
}

/// Extract Plotly JavaScript dependencies and plot content
///
/// `plotly_head` loads plotly.js from the CDN, `plotly_body` is the inline
/// div and script of the plot itself.
fn extract_plotly_parts(plot: &Plot) -> (String, String) {
    let plotly_head = Plot::online_cdn_js();
    let plotly_body = plot.to_inline_html(None);
    (plotly_head, plotly_body)
}

/// Apply template with placeholder substitution
fn apply_template(template: &str, plot: &Plot, metadata: &ReportMetadata) -> Vec<u8> {
    let (plotly_head, plotly_body) = extract_plotly_parts(plot);

    let output = template
        .replace("{{TITLE}}", &metadata.title)
        .replace("{{PLOTLY_HEAD}}", &plotly_head)
        .replace("{{PLOTLY_BODY}}", &plotly_body)
        .replace("{{CUSTOM_CSS}}", &metadata.custom_css)
        .replace("{{TIMESTAMP}}", &metadata.timestamp)
        .replace("{{DATABASE}}", &metadata.database);

    output.into_bytes()
}

/// Load template from file or config, `None` selects the default template
fn load_template(template_path: Option<&PathBuf>) -> Result<Option<String>> {
    let template_path = match template_path.cloned().or_else(config::report_template_path) {
        Some(path) => path,
        None => return Ok(None),
    };

    if !template_path.exists() {
        bail!("Template file not found: {}", template_path.display());
    }

    let template_content = fs::read_to_string(&template_path).map_err(|e| {
        anyhow!(
            "Failed to read template file {}: {}",
            template_path.display(),
            e
        )
    })?;

    Ok(Some(template_content))
}

/// Load custom CSS content from file or config
fn load_custom_css(custom_css_path: Option<&PathBuf>) -> Result<String> {
    let css_path = match custom_css_path.cloned().or_else(config::report_custom_css_path) {
        Some(path) => path,
        None => return Ok(String::new()),
    };

    if !css_path.exists() {
        bail!("Custom CSS file not found: {}", css_path.display());
    }

    fs::read_to_string(&css_path).map_err(|e| {
        anyhow!(
            "Failed to read custom CSS file {}: {}",
            css_path.display(),
            e
        )
    })
}

/// Default HTML template used when no custom template is provided.
const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{TITLE}}</title>
    {{PLOTLY_HEAD}}
    <style>{{CUSTOM_CSS}}</style>
</head>
<body>
    {{PLOTLY_BODY}}
</body>
</html>"#;

/// Floats always carry at least one decimal place.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// CSV row representation of a plotted value.
/// Extra key-value pairs are appended after the fixed columns.
struct CsvRow {
    commit: String,
    date: String,
    measurement: String,
    value: f64,
    extras: Vec<(String, String)>,
}

impl CsvRow {
    fn from_distribution_point(
        metric: &str,
        context_columns: &[String],
        point: &DistributionPoint,
    ) -> Self {
        let extras = std::iter::once(("file".to_string(), point.source_file.clone()))
            .chain(
                context_columns
                    .iter()
                    .zip(&point.context)
                    .map(|(name, cell)| (name.clone(), cell_display(cell))),
            )
            .collect();
        CsvRow {
            commit: point.commit_value.clone(),
            date: point.date.to_string(),
            measurement: metric.to_string(),
            value: point.value,
            extras,
        }
    }

    fn from_aggregated_point(metric: &str, statistic: ReductionFunc, point: &AggregatedPoint) -> Self {
        CsvRow {
            commit: point.commit_value.clone(),
            date: point.date.to_string(),
            measurement: metric.to_string(),
            value: point.value,
            extras: vec![("statistic".to_string(), statistic.to_string())],
        }
    }

    /// Format as a tab-delimited line
    fn to_csv_line(&self) -> String {
        let mut line = format!(
            "{}\t{}\t{}\t{}",
            self.commit,
            self.date,
            self.measurement,
            format_value(self.value)
        );

        for (k, v) in &self.extras {
            line.push('\t');
            line.push_str(k);
            line.push('=');
            line.push_str(v);
        }

        line
    }
}

trait Reporter {
    fn add_distribution(&mut self, table: &DistributionTable);
    fn add_progression(&mut self, table: &ProgressionTable);
    /// Only meaningful for HTML output.
    fn set_template(&mut self, _template: Option<String>, _metadata: ReportMetadata) {}
    fn as_bytes(&self) -> Vec<u8>;
}

struct PlotlyReporter {
    plot: Plot,
    template: Option<String>,
    metadata: Option<ReportMetadata>,
}

impl PlotlyReporter {
    fn new() -> PlotlyReporter {
        let config = Configuration::default().responsive(true).fill_frame(false);
        let mut plot = Plot::new();
        plot.set_configuration(config);
        PlotlyReporter {
            plot,
            template: None,
            metadata: None,
        }
    }

    fn set_layout(&mut self, title: &str, metric: &str, x_axis: Axis) {
        let layout = Layout::new()
            .title(Title::from(title))
            .x_axis(x_axis.title(Title::from("Commit Value")))
            .y_axis(Axis::new().title(Title::from(metric)))
            .legend(Legend::new().orientation(plotly::common::Orientation::Horizontal));
        self.plot.set_layout(layout);
    }

    fn hover_text(table: &DistributionTable, point: &DistributionPoint) -> String {
        let mut text = format!(
            "{}: {}<br>File: {}<br>Date: {}<br>Row: {}",
            table.metric,
            format_value(point.value),
            point.source_file,
            point.date,
            point.row_id
        );
        for (name, cell) in table.context_columns.iter().zip(&point.context) {
            text.push_str(&format!("<br>{}: {}", name, cell_display(cell)));
        }
        text
    }
}

impl Reporter for PlotlyReporter {
    fn add_distribution(&mut self, table: &DistributionTable) {
        // One box per commit value, boxes ordered by the earliest date of
        // their commit
        let groups = table
            .points
            .iter()
            .into_group_map_by(|p| p.commit_value.as_str())
            .into_iter()
            .sorted_by(|(a_commit, a), (b_commit, b)| {
                let a_date = a.iter().map(|p| &p.date).min();
                let b_date = b.iter().map(|p| &p.date).min();
                a_date.cmp(&b_date).then_with(|| a_commit.cmp(b_commit))
            });

        for (commit_value, points) in groups {
            let x = vec![commit_value.to_string(); points.len()];
            let y = points.iter().map(|p| p.value).collect_vec();
            let hover_texts = points
                .iter()
                .map(|p| Self::hover_text(table, p))
                .collect_vec();

            let trace = BoxPlot::new_xy(x, y)
                .name(commit_value)
                .box_points(BoxPoints::All)
                .jitter(DEFAULT_POINT_JITTER)
                .hover_text_array(hover_texts)
                .show_legend(false);
            self.plot.add_trace(trace);
        }

        self.set_layout(
            &distribution_title(&table.table, &table.metric),
            &table.metric,
            Axis::new(),
        );
    }

    fn add_progression(&mut self, table: &ProgressionTable) {
        let (x, y): (Vec<usize>, Vec<f64>) = table
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.value))
            .unzip();
        let hover_texts = table
            .points
            .iter()
            .map(|p| {
                format!(
                    "{}: {}<br>{} of {}<br>Date: {}",
                    p.commit_value,
                    format_value(p.value),
                    table.statistic,
                    table.metric,
                    p.date
                )
            })
            .collect_vec();

        let trace = Scatter::new(x.clone(), y)
            .mode(Mode::LinesMarkers)
            .name(&table.statistic.to_string())
            .hover_text_array(hover_texts);
        self.plot.add_trace(trace);

        let x_axis = Axis::new()
            .tick_values(x.into_iter().map(|i| i as f64).collect())
            .tick_text(
                table
                    .points
                    .iter()
                    .map(|p| p.commit_value.clone())
                    .collect(),
            )
            .tick_angle(DEFAULT_TICK_ANGLE)
            .tick_font(Font::new().family("monospace"));
        self.set_layout(
            &progression_title(&table.table, &table.metric, table.statistic),
            &table.metric,
            x_axis,
        );
    }

    fn set_template(&mut self, template: Option<String>, metadata: ReportMetadata) {
        self.template = template;
        self.metadata = Some(metadata);
    }

    fn as_bytes(&self) -> Vec<u8> {
        let template = self.template.as_deref().unwrap_or(DEFAULT_HTML_TEMPLATE);

        let default_metadata = ReportMetadata {
            title: "Measurements per Commit Value".to_string(),
            custom_css: String::new(),
            timestamp: String::new(),
            database: String::new(),
        };
        let metadata = self.metadata.as_ref().unwrap_or(&default_metadata);

        apply_template(template, &self.plot, metadata)
    }
}

struct CsvReporter {
    rows: Vec<CsvRow>,
}

impl CsvReporter {
    fn new() -> Self {
        CsvReporter { rows: Vec::new() }
    }
}

impl Reporter for CsvReporter {
    fn add_distribution(&mut self, table: &DistributionTable) {
        self.rows.extend(table.points.iter().map(|p| {
            CsvRow::from_distribution_point(&table.metric, &table.context_columns, p)
        }));
    }

    fn add_progression(&mut self, table: &ProgressionTable) {
        self.rows.extend(
            table
                .points
                .iter()
                .map(|p| CsvRow::from_aggregated_point(&table.metric, table.statistic, p)),
        );
    }

    fn as_bytes(&self) -> Vec<u8> {
        if self.rows.is_empty() {
            return Vec::new();
        }

        let mut lines = vec!["commit\tdate\tmeasurement\tvalue".to_string()];
        lines.extend(self.rows.iter().map(CsvRow::to_csv_line));

        let mut output = lines.join("\n");
        output.push('\n');
        output.into_bytes()
    }
}

struct ReporterFactory {}

impl ReporterFactory {
    fn from_file_name(path: &Path) -> Option<Box<dyn Reporter>> {
        if path == Path::new("-") {
            return Some(Box::new(CsvReporter::new()) as Box<dyn Reporter>);
        }
        let extension = path.extension()?.to_ascii_lowercase();
        match extension.to_str()? {
            "html" => Some(Box::new(PlotlyReporter::new()) as Box<dyn Reporter>),
            "csv" => Some(Box::new(CsvReporter::new()) as Box<dyn Reporter>),
            _ => None,
        }
    }
}

fn is_html(output: &Path) -> bool {
    output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

fn prepare_reporter(
    output: &Path,
    template_config: &ReportTemplateConfig,
    default_title: String,
    database: &str,
) -> Result<Box<dyn Reporter>> {
    let mut reporter =
        ReporterFactory::from_file_name(output).ok_or(anyhow!("Could not infer output format"))?;

    if is_html(output) {
        let template = load_template(template_config.template_path.as_ref())?;
        // CLI > config > chart title
        let title = template_config
            .title
            .clone()
            .or_else(config::report_title)
            .unwrap_or(default_title);
        let custom_css = load_custom_css(template_config.custom_css_path.as_ref())?;
        reporter.set_template(template, ReportMetadata::new(title, custom_css, database));
    }

    Ok(reporter)
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if output == Path::new("-") {
        match io::stdout().write_all(bytes) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            res => res,
        }?;
    } else {
        File::create(output)?.write_all(bytes)?;
        log::info!("Wrote {}", output.display());
    }
    Ok(())
}

/// Renders the distribution plot of `table.metric` into `output`.
pub fn report_distribution(
    conn: &Connection,
    table: &str,
    metric: &str,
    output: &Path,
    template_config: &ReportTemplateConfig,
    database: &str,
) -> Result<()> {
    let mut reporter = prepare_reporter(
        output,
        template_config,
        distribution_title(table, metric),
        database,
    )?;

    let distribution = assemble_distribution(conn, table, metric)?;
    if distribution.points.is_empty() {
        log::warn!("No values in {}.{}", table, metric);
    }
    reporter.add_distribution(&distribution);

    write_output(output, &reporter.as_bytes())
}

/// Renders the trend plot of `table.metric` between two commits into `output`.
#[allow(clippy::too_many_arguments)]
pub fn report_progression(
    conn: &Connection,
    table: &str,
    metric: &str,
    statistic: ReductionFunc,
    start_commit: &str,
    end_commit: &str,
    output: &Path,
    template_config: &ReportTemplateConfig,
    database: &str,
) -> Result<()> {
    let mut reporter = prepare_reporter(
        output,
        template_config,
        progression_title(table, metric, statistic),
        database,
    )?;

    let progression =
        assemble_progression(conn, table, metric, statistic, start_commit, end_commit)?;
    if progression.points.is_empty() {
        log::warn!(
            "No {} values between {} and {}",
            metric,
            start_commit,
            end_commit
        );
    }
    reporter.add_progression(&progression);

    write_output(output, &reporter.as_bytes())
}
