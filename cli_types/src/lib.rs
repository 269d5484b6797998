use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReductionFunc {
    Min,
    Max,
    Median,
    Mean,
}

impl FromStr for ReductionFunc {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(ReductionFunc::Min),
            "max" => Ok(ReductionFunc::Max),
            "median" => Ok(ReductionFunc::Median),
            "mean" => Ok(ReductionFunc::Mean),
            _ => Err(anyhow!(
                "Invalid statistic: {}. Valid values are 'mean', 'median', 'min' or 'max'",
                s
            )),
        }
    }
}

impl Display for ReductionFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReductionFunc::Min => "min",
            ReductionFunc::Max => "max",
            ReductionFunc::Median => "median",
            ReductionFunc::Mean => "mean",
        };
        f.write_str(name)
    }
}

#[derive(Parser)]
#[command(version, name = "jfr-plot")]
pub struct Cli {
    /// Increase verbosity level (can be specified multiple times.) The first level sets level
    /// "info", second sets level "debug", and third sets level "trace" for the logger.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Database to open. Either a path to an existing SQLite file or the name
    /// of a database `<name>.db` inside the configured database directory.
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct CliSelection {
    /// Name of the measurement table
    #[arg(value_parser=parse_spaceless_string)]
    pub table: String,

    /// Name of the metric column to plot
    #[arg(value_parser=parse_spaceless_string)]
    pub column: String,
}

#[derive(Args, Default)]
pub struct CliReportTemplate {
    /// Title of the generated HTML page
    #[arg(long)]
    pub title: Option<String>,

    /// HTML template with placeholders such as `{{PLOTLY_BODY}}`
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// CSS file whose content replaces `{{CUSTOM_CSS}}` in the template
    #[arg(long)]
    pub custom_css: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the measurement tables of the database
    Tables {
        /// Only list tables whose name matches any of these regular expressions
        #[arg(short, long)]
        filter: Vec<String>,
    },

    /// List the metric columns of a table
    Columns {
        #[arg(value_parser=parse_spaceless_string)]
        table: String,
    },

    /// List the commit values of a table in chronological order
    Commits {
        #[arg(value_parser=parse_spaceless_string)]
        table: String,
    },

    /// Plot every measurement of a metric column per commit value
    Distribution {
        #[command(flatten)]
        selection: CliSelection,

        /// Output file. `.html` renders a chart, `.csv` or `-` (stdout) a table
        #[arg(short, long, default_value = "distribution.html")]
        output: PathBuf,

        #[command(flatten)]
        template: CliReportTemplate,
    },

    /// Plot a statistic of a metric column per commit value and date, for
    /// all commits dated between the start and the end commit.
    ///
    /// The start commit must not be dated after the end commit.
    Progression {
        #[command(flatten)]
        selection: CliSelection,

        /// First commit value of the range
        start_commit: String,

        /// Last commit value of the range
        end_commit: String,

        /// Statistic to reduce each (commit, date) group with. Defaults to the
        /// configured statistic, or mean.
        #[arg(short, long)]
        statistic: Option<ReductionFunc>,

        /// Output file. `.html` renders a chart, `.csv` or `-` (stdout) a table
        #[arg(short, long, default_value = "progression.html")]
        output: PathBuf,

        #[command(flatten)]
        template: CliReportTemplate,
    },

    /// Print descriptive statistics of a metric column per commit value as JSON
    Statistics {
        #[command(flatten)]
        selection: CliSelection,
    },

    /// Show the resolved configuration
    Config {},
}

impl Commands {
    /// Whether the command needs an open database.
    pub fn requires_database(&self) -> bool {
        !matches!(self, Commands::Config {})
    }
}

fn parse_spaceless_string(s: &str) -> Result<String> {
    if s.is_empty() {
        Err(anyhow!("invalid name: empty string"))
    } else if s.split_whitespace().count() > 1 || s.trim() != s {
        Err(anyhow!("invalid name: found space in '{}'", s))
    } else {
        Ok(String::from(s))
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn verify_spaceless_parsing() {
        assert_eq!(
            parse_spaceless_string("jdk_CPULoad").unwrap(),
            "jdk_CPULoad"
        );
        assert!(parse_spaceless_string("").is_err());
        assert!(parse_spaceless_string("two words").is_err());
        assert!(parse_spaceless_string(" padded").is_err());
    }

    #[test]
    fn verify_reduction_func_round_trip_names() {
        for func in [
            ReductionFunc::Min,
            ReductionFunc::Max,
            ReductionFunc::Median,
            ReductionFunc::Mean,
        ] {
            assert_eq!(func, func.to_string().parse::<ReductionFunc>().unwrap());
        }
        assert!("average".parse::<ReductionFunc>().is_err());
    }

    #[test]
    fn parse_progression() {
        let cli = Cli::try_parse_from([
            "jfr-plot",
            "-d",
            "bench",
            "progression",
            "jdk_GCHeapSummary",
            "heapUsed",
            "c1",
            "c2",
            "-s",
            "median",
        ])
        .unwrap();

        assert_eq!(cli.database.as_deref(), Some("bench"));
        match cli.command {
            Commands::Progression {
                selection,
                start_commit,
                end_commit,
                statistic,
                output,
                ..
            } => {
                assert_eq!(selection.table, "jdk_GCHeapSummary");
                assert_eq!(selection.column, "heapUsed");
                assert_eq!(start_commit, "c1");
                assert_eq!(end_commit, "c2");
                assert_eq!(statistic, Some(ReductionFunc::Median));
                assert_eq!(output, PathBuf::from("progression.html"));
            }
            _ => panic!("expected progression command"),
        }
    }

    #[test]
    fn config_does_not_need_database() {
        let cli = Cli::try_parse_from(["jfr-plot", "config"]).unwrap();
        assert!(!cli.command.requires_database());

        let cli = Cli::try_parse_from(["jfr-plot", "tables"]).unwrap();
        assert!(cli.command.requires_database());
    }
}
