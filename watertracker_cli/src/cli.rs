use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use log::{debug, info, warn};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;
use watertracker::{
    compare::AnalysisMode,
    config::Config,
    error::WaterTrackerError,
    formatters::{
        CSVFormatter, GeoJSONFormatter, GeoJSONSeqFormatter, JSONFormatter, OutputFormatter,
        OutputGenerator,
    },
    metric::Metric,
    request::{RequestFile, ViewRequest, ViewResponse},
    search::{CaseSensitivity, CountrySearch, MatchType, SearchConfig},
    view::View,
    WaterTracker,
};

use crate::display::{
    display_comparison, display_countries, display_map, display_metrics, display_series,
};
use crate::error::{WaterTrackerCliError, WaterTrackerCliResult};

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const LOADING_STRING: &str = "Loading water data";

/// Defines the output formats we are able to produce views in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    /// The JSON view model a client renders
    View,
    GeoJSON,
    GeoJSONSeq,
    Csv,
    Json,
    /// A table in the terminal
    Stdout,
}

impl OutputFormat {
    /// Formatter for the frame behind a view; `View` and `Stdout` have none
    fn formatter(&self) -> Option<OutputFormatter> {
        match self {
            OutputFormat::GeoJSON => Some(OutputFormatter::GeoJSON(GeoJSONFormatter)),
            OutputFormat::GeoJSONSeq => Some(OutputFormatter::GeoJSONSeq(GeoJSONSeqFormatter)),
            OutputFormat::Csv => Some(OutputFormatter::Csv(CSVFormatter)),
            OutputFormat::Json => Some(OutputFormatter::Json(JSONFormatter)),
            OutputFormat::View | OutputFormat::Stdout => None,
        }
    }

    fn is_geographic(&self) -> bool {
        matches!(self, OutputFormat::GeoJSON | OutputFormat::GeoJSONSeq)
    }
}

fn output_writer<U: AsRef<Path>>(output_file: Option<U>) -> WaterTrackerCliResult<Box<dyn Write>> {
    Ok(match output_file {
        Some(output_file) => {
            Box::new(File::create(output_file).context("Failed to write output")?)
        }
        None => Box::new(std::io::stdout().lock()),
    })
}

fn write_output<T, U>(
    output_generator: T,
    mut data: DataFrame,
    output_file: Option<U>,
) -> WaterTrackerCliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    let mut writer = output_writer(output_file)?;
    output_generator.save(&mut writer, &mut data)?;
    Ok(())
}

fn write_json<T, U>(value: &T, output_file: Option<U>) -> WaterTrackerCliResult<()>
where
    T: Serialize,
    U: AsRef<Path>,
{
    let mut writer = output_writer(output_file)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Load both inputs, with a spinner unless `quiet`
fn load_tracker(config: Config, quiet: bool) -> WaterTrackerCliResult<WaterTracker> {
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            LOADING_STRING.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let tracker = WaterTracker::new_with_config(config);
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
    Ok(tracker?)
}

fn parse_metric(value: &str) -> Result<Metric, WaterTrackerError> {
    Metric::resolve(value)
}

fn parse_mode(value: &str) -> Result<AnalysisMode, WaterTrackerError> {
    AnalysisMode::try_from(value.to_string())
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()>;
}

#[derive(Debug, Clone, clap::ValueEnum, Copy)]
enum MatchTypeArgs {
    Regex,
    Exact,
    Contains,
    Startswith,
}

impl From<MatchTypeArgs> for MatchType {
    fn from(value: MatchTypeArgs) -> Self {
        match value {
            MatchTypeArgs::Exact => MatchType::Exact,
            MatchTypeArgs::Regex => MatchType::Regex,
            MatchTypeArgs::Contains => MatchType::Contains,
            MatchTypeArgs::Startswith => MatchType::Startswith,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum, Copy)]
enum CaseSensitivityArgs {
    Sensitive,
    Insensitive,
}

impl From<CaseSensitivityArgs> for CaseSensitivity {
    fn from(value: CaseSensitivityArgs) -> Self {
        match value {
            CaseSensitivityArgs::Insensitive => CaseSensitivity::Insensitive,
            CaseSensitivityArgs::Sensitive => CaseSensitivity::Sensitive,
        }
    }
}

/// The Countries command lists the countries with forecasts, optionally filtered by name or code.
#[derive(Args, Debug)]
pub struct CountriesCommand {
    #[arg(short, long, help = "Filter by country name or ISO code")]
    search: Option<String>,
    #[arg(
        value_enum,
        short = 'm',
        long,
        value_name = "MATCH_TYPE",
        help = "Type of matching to perform on the 'search' argument",
        default_value_t = MatchTypeArgs::Contains
    )]
    match_type: MatchTypeArgs,
    #[arg(
        value_enum,
        long,
        value_name = "CASE_SENSITIVITY",
        help = "Type of case sensitivity used in matching on the 'search' argument",
        default_value_t = CaseSensitivityArgs::Insensitive
    )]
    case_sensitivity: CaseSensitivityArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CountriesCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `countries` subcommand");
        let tracker = load_tracker(config, self.quiet)?;
        let countries = match self.search.as_ref() {
            Some(value) => {
                let search = CountrySearch {
                    value: value.clone(),
                    config: SearchConfig {
                        match_type: self.match_type.into(),
                        case_sensitivity: self.case_sensitivity.into(),
                    },
                };
                let matches = tracker.store.search_country_index(search)?;
                debug!("{} countries match {value:?}", matches.height());
                matches
            }
            None => tracker.store.country_index().clone(),
        };
        if countries.height() == 0 {
            println!("No countries found.");
            return Ok(());
        }
        println!("\nThe following countries are available:");
        display_countries(&countries)?;
        Ok(())
    }
}

/// The Metrics command lists the metrics that can be charted.
#[derive(Args, Debug)]
pub struct MetricsCommand;

impl RunCommand for MetricsCommand {
    fn run(&self, _config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `metrics` subcommand");
        display_metrics()?;
        Ok(())
    }
}

/// The Map command builds the choropleth for one year.
#[derive(Args, Debug)]
pub struct MapCommand {
    #[arg(short, long, help = "Year to map, defaults to the configured default year")]
    year: Option<i32>,
    #[arg(
        short = 'f',
        long,
        value_name = "view|geojson|geojsonseq|csv|json|stdout",
        default_value = "view",
        help = "Output format for the results"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for MapCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `map` subcommand");
        let year = self.year.unwrap_or(config.default_year);
        let tracker = load_tracker(config, self.quiet)?;
        if let Some((min_year, max_year)) = tracker.store.year_range() {
            if !(min_year..=max_year).contains(&year) {
                warn!("Year {year} is outside the available range {min_year}..={max_year}");
            }
        }
        let frame = tracker.map(year)?;
        debug!("{frame:#?}");
        match self.output_format.formatter() {
            Some(formatter) => write_output(formatter, frame.data, self.output_file.as_deref()),
            None if self.output_format == OutputFormat::Stdout => Ok(display_map(&frame)?),
            None => write_json(
                &ViewResponse::Map(frame.to_view()?),
                self.output_file.as_deref(),
            ),
        }
    }
}

/// The Series command shows the forecast of one metric for one country.
#[derive(Args, Debug)]
pub struct SeriesCommand {
    #[arg(index = 1, help = "Country name or ISO code, e.g. 'World' or 'USA'")]
    country: String,
    #[arg(
        short,
        long,
        value_parser = parse_metric,
        help = "Metric to chart: freshwater, use, population, gdp or its full label"
    )]
    metric: Metric,
    #[arg(
        short = 'f',
        long,
        value_name = "view|csv|json|stdout",
        default_value = "view",
        help = "Output format for the results"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SeriesCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `series` subcommand");
        if self.output_format.is_geographic() {
            return Err(WaterTrackerCliError::UnsupportedFormat {
                format: format!("{:?}", self.output_format),
                command: "series",
            });
        }
        let tracker = load_tracker(config, self.quiet)?;
        if self.output_format == OutputFormat::View {
            let response = tracker.handle(ViewRequest::Series {
                country: self.country.clone(),
                metric: self.metric,
            })?;
            return write_json(&response, self.output_file.as_deref());
        }
        match tracker.series(&self.country, self.metric)? {
            View::Data(series) => match self.output_format.formatter() {
                Some(formatter) => {
                    write_output(formatter, series.data, self.output_file.as_deref())
                }
                None => Ok(display_series(&series)?),
            },
            View::Empty(reason) => {
                println!("{reason}");
                Ok(())
            }
        }
    }
}

/// The Compare command charts several countries side by side.
#[derive(Args, Debug)]
pub struct CompareCommand {
    #[arg(
        short,
        long = "country",
        value_name = "COUNTRY",
        help = "Country name or ISO code; repeat to add countries"
    )]
    countries: Vec<String>,
    #[arg(
        short,
        long,
        value_parser = parse_metric,
        help = "Metric to compare: freshwater, use, population, gdp or its full label"
    )]
    metric: Metric,
    #[arg(
        long,
        value_parser = parse_mode,
        default_value = "nominal",
        help = "Analysis mode: nominal, cumulative, yoy or 3yr"
    )]
    mode: AnalysisMode,
    #[arg(
        short = 'f',
        long,
        value_name = "view|csv|json|stdout",
        default_value = "view",
        help = "Output format for the results"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CompareCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `compare` subcommand");
        if self.output_format.is_geographic() {
            return Err(WaterTrackerCliError::UnsupportedFormat {
                format: format!("{:?}", self.output_format),
                command: "compare",
            });
        }
        let tracker = load_tracker(config, self.quiet)?;
        if self.output_format == OutputFormat::View {
            let response = tracker.handle(ViewRequest::Compare {
                countries: self.countries.clone(),
                metric: self.metric,
                mode: self.mode,
            })?;
            return write_json(&response, self.output_file.as_deref());
        }
        match tracker.compare(&self.countries, self.metric, self.mode)? {
            View::Data(comparison) => match self.output_format.formatter() {
                Some(formatter) => write_output(
                    formatter,
                    comparison.combined()?,
                    self.output_file.as_deref(),
                ),
                None => Ok(display_comparison(&comparison)?),
            },
            View::Empty(reason) => {
                println!("{reason}");
                Ok(())
            }
        }
    }
}

/// The Request command answers every request in a JSON file
#[derive(Args, Debug)]
pub struct RequestCommand {
    #[arg(index = 1)]
    request_file: String,
    #[arg(short = 'o', long)]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for RequestCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `request` subcommand");
        let contents = std::fs::read_to_string(&self.request_file).context(format!(
            "Failed to read requests from file: {}",
            self.request_file
        ))?;
        let requests: RequestFile = serde_json::from_str(&contents)?;
        let tracker = load_tracker(config, self.quiet)?;
        let responses = requests
            .into_requests()
            .into_iter()
            .map(|request| tracker.handle(request))
            .collect::<anyhow::Result<Vec<ViewResponse>>>()?;
        write_json(&responses, self.output_file.as_deref())
    }
}

/// The Session command keeps the data loaded and answers one JSON request per line of stdin with
/// one JSON response per line of stdout
#[derive(Args, Debug)]
pub struct SessionCommand;

/// Answer requests from `reader` until it is exhausted. A bad request gets an error message and
/// the session carries on.
fn run_session(
    tracker: &WaterTracker,
    reader: impl BufRead,
    mut writer: impl Write,
) -> WaterTrackerCliResult<usize> {
    let mut handled = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ViewRequest>(&line) {
            Ok(request) => tracker.handle(request).unwrap_or_else(|err| {
                warn!("Request failed: {err:#}");
                ViewResponse::error(format!("{err:#}"))
            }),
            Err(err) => {
                warn!("Invalid request {line:?}: {err}");
                ViewResponse::error(format!("invalid request: {err}"))
            }
        };
        serde_json::to_writer(&mut writer, &response)?;
        writeln!(writer)?;
        writer.flush()?;
        handled += 1;
    }
    Ok(handled)
}

impl RunCommand for SessionCommand {
    fn run(&self, config: Config) -> WaterTrackerCliResult<()> {
        info!("Running `session` subcommand");
        // Spinner output would interleave with the responses
        let tracker = load_tracker(config, true)?;
        let handled = run_session(
            &tracker,
            std::io::stdin().lock(),
            std::io::stdout().lock(),
        )?;
        info!("Session ended after {handled} request(s)");
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Watertracker explores freshwater scarcity and its forecasts by country", long_about = None, name="watertracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress spinner to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
    #[arg(
        long,
        value_name = "FILE",
        help = "GeoJSON records to load instead of the configured file",
        global = true
    )]
    pub geo_data: Option<String>,
    #[arg(
        long,
        value_name = "FILE",
        help = "Forecast JSON to load instead of the configured file",
        global = true
    )]
    pub predictions: Option<String>,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command implements the RunCommand trait and specifies the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// List countries for which forecasts are available
    Countries(CountriesCommand),
    /// List the metrics that can be charted
    Metrics(MetricsCommand),
    /// Choropleth of freshwater availability for one year
    Map(MapCommand),
    /// Forecast of one metric for one country
    Series(SeriesCommand),
    /// Compare one metric across countries
    Compare(CompareCommand),
    /// Answer the requests in a JSON file
    Request(RequestCommand),
    /// Answer JSON requests read line by line from stdin
    Session(SessionCommand),
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::str::FromStr;

    use tempfile::NamedTempFile;

    use super::*;

    fn test_config() -> Config {
        let test_data = format!("{}/../watertracker/test_data", env!("CARGO_MANIFEST_DIR"));
        Config {
            geo_data_path: format!("{test_data}/sample.geojson"),
            predictions_path: format!("{test_data}/sample_predictions.json"),
            ..Config::default()
        }
    }

    fn temp_output() -> NamedTempFile {
        NamedTempFile::new().unwrap()
    }

    #[test]
    fn map_command_should_write_geojson() {
        let output = temp_output();
        let map_command = MapCommand {
            year: Some(2019),
            output_format: OutputFormat::GeoJSON,
            output_file: Some(output.path().to_string_lossy().to_string()),
            quiet: true,
        };
        map_command.run(test_config()).unwrap();
        let contents = std::fs::read_to_string(output.path()).unwrap();
        let collection = geojson_features(&contents);
        assert_eq!(collection, 2, "only the 2019 records should be mapped");
    }

    fn geojson_features(contents: &str) -> usize {
        let value: serde_json::Value = serde_json::from_str(contents).unwrap();
        value["features"].as_array().unwrap().len()
    }

    #[test]
    fn map_command_should_write_view_for_empty_year() {
        let output = temp_output();
        let map_command = MapCommand {
            year: Some(1990),
            output_format: OutputFormat::View,
            output_file: Some(output.path().to_string_lossy().to_string()),
            quiet: true,
        };
        map_command.run(test_config()).unwrap();
        let contents = std::fs::read_to_string(output.path()).unwrap();
        let view: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(view["view"], "map");
        assert_eq!(view["bins"], serde_json::Value::Null);
        assert_eq!(view["message"], "No data available for 1990.");
    }

    #[test]
    fn series_command_should_reject_geographic_formats() {
        let series_command = SeriesCommand {
            country: "World".into(),
            metric: Metric::Population,
            output_format: OutputFormat::GeoJSONSeq,
            output_file: None,
            quiet: true,
        };
        assert!(matches!(
            series_command.run(test_config()),
            Err(WaterTrackerCliError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn compare_command_should_write_csv() {
        let output = temp_output();
        let compare_command = CompareCommand {
            countries: vec!["USA".into(), "India".into()],
            metric: Metric::GdpPerCapita,
            mode: AnalysisMode::Nominal,
            output_format: OutputFormat::Csv,
            output_file: Some(output.path().to_string_lossy().to_string()),
            quiet: true,
        };
        compare_command.run(test_config()).unwrap();
        let contents = std::fs::read_to_string(output.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Country,ds,yhat"));
        assert_eq!(lines.count(), 4);
    }

    #[test]
    fn request_command_should_answer_each_request() {
        let mut requests = NamedTempFile::new().unwrap();
        writeln!(
            requests,
            r#"[{{"view": "map"}}, {{"view": "series", "country": "World", "metric": "population"}}]"#
        )
        .unwrap();
        let output = temp_output();
        let request_command = RequestCommand {
            request_file: requests.path().to_string_lossy().to_string(),
            output_file: Some(output.path().to_string_lossy().to_string()),
            quiet: true,
        };
        request_command.run(test_config()).unwrap();
        let contents = std::fs::read_to_string(output.path()).unwrap();
        let responses: Vec<serde_json::Value> = serde_json::from_str(&contents).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["view"], "map");
        assert_eq!(responses[1]["view"], "chart");
        assert_eq!(
            responses[1]["title"],
            "Population Predictions Over Time for World"
        );
    }

    #[test]
    fn session_should_answer_each_line_and_survive_bad_requests() {
        let tracker = WaterTracker::new_with_config(test_config()).unwrap();
        let input = concat!(
            r#"{"view": "compare", "countries": [], "metric": "gdp"}"#,
            "\n\n",
            "not json\n",
            r#"{"view": "series", "country": "Atlantis", "metric": "gdp"}"#,
            "\n"
        );
        let mut output: Vec<u8> = vec![];
        let handled = run_session(&tracker, Cursor::new(input), &mut output).unwrap();
        assert_eq!(handled, 3);
        let responses: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses[0]["level"], "info");
        assert_eq!(responses[1]["level"], "error");
        assert_eq!(
            responses[2]["text"],
            "No predictions available for GDP Per Capita ($) PPP in Atlantis."
        );
    }

    #[test]
    fn output_type_should_deserialize_properly() {
        let output_format = OutputFormat::from_str("GeoJSON");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::GeoJSON,
            "geojson format should be parsed correctly"
        );
        let output_format = OutputFormat::from_str("GeoJson");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::GeoJSON,
            "parsing should be case insensitive"
        );
        let output_format = OutputFormat::from_str("stdout");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::Stdout,
            "correct variants should parse correctly"
        );
        let output_format = OutputFormat::from_str("geoparquet");
        assert!(output_format.is_err(), "non listed formats should fail");
    }

    #[test]
    fn metric_and_mode_arguments_should_accept_short_names() {
        assert_eq!(parse_metric("gdp").unwrap(), Metric::GdpPerCapita);
        assert_eq!(parse_metric("Population").unwrap(), Metric::Population);
        assert!(parse_metric("rainfall").is_err());
        assert_eq!(parse_mode("yoy").unwrap(), AnalysisMode::YoyGrowth);
        assert_eq!(parse_mode("3yr").unwrap(), AnalysisMode::ThreeYearGrowth);
        assert!(parse_mode("median").is_err());
    }

    #[test]
    fn cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
