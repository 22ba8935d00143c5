#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `make_data_extract`: writes the OSM features of one category inside a
//! boundary to a `GeoJSON` file for use as an ODK data extract.
//!
//! Exactly one source is used per run: a Postgres/PostGIS database
//! (`-p`), the Overpass API (`-o`), or a local file (`-i`). Errors are
//! logged; the process always exits normally.

use std::path::PathBuf;

use clap::Parser;
use clap::builder::PossibleValuesParser;
use data_extract::form::{DEFAULT_OUTPUT, resolve_output_path};
use data_extract::overpass::DEFAULT_OVERPASS_URL;
use data_extract::{
    DataSource, ExtractError, ExtractRequest, FileClient, OverpassClient, PostgresClient,
    PostgresConfig,
};
use data_extract_category::SchemaStore;
use data_extract_category_models::Category;
use data_extract_cli_utils::{MultiProgress, Verbosity};
use strum::VariantNames as _;

/// Make a `GeoJSON` data file for ODK from OSM.
#[derive(Debug, Parser)]
#[command(name = "make_data_extract")]
#[command(about = "Make GeoJSON data file for ODK from OSM")]
struct Cli {
    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors. Overrides `--verbose`.
    #[arg(short, long)]
    quiet: bool,

    /// Use the Overpass API.
    #[arg(short, long, conflicts_with = "postgres")]
    overpass: bool,

    /// Use a Postgres database.
    #[arg(short, long)]
    postgres: bool,

    /// Name of the `GeoJSON` output file. Left at the default, the name is
    /// read from `<category>.xml`.
    #[arg(short = 'g', long, default_value = DEFAULT_OUTPUT)]
    geojson: PathBuf,

    /// Input data file.
    #[arg(short, long)]
    infile: Option<PathBuf>,

    /// Database name.
    #[arg(long, visible_alias = "dn")]
    dbname: Option<String>,

    /// Database host.
    #[arg(long, visible_alias = "dh", default_value = "localhost")]
    dbhost: String,

    /// Boundary polygon to limit the data size.
    #[arg(short, long)]
    boundary: Option<PathBuf>,

    /// Which category to extract.
    #[arg(
        short,
        long,
        default_value = "buildings",
        value_parser = PossibleValuesParser::new(Category::VARIANTS.iter().copied())
    )]
    category: String,

    /// Directory of category YAML files to use instead of the built-in ones.
    #[arg(long, env = "DATA_MODELS_PATH")]
    data_models: Option<PathBuf>,

    /// Overpass API endpoint.
    #[arg(long, env = "OVERPASS_URL", default_value = DEFAULT_OVERPASS_URL)]
    overpass_url: String,

    /// Directory searched for `<category>.xml`.
    #[arg(long, default_value = ".")]
    form_dir: PathBuf,
}

/// Source selected by the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    Postgres,
    Overpass,
    File(PathBuf),
}

impl Backend {
    /// Postgres takes precedence, then Overpass, then the input file.
    fn select(cli: &Cli) -> Option<Self> {
        if cli.postgres {
            Some(Self::Postgres)
        } else if cli.overpass {
            Some(Self::Overpass)
        } else {
            cli.infile.clone().map(Self::File)
        }
    }
}

/// Rewrites the single-dash `-dn`/`-dh` spellings to their long forms,
/// which clap can't express as short flags.
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-dn" => "--dn".to_string(),
            "-dh" => "--dh".to_string(),
            _ => arg,
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args()));
    let multi = data_extract_cli_utils::init_logger(Verbosity::from_flags(cli.verbose, cli.quiet));

    if let Err(e) = run(&cli, &multi).await {
        log::error!("{e}");
    }
}

async fn run(cli: &Cli, multi: &MultiProgress) -> Result<(), ExtractError> {
    let output = resolve_output_path(&cli.geojson, &cli.category, &cli.form_dir)?;

    let Some(backend) = Backend::select(cli) else {
        log::error!("You need to supply either --overpass, --postgres, or --infile");
        return Ok(());
    };

    let store = cli
        .data_models
        .clone()
        .map_or_else(SchemaStore::embedded, SchemaStore::from_dir);

    let source = match backend {
        Backend::Postgres => {
            log::info!("Using a Postgres database for the data source");
            let config =
                PostgresConfig::from_env(&cli.dbhost, cli.dbname.as_deref().unwrap_or_default());
            DataSource::Postgres(PostgresClient::connect(&config).await)
        }
        Backend::Overpass => {
            log::info!("Using Overpass for the data source");
            DataSource::Overpass(OverpassClient::new(cli.overpass_url.clone()))
        }
        Backend::File(infile) => {
            log::info!("Using file {} for the data source", infile.display());
            DataSource::File(FileClient::new(infile))
        }
    };

    let request = ExtractRequest {
        category: &cli.category,
        boundary: cli.boundary.as_deref(),
        output: &output,
    };

    let spinner = data_extract_cli_utils::spinner(
        multi,
        &format!("Extracting {} from {}", cli.category, source.kind()),
    );
    let result = data_extract::run(&source, &store, &request).await;
    spinner.finish_and_clear();

    let count = result?;
    log::info!("Done: {count} feature(s) in {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("make_data_extract").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.category, "buildings");
        assert_eq!(cli.geojson, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(cli.dbhost, "localhost");
        assert_eq!(Backend::select(&cli), None);
    }

    #[test]
    fn postgres_wins_over_infile() {
        let cli = parse(&["-p", "-i", "buildings.geojson", "--dn", "osm"]);
        assert_eq!(Backend::select(&cli), Some(Backend::Postgres));
        assert_eq!(cli.dbname.as_deref(), Some("osm"));
    }

    #[test]
    fn overpass_wins_over_infile() {
        let cli = parse(&["-o", "-i", "buildings.geojson"]);
        assert_eq!(Backend::select(&cli), Some(Backend::Overpass));
    }

    #[test]
    fn infile_alone_selects_file_backend() {
        let cli = parse(&["-i", "buildings.geojson"]);
        assert_eq!(
            Backend::select(&cli),
            Some(Backend::File(PathBuf::from("buildings.geojson")))
        );
    }

    #[test]
    fn overpass_and_postgres_conflict() {
        assert!(Cli::try_parse_from(["make_data_extract", "-o", "-p"]).is_err());
    }

    #[test]
    fn rejects_unknown_categories() {
        assert!(Cli::try_parse_from(["make_data_extract", "-c", "camping"]).is_err());
        assert_eq!(parse(&["-c", "healthcare"]).category, "healthcare");
    }

    #[test]
    fn single_dash_db_flags_are_accepted() {
        let args = normalize_args(
            ["make_data_extract", "-p", "-dn", "osm", "-dh", "db.example.org"]
                .into_iter()
                .map(String::from),
        );
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.dbname.as_deref(), Some("osm"));
        assert_eq!(cli.dbhost, "db.example.org");
    }

    #[test]
    fn normalize_args_leaves_values_alone() {
        let args = normalize_args(["-c", "-dnx", "--dn"].into_iter().map(String::from));
        assert_eq!(args, vec!["-c", "-dnx", "--dn"]);
    }

    #[test]
    fn db_aliases() {
        let cli = parse(&["--dh", "db.example.org", "--dbname", "kenya"]);
        assert_eq!(cli.dbhost, "db.example.org");
        assert_eq!(cli.dbname.as_deref(), Some("kenya"));
    }
}
