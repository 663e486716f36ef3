use clap::{Arg, ArgAction, Command};
use log::error;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use trackscout::api::LastfmBlock;
use trackscout::config::AppConfig;
use trackscout::data::{ExclusionSet, Seed};
use trackscout::helpers::lastfm::LastfmClient;
use trackscout::recommendations::RecommendationCascade;

/// Split "Artist - Title" into its parts
fn parse_exclude(value: &str) -> Option<(String, String)> {
    let (artist, title) = value.split_once(" - ")?;
    Some((artist.trim().to_string(), title.trim().to_string()))
}

fn main() {
    let matches = Command::new("trackscout_recommend")
        .about("Run the recommendation cascade for a track without an audio sample")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("artist")
                .short('a')
                .long("artist")
                .value_name("ARTIST")
                .help("Seed artist")
                .required(true),
        )
        .arg(
            Arg::new("title")
                .short('t')
                .long("title")
                .value_name("TITLE")
                .help("Seed track title")
                .required(true),
        )
        .arg(
            Arg::new("exclude")
                .short('x')
                .long("exclude")
                .value_name("ARTIST - TITLE")
                .help("Track to leave out of the result (implies --more, may be repeated)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("limit")
                .short('l')
                .long("limit")
                .value_name("N")
                .help("Number of tracks to return")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("more")
                .short('m')
                .long("more")
                .help("Use the exclusion-aware variant and look up the seed's play count")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (default: trackscout.json if it exists)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    dotenvy::dotenv().ok();
    if matches.get_flag("verbose") {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let mut config = match AppConfig::load(matches.get_one::<String>("config").map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.apply_environment() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let client = match LastfmClient::from_config(&config.lastfm) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let cascade = RecommendationCascade::new(Arc::new(client))
        .with_settings(config.recommendations.cascade_settings());

    let artist = matches.get_one::<String>("artist").map(|s| s.trim()).unwrap_or("");
    let title = matches.get_one::<String>("title").map(|s| s.trim()).unwrap_or("");
    if artist.is_empty() || title.is_empty() {
        eprintln!("Error: artist and title must not be empty");
        std::process::exit(1);
    }
    let query = Seed::for_query(artist, title);

    let mut excluded = Vec::new();
    for value in matches.get_many::<String>("exclude").into_iter().flatten() {
        match parse_exclude(value) {
            Some(pair) => excluded.push(pair),
            None => {
                eprintln!("Error: --exclude expects \"Artist - Title\", got \"{}\"", value);
                std::process::exit(1);
            }
        }
    }

    let output = if matches.get_flag("more") || !excluded.is_empty() {
        let desired = matches
            .get_one::<usize>("limit")
            .copied()
            .unwrap_or(config.recommendations.more_limit);
        let seed = Seed::new(artist, title);
        let exclusions = ExclusionSet::new(&seed, excluded.iter().map(|(a, t)| (a.as_str(), t.as_str())));
        let more = cascade.recommend_more(&query, &exclusions, desired);
        json!({
            "seed": {"artist": artist, "title": title, "playcount": more.playcount},
            "lastfm": LastfmBlock::new(more.cascade, &query, true),
        })
    } else {
        let limit = matches
            .get_one::<usize>("limit")
            .copied()
            .unwrap_or(config.recommendations.identify_limit);
        let result = cascade.recommend(&query, limit);
        json!({
            "seed": {"artist": artist, "title": title},
            "lastfm": LastfmBlock::new(result, &query, true),
        })
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
