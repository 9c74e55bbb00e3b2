use crate::elimination_voting::ev;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
pub struct ConfigError {
    details: String,
}

impl ConfigError {
    fn new(msg: &str) -> ConfigError {
        ConfigError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub entries_file: Option<PathBuf>,
    pub log_level: log::LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let token = match std::env::var("DISCORD_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token,
            _ => return Err(ConfigError::new("Expected DISCORD_TOKEN in the environment")),
        };

        let entries_file = std::env::var_os("BRACKET_ENTRIES").map(PathBuf::from);

        let log_level = match std::env::var("BRACKET_LOG_LEVEL") {
            Ok(level) => parse_log_level(&level)?,
            Err(_) => log::LevelFilter::Debug,
        };

        Ok(Config {
            token,
            entries_file,
            log_level,
        })
    }
}

fn parse_log_level(level: &str) -> Result<log::LevelFilter, ConfigError> {
    log::LevelFilter::from_str(level.trim()).map_err(|err| {
        ConfigError::new(&format!(
            "BRACKET_LOG_LEVEL '{level}' is not a valid level: {err}"
        ))
    })
}

/// One entry per line. Blank lines and `#` comments are skipped.
pub fn parse_entries(contents: &str) -> Vec<ev::Entry> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

pub fn load_entries(path: &Path) -> Result<Vec<ev::Entry>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        ConfigError::new(&format!(
            "Failed to read entries file {}: {err}",
            path.display()
        ))
    })?;

    check_seed_entries(parse_entries(&contents)).map_err(|err| {
        ConfigError::new(&format!("Entries file {}: {err}", path.display()))
    })
}

fn check_seed_entries(entries: Vec<ev::Entry>) -> Result<Vec<ev::Entry>, ev::TransitionError> {
    ev::check_entries(&entries)?;
    return Ok(entries);
}

#[test]
fn test_parse_entries() {
    struct Case {
        input: &'static str,
        expected: Vec<&'static str>,
    }

    let cases = [
        Case {
            input: "Trainspotting\n28 Days Later\nSunshine\n",
            expected: vec!["Trainspotting", "28 Days Later", "Sunshine"],
        },
        Case {
            input: "# Danny Boyle\n\n  Millions  \n\n127 Hours",
            expected: vec!["Millions", "127 Hours"],
        },
        Case {
            input: "",
            expected: vec![],
        },
    ];

    for case in cases.iter() {
        assert_eq!(parse_entries(case.input), case.expected);
    }
}

#[test]
fn test_check_seed_entries() {
    struct Case {
        input: &'static str,
        expected: Result<Vec<ev::Entry>, ev::TransitionError>,
    }

    let cases = [
        Case {
            input: "Trainspotting\n28 Days Later\n",
            expected: Ok(vec!["Trainspotting".to_string(), "28 Days Later".to_string()]),
        },
        Case {
            input: "# only one\nSunshine\n",
            expected: Err(ev::TransitionError::NotEnoughEntries),
        },
        Case {
            input: "Sunshine\nMillions\n  Sunshine \n",
            expected: Err(ev::TransitionError::DuplicateEntry("Sunshine".to_string())),
        },
    ];

    for case in cases.iter() {
        assert_eq!(
            check_seed_entries(parse_entries(case.input)),
            case.expected,
            "{}",
            case.input
        );
    }
}

#[test]
fn test_load_entries_rejects_single_entry_file() {
    let path = std::env::temp_dir().join(format!("bracketbot-single-{}.txt", std::process::id()));
    std::fs::write(&path, "Sunshine\n").unwrap();
    let result = load_entries(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_err());
}

#[test]
fn test_parse_log_level() {
    assert_eq!(parse_log_level("info").unwrap(), log::LevelFilter::Info);
    assert_eq!(parse_log_level(" WARN ").unwrap(), log::LevelFilter::Warn);
    assert!(parse_log_level("chatty").is_err());
}
