use log::{debug, error, info, warn};
use serenity::async_trait;
use serenity::builder::CreateMessage;
use serenity::model::prelude::*;
use serenity::prelude::*;
use std::time::SystemTime;
mod config;
mod elimination_voting;
mod store;
use crate::config::Config;
use crate::elimination_voting::ev;
use crate::store::{Action, Store};

const HELP: &str = "Unknown command.
Options:
- `^bracket A | B | C`: Starts a new bracket with the given entries.
- `^vote <entry>`: Vote for one of the two entries in the current pair.
- `^next`: Close the current pair and move on to the next one.
- `^state`: Show the current pair and what is queued up.
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Bracket(Vec<ev::Entry>),
    Next,
    Vote(ev::Entry),
    State,
    Help,
}

// TODO: Configurable prefix
fn parse_command(content: &str) -> Option<Command> {
    let content = content.trim();
    let rest = content.strip_prefix("^")?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "bracket" => Command::Bracket(
            args.split("|")
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| entry.to_string())
                .collect(),
        ),
        "next" => Command::Next,
        "vote" if !args.is_empty() => Command::Vote(args.to_string()),
        "state" => Command::State,
        _ => Command::Help,
    };
    return Some(command);
}

#[test]
fn test_parse_command() {
    struct Case {
        input: &'static str,
        expected: Option<Command>,
    }

    let cases = [
        Case {
            input: "^bracket Trainspotting | 28 Days Later |Sunshine",
            expected: Some(Command::Bracket(vec![
                "Trainspotting".to_string(),
                "28 Days Later".to_string(),
                "Sunshine".to_string(),
            ])),
        },
        Case {
            input: "  ^next \n",
            expected: Some(Command::Next),
        },
        Case {
            input: "^vote 28 Days Later",
            expected: Some(Command::Vote("28 Days Later".to_string())),
        },
        Case {
            input: "^vote",
            expected: Some(Command::Help),
        },
        Case {
            input: "^state",
            expected: Some(Command::State),
        },
        Case {
            input: "^newsession",
            expected: Some(Command::Help),
        },
        Case {
            input: "what are we watching tonight?",
            expected: None,
        },
    ];

    for case in cases.iter() {
        assert_eq!(parse_command(case.input), case.expected, "{}", case.input);
    }
}

/// Runs a command against the store and builds the channel reply.
fn apply_command(store: &mut Store, command: Command) -> String {
    match command {
        Command::Bracket(entries) => {
            if let Err(err) = ev::check_entries(&entries) {
                return format!("Cannot start bracket: {err}. Try `^bracket A | B`");
            }
            store.reset();
            if let Err(err) = store.dispatch(Action::SetEntries(entries)) {
                error!("Failed to set entries: {err}");
                return format!("Failed to start bracket: {err}");
            }
            match store.dispatch(Action::Next) {
                Ok(state) => format!("Started a new bracket.\n{state}"),
                Err(err) => {
                    error!("Failed to pair first entries: {err}");
                    format!("Failed to start bracket: {err}")
                }
            }
        }
        Command::Next => match store.dispatch(Action::Next) {
            Ok(state) => state.to_string(),
            Err(err) => {
                warn!("Rejected next: {err}");
                format!("Cannot move on: {err}")
            }
        },
        Command::Vote(entry) => match store.dispatch(Action::Vote(entry)) {
            Ok(state) => format!("Vote recorded.\n{state}"),
            Err(err) => {
                warn!("Rejected vote: {err}");
                format!("Vote not recorded: {err}")
            }
        },
        Command::State => store.state().to_string(),
        Command::Help => HELP.to_string(),
    }
}

#[test]
fn test_apply_command() {
    let mut store = Store::new();

    assert_eq!(
        apply_command(&mut store, Command::Bracket(vec!["Sunshine".to_string()])),
        "Cannot start bracket: At least two entries are needed to form a pair. Try `^bracket A | B`"
    );
    assert_eq!(store.state(), &ev::State::default());

    // A repeated entry would be paired against itself and tie forever.
    assert_eq!(
        apply_command(
            &mut store,
            Command::Bracket(vec![
                "Sunshine".to_string(),
                "Millions".to_string(),
                "Sunshine".to_string(),
            ])
        ),
        "Cannot start bracket: 'Sunshine' is listed more than once. Try `^bracket A | B`"
    );
    assert_eq!(store.state(), &ev::State::default());

    assert_eq!(
        apply_command(
            &mut store,
            Command::Bracket(vec![
                "Trainspotting".to_string(),
                "28 Days Later".to_string(),
                "Sunshine".to_string(),
            ])
        ),
        "Started a new bracket.\nNow voting: **Trainspotting** (0) vs **28 Days Later** (0)\nUp next: Sunshine"
    );
    assert_eq!(
        apply_command(&mut store, Command::Vote("Sunshine".to_string())),
        "Vote not recorded: 'Sunshine' is not in the current pair"
    );
    assert_eq!(
        apply_command(&mut store, Command::Vote("28 Days Later".to_string())),
        "Vote recorded.\nNow voting: **Trainspotting** (0) vs **28 Days Later** (1)\nUp next: Sunshine"
    );
    assert_eq!(
        apply_command(&mut store, Command::Next),
        "Now voting: **Sunshine** (0) vs **28 Days Later** (0)\nUp next: nothing"
    );
    apply_command(&mut store, Command::Vote("Sunshine".to_string()));
    assert_eq!(
        apply_command(&mut store, Command::Next),
        "Winner: **Sunshine**"
    );
    assert_eq!(
        apply_command(&mut store, Command::Next),
        "Cannot move on: The bracket is already decided: Sunshine won"
    );

    // A new bracket replaces a finished one.
    apply_command(
        &mut store,
        Command::Bracket(vec!["Millions".to_string(), "127 Hours".to_string()]),
    );
    assert_eq!(store.state().winner, None);
    assert_eq!(
        store.state().vote,
        Some(ev::Vote::new("Millions".to_string(), "127 Hours".to_string()))
    );
}

struct Bot {
    store: tokio::sync::Mutex<Store>,
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, _: Context, ready: Ready) {
        info!("Connected as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) -> () {
        if msg.author.bot {
            return;
        }

        let command = match parse_command(&msg.content) {
            Some(command) => command,
            None => return,
        };
        debug!("Received {:?} from {}", command, msg.author.id);

        let chan_respond = async |to_send: &str| -> () {
            let msg_to_send = CreateMessage::new().content(format!(
                "{}: {to_send}",
                msg.author_nick(&ctx).await.unwrap_or(msg.author.name.clone())
            ));
            if let Err(say_err) = msg.channel_id.send_message(&ctx, msg_to_send).await {
                error!(
                    "Failed to respond to channel_id {}: {say_err}",
                    msg.channel_id
                );
            }
            ()
        };

        let reply = {
            let mut store = self.store.lock().await;
            apply_command(&mut store, command)
        };
        chan_respond(&reply).await;
    }
}

fn setup_logging(level: log::LevelFilter) -> Result<(), fern::InitError> {
    let colors = fern::colors::ColoredLevelConfig::new()
        .debug(fern::colors::Color::Blue)
        .info(fern::colors::Color::Green);
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("tracing", log::LevelFilter::Warn) // This spams heartbeats
        .level_for("serenity", log::LevelFilter::Warn)
        .level_for("h2", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Warn)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("tungstenite", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    setup_logging(config.log_level)?;

    serenity::utils::token::validate(&config.token)?;

    let mut store = Store::new();
    store.subscribe(|state| info!("Bracket state: {:?}", state));

    if let Some(path) = &config.entries_file {
        let entries = config::load_entries(path)?;
        info!("Seeding {} entries from {}", entries.len(), path.display());
        store.dispatch(Action::SetEntries(entries))?;
        store.dispatch(Action::Next)?;
    }

    let bot = Bot {
        store: tokio::sync::Mutex::new(store),
    };

    let intents = GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&config.token, intents)
        .event_handler(bot)
        .await?;

    if let Err(err) = client.start().await {
        error!("Client start failed: {err:?}");
        return Err(err.into());
    }

    Ok(())
}
