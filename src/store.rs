use crate::elimination_voting::ev;
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetEntries(Vec<ev::Entry>),
    Next,
    Vote(ev::Entry),
}

pub fn reduce(state: &ev::State, action: Action) -> Result<ev::State, ev::TransitionError> {
    match action {
        Action::SetEntries(entries) => Ok(ev::set_entries(state, entries)),
        Action::Next => ev::next(state),
        Action::Vote(entry) => {
            if let Some(winner) = &state.winner {
                return Err(ev::TransitionError::AlreadyDecided(winner.clone()));
            }
            let vote_state = match &state.vote {
                Some(vote_state) => vote_state,
                None => return Err(ev::TransitionError::NoVoteInProgress(entry)),
            };
            Ok(ev::State {
                vote: Some(ev::vote(vote_state, &entry)?),
                ..state.clone()
            })
        }
    }
}

pub type Listener = Box<dyn Fn(&ev::State) + Send + Sync>;

/// Holds the one authoritative bracket state. Every update goes through
/// `dispatch`, and subscribers see each new state in order.
pub struct Store {
    state: ev::State,
    listeners: Vec<Listener>,
}

impl Store {
    pub fn new() -> Store {
        Store::with_state(ev::State::default())
    }

    pub fn with_state(state: ev::State) -> Store {
        Store {
            state,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &ev::State {
        &self.state
    }

    /// Drops back to the empty state. Subscribers are kept.
    pub fn reset(&mut self) {
        self.state = ev::State::default();
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&ev::State) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// On error the current state is kept and no listener runs.
    pub fn dispatch(&mut self, action: Action) -> Result<&ev::State, ev::TransitionError> {
        debug!("Dispatching {:?}", action);
        self.state = reduce(&self.state, action)?;
        for listener in self.listeners.iter() {
            listener(&self.state);
        }
        return Ok(&self.state);
    }
}

#[cfg(test)]
fn names(entries: &[&str]) -> Vec<ev::Entry> {
    entries.iter().map(|entry| entry.to_string()).collect()
}

#[test]
fn test_reduce() {
    struct Case {
        state: ev::State,
        action: Action,
        expected: Result<ev::State, ev::TransitionError>,
    }

    let pair = ev::Vote::new("Trainspotting".to_string(), "28 Days Later".to_string());

    let cases = [
        Case {
            state: ev::State::default(),
            action: Action::SetEntries(names(&["Trainspotting", "28 Days Later"])),
            expected: Ok(ev::State {
                entries: names(&["Trainspotting", "28 Days Later"]),
                vote: None,
                winner: None,
            }),
        },
        Case {
            state: ev::State {
                entries: names(&["Trainspotting", "28 Days Later", "Sunshine"]),
                vote: None,
                winner: None,
            },
            action: Action::Next,
            expected: Ok(ev::State {
                entries: names(&["Sunshine"]),
                vote: Some(pair.clone()),
                winner: None,
            }),
        },
        Case {
            state: ev::State {
                entries: names(&["Sunshine"]),
                vote: Some(pair.clone()),
                winner: None,
            },
            action: Action::Vote("Trainspotting".to_string()),
            expected: Ok(ev::State {
                entries: names(&["Sunshine"]),
                vote: Some(ev::Vote {
                    pair: pair.pair.clone(),
                    tally: ev::Tally::from([("Trainspotting".to_string(), 1)]),
                }),
                winner: None,
            }),
        },
        Case {
            state: ev::State {
                entries: names(&["Sunshine", "Millions"]),
                vote: None,
                winner: None,
            },
            action: Action::Vote("Sunshine".to_string()),
            expected: Err(ev::TransitionError::NoVoteInProgress(
                "Sunshine".to_string(),
            )),
        },
        Case {
            state: ev::State {
                entries: names(&[]),
                vote: None,
                winner: Some("Sunshine".to_string()),
            },
            action: Action::Vote("Sunshine".to_string()),
            expected: Err(ev::TransitionError::AlreadyDecided("Sunshine".to_string())),
        },
        Case {
            state: ev::State {
                entries: names(&[]),
                vote: Some(pair.clone()),
                winner: None,
            },
            action: Action::Vote("Millions".to_string()),
            expected: Err(ev::TransitionError::NotInPair("Millions".to_string())),
        },
    ];

    for (i, case) in cases.iter().enumerate() {
        assert_eq!(
            reduce(&case.state, case.action.clone()),
            case.expected,
            "Case {}",
            i,
        );
    }
}

#[test]
fn test_full_bracket() {
    let mut store = Store::new();
    let mut rounds = vec![
        Action::SetEntries(names(&[
            "Trainspotting",
            "28 Days Later",
            "Sunshine",
            "Millions",
        ])),
        Action::Next,
        // Trainspotting vs 28 Days Later
        Action::Vote("Trainspotting".to_string()),
        Action::Vote("Trainspotting".to_string()),
        Action::Vote("28 Days Later".to_string()),
        Action::Next,
        // Sunshine vs Millions, tied
        Action::Vote("Sunshine".to_string()),
        Action::Vote("Millions".to_string()),
        Action::Next,
        // Trainspotting vs Sunshine
        Action::Vote("Sunshine".to_string()),
        Action::Next,
    ];

    for action in rounds.drain(..) {
        store.dispatch(action).unwrap();
    }
    assert_eq!(
        store.state(),
        &ev::State {
            entries: names(&[]),
            vote: Some(ev::Vote::new("Millions".to_string(), "Sunshine".to_string())),
            winner: None,
        }
    );

    store.dispatch(Action::Vote("Millions".to_string())).unwrap();
    let state = store.dispatch(Action::Next).unwrap();
    assert_eq!(
        state,
        &ev::State {
            entries: names(&[]),
            vote: None,
            winner: Some("Millions".to_string()),
        }
    );
    assert_eq!(
        store.dispatch(Action::Next),
        Err(ev::TransitionError::AlreadyDecided("Millions".to_string()))
    );
}

#[test]
fn test_dispatch_notifies_subscribers() {
    use std::sync::{Arc, Mutex};

    let seen: Arc<Mutex<Vec<ev::State>>> = Arc::new(Mutex::new(Vec::new()));
    let mut store = Store::new();
    let sink = seen.clone();
    store.subscribe(move |state| sink.lock().unwrap().push(state.clone()));

    store
        .dispatch(Action::SetEntries(names(&["Trainspotting", "28 Days Later"])))
        .unwrap();
    store.dispatch(Action::Next).unwrap();

    let before = store.state().clone();
    assert_eq!(
        store.dispatch(Action::Vote("Sunshine".to_string())),
        Err(ev::TransitionError::NotInPair("Sunshine".to_string()))
    );
    assert_eq!(store.state(), &before);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1], before);
}
