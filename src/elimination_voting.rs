pub mod ev {
    use std::collections::{BTreeMap, BTreeSet};
    use std::error::Error;
    use std::fmt;

    pub type Entry = String;
    pub type Tally = BTreeMap<Entry, u32>;

    /// Rough character budget for the "Up next" line so a rendered state fits
    /// in one chat message.
    const UP_NEXT_BUDGET: usize = 1500;

    /// The pair currently under vote. An empty tally means nobody has voted yet.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Vote {
        pub pair: [Entry; 2],
        pub tally: Tally,
    }

    impl Vote {
        pub fn new(first: Entry, second: Entry) -> Vote {
            Vote {
                pair: [first, second],
                tally: Tally::new(),
            }
        }

        /// Entries holding the highest count. Both pair members on a tie,
        /// in pair order.
        fn survivors(&self) -> Vec<Entry> {
            let counts: Vec<u32> = self
                .pair
                .iter()
                .map(|entry| self.tally.get(entry).copied().unwrap_or(0))
                .collect();
            let max = counts.iter().copied().max().unwrap_or(0);

            self.pair
                .iter()
                .zip(counts)
                .filter(|(_, count)| *count == max)
                .map(|(entry, _)| entry.clone())
                .collect()
        }
    }

    impl fmt::Display for Vote {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            let [first, second] = &self.pair;
            write!(
                f,
                "**{first}** ({}) vs **{second}** ({})",
                self.tally.get(first).copied().unwrap_or(0),
                self.tally.get(second).copied().unwrap_or(0),
            )
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct State {
        pub entries: Vec<Entry>,
        pub vote: Option<Vote>,
        pub winner: Option<Entry>,
    }

    impl fmt::Display for State {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            if let Some(winner) = &self.winner {
                return write!(f, "Winner: **{winner}**");
            }

            match &self.vote {
                Some(vote) => writeln!(f, "Now voting: {vote}")?,
                None => writeln!(f, "No vote in progress")?,
            };
            if self.entries.is_empty() {
                return write!(f, "Up next: nothing");
            }

            let mut shown: Vec<&str> = Vec::new();
            let mut used = 0;
            for entry in self.entries.iter() {
                used += entry.len() + 2;
                if used > UP_NEXT_BUDGET {
                    break;
                }
                shown.push(entry);
            }

            let hidden = self.entries.len() - shown.len();
            match (shown.is_empty(), hidden) {
                (true, _) => write!(f, "Up next: {hidden} entries"),
                (false, 0) => write!(f, "Up next: {}", shown.join(", ")),
                (false, _) => write!(f, "Up next: {} and {hidden} more", shown.join(", ")),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TransitionError {
        NotEnoughEntries,
        DuplicateEntry(Entry),
        AlreadyDecided(Entry),
        NotInPair(Entry),
        NoVoteInProgress(Entry),
    }

    impl fmt::Display for TransitionError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            match self {
                TransitionError::NotEnoughEntries => {
                    write!(f, "At least two entries are needed to form a pair")
                }
                TransitionError::DuplicateEntry(entry) => {
                    write!(f, "'{entry}' is listed more than once")
                }
                TransitionError::AlreadyDecided(winner) => {
                    write!(f, "The bracket is already decided: {winner} won")
                }
                TransitionError::NotInPair(entry) => {
                    write!(f, "'{entry}' is not in the current pair")
                }
                TransitionError::NoVoteInProgress(entry) => {
                    write!(f, "Cannot vote for '{entry}': no pair is being voted on")
                }
            }
        }
    }

    impl Error for TransitionError {}

    /// Entries that can seed a bracket: at least two, none repeated.
    pub fn check_entries(entries: &[Entry]) -> Result<(), TransitionError> {
        if entries.len() < 2 {
            return Err(TransitionError::NotEnoughEntries);
        }

        let mut seen = BTreeSet::new();
        for entry in entries.iter() {
            if !seen.insert(entry) {
                return Err(TransitionError::DuplicateEntry(entry.clone()));
            }
        }
        return Ok(());
    }

    pub fn set_entries<I, E>(state: &State, entries: I) -> State
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        State {
            entries: entries.into_iter().map(Into::into).collect(),
            ..state.clone()
        }
    }

    /// Resolves the pair under vote (if any) and pairs up the next two entries.
    pub fn next(state: &State) -> Result<State, TransitionError> {
        if let Some(winner) = &state.winner {
            return Err(TransitionError::AlreadyDecided(winner.clone()));
        }

        let mut queue: Vec<Entry> = state.entries.clone();
        match &state.vote {
            Some(vote) => queue.extend(vote.survivors()),
            None if queue.len() < 2 => return Err(TransitionError::NotEnoughEntries),
            None => {}
        }

        let mut queue = queue.into_iter();
        match (queue.next(), queue.next()) {
            (Some(first), Some(second)) => Ok(State {
                entries: queue.collect(),
                vote: Some(Vote::new(first, second)),
                winner: None,
            }),
            (Some(winner), None) => Ok(State {
                entries: Vec::new(),
                vote: None,
                winner: Some(winner),
            }),
            (None, _) => Err(TransitionError::NotEnoughEntries),
        }
    }

    pub fn vote(vote_state: &Vote, entry: &str) -> Result<Vote, TransitionError> {
        if !vote_state.pair.iter().any(|candidate| candidate == entry) {
            return Err(TransitionError::NotInPair(entry.to_string()));
        }

        let mut tally = vote_state.tally.clone();
        *tally.entry(entry.to_string()).or_insert(0) += 1;

        return Ok(Vote {
            pair: vote_state.pair.clone(),
            tally,
        });
    }

    #[cfg(test)]
    fn entries(names: &[&str]) -> Vec<Entry> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[cfg(test)]
    fn vote_with(first: &str, second: &str, counts: &[(&str, u32)]) -> Vote {
        Vote {
            pair: [first.to_string(), second.to_string()],
            tally: counts
                .iter()
                .map(|(entry, count)| (entry.to_string(), *count))
                .collect(),
        }
    }

    #[test]
    fn test_set_entries() {
        let state = State::default();
        let next_state = set_entries(&state, ["Trainspotting", "28 Days Later"]);
        assert_eq!(
            next_state,
            State {
                entries: entries(&["Trainspotting", "28 Days Later"]),
                vote: None,
                winner: None,
            }
        );
    }

    #[test]
    fn test_set_entries_keeps_other_fields() {
        let state = State {
            entries: entries(&["Sunshine"]),
            vote: Some(Vote::new(
                "Trainspotting".to_string(),
                "28 Days Later".to_string(),
            )),
            winner: None,
        };
        let next_state = set_entries(&state, entries(&["Millions", "127 Hours"]));
        assert_eq!(next_state.entries, entries(&["Millions", "127 Hours"]));
        assert_eq!(next_state.vote, state.vote);
    }

    #[test]
    fn test_next() {
        struct Case {
            name: &'static str,
            state: State,
            expected: State,
        }

        let cases = [
            Case {
                name: "takes the next two entries under vote",
                state: State {
                    entries: entries(&["Trainspotting", "28 Days Later", "Sunshine"]),
                    vote: None,
                    winner: None,
                },
                expected: State {
                    entries: entries(&["Sunshine"]),
                    vote: Some(vote_with("Trainspotting", "28 Days Later", &[])),
                    winner: None,
                },
            },
            Case {
                name: "puts winner of current vote back to entries",
                state: State {
                    entries: entries(&["Sunshine", "Millions", "127 Hours"]),
                    vote: Some(vote_with(
                        "Trainspotting",
                        "28 Days Later",
                        &[("Trainspotting", 4), ("28 Days Later", 2)],
                    )),
                    winner: None,
                },
                expected: State {
                    entries: entries(&["127 Hours", "Trainspotting"]),
                    vote: Some(vote_with("Sunshine", "Millions", &[])),
                    winner: None,
                },
            },
            Case {
                name: "puts both from tied vote back to entries",
                state: State {
                    entries: entries(&["Sunshine", "Millions", "127 Hours"]),
                    vote: Some(vote_with(
                        "Trainspotting",
                        "28 Days Later",
                        &[("Trainspotting", 3), ("28 Days Later", 3)],
                    )),
                    winner: None,
                },
                expected: State {
                    entries: entries(&["127 Hours", "Trainspotting", "28 Days Later"]),
                    vote: Some(vote_with("Sunshine", "Millions", &[])),
                    winner: None,
                },
            },
            Case {
                name: "marks winner when just one entry left",
                state: State {
                    entries: entries(&[]),
                    vote: Some(vote_with(
                        "Trainspotting",
                        "28 Days Later",
                        &[("Trainspotting", 4), ("28 Days Later", 2)],
                    )),
                    winner: None,
                },
                expected: State {
                    entries: entries(&[]),
                    vote: None,
                    winner: Some("Trainspotting".to_string()),
                },
            },
            Case {
                name: "second entry wins with only its own votes",
                state: State {
                    entries: entries(&["Sunshine"]),
                    vote: Some(vote_with(
                        "Trainspotting",
                        "28 Days Later",
                        &[("28 Days Later", 1)],
                    )),
                    winner: None,
                },
                expected: State {
                    entries: entries(&[]),
                    vote: Some(vote_with("Sunshine", "28 Days Later", &[])),
                    winner: None,
                },
            },
            Case {
                name: "re-pairs a tie with nothing else queued",
                state: State {
                    entries: entries(&[]),
                    vote: Some(vote_with(
                        "Trainspotting",
                        "28 Days Later",
                        &[("Trainspotting", 2), ("28 Days Later", 2)],
                    )),
                    winner: None,
                },
                expected: State {
                    entries: entries(&[]),
                    vote: Some(vote_with("Trainspotting", "28 Days Later", &[])),
                    winner: None,
                },
            },
            Case {
                name: "no votes at all is a tie",
                state: State {
                    entries: entries(&["Sunshine"]),
                    vote: Some(vote_with("Trainspotting", "28 Days Later", &[])),
                    winner: None,
                },
                expected: State {
                    entries: entries(&["28 Days Later"]),
                    vote: Some(vote_with("Sunshine", "Trainspotting", &[])),
                    winner: None,
                },
            },
        ];

        for case in cases.iter() {
            assert_eq!(next(&case.state).unwrap(), case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_next_errors() {
        struct Case {
            state: State,
            expected: TransitionError,
        }

        let cases = [
            Case {
                state: State::default(),
                expected: TransitionError::NotEnoughEntries,
            },
            Case {
                // a lone entry never faced a vote, so it is not a winner
                state: State {
                    entries: entries(&["Sunshine"]),
                    vote: None,
                    winner: None,
                },
                expected: TransitionError::NotEnoughEntries,
            },
            Case {
                state: State {
                    entries: entries(&[]),
                    vote: None,
                    winner: Some("Trainspotting".to_string()),
                },
                expected: TransitionError::AlreadyDecided("Trainspotting".to_string()),
            },
        ];

        for case in cases.iter() {
            assert_eq!(next(&case.state), Err(case.expected.clone()));
        }
    }

    #[test]
    fn test_vote() {
        struct Case {
            state: Vote,
            entry: &'static str,
            expected: Vote,
        }

        let cases = [
            Case {
                // creates a tally for the voted entry
                state: vote_with("Trainspotting", "28 Days Later", &[]),
                entry: "Trainspotting",
                expected: vote_with("Trainspotting", "28 Days Later", &[("Trainspotting", 1)]),
            },
            Case {
                // adds to existing tally for the voted entry
                state: vote_with(
                    "Trainspotting",
                    "28 Days Later",
                    &[("Trainspotting", 3), ("28 Days Later", 2)],
                ),
                entry: "Trainspotting",
                expected: vote_with(
                    "Trainspotting",
                    "28 Days Later",
                    &[("Trainspotting", 4), ("28 Days Later", 2)],
                ),
            },
        ];

        for case in cases.iter() {
            assert_eq!(vote(&case.state, case.entry).unwrap(), case.expected);
        }
    }

    #[test]
    fn test_vote_accumulates_in_any_order() {
        let start = vote_with("Trainspotting", "28 Days Later", &[]);
        let expected = vote_with(
            "Trainspotting",
            "28 Days Later",
            &[("Trainspotting", 2), ("28 Days Later", 1)],
        );

        let orders = [
            ["Trainspotting", "Trainspotting", "28 Days Later"],
            ["Trainspotting", "28 Days Later", "Trainspotting"],
            ["28 Days Later", "Trainspotting", "Trainspotting"],
        ];
        for order in orders.iter() {
            let result = order
                .iter()
                .try_fold(start.clone(), |acc, entry| vote(&acc, entry))
                .unwrap();
            assert_eq!(result, expected, "order {:?}", order);
        }

        let one_each = vote(&vote(&start, "Trainspotting").unwrap(), "28 Days Later").unwrap();
        assert_eq!(
            one_each.tally,
            Tally::from([
                ("Trainspotting".to_string(), 1),
                ("28 Days Later".to_string(), 1),
            ])
        );
    }

    #[test]
    fn test_vote_outside_pair() {
        let state = vote_with("Trainspotting", "28 Days Later", &[("Trainspotting", 1)]);
        assert_eq!(
            vote(&state, "Sunshine"),
            Err(TransitionError::NotInPair("Sunshine".to_string()))
        );
    }

    #[test]
    fn test_check_entries() {
        struct Case {
            entries: Vec<Entry>,
            expected: Result<(), TransitionError>,
        }

        let cases = [
            Case {
                entries: entries(&["Trainspotting", "28 Days Later"]),
                expected: Ok(()),
            },
            Case {
                entries: entries(&["Sunshine"]),
                expected: Err(TransitionError::NotEnoughEntries),
            },
            Case {
                entries: entries(&["Sunshine", "Sunshine"]),
                expected: Err(TransitionError::DuplicateEntry("Sunshine".to_string())),
            },
            Case {
                entries: entries(&["Sunshine", "Millions", "Sunshine"]),
                expected: Err(TransitionError::DuplicateEntry("Sunshine".to_string())),
            },
        ];

        for case in cases.iter() {
            assert_eq!(check_entries(&case.entries), case.expected, "{:?}", case.entries);
        }
    }

    #[test]
    fn test_state_display_truncates_long_queue() {
        let state = State {
            entries: (0..300).map(|i| format!("Entry {i:03}")).collect(),
            vote: Some(vote_with("Trainspotting", "28 Days Later", &[])),
            winner: None,
        };
        let rendered = state.to_string();
        assert!(rendered.len() < 2000, "rendered {} chars", rendered.len());
        assert!(rendered.contains("Entry 134, Entry 135 and 164 more"));

        let huge = State {
            entries: vec!["x".repeat(UP_NEXT_BUDGET), "y".to_string()],
            vote: None,
            winner: None,
        };
        assert_eq!(huge.to_string(), "No vote in progress\nUp next: 2 entries");
    }

    #[test]
    fn test_state_display() {
        let state = State {
            entries: entries(&["Sunshine", "Millions"]),
            vote: Some(vote_with(
                "Trainspotting",
                "28 Days Later",
                &[("Trainspotting", 2)],
            )),
            winner: None,
        };
        assert_eq!(
            state.to_string(),
            "Now voting: **Trainspotting** (2) vs **28 Days Later** (0)\nUp next: Sunshine, Millions"
        );

        let decided = State {
            entries: entries(&[]),
            vote: None,
            winner: Some("Sunshine".to_string()),
        };
        assert_eq!(decided.to_string(), "Winner: **Sunshine**");
    }
}
