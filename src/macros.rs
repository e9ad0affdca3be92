//! Parameterized sub-machines ("macros").
//!
//! A [`Macro`] sits in a table entry and stands for a whole fragment of states. Each
//! instantiation is named by a hygiene prefix: every state the fragment defines starts
//! with it, so sibling instantiations never collide. Prefixes are either supplied by
//! the caller or drawn from a [`Hygiene`] counter threaded through expansion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::expand::expand;
use crate::library;
use crate::table::{Entry, Table};
use crate::types::{Direction, State, Symbol, Transition, TuringMachineError};

/// Hands out unique hygiene prefixes.
///
/// Generated prefixes contain `$`, which the description grammar does not accept in
/// state names, so they cannot clash with parsed states.
#[derive(Debug, Default)]
pub struct Hygiene {
    next_id: u64,
}

impl Hygiene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_prefix(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("${id}_")
    }

    /// Moves the counter past every generated prefix already used in `table`, whether
    /// by a state or by a pinned macro prefix.
    pub fn reserve(&mut self, table: &Table) {
        let states = table.all_states();
        let pinned = table.entries().filter_map(|(_, _, entry)| match entry {
            Entry::Macro(call) => call.prefix.as_deref(),
            Entry::Transition(_) => None,
        });

        let used = states.iter().map(String::as_str).chain(pinned);
        if let Some(id) = used.filter_map(prefix_id).max() {
            self.next_id = self.next_id.max(id + 1);
        }
    }
}

/// The counter value behind a `${id}_` prefix at the start of `name`.
fn prefix_id(name: &str) -> Option<u64> {
    let rest = name.strip_prefix('$')?;
    let (id, _) = rest.split_once('_')?;
    id.parse().ok()
}

/// Where `MoveUntil` stops relative to the symbol it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overshoot {
    /// One cell before the symbol (reverses one step after finding it).
    Before,
    /// On the symbol.
    At,
    /// One cell past the symbol.
    Past,
}

impl TryFrom<i64> for Overshoot {
    type Error = TuringMachineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Overshoot::Before),
            0 => Ok(Overshoot::At),
            1 => Ok(Overshoot::Past),
            _ => Err(TuringMachineError::InvalidParameter(format!(
                "overshoot must be -1, 0 or 1, got {value}"
            ))),
        }
    }
}

/// The closed set of macro kinds, each carrying its own parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MacroKind {
    /// Move in `direction` until `target` is under the head.
    MoveUntil {
        target: Symbol,
        direction: Direction,
        overshoot: Overshoot,
        alphabet: Vec<Symbol>,
    },
    /// Move in `direction` until the `count`-th occurrence of `target`.
    MoveUntilRepeat {
        target: Symbol,
        count: usize,
        direction: Direction,
        alphabet: Vec<Symbol>,
    },
    /// Move exactly `distance` cells regardless of content.
    MoveFixed {
        distance: usize,
        direction: Direction,
        alphabet: Vec<Symbol>,
    },
    /// A pre-built table entered at `entry`. Transitions into its halting states
    /// continue at the macro's return state.
    Fragment { table: Table, entry: State },
    /// A fragment taken from the embedded sub-machine library.
    Library { name: String },
}

impl MacroKind {
    /// The symbols this macro reads or writes.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        match self {
            MacroKind::MoveUntil {
                target, alphabet, ..
            }
            | MacroKind::MoveUntilRepeat {
                target, alphabet, ..
            } => alphabet.iter().copied().chain([*target]).collect(),
            MacroKind::MoveFixed { alphabet, .. } => alphabet.iter().copied().collect(),
            MacroKind::Fragment { table, .. } => table.alphabet(),
            MacroKind::Library { name } => library::get(name)
                .map(|program| program.alphabet().into_iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// A macro instantiation: what to generate, where to continue afterwards, and the
/// optional caller-supplied hygiene prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub kind: MacroKind,
    pub return_state: State,
    pub prefix: Option<String>,
}

impl Macro {
    pub fn new(kind: MacroKind, return_state: impl Into<State>) -> Self {
        Self {
            kind,
            return_state: return_state.into(),
            prefix: None,
        }
    }

    pub fn move_until(
        return_state: impl Into<State>,
        target: Symbol,
        direction: Direction,
        overshoot: Overshoot,
        alphabet: Vec<Symbol>,
    ) -> Self {
        Self::new(
            MacroKind::MoveUntil {
                target,
                direction,
                overshoot,
                alphabet,
            },
            return_state,
        )
    }

    pub fn move_until_repeat(
        return_state: impl Into<State>,
        target: Symbol,
        count: usize,
        direction: Direction,
        alphabet: Vec<Symbol>,
    ) -> Self {
        Self::new(
            MacroKind::MoveUntilRepeat {
                target,
                count,
                direction,
                alphabet,
            },
            return_state,
        )
    }

    pub fn move_fixed(
        return_state: impl Into<State>,
        distance: usize,
        direction: Direction,
        alphabet: Vec<Symbol>,
    ) -> Self {
        Self::new(
            MacroKind::MoveFixed {
                distance,
                direction,
                alphabet,
            },
            return_state,
        )
    }

    pub fn fragment(return_state: impl Into<State>, table: Table, entry: impl Into<State>) -> Self {
        Self::new(
            MacroKind::Fragment {
                table,
                entry: entry.into(),
            },
            return_state,
        )
    }

    pub fn library(return_state: impl Into<State>, name: impl Into<String>) -> Self {
        Self::new(MacroKind::Library { name: name.into() }, return_state)
    }

    /// Pins the hygiene prefix instead of drawing one at expansion time.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Generates the macro's fragment and entry state.
    ///
    /// Every state defined by the fragment starts with the instantiation's prefix, and
    /// every path out of it leads to `return_state`. The fragment may still contain
    /// macro entries; callers run [`expand`] to a fixpoint.
    pub fn assemble(&self, hygiene: &mut Hygiene) -> Result<(Table, State), TuringMachineError> {
        let prefix = match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => hygiene.fresh_prefix(),
        };

        match &self.kind {
            MacroKind::MoveUntil {
                target,
                direction,
                overshoot,
                alphabet,
            } => {
                check_direction(*direction)?;
                check_target(*target, alphabet)?;
                Ok(self.move_until_fragment(&prefix, *target, *direction, *overshoot, alphabet))
            }
            MacroKind::MoveUntilRepeat {
                target,
                count,
                direction,
                alphabet,
            } => {
                check_direction(*direction)?;
                check_target(*target, alphabet)?;
                if *count == 0 {
                    return Err(TuringMachineError::InvalidParameter(
                        "repeat count must be at least 1".to_string(),
                    ));
                }

                let mut chain = Table::new();
                for i in 1..=*count {
                    let (next, overshoot) = if i == *count {
                        (self.return_state.clone(), Overshoot::At)
                    } else {
                        (format!("{prefix}{}", i + 1), Overshoot::Past)
                    };
                    let step = Macro::move_until(next, *target, *direction, overshoot, alphabet.clone())
                        .with_prefix(format!("{prefix}{i}_"));
                    for &symbol in alphabet {
                        chain.insert(&format!("{prefix}{i}"), symbol, step.clone());
                    }
                }

                // Compiled here so the fragment handed back is already primitive.
                Ok((expand(&chain, hygiene)?, format!("{prefix}1")))
            }
            MacroKind::MoveFixed {
                distance,
                direction,
                alphabet,
            } => {
                check_direction(*direction)?;
                if *distance == 0 {
                    return Err(TuringMachineError::InvalidParameter(
                        "fixed move distance must be at least 1".to_string(),
                    ));
                }

                let mut fragment = Table::new();
                for i in 1..=*distance {
                    let next = if i == *distance {
                        self.return_state.clone()
                    } else {
                        format!("{prefix}{}", i + 1)
                    };
                    for &symbol in alphabet {
                        fragment.insert(
                            &format!("{prefix}{i}"),
                            symbol,
                            Transition::shift(next.clone(), *direction),
                        );
                    }
                }
                Ok((fragment, format!("{prefix}1")))
            }
            MacroKind::Fragment { table, entry } => {
                Ok(self.embed_fragment(&prefix, table, entry))
            }
            MacroKind::Library { name } => {
                let program = library::get(name)?;
                Ok(self.embed_fragment(&prefix, &program.table, &program.initial_state))
            }
        }
    }

    fn move_until_fragment(
        &self,
        prefix: &str,
        target: Symbol,
        direction: Direction,
        overshoot: Overshoot,
        alphabet: &[Symbol],
    ) -> (Table, State) {
        let scan = format!("{prefix}1");
        let mut fragment = Table::new();

        for &symbol in alphabet.iter().filter(|&&s| s != target) {
            fragment.insert(&scan, symbol, Transition::shift(scan.clone(), direction));
        }

        let found = match overshoot {
            Overshoot::Before => Transition::shift(self.return_state.clone(), direction.reverse()),
            Overshoot::At => Transition::null(self.return_state.clone()),
            Overshoot::Past => Transition::shift(self.return_state.clone(), direction),
        };
        fragment.insert(&scan, target, found);

        (fragment, scan)
    }

    fn embed_fragment(&self, prefix: &str, table: &Table, entry: &str) -> (Table, State) {
        let rename = |state: &str| -> State {
            if table.is_halting(state) {
                self.return_state.clone()
            } else {
                format!("{prefix}{state}")
            }
        };

        let mut fragment = Table::new();
        for (state, symbol, entry) in table.entries() {
            let entry = match entry {
                Entry::Transition(t) => Entry::Transition(Transition {
                    next_state: rename(&t.next_state),
                    ..t.clone()
                }),
                Entry::Macro(call) => Entry::Macro(Macro {
                    kind: call.kind.clone(),
                    return_state: rename(&call.return_state),
                    // Re-prefixed so two embeddings of the same fragment stay apart.
                    prefix: call.prefix.as_ref().map(|inner| format!("{prefix}{inner}")),
                }),
            };
            fragment.insert(&format!("{prefix}{state}"), symbol, entry);
        }

        (fragment, rename(entry))
    }
}

fn check_direction(direction: Direction) -> Result<(), TuringMachineError> {
    if direction == Direction::Stay {
        return Err(TuringMachineError::InvalidParameter(
            "direction must be Left or Right".to_string(),
        ));
    }
    Ok(())
}

fn check_target(target: Symbol, alphabet: &[Symbol]) -> Result<(), TuringMachineError> {
    if !alphabet.contains(&target) {
        return Err(TuringMachineError::InvalidParameter(format!(
            "target symbol {target:?} is not in the alphabet {alphabet:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: [Symbol; 4] = ['0', '1', '#', '@'];

    #[test]
    fn test_hygiene_prefixes_are_unique() {
        let mut hygiene = Hygiene::new();
        let a = hygiene.fresh_prefix();
        let b = hygiene.fresh_prefix();

        assert_ne!(a, b);
        assert!(a.contains('$'));
    }

    #[test]
    fn test_hygiene_skips_prefixes_in_use() {
        let mut table = Table::new();
        table.insert("$4_1", '0', Transition::shift("$4_2", Direction::Right));
        table.insert(
            "a",
            '0',
            Macro::move_fixed("b", 1, Direction::Left, vec!['0']).with_prefix("$7_"),
        );
        table.insert("b", '0', Transition::shift("$c_d", Direction::Left));

        let mut hygiene = Hygiene::new();
        hygiene.reserve(&table);
        assert_eq!(hygiene.fresh_prefix(), "$8_");

        hygiene.reserve(&Table::new());
        assert_eq!(hygiene.fresh_prefix(), "$9_");
    }

    #[test]
    fn test_overshoot_from_integer() {
        assert_eq!(Overshoot::try_from(-1).unwrap(), Overshoot::Before);
        assert_eq!(Overshoot::try_from(0).unwrap(), Overshoot::At);
        assert_eq!(Overshoot::try_from(1).unwrap(), Overshoot::Past);
        assert!(matches!(
            Overshoot::try_from(2),
            Err(TuringMachineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_move_until_fragment() {
        let call = Macro::move_until("next", '#', Direction::Right, Overshoot::Before, ALPHABET.to_vec())
            .with_prefix("mu_");
        let (fragment, entry) = call.assemble(&mut Hygiene::new()).unwrap();

        assert_eq!(entry, "mu_1");
        assert_eq!(fragment.len(), 4);
        assert_eq!(
            fragment.transition("mu_1", '0'),
            Some(&Transition::shift("mu_1", Direction::Right))
        );
        assert_eq!(
            fragment.transition("mu_1", '#'),
            Some(&Transition::shift("next", Direction::Left))
        );
    }

    #[test]
    fn test_move_until_at_emits_null_exit() {
        let call = Macro::move_until("next", '1', Direction::Left, Overshoot::At, vec!['0', '1']);
        let (fragment, entry) = call.assemble(&mut Hygiene::new()).unwrap();

        assert_eq!(fragment.transition(&entry, '1'), Some(&Transition::null("next")));
    }

    #[test]
    fn test_move_until_repeat_is_self_compiled() {
        let call = Macro::move_until_repeat("next", '0', 3, Direction::Right, ALPHABET.to_vec())
            .with_prefix("r_");
        let (fragment, entry) = call.assemble(&mut Hygiene::new()).unwrap();

        assert_eq!(entry, "r_1");
        assert!(!fragment.has_macros());
        assert_eq!(
            fragment.transition("r_1_1", '0'),
            Some(&Transition::shift("r_2", Direction::Right))
        );
        assert_eq!(fragment.transition("r_3_1", '0'), Some(&Transition::null("next")));
    }

    #[test]
    fn test_move_fixed_fragment() {
        let call = Macro::move_fixed("next", 2, Direction::Left, vec!['0', '1']).with_prefix("f_");
        let (fragment, entry) = call.assemble(&mut Hygiene::new()).unwrap();

        assert_eq!(entry, "f_1");
        assert_eq!(
            fragment.transition("f_1", '1'),
            Some(&Transition::shift("f_2", Direction::Left))
        );
        assert_eq!(
            fragment.transition("f_2", '0'),
            Some(&Transition::shift("next", Direction::Left))
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let mut hygiene = Hygiene::new();
        let cases = [
            Macro::move_until_repeat("n", '0', 0, Direction::Right, vec!['0', '1']),
            Macro::move_fixed("n", 0, Direction::Right, vec!['0', '1']),
            Macro::move_until("n", '0', Direction::Stay, Overshoot::At, vec!['0', '1']),
            Macro::move_until("n", 'x', Direction::Right, Overshoot::At, vec!['0', '1']),
            Macro::library("n", "no_such_machine"),
        ];

        for call in cases {
            assert!(
                matches!(call.assemble(&mut hygiene), Err(TuringMachineError::InvalidParameter(_))),
                "{call:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_fragment_redirects_halts_and_reprefixes_macros() {
        let mut inner = Table::new();
        inner.insert("start", '1', Transition::shift("start", Direction::Right));
        inner.insert(
            "start",
            '0',
            Macro::move_until("done", '1', Direction::Left, Overshoot::Past, vec!['0', '1'])
                .with_prefix("back_"),
        );
        inner.insert_state("done");

        let call = Macro::fragment("after", inner, "start").with_prefix("frag_");
        let (fragment, entry) = call.assemble(&mut Hygiene::new()).unwrap();

        assert_eq!(entry, "frag_start");
        assert!(!fragment.contains_state("frag_done"));
        match fragment.get("frag_start", '0') {
            Some(Entry::Macro(call)) => {
                assert_eq!(call.return_state, "after");
                assert_eq!(call.prefix.as_deref(), Some("frag_back_"));
            }
            other => panic!("expected a macro entry, got {other:?}"),
        }
    }
}
