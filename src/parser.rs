//! This module provides the parser for machine descriptions, utilizing the `pest` crate.
//! It defines the grammar for `.tm` files and functions to parse the input into a `Program`.
//!
//! Macro entries are built in a second phase, once the whole description has been read,
//! because their alphabet is the declared one or, failing that, every symbol the
//! description uses.

use crate::{
    analyzer::analyze,
    macros::{Macro, Overshoot},
    table::{Entry, Table},
    types::{Direction, Program, State, Symbol, Transition, TuringMachineError, DEFAULT_BLANK_SYMBOL},
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::{BTreeSet, HashSet};

/// Derives a `PestParser` for the description grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct TuringMachineParser;

/// Parses the given input string into a `Program`.
///
/// The parsed program is validated with [`analyze`] before being returned.
///
/// # Returns
///
/// * `Ok(Program)` if the input is successfully parsed and validated.
/// * `Err(TuringMachineError::ParseError)` if there are any syntax errors.
/// * `Err(TuringMachineError::ValidationError)` if the program fails validation.
pub fn parse(input: &str) -> Result<Program, TuringMachineError> {
    let mut pairs = TuringMachineParser::parse(Rule::program, input.trim())
        .map_err(|e| TuringMachineError::ParseError(e.into()))?;
    let root = pairs.next().ok_or_else(|| {
        TuringMachineError::ValidationError("Empty program description".to_string())
    })?;

    let program = parse_program(root)?;

    analyze(&program)?;

    Ok(program)
}

/// A parsed action whose macro, if any, still needs the program's alphabet.
enum ParsedEntry {
    Transition(Transition),
    MoveUntil {
        target: Symbol,
        direction: Direction,
        overshoot: Overshoot,
        next: State,
    },
    Repeat {
        target: Symbol,
        count: usize,
        direction: Direction,
        next: State,
    },
    Fixed {
        distance: usize,
        direction: Direction,
        next: State,
    },
    Call {
        name: String,
        next: State,
    },
}

impl ParsedEntry {
    fn symbols(&self) -> Vec<Symbol> {
        match self {
            ParsedEntry::Transition(t) => t.write.into_iter().collect(),
            ParsedEntry::MoveUntil { target, .. } | ParsedEntry::Repeat { target, .. } => {
                vec![*target]
            }
            ParsedEntry::Fixed { .. } | ParsedEntry::Call { .. } => Vec::new(),
        }
    }

    fn into_entry(self, alphabet: &[Symbol]) -> Entry {
        match self {
            ParsedEntry::Transition(t) => Entry::Transition(t),
            ParsedEntry::MoveUntil {
                target,
                direction,
                overshoot,
                next,
            } => Macro::move_until(next, target, direction, overshoot, alphabet.to_vec()).into(),
            ParsedEntry::Repeat {
                target,
                count,
                direction,
                next,
            } => Macro::move_until_repeat(next, target, count, direction, alphabet.to_vec()).into(),
            ParsedEntry::Fixed {
                distance,
                direction,
                next,
            } => Macro::move_fixed(next, distance, direction, alphabet.to_vec()).into(),
            ParsedEntry::Call { name, next } => Macro::library(next, name).into(),
        }
    }
}

type ParsedRules = Vec<(State, Vec<(Symbol, ParsedEntry)>)>;

/// Parses the top-level structure of a description from a `Pair<Rule::program>`.
fn parse_program(pair: Pair<Rule>) -> Result<Program, TuringMachineError> {
    let mut name: Option<String> = None;
    let mut tape: Option<Vec<Symbol>> = None;
    let mut head: Option<usize> = None;
    let mut blank: Option<Symbol> = None;
    let mut declared: Option<Vec<Symbol>> = None;
    let mut rules: Option<ParsedRules> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(parse_inner_string(p, span)?.trim().to_string()),
            Rule::blank => blank = Some(parse_symbol(parse_inner_string(p, span)?)),
            Rule::alphabet => declared = Some(parse_symbols(next_pair(&mut p.into_inner(), span)?)),
            Rule::tape => tape = Some(parse_tape(p, span)?),
            Rule::head => head = Some(parse_number(next_pair(&mut p.into_inner(), span)?)?),
            Rule::rules => rules = Some(parse_rules(p)?),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, "name")?;
    let tape = check_required_rule(tape, "tape")?;
    let rules = check_required_rule(rules, "rules")?;
    let blank = blank.unwrap_or(DEFAULT_BLANK_SYMBOL);
    let head = head.unwrap_or(0);

    let initial_state = rules
        .first()
        .map(|(state, _)| state.clone())
        .ok_or_else(|| TuringMachineError::ValidationError("No states in 'rules' section".to_string()))?;

    let alphabet = match declared {
        Some(declared) => {
            check_declared_alphabet(&declared, blank, &tape, &rules)?;
            declared
        }
        None => infer_alphabet(blank, &tape, &rules),
    };

    let mut table = Table::new();
    for (state, entries) in rules {
        table.insert_state(&state);
        for (symbol, entry) in entries {
            table.insert(&state, symbol, entry.into_entry(&alphabet));
        }
    }

    Ok(Program::new(name, initial_state, table)
        .with_tape(tape, head)
        .with_blank(blank))
}

/// Every symbol the description uses: blank, tape, reads, writes and macro targets.
fn infer_alphabet(blank: Symbol, tape: &[Symbol], rules: &ParsedRules) -> Vec<Symbol> {
    let mut symbols: BTreeSet<Symbol> = tape.iter().copied().collect();
    symbols.insert(blank);
    for (_, entries) in rules {
        for (symbol, entry) in entries {
            symbols.insert(*symbol);
            symbols.extend(entry.symbols());
        }
    }
    symbols.into_iter().collect()
}

fn check_declared_alphabet(
    declared: &[Symbol],
    blank: Symbol,
    tape: &[Symbol],
    rules: &ParsedRules,
) -> Result<(), TuringMachineError> {
    let undeclared = infer_alphabet(blank, tape, rules)
        .into_iter()
        .filter(|s| !declared.contains(s))
        .collect::<Vec<_>>();

    if !undeclared.is_empty() {
        return Err(TuringMachineError::ValidationError(format!(
            "Symbols used but not declared in 'alphabet': {:?}",
            undeclared
        )));
    }

    Ok(())
}

/// Parses the tape from either a quoted string or a comma-separated symbol list.
fn parse_tape(pair: Pair<Rule>, span: Span) -> Result<Vec<Symbol>, TuringMachineError> {
    let value = next_pair(&mut pair.into_inner(), span)?;
    match value.as_rule() {
        Rule::string => Ok(parse_inner_string(value, span)?.chars().collect()),
        _ => Ok(parse_symbols(value)),
    }
}

fn parse_symbols(pair: Pair<Rule>) -> Vec<Symbol> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::symbol)
        .map(|p| parse_symbol(p.as_str()))
        .collect()
}

/// Parses the rules section: state blocks in order, the first one being the start state.
fn parse_rules(pair: Pair<Rule>) -> Result<ParsedRules, TuringMachineError> {
    let mut rules: ParsedRules = Vec::new();
    let mut states = HashSet::new();

    for block in pair.into_inner() {
        let span = block.as_span();
        let mut pairs = block.into_inner();
        let state = parse_string(&mut pairs, span)?;

        if !states.insert(state.clone()) {
            return Err(parse_error(&format!("Duplicate state block: {state}"), span));
        }

        let mut entries = Vec::new();
        let mut symbols = HashSet::new();
        for action in pairs {
            let span = action.as_span();
            let (symbol, entry) = parse_action(action)?;
            if !symbols.insert(symbol) {
                return Err(parse_error(
                    &format!("Duplicate action for symbol {symbol:?} in state {state}"),
                    span,
                ));
            }
            entries.push((symbol, entry));
        }

        rules.push((state, entries));
    }

    Ok(rules)
}

/// Parses one action line into its read symbol and entry.
fn parse_action(pair: Pair<Rule>) -> Result<(Symbol, ParsedEntry), TuringMachineError> {
    let span = pair.as_span();
    let rule = pair.as_rule();
    let mut pairs = pair.into_inner();
    let read = parse_symbol(parse_string(&mut pairs, span)?);

    let entry = match rule {
        Rule::write_action => {
            let write = parse_symbol(parse_string(&mut pairs, span)?);
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            let next = parse_string(&mut pairs, span)?;
            ParsedEntry::Transition(Transition::new(next, Some(write), direction))
        }
        Rule::move_action => {
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            let next = parse_string(&mut pairs, span)?;
            ParsedEntry::Transition(Transition::shift(next, direction))
        }
        _ => {
            let call = next_pair(&mut pairs, span)?;
            let next = parse_string(&mut pairs, span)?;
            parse_macro(call, next)?
        }
    };

    Ok((read, entry))
}

/// Parses a macro invocation such as `until(0, R, +1)` or `repeat(#, 4, R)`.
fn parse_macro(pair: Pair<Rule>, next: State) -> Result<ParsedEntry, TuringMachineError> {
    let span = pair.as_span();
    let rule = pair.as_rule();
    let mut pairs = pair.into_inner();

    match rule {
        Rule::until => {
            let target = parse_symbol(parse_string(&mut pairs, span)?);
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            let overshoot = match pairs.next() {
                Some(p) => {
                    let value = p
                        .as_str()
                        .parse::<i64>()
                        .map_err(|e| parse_error(&format!("Invalid overshoot: {e}"), span))?;
                    Overshoot::try_from(value).map_err(|e| parse_error(&e.to_string(), span))?
                }
                None => Overshoot::At,
            };
            Ok(ParsedEntry::MoveUntil {
                target,
                direction,
                overshoot,
                next,
            })
        }
        Rule::repeat => {
            let target = parse_symbol(parse_string(&mut pairs, span)?);
            let count = parse_number(next_pair(&mut pairs, span)?)?;
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            Ok(ParsedEntry::Repeat {
                target,
                count,
                direction,
                next,
            })
        }
        Rule::fixed => {
            let distance = parse_number(next_pair(&mut pairs, span)?)?;
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            Ok(ParsedEntry::Fixed {
                distance,
                direction,
                next,
            })
        }
        _ => Ok(ParsedEntry::Call {
            name: parse_string(&mut pairs, span)?,
            next,
        }),
    }
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports '<' or 'L' for Left, '>' or 'R' for Right, and '-' or 'S' for Stay.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, TuringMachineError> {
    let span = pair.as_span();
    match pair.as_str() {
        "<" | "L" => Ok(Direction::Left),
        ">" | "R" => Ok(Direction::Right),
        "-" | "S" => Ok(Direction::Stay),
        _ => Err(parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            span,
        )),
    }
}

fn parse_number(pair: Pair<Rule>) -> Result<usize, TuringMachineError> {
    let span = pair.as_span();
    pair.as_str()
        .parse::<usize>()
        .map_err(|e| parse_error(&format!("Invalid number: {e}"), span))
}

/// Parses a single character symbol from a string, handling quoted and unquoted symbols.
fn parse_symbol(input: impl AsRef<str>) -> Symbol {
    let input = input.as_ref();
    let inner = input
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(input);
    inner.chars().next().unwrap_or(DEFAULT_BLANK_SYMBOL)
}

/// Creates a `TuringMachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> TuringMachineError {
    TuringMachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Takes the next pair, which the grammar guarantees to exist.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span) -> Result<Pair<'i, Rule>, TuringMachineError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Unexpected end of rule", span))
}

/// Extracts the inner string content from a `Pair`.
fn parse_inner_string(pair: Pair<Rule>, span: Span) -> Result<String, TuringMachineError> {
    Ok(next_pair(&mut pair.into_inner(), span)?.as_str().into())
}

/// Extracts the string content from the current `Pair` in a `Pairs` iterator.
fn parse_string(pairs: &mut Pairs<Rule>, span: Span) -> Result<String, TuringMachineError> {
    Ok(next_pair(pairs, span)?.as_str().into())
}

/// Checks if a given rule has already been declared, ensuring uniqueness for top-level sections.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), TuringMachineError> {
    if !matches!(
        rule,
        Rule::name | Rule::blank | Rule::alphabet | Rule::tape | Rule::head | Rule::rules
    ) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required rule is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, name: &str) -> Result<T, TuringMachineError> {
    value.ok_or_else(|| TuringMachineError::ValidationError(format!("Missing '{name}' section")))
}
