//! LALR(1) parse-table construction.
//!
//! The canonical LR(1) collection is built by closure/goto over item sets,
//! then states with equal cores are merged. The result is the ACTION/GOTO
//! table that drives the parser. Construction happens once, at first use.
//!
//! Shift/reduce conflicts are resolved in favour of shift; this covers the
//! dangling `else` and the greedy reading of `name (` as a call header. A
//! reduce/reduce conflict means the grammar itself is broken and panics
//! during construction.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;
use once_cell::sync::Lazy;

use super::grammar::{GrammarSymbol, PRODUCTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
}

pub struct ParseTable {
    actions: HashMap<(usize, GrammarSymbol), Action>,
    gotos: HashMap<(usize, GrammarSymbol), usize>,
}

pub static PARSE_TABLE: Lazy<ParseTable> = Lazy::new(ParseTable::construct);

/// An LR(1) item: a production, a dot position and a lookahead terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    production: usize,
    dot: usize,
    lookahead: GrammarSymbol,
}

impl Item {
    fn next_symbol(&self) -> Option<GrammarSymbol> {
        PRODUCTIONS[self.production].rhs.get(self.dot).copied()
    }
}

type ItemSet = BTreeSet<Item>;

/// FIRST sets for all non-terminals. The grammar has no epsilon productions,
/// which keeps both this computation and the closure below simple.
fn first_sets() -> HashMap<GrammarSymbol, BTreeSet<GrammarSymbol>> {
    let mut first: HashMap<GrammarSymbol, BTreeSet<GrammarSymbol>> = HashMap::new();

    let mut changed = true;
    while changed {
        changed = false;
        for production in PRODUCTIONS {
            let head = production.rhs[0];
            let additions: BTreeSet<GrammarSymbol> = if head.is_terminal() {
                [head].into()
            } else {
                first.get(&head).cloned().unwrap_or_default()
            };

            let entry = first.entry(production.lhs).or_default();
            for symbol in additions {
                changed |= entry.insert(symbol);
            }
        }
    }

    first
}

impl ParseTable {
    pub fn action(&self, state: usize, terminal: GrammarSymbol) -> Option<Action> {
        self.actions.get(&(state, terminal)).copied()
    }

    pub fn goto(&self, state: usize, non_terminal: GrammarSymbol) -> Option<usize> {
        self.gotos.get(&(state, non_terminal)).copied()
    }

    fn construct() -> Self {
        let first = first_sets();

        let closure = |items: ItemSet| -> ItemSet {
            let mut set = items;
            let mut queue: Vec<Item> = set.iter().copied().collect();
            while let Some(item) = queue.pop() {
                let Some(symbol) = item.next_symbol() else {
                    continue;
                };
                if symbol.is_terminal() {
                    continue;
                }

                let rhs = PRODUCTIONS[item.production].rhs;
                let lookaheads: BTreeSet<GrammarSymbol> = match rhs.get(item.dot + 1) {
                    Some(next) if next.is_terminal() => [*next].into(),
                    Some(next) => first.get(next).cloned().unwrap_or_default(),
                    None => [item.lookahead].into(),
                };

                for (index, production) in PRODUCTIONS.iter().enumerate() {
                    if production.lhs != symbol {
                        continue;
                    }
                    for &lookahead in &lookaheads {
                        let new_item = Item {
                            production: index,
                            dot: 0,
                            lookahead,
                        };
                        if set.insert(new_item) {
                            queue.push(new_item);
                        }
                    }
                }
            }
            set
        };

        // canonical LR(1) collection
        let start = closure(
            [Item {
                production: 0,
                dot: 0,
                lookahead: GrammarSymbol::EndOfFile,
            }]
            .into(),
        );

        let mut states: Vec<ItemSet> = vec![start.clone()];
        let mut state_ids: HashMap<ItemSet, usize> = HashMap::from([(start, 0)]);
        let mut transitions: HashMap<(usize, GrammarSymbol), usize> = HashMap::new();

        let mut queue = vec![0usize];
        while let Some(state) = queue.pop() {
            let mut by_symbol: BTreeMap<GrammarSymbol, ItemSet> = BTreeMap::new();
            for item in &states[state] {
                if let Some(symbol) = item.next_symbol() {
                    by_symbol.entry(symbol).or_default().insert(Item {
                        dot: item.dot + 1,
                        ..*item
                    });
                }
            }

            for (symbol, kernel) in by_symbol {
                let target_set = closure(kernel);
                let target = match state_ids.get(&target_set) {
                    Some(id) => *id,
                    None => {
                        let id = states.len();
                        states.push(target_set.clone());
                        state_ids.insert(target_set, id);
                        queue.push(id);
                        id
                    }
                };
                transitions.insert((state, symbol), target);
            }
        }

        // merge states with equal cores (LALR)
        let core_of = |items: &ItemSet| -> BTreeSet<(usize, usize)> {
            items.iter().map(|i| (i.production, i.dot)).collect()
        };

        let mut core_ids: HashMap<BTreeSet<(usize, usize)>, usize> = HashMap::new();
        let mut merged_of: Vec<usize> = Vec::with_capacity(states.len());
        let mut merged_states: Vec<ItemSet> = vec![];
        for state in &states {
            let core = core_of(state);
            let merged = match core_ids.get(&core) {
                Some(id) => *id,
                None => {
                    let id = merged_states.len();
                    core_ids.insert(core, id);
                    merged_states.push(ItemSet::new());
                    id
                }
            };
            merged_of.push(merged);
            merged_states[merged].extend(state.iter().copied());
        }

        let mut merged_transitions: HashMap<(usize, GrammarSymbol), usize> = HashMap::new();
        for ((state, symbol), target) in transitions {
            merged_transitions.insert((merged_of[state], symbol), merged_of[target]);
        }

        debug!(
            "parse table: {} LR(1) states merged into {} LALR states",
            states.len(),
            merged_states.len()
        );

        // fill ACTION and GOTO
        let mut actions: HashMap<(usize, GrammarSymbol), Action> = HashMap::new();
        let mut gotos: HashMap<(usize, GrammarSymbol), usize> = HashMap::new();

        for (state, items) in merged_states.iter().enumerate() {
            for item in items {
                match item.next_symbol() {
                    Some(symbol) => {
                        let target = merged_transitions[&(state, symbol)];
                        if symbol.is_terminal() {
                            actions.insert((state, symbol), Action::Shift(target));
                        } else {
                            gotos.insert((state, symbol), target);
                        }
                    }
                    None if item.production == 0 => {
                        actions.insert((state, item.lookahead), Action::Accept);
                    }
                    None => {
                        let key = (state, item.lookahead);
                        match actions.get(&key) {
                            Some(Action::Shift(_)) | Some(Action::Accept) => {
                                debug!(
                                    "shift/reduce conflict on {:?} in state {state}, keeping shift",
                                    item.lookahead
                                );
                            }
                            Some(Action::Reduce(other)) if *other != item.production => {
                                panic!(
                                    "reduce/reduce conflict in state {state} on {:?}: {} vs {}",
                                    item.lookahead, other, item.production
                                );
                            }
                            _ => {
                                actions.insert(key, Action::Reduce(item.production));
                            }
                        }
                    }
                }
            }
        }

        Self { actions, gotos }
    }
}
