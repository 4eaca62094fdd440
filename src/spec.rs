//! The specification input boundary: the parse-tree representation
//! produced by the (external) lexer/parser, the explicit
//! [`Specification`] context that replaces process-wide mutable spec
//! state, and a small textual reader good enough to drive the CLI
//! end to end.

use std::error::Error;
use std::fmt;
use std::io::BufRead;

use crate::predicate::{Predicate, PredicateError, PredicateLayer};
use crate::variables::VariableIndex;

/// A node in a compiled predicate parse tree, as produced by the
/// specification front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    /// A Boolean constant.
    Constant(bool),
    /// A reference to a variable, optionally primed.
    Variable { name: String, primed: bool },
    /// Logical negation.
    Not(Box<ParseTree>),
    /// Logical conjunction.
    And(Box<ParseTree>, Box<ParseTree>),
    /// Logical disjunction.
    Or(Box<ParseTree>, Box<ParseTree>),
    /// Logical implication.
    Implies(Box<ParseTree>, Box<ParseTree>),
    /// Logical equivalence.
    Iff(Box<ParseTree>, Box<ParseTree>),
}

impl ParseTree {
    /// Shorthand for [`ParseTree::Constant(true)`].
    pub fn truth() -> Self {
        Self::Constant(true)
    }

    /// Conjoins `conjuncts` into a single tree, reducing to `true` on an
    /// empty slice. Mirrors how the environment/system transition relation
    /// may be supplied as a sequence of conjuncts to be AND-merged rather
    /// than pre-flattened by the front end.
    pub fn and_merge(conjuncts: Vec<ParseTree>) -> Self {
        conjuncts
            .into_iter()
            .fold(None, |acc, next| match acc {
                None => Some(next),
                Some(prev) => Some(ParseTree::And(Box::new(prev), Box::new(next))),
            })
            .unwrap_or(ParseTree::truth())
    }
}

/// An error produced while reading a textual specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input ended before a complete specification was read.
    UnexpectedEof,
    /// A section header was expected but not found.
    MissingSection(&'static str),
    /// A token could not be parsed as part of a formula.
    UnexpectedToken(String),
    /// A variable was referenced that was never declared.
    UnknownVariable(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::MissingSection(name) => write!(f, "missing section: {}", name),
            Self::UnexpectedToken(tok) => write!(f, "unexpected token: {}", tok),
            Self::UnknownVariable(name) => write!(f, "unknown variable: {}", name),
        }
    }
}

impl Error for ParseError {}

/// The GR(1) specification, held as an explicit value rather than threaded
/// through process-wide mutable globals: environment/system variable
/// lists, initial-condition and transition-relation trees, and the
/// recurrence goal lists for both sides.
#[derive(Debug, Clone)]
pub struct Specification {
    pub env_vars: Vec<String>,
    pub sys_vars: Vec<String>,
    pub env_init: ParseTree,
    pub sys_init: ParseTree,
    /// Conjuncts of the environment transition relation; AND-merged at
    /// compile time.
    pub env_trans: Vec<ParseTree>,
    /// Conjuncts of the system transition relation; AND-merged at compile
    /// time.
    pub sys_trans: Vec<ParseTree>,
    pub env_goals: Vec<ParseTree>,
    pub sys_goals: Vec<ParseTree>,
}

impl Specification {
    /// Returns the variable index implied by this specification's
    /// variable lists.
    pub fn variable_index(&self) -> VariableIndex {
        VariableIndex::new(self.env_vars.clone(), self.sys_vars.clone())
    }
}

/// A specification with every tree compiled down to a predicate, ready for
/// the fixpoint engine, realizability check and strategy builder.
pub struct CompiledSpec {
    pub env_init: Predicate,
    pub sys_init: Predicate,
    pub env_trans: Predicate,
    pub sys_trans: Predicate,
    pub env_goals: Vec<Predicate>,
    pub sys_goals: Vec<Predicate>,
}

impl CompiledSpec {
    /// Compiles a [`Specification`] against the given predicate layer.
    ///
    /// Synthesizes a single trivial goal of `true` for whichever side (or
    /// both) declares no recurrence goals, exactly as the engine handles
    /// the one-pair GR(1) reduction and the `|sys_goals| == 0` case
    /// (treated as "always realizable, invariant loop" rather than
    /// rejected, per the accompanying design notes).
    pub fn compile(
        predicates: &PredicateLayer,
        spec: &Specification,
    ) -> Result<Self, PredicateError> {
        let env_init = predicates.compile(&spec.env_init)?;
        let sys_init = predicates.compile(&spec.sys_init)?;
        let env_trans = predicates.compile(&ParseTree::and_merge(spec.env_trans.clone()))?;
        let sys_trans = predicates.compile(&ParseTree::and_merge(spec.sys_trans.clone()))?;

        let env_goals = if spec.env_goals.is_empty() {
            vec![predicates.truth()]
        } else {
            spec.env_goals
                .iter()
                .map(|t| predicates.compile(t))
                .collect::<Result<_, _>>()?
        };
        let sys_goals = if spec.sys_goals.is_empty() {
            vec![predicates.truth()]
        } else {
            spec.sys_goals
                .iter()
                .map(|t| predicates.compile(t))
                .collect::<Result<_, _>>()?
        };

        Ok(Self {
            env_init,
            sys_init,
            env_trans,
            sys_trans,
            env_goals,
            sys_goals,
        })
    }
}

/// A minimal reader for the gr1c-style textual specification format:
/// variable declarations followed by `ENV INIT:` / `SYS INIT:` /
/// `ENV TRANS:` / `SYS TRANS:` / `ENV GOALS:` / `SYS GOALS:` sections, each
/// holding one formula per line in a small infix syntax
/// (`!`, `&`, `|`, `->`, `<->`, parentheses, and bare variable names,
/// optionally followed by `'` for the primed copy).
///
/// This is a convenience front door for the command-line binary, not a
/// general-purpose LTL grammar: the lexer/parser proper is an external
/// concern. It recognizes exactly the textual shape documented by the
/// reference front end's `-p` dump.
pub fn parse_specification<R: BufRead>(reader: R) -> Result<Specification, ParseError> {
    let mut env_vars = Vec::new();
    let mut sys_vars = Vec::new();
    let mut env_init = ParseTree::truth();
    let mut sys_init = ParseTree::truth();
    let mut env_trans = Vec::new();
    let mut sys_trans = Vec::new();
    let mut env_goals = Vec::new();
    let mut sys_goals = Vec::new();

    let mut declared: Vec<String> = Vec::new();
    let mut section = Section::None;

    for line in reader.lines() {
        let line = line.map_err(|_| ParseError::UnexpectedEof)?;
        let line = strip_comment(&line).trim().to_string();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("ENV VARS:") {
            env_vars = split_names(rest);
            declared.extend(env_vars.iter().cloned());
            continue;
        }
        if let Some(rest) = line.strip_prefix("SYS VARS:") {
            sys_vars = split_names(rest);
            declared.extend(sys_vars.iter().cloned());
            continue;
        }
        if let Some(new_section) = Section::from_header(&line) {
            section = new_section;
            continue;
        }

        let tree = parse_formula(&line, &declared)?;
        match section {
            Section::None => return Err(ParseError::UnexpectedToken(line)),
            Section::EnvInit => env_init = tree,
            Section::SysInit => sys_init = tree,
            Section::EnvTrans => env_trans.push(tree),
            Section::SysTrans => sys_trans.push(tree),
            Section::EnvGoals => env_goals.push(tree),
            Section::SysGoals => sys_goals.push(tree),
        }
    }

    Ok(Specification {
        env_vars,
        sys_vars,
        env_init,
        sys_init,
        env_trans,
        sys_trans,
        env_goals,
        sys_goals,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    EnvInit,
    SysInit,
    EnvTrans,
    SysTrans,
    EnvGoals,
    SysGoals,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        match line {
            "ENV INIT:" => Some(Self::EnvInit),
            "SYS INIT:" => Some(Self::SysInit),
            "ENV TRANS:" => Some(Self::EnvTrans),
            "SYS TRANS:" => Some(Self::SysTrans),
            "ENV GOALS:" => Some(Self::EnvGoals),
            "SYS GOALS:" => Some(Self::SysGoals),
            _ => None,
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn split_names(rest: &str) -> Vec<String> {
    rest.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// A small recursive-descent parser for the infix formula syntax,
/// precedence from loosest to tightest: `<->`, `->`, `|`, `&`, `!`, atom.
fn parse_formula(line: &str, declared: &[String]) -> Result<ParseTree, ParseError> {
    let tokens = tokenize(line)?;
    let mut pos = 0;
    let tree = parse_iff(&tokens, &mut pos, declared)?;
    if pos != tokens.len() {
        return Err(ParseError::UnexpectedToken(tokens[pos].clone()));
    }
    Ok(tree)
}

fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' || c == ')' || c == '!' || c == '&' || c == '|' {
            tokens.push(c.to_string());
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'>') {
            tokens.push("->".to_string());
            i += 2;
        } else if c == '<' && chars.get(i + 1) == Some(&'-') && chars.get(i + 2) == Some(&'>') {
            tokens.push("<->".to_string());
            i += 3;
        } else if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let mut name: String = chars[start..i].iter().collect();
            if i < chars.len() && chars[i] == '\'' {
                name.push('\'');
                i += 1;
            }
            tokens.push(name);
        } else {
            return Err(ParseError::UnexpectedToken(c.to_string()));
        }
    }
    Ok(tokens)
}

fn parse_iff(
    tokens: &[String],
    pos: &mut usize,
    declared: &[String],
) -> Result<ParseTree, ParseError> {
    let lhs = parse_implies(tokens, pos, declared)?;
    if tokens.get(*pos).map(String::as_str) == Some("<->") {
        *pos += 1;
        let rhs = parse_iff(tokens, pos, declared)?;
        Ok(ParseTree::Iff(Box::new(lhs), Box::new(rhs)))
    } else {
        Ok(lhs)
    }
}

fn parse_implies(
    tokens: &[String],
    pos: &mut usize,
    declared: &[String],
) -> Result<ParseTree, ParseError> {
    let lhs = parse_or(tokens, pos, declared)?;
    if tokens.get(*pos).map(String::as_str) == Some("->") {
        *pos += 1;
        let rhs = parse_implies(tokens, pos, declared)?;
        Ok(ParseTree::Implies(Box::new(lhs), Box::new(rhs)))
    } else {
        Ok(lhs)
    }
}

fn parse_or(
    tokens: &[String],
    pos: &mut usize,
    declared: &[String],
) -> Result<ParseTree, ParseError> {
    let mut lhs = parse_and(tokens, pos, declared)?;
    while tokens.get(*pos).map(String::as_str) == Some("|") {
        *pos += 1;
        let rhs = parse_and(tokens, pos, declared)?;
        lhs = ParseTree::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(
    tokens: &[String],
    pos: &mut usize,
    declared: &[String],
) -> Result<ParseTree, ParseError> {
    let mut lhs = parse_not(tokens, pos, declared)?;
    while tokens.get(*pos).map(String::as_str) == Some("&") {
        *pos += 1;
        let rhs = parse_not(tokens, pos, declared)?;
        lhs = ParseTree::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_not(
    tokens: &[String],
    pos: &mut usize,
    declared: &[String],
) -> Result<ParseTree, ParseError> {
    if tokens.get(*pos).map(String::as_str) == Some("!") {
        *pos += 1;
        let inner = parse_not(tokens, pos, declared)?;
        Ok(ParseTree::Not(Box::new(inner)))
    } else {
        parse_atom(tokens, pos, declared)
    }
}

fn parse_atom(
    tokens: &[String],
    pos: &mut usize,
    declared: &[String],
) -> Result<ParseTree, ParseError> {
    let tok = tokens.get(*pos).ok_or(ParseError::UnexpectedEof)?;
    if tok == "(" {
        *pos += 1;
        let inner = parse_iff(tokens, pos, declared)?;
        if tokens.get(*pos).map(String::as_str) != Some(")") {
            return Err(ParseError::UnexpectedToken(
                tokens.get(*pos).cloned().unwrap_or_default(),
            ));
        }
        *pos += 1;
        Ok(inner)
    } else if tok == "true" || tok == "True" || tok == "1" {
        *pos += 1;
        Ok(ParseTree::Constant(true))
    } else if tok == "false" || tok == "False" || tok == "0" {
        *pos += 1;
        Ok(ParseTree::Constant(false))
    } else {
        *pos += 1;
        let (name, primed) = if let Some(stripped) = tok.strip_suffix('\'') {
            (stripped.to_string(), true)
        } else {
            (tok.clone(), false)
        };
        if !declared.iter().any(|v| v == &name) {
            return Err(ParseError::UnknownVariable(name));
        }
        Ok(ParseTree::Variable { name, primed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_merge_empty_is_true() {
        assert_eq!(ParseTree::and_merge(vec![]), ParseTree::truth());
    }

    #[test]
    fn test_and_merge_single() {
        let t = ParseTree::Variable {
            name: "a".to_string(),
            primed: false,
        };
        assert_eq!(ParseTree::and_merge(vec![t.clone()]), t);
    }

    #[test]
    fn test_parse_simple_formula() {
        let declared = vec!["a".to_string(), "b".to_string()];
        let tree = parse_formula("a & !b'", &declared).unwrap();
        assert_eq!(
            tree,
            ParseTree::And(
                Box::new(ParseTree::Variable {
                    name: "a".to_string(),
                    primed: false
                }),
                Box::new(ParseTree::Not(Box::new(ParseTree::Variable {
                    name: "b".to_string(),
                    primed: true
                })))
            )
        );
    }

    #[test]
    fn test_parse_full_specification() {
        let input = "ENV VARS: e\nSYS VARS: s\nENV INIT:\ntrue\nSYS INIT:\n!s\nENV TRANS:\nSYS TRANS:\ns' <-> e\nENV GOALS:\ne\nSYS GOALS:\ns\n";
        let spec = parse_specification(input.as_bytes()).unwrap();
        assert_eq!(spec.env_vars, vec!["e".to_string()]);
        assert_eq!(spec.sys_vars, vec!["s".to_string()]);
        assert_eq!(spec.env_goals.len(), 1);
        assert_eq!(spec.sys_goals.len(), 1);
        assert_eq!(spec.sys_trans.len(), 1);
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let declared = vec!["a".to_string()];
        let err = parse_formula("z", &declared).unwrap_err();
        assert_eq!(err, ParseError::UnknownVariable("z".to_string()));
    }
}
