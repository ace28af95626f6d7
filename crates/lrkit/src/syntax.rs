//! Line-oriented grammar description format.
//!
//! ```text
//! # comment
//! %left '+' '-'
//! %left '*' '/'
//! Q -> E
//! E -> E '+' E | E '*' E
//!    | '-' E %prec '*'
//!    | num
//! ```
//!
//! A line starting with `|` continues the alternatives of the previous line.

mod lexer;

use self::lexer::{Lexer, Spanned, Token};
use crate::{
    grammar::{Assoc, Grammar, GrammarDef, GrammarError, Precedence},
    types::{Map, Set},
};
use lrkit_runtime::SymbolID;

#[derive(Debug, Clone)]
enum Elem {
    Name(String),
    Quoted(String),
}

#[derive(Debug)]
struct Alternative {
    elems: Vec<Elem>,
    prec: Option<Elem>,
}

#[derive(Debug)]
enum Line {
    Rules {
        line: usize,
        left: String,
        alternatives: Vec<Alternative>,
    },
    Prec {
        line: usize,
        assoc: Assoc,
        elems: Vec<Elem>,
    },
}

pub(crate) fn parse(source: &str) -> Result<Grammar, GrammarError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut lines = vec![];
    let mut pending: Option<(usize, Vec<Token<'_>>)> = None;
    for spanned in Lexer::new(source) {
        let (start, token, _): Spanned<'_> = spanned.map_err(|err| {
            let (line, msg) = lexer::describe(err);
            GrammarError::Syntax { line, msg }
        })?;
        // Tokens never span lines, so the start location decides the line.
        let line = start.line as usize + 1;
        if let Some((current, tokens)) = &mut pending {
            if *current == line {
                tokens.push(token);
                continue;
            }
        }
        if let Some((line, tokens)) = pending.replace((line, vec![token])) {
            push_line(&mut lines, line, tokens)?;
        }
    }
    if let Some((line, tokens)) = pending {
        push_line(&mut lines, line, tokens)?;
    }

    let lefts: Set<&str> = lines
        .iter()
        .filter_map(|line| match line {
            Line::Rules { left, .. } => Some(&**left),
            _ => None,
        })
        .collect();

    Grammar::define(|g| {
        let mut symbols = Symbols {
            lefts: &lefts,
            declared: Map::default(),
        };

        // IDs are assigned in order of first appearance.
        for line in &lines {
            match line {
                Line::Rules {
                    line,
                    left,
                    alternatives,
                } => {
                    symbols.resolve(g, *line, &Elem::Name(left.clone()))?;
                    for alt in alternatives {
                        for elem in alt.elems.iter().chain(&alt.prec) {
                            symbols.resolve(g, *line, elem)?;
                        }
                    }
                }
                Line::Prec { line, elems, .. } => {
                    for elem in elems {
                        symbols.resolve(g, *line, elem)?;
                    }
                }
            }
        }

        let mut priority = 0;
        for line in &lines {
            if let Line::Prec { line, assoc, elems } = line {
                priority += 1;
                for elem in elems {
                    let terminal = symbols.resolve(g, *line, elem)?;
                    if lefts.contains(elem_name(elem)) {
                        return Err(GrammarError::Syntax {
                            line: *line,
                            msg: format!("`{}' is not a terminal symbol", elem_name(elem)),
                        });
                    }
                    g.precedence(terminal, Precedence::new(priority, *assoc))?;
                }
            }
        }

        for line in &lines {
            if let Line::Rules {
                line,
                left,
                alternatives,
            } = line
            {
                let left = symbols.resolve(g, *line, &Elem::Name(left.clone()))?;
                for alt in alternatives {
                    let mut right = Vec::with_capacity(alt.elems.len());
                    for elem in &alt.elems {
                        right.push(symbols.resolve(g, *line, elem)?);
                    }
                    let prec = match &alt.prec {
                        Some(elem) => {
                            let symbol = symbols.resolve(g, *line, elem)?;
                            Some(g.terminal_precedence(symbol).ok_or_else(|| {
                                GrammarError::Syntax {
                                    line: *line,
                                    msg: format!(
                                        "`{}' has no declared precedence",
                                        elem_name(elem)
                                    ),
                                }
                            })?)
                        }
                        None => None,
                    };
                    g.rule_with_precedence(left, right, prec)?;
                }
            }
        }

        Ok(())
    })
}

fn push_line(lines: &mut Vec<Line>, line: usize, tokens: Vec<Token<'_>>) -> Result<(), GrammarError> {
    let syntax = |msg| GrammarError::Syntax { line, msg };
    if tokens[0] == Token::Bar {
        let alts = parse_alternatives(tokens.into_iter().skip(1)).map_err(syntax)?;
        return match lines.last_mut() {
            Some(Line::Rules { alternatives, .. }) => {
                alternatives.extend(alts);
                Ok(())
            }
            _ => Err(syntax("`|' does not follow a production".into())),
        };
    }
    let parsed = parse_line(line, tokens).map_err(syntax)?;
    tracing::trace!("line {}: {:?}", line, parsed);
    lines.push(parsed);
    Ok(())
}

struct Symbols<'a> {
    lefts: &'a Set<&'a str>,
    declared: Map<String, SymbolID>,
}

impl Symbols<'_> {
    fn resolve(&mut self, g: &mut GrammarDef, line: usize, elem: &Elem) -> Result<SymbolID, GrammarError> {
        match elem {
            Elem::Quoted(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => g.literal(ch).map_err(|err| match err {
                        GrammarError::LiteralOutOfRange(..) => GrammarError::Syntax {
                            line,
                            msg: err.to_string(),
                        },
                        err => err,
                    }),
                    _ => {
                        let name = format!("'{}'", text);
                        self.named(&name, |g| g.terminal(&name), g)
                    }
                }
            }
            Elem::Name(name) if self.lefts.contains(&**name) => {
                self.named(name, |g| g.nonterminal(name), g)
            }
            Elem::Name(name) => self.named(name, |g| g.terminal(name), g),
        }
    }

    fn named<F>(&mut self, name: &str, declare: F, g: &mut GrammarDef) -> Result<SymbolID, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<SymbolID, GrammarError>,
    {
        if let Some(id) = self.declared.get(name) {
            return Ok(*id);
        }
        let id = declare(g)?;
        self.declared.insert(name.to_owned(), id);
        Ok(id)
    }
}

fn elem_name(elem: &Elem) -> &str {
    match elem {
        Elem::Name(name) | Elem::Quoted(name) => name,
    }
}

fn parse_line(line: usize, tokens: Vec<Token<'_>>) -> Result<Line, String> {
    let mut tokens = tokens.into_iter();

    match tokens.next() {
        Some(Token::Directive(directive)) => {
            let assoc = match directive {
                "left" => Assoc::Left,
                "right" => Assoc::Right,
                "nonassoc" => Assoc::Nonassoc,
                other => return Err(format!("unknown directive `%{}'", other)),
            };
            let elems = tokens
                .map(|token| match token {
                    Token::Name(name) => Ok(Elem::Name(name.to_owned())),
                    Token::Quoted(text) => Ok(Elem::Quoted(text)),
                    token => Err(format!("unexpected {:?} in a precedence declaration", token)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if elems.is_empty() {
                return Err(format!("`%{}' requires at least one terminal", directive));
            }
            Ok(Line::Prec {
                line,
                assoc,
                elems,
            })
        }

        Some(Token::Name(left)) => {
            if tokens.next() != Some(Token::Arrow) {
                return Err(format!("expected `->' after `{}'", left));
            }

            Ok(Line::Rules {
                line,
                left: left.to_owned(),
                alternatives: parse_alternatives(tokens)?,
            })
        }

        Some(token) => Err(format!("unexpected {:?} at the beginning of a line", token)),
        None => Err("empty line".into()),
    }
}

fn parse_alternatives<'input, I>(tokens: I) -> Result<Vec<Alternative>, String>
where
    I: IntoIterator<Item = Token<'input>>,
{
    let mut tokens = tokens.into_iter();
    let mut alternatives = vec![];
    let mut current = Alternative {
        elems: vec![],
        prec: None,
    };
    while let Some(token) = tokens.next() {
        match token {
            Token::Name(name) if current.prec.is_none() => {
                current.elems.push(Elem::Name(name.to_owned()))
            }
            Token::Quoted(text) if current.prec.is_none() => current.elems.push(Elem::Quoted(text)),
            Token::Bar => alternatives.push(std::mem::replace(
                &mut current,
                Alternative {
                    elems: vec![],
                    prec: None,
                },
            )),
            Token::Directive(directive) if directive == "prec" && current.prec.is_none() => {
                current.prec = match tokens.next() {
                    Some(Token::Name(name)) => Some(Elem::Name(name.to_owned())),
                    Some(Token::Quoted(text)) => Some(Elem::Quoted(text)),
                    _ => return Err("`%prec' must be followed by a terminal".into()),
                };
            }
            token => return Err(format!("unexpected {:?}", token)),
        }
    }
    alternatives.push(current);
    Ok(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::FIRST_NAMED_SYMBOL;
    use lrkit_runtime::RuleID;

    #[test]
    fn productions_and_ids() {
        let grammar: Grammar = "
            # expression grammar
            Q->P
            P -> T '+' T | T '-' T
            T -> '(' P ')' | d
        "
        .parse()
        .unwrap();

        let q = grammar.symbol("Q").unwrap();
        let p = grammar.symbol("P").unwrap();
        let t = grammar.symbol("T").unwrap();
        let d = grammar.symbol("d").unwrap();
        assert_eq!(q.raw(), FIRST_NAMED_SYMBOL);
        assert_eq!(p.raw(), FIRST_NAMED_SYMBOL + 1);
        assert_eq!(t.raw(), FIRST_NAMED_SYMBOL + 2);
        assert_eq!(d.raw(), FIRST_NAMED_SYMBOL + 3);
        assert!(grammar.is_nonterminal(t));
        assert!(grammar.is_terminal(d));
        assert!(grammar.is_terminal(SymbolID::from_char('(')));

        assert_eq!(grammar.start_symbol(), q);
        assert_eq!(grammar.productions().len(), 5);
        assert_eq!(
            grammar.production(RuleID::new(2)).right(),
            [t, SymbolID::from_char('-'), t]
        );
    }

    #[test]
    fn empty_alternative_and_escapes() {
        let grammar: Grammar = r"
            S -> L
            L -> L item |
            item -> '\'' | '\\' | '=='
        "
        .parse()
        .unwrap();
        let l = grammar.symbol("L").unwrap();
        assert!(grammar
            .productions_of(l)
            .iter()
            .any(|rule| grammar.production(*rule).right().is_empty()));
        let eq = grammar.symbol("'=='").unwrap();
        assert!(grammar.is_terminal(eq));
        assert!(grammar.is_terminal(SymbolID::from_char('\'')));
        assert!(grammar.is_terminal(SymbolID::from_char('\\')));
    }

    #[test]
    fn precedence_declarations() {
        let grammar: Grammar = "
            %left '+'
            %left '*'
            %right NEG
            S -> E
            E -> E '+' E | E '*' E | '-' E %prec NEG | num
        "
        .parse()
        .unwrap();
        let priorities: Vec<_> = grammar
            .productions()
            .iter()
            .map(|p| p.precedence(&grammar).map(|prec| (prec.priority, prec.assoc)))
            .collect();
        assert_eq!(
            priorities,
            [
                None,
                Some((1, Assoc::Left)),
                Some((2, Assoc::Left)),
                Some((3, Assoc::Right)),
                None,
            ]
        );
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let err = "S -> A\nA -> 'x\n".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 2, .. }), "{}", err);

        let err = "S A\n".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));

        let err = "%unknown x\nS -> x".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));

        let err = "S -> a - b".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));

        let err = "S -> 'λ'".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));

        let err = "S -> E %prec x\nE -> x".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));
    }

    #[test]
    fn continuation_lines() {
        let grammar: Grammar = "
            S -> E
            E -> E '+' E
               | E '*' E   # product
               | num
        "
        .parse()
        .unwrap();
        let e = grammar.symbol("E").unwrap();
        assert_eq!(grammar.productions_of(e).len(), 3);

        let err = "| a\nS -> a".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = "# nothing here\n\n".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Empty));
    }
}
