//! Lexer for the grammar description format.

use lexgen_util::{LexerError, LexerErrorKind, Loc};

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    Name(&'input str),
    /// Quoted text with escapes resolved.
    Quoted(String),
    Directive(&'input str),
    Arrow,
    Bar,
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

lexgen::lexer! {
    pub Lexer -> Token<'input>;

    type Error = String;

    let whitespace = [' ' '\t' '\r' '\n'];
    let comment = '#' (_ # ['\r' '\n'])*;
    let ident = ($$XID_Start | '_') $$XID_Continue*;
    let quoted = '\'' ((_ # ['\'' '\\' '\r' '\n']) | '\\' (_ # ['\r' '\n']))* '\'';

    rule Init {
        $whitespace+,
        $comment,
        "->" = Token::Arrow,
        "|" = Token::Bar,
        '%' $ident => |lexer| {
            let token = Token::Directive(&lexer.match_()[1..]);
            lexer.return_(token)
        },
        $quoted =? |lexer| {
            let token = unquote(lexer.match_()).map(Token::Quoted);
            lexer.return_(token)
        },
        $ident => |lexer| {
            let token = Token::Name(lexer.match_());
            lexer.return_(token)
        },
    }
}

fn unquote(quoted: &str) -> Result<String, String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            text.push(ch);
            continue;
        }
        match chars.next() {
            Some('\'') => text.push('\''),
            Some('\\') => text.push('\\'),
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some(ch) => return Err(format!("unknown escape `\\{}'", ch)),
            None => return Err("dangling escape in a quote".into()),
        }
    }
    if text.is_empty() {
        return Err("empty quote".into());
    }
    Ok(text)
}

/// Splits a lexer error into a 1-based line number and a message.
pub fn describe(err: LexerError<String>) -> (usize, String) {
    let line = err.location.line as usize + 1;
    let msg = match err.kind {
        LexerErrorKind::InvalidToken => format!(
            "unexpected character at column {}",
            err.location.col as usize + 1
        ),
        LexerErrorKind::Custom(msg) => msg,
    };
    (line, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Token::*;

    fn lex(input: &str) -> Result<Vec<(u32, Token<'_>)>, (usize, String)> {
        Lexer::new(input)
            .map(|res| res.map(|(start, t, _)| (start.line, t)).map_err(describe))
            .collect()
    }

    #[test]
    fn smoketest() {
        let input = "\
%left '+' '-'  # additive
Q -> E
E -> E '+' E | '-' E %prec '*'
   | num | '\\'' | '=='
Ｅｘｐｒ -> _tail
";
        let tokens = lex(input).unwrap();
        assert_eq!(
            tokens,
            [
                (0, Directive("left")),
                (0, Quoted("+".into())),
                (0, Quoted("-".into())),
                (1, Name("Q")),
                (1, Arrow),
                (1, Name("E")),
                (2, Name("E")),
                (2, Arrow),
                (2, Name("E")),
                (2, Quoted("+".into())),
                (2, Name("E")),
                (2, Bar),
                (2, Quoted("-".into())),
                (2, Name("E")),
                (2, Directive("prec")),
                (2, Quoted("*".into())),
                (3, Bar),
                (3, Name("num")),
                (3, Bar),
                (3, Quoted("'".into())),
                (3, Bar),
                (3, Quoted("==".into())),
                (4, Name("Ｅｘｐｒ")),
                (4, Arrow),
                (4, Name("_tail")),
            ]
        );
    }

    #[test]
    fn errors_report_lines() {
        assert_eq!(lex("S -> A\nA -> 'x\n").unwrap_err().0, 2);
        assert_eq!(lex("S -> a - b").unwrap_err().0, 1);
        let (line, msg) = lex("\n\nS -> '\\q'").unwrap_err();
        assert_eq!(line, 3);
        assert_eq!(msg, "unknown escape `\\q'");
        assert_eq!(lex("S -> ''").unwrap_err().1, "empty quote");
        assert!(lex("# only a comment").unwrap().is_empty());
    }
}
