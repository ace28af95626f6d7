use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lrkit::{
    runtime::{self, Node, ParseError, Token},
    Config, Grammar, TableError,
};
use std::{fmt::Write as _, fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Canonical,
    Lalr,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    input: PathBuf,

    /// The construction method of the LR automaton.
    #[arg(long, value_enum, default_value_t = Algorithm::Lalr)]
    algorithm: Algorithm,

    /// Report table conflicts instead of overwriting entries.
    #[arg(long)]
    strict: bool,

    /// Write the expanded grammar, the automaton and the action table next to the input file.
    #[arg(long)]
    dump: bool,

    /// Parse a whitespace-separated sequence of terminal names and print the tree.
    #[arg(long, value_name = "TOKENS")]
    parse: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let in_file =
        fs::canonicalize(&args.input).context("failed to canonicalize the input file name")?;
    let grammar = Grammar::from_file(&in_file)
        .with_context(|| format!("failed to load the grammar from {}", in_file.display()))?;

    let mut config = Config::new();
    match args.algorithm {
        Algorithm::Canonical => config.use_canonical(),
        Algorithm::Lalr => config.use_lalr(),
    };
    config.strict(args.strict);

    let automaton = config.automaton(&grammar);
    let table = match lrkit::ActionTable::new(&grammar, &automaton, config.mode()) {
        Ok(table) => table,
        Err(TableError::Conflicts(conflicts)) => {
            for conflict in &conflicts {
                println!("[conflict] {}", conflict.display(&grammar));
            }
            anyhow::bail!("the grammar has {} conflict(s)", conflicts.len());
        }
    };
    println!(
        "{} productions, {} states",
        grammar.productions().len(),
        table.num_states()
    );

    if args.dump {
        let expanded_file = in_file.with_extension("expanded");
        let automaton_file = in_file.with_extension("automaton");
        let table_file = in_file.with_extension("table");
        fs::write(&expanded_file, grammar.to_string()).context("writing .expanded")?;
        fs::write(&automaton_file, automaton.display(&grammar).to_string())
            .context("writing .automaton")?;
        fs::write(&table_file, table.display(&grammar).to_string()).context("writing .table")?;
    }

    if let Some(input) = &args.parse {
        let mut tokens = vec![];
        for word in input.split_whitespace() {
            let symbol = resolve_terminal(&grammar, word)
                .with_context(|| format!("unknown terminal `{}'", word))?;
            tokens.push(Token::new(symbol, word));
        }
        tokens.push(Token::eoi());

        let mut parser = runtime::Parser::<_, ()>::new(&table);
        match parser.parse(tokens, &mut ()) {
            Ok(root) => print!("{}", render_tree(&grammar, &root)),
            Err(ParseError::Syntax(err)) => {
                let expected: Vec<_> = err
                    .expected
                    .iter()
                    .map(|symbol| grammar.name(*symbol).into_owned())
                    .collect();
                anyhow::bail!(
                    "syntax error at `{}' (expected one of: {})",
                    grammar.name(err.token.symbol),
                    expected.join(" ")
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn resolve_terminal(grammar: &Grammar, word: &str) -> Option<runtime::SymbolID> {
    let symbol = grammar.symbol(word).or_else(|| {
        let mut chars = word.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(runtime::SymbolID::from_char(ch)),
            _ => None,
        }
    })?;
    grammar.is_terminal(symbol).then_some(symbol)
}

fn render_tree<A>(grammar: &Grammar, root: &Node<A>) -> String {
    let mut out = String::new();
    root.walk(&mut |node, depth| {
        let _ = match node.text() {
            Some(text) => writeln!(out, "{:indent$}{} {:?}", "", grammar.name(node.symbol()), text, indent = depth * 2),
            None => writeln!(out, "{:indent$}{}", "", grammar.name(node.symbol()), indent = depth * 2),
        };
    });
    out
}
