use lrkit::automaton::{
    epsilon_closure, integrate, minimize, nfa_to_dfa, Dfa, Edge, Nfa, SymbolID,
};

fn sym(ch: char) -> SymbolID {
    SymbolID::from_char(ch)
}

// a(b|c+)c
fn pattern() -> Nfa {
    Nfa::from_edges(
        [
            Edge::new(sym('a'), 0, 1),
            Edge::epsilon(1, 2),
            Edge::epsilon(1, 4),
            Edge::new(sym('b'), 2, 3),
            Edge::new(sym('c'), 4, 5),
            Edge::epsilon(5, 4),
            Edge::epsilon(3, 6),
            Edge::epsilon(5, 6),
            Edge::new(sym('c'), 6, 7),
        ],
        [(7, 1)],
    )
}

fn literal(s: &str) -> Dfa {
    let mut dfa = Dfa::new();
    let mut state = 0;
    for ch in s.chars() {
        let next = dfa.add_state();
        dfa.set_transition(state, sym(ch), next);
        state = next;
    }
    dfa.set_finality(state, 1);
    dfa
}

#[test]
fn thompson_nfa_to_minimal_dfa() {
    let nfa = pattern();
    assert_eq!(
        epsilon_closure([1], &nfa).into_iter().collect::<Vec<_>>(),
        [1, 2, 4]
    );

    let dfa = minimize(&nfa_to_dfa(&nfa));
    eprintln!("{}", dfa);

    for input in ["abc", "acc", "accc", "accccc"] {
        assert_eq!(dfa.accepts_str(input), 1, "{:?}", input);
    }
    for input in ["", "a", "ab", "ac", "abbc", "abcc", "bc"] {
        assert_eq!(dfa.accepts_str(input), 0, "{:?}", input);
    }

    // start, a, ab, ac, abc and ac+c.
    assert_eq!(dfa.num_states(), 6);
    assert_eq!(minimize(&dfa), dfa);
}

#[test]
fn integrated_recognizer_reports_the_pattern() {
    let regex = minimize(&nfa_to_dfa(&pattern()));
    let dfa = integrate(&[regex, literal("ab"), literal("ac")]);

    assert_eq!(dfa.accepts_str("abc"), 1);
    assert_eq!(dfa.accepts_str("acc"), 1);
    assert_eq!(dfa.accepts_str("ab"), 2);
    assert_eq!(dfa.accepts_str("ac"), 3);
    assert_eq!(dfa.accepts_str("a"), 0);
    assert_eq!(dfa.accepts_str("abcc"), 0);
    assert_eq!(minimize(&dfa), dfa);
}
