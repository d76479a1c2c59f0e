use pretty_assertions::assert_eq;
use reg_gen::{
    compile, generate, is_automaton, to_postfix, tokenize, Automaton, Generator,
    GeneratorConfig, LengthPolicy, RegGenError, Token,
};
use regex::Regex;
use std::fs;
use std::thread;

/// Patterns written in the shared subset of both syntaxes, so that the
/// `regex` crate can act as the membership oracle
const ORACLE_PATTERNS: &[&str] = &[
    "ab",
    "a|b",
    "a*",
    "(ab|c)*d",
    "[a-z]{2,5}",
    "[0-9a-f]+",
    r"\d{3}\-\d{4}",
    "(?:x|yz)+w?",
    r"\w\W\d\D",
    "(a|b|c)(d|e){2,}",
    "^hello (world|there)$",
    r"a\.b\*",
    "(a{2}b){1,3}",
    " +",
    "x?y?z?",
    "(a|)b",
    "..?",
    "",
];

fn closest() -> GeneratorConfig {
    GeneratorConfig {
        length_policy: LengthPolicy::Closest,
        ..GeneratorConfig::default()
    }
}

fn oracle(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})$", pattern)).unwrap()
}

#[test]
fn test_generated_words_match_the_pattern() {
    for pattern in ORACLE_PATTERNS {
        let regex = oracle(pattern);
        let generator = Generator::with_config(*pattern, closest()).unwrap();

        for length in 0..10 {
            for seed in 0..5 {
                let word = generator.generate(length, Some(seed)).unwrap();
                assert!(
                    regex.is_match(&word.text),
                    "{:?} generated {:?}, which does not match",
                    pattern,
                    word.text
                );
                assert!(generator.automaton().accepts(&word.text));
            }
        }
    }
}

#[test]
fn test_exact_lengths_are_honoured() {
    for (pattern, length) in [("[a-z]{2,5}", 4), ("(ab|c)*d", 6), (r"\w+", 9), ("a*", 0)] {
        let word = generate(pattern, length, Some(11)).unwrap();
        assert_eq!(word.text.chars().count(), length, "pattern {:?}", pattern);
        assert!(oracle(pattern).is_match(&word.text));
    }
}

#[test]
fn test_no_dangling_automaton() {
    for pattern in ORACLE_PATTERNS {
        let automaton = compile(pattern).unwrap();
        let start = automaton.start();
        assert!(
            automaton.outgoing(start).next().is_some() || automaton.is_accepting(start),
            "start state of {:?} is dangling",
            pattern
        );
        assert_eq!(
            automaton.accessible_from(start).len(),
            automaton.state_count(),
            "{:?} kept unreachable states",
            pattern
        );
    }
}

#[test]
fn test_seeded_generation_is_deterministic() {
    for pattern in ["[a-z]+[0-9]*", "(foo|bar|baz)+", r"\W\w\W"] {
        let config = closest();
        let first_gen = Generator::with_config(pattern, config.clone()).unwrap();
        let first = first_gen.generate(12, Some(1234)).unwrap();
        let second_gen = Generator::with_config(pattern, config).unwrap();
        let second = second_gen.generate(12, Some(1234)).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.seed, Some(1234));
    }
}

#[test]
fn test_unseeded_generation() {
    let word = generate("[ab]{6}", 6, None).unwrap();
    assert_eq!(word.seed, None);
    assert!(oracle("[ab]{6}").is_match(&word.text));
}

#[test]
fn test_tokens_and_postfix() {
    let tokens = tokenize("ab").unwrap();
    assert_eq!(
        tokens,
        vec![Token::Char('a'), Token::Concatenation, Token::Char('b')]
    );
    assert_eq!(
        to_postfix(&tokens).unwrap(),
        vec![Token::Char('a'), Token::Char('b'), Token::Concatenation]
    );

    let tokens = tokenize("a|b").unwrap();
    assert_eq!(
        to_postfix(&tokens).unwrap(),
        vec![Token::Char('a'), Token::Char('b'), Token::Alternation]
    );

    let automaton = compile("a|b").unwrap();
    let from_start: Vec<_> = automaton.outgoing(automaton.start()).collect();
    assert_eq!(from_start.len(), 2);
    assert!(from_start.iter().all(|t| t.is_epsilon()));
}

#[test]
fn test_documented_examples() {
    assert_eq!(generate("a*", 0, None).unwrap().text, "");

    let word = generate("[a-c]", 1, Some(0)).unwrap();
    assert!(["a", "b", "c"].contains(&word.text.as_str()));
    assert_eq!(word.text, generate("[a-c]", 1, Some(0)).unwrap().text);
}

#[test]
fn test_compile_errors() {
    match compile("(a") {
        Err(RegGenError::Parse(msg)) => assert_eq!(msg, "mismatched parenthesis"),
        other => panic!("Expected Parse error, got {:?}", other),
    }

    match compile("[z-a]") {
        Err(err @ RegGenError::Lex { .. }) => {
            assert!(format!("{}", err).contains("descending range"))
        }
        other => panic!("Expected Lex error, got {:?}", other),
    }

    assert!(matches!(
        compile("foo(?=bar)"),
        Err(RegGenError::UnsupportedFeature { .. })
    ));
    assert!(matches!(compile("a{1,e}"), Err(RegGenError::Lex { .. })));
    assert!(matches!(compile("a{1,2,3}"), Err(RegGenError::Lex { .. })));
}

#[test]
fn test_anchors_are_ignored() {
    assert_eq!(generate("^ab$", 2, Some(5)).unwrap().text, "ab");
    let automaton = compile("a^b$").unwrap();
    assert!(automaton.accepts("ab"));
}

#[test]
fn test_length_policies() {
    match generate("(ab)+", 3, Some(0)) {
        Err(RegGenError::Generation(msg)) => {
            assert!(msg.contains("no accepting path within length bound"))
        }
        other => panic!("Expected Generation error, got {:?}", other),
    }

    let generator = Generator::with_config("(ab)+", closest()).unwrap();
    let word = generator.generate(3, Some(0)).unwrap();
    assert_eq!(word.text, "ab");
    assert_eq!(word.requested_length, 3);

    let word = generator.generate(0, Some(0)).unwrap();
    assert_eq!(word.text, "ab");
}

#[test]
fn test_automaton_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("automaton.json");

    let automaton = compile(r"(red|green|blue)\-?[0-9]{2}").unwrap();
    automaton.save(&path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(is_automaton(&value));

    let loaded = Automaton::load(&path).unwrap();
    assert_eq!(loaded, automaton);
    assert_eq!(
        generate(&loaded, 6, Some(77)).unwrap().text,
        generate(&automaton, 6, Some(77)).unwrap().text
    );
}

#[test]
fn test_hand_written_automaton_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("automaton.json");

    // s2 is unreachable from the start
    fs::write(
        &path,
        r#"{
            "states": 3,
            "start": 0,
            "accepting": [1, 2],
            "transitions": [
                {"from": 0, "label": {"type": "char", "value": "q"}, "to": 1},
                {"from": 2, "label": null, "to": 1}
            ]
        }"#,
    )
    .unwrap();
    let automaton = Automaton::load(&path).unwrap();
    assert_eq!(automaton.state_count(), 2);
    assert_eq!(automaton.transitions().len(), 1);
    assert_eq!(generate(&automaton, 1, Some(0)).unwrap().text, "q");

    assert!(matches!(
        Automaton::load(&dir.path().join("missing.json")),
        Err(RegGenError::Io(_))
    ));
}

#[test]
fn test_automaton_is_shareable_across_threads() {
    let automaton = compile("[a-f]{4}(x|yy)*").unwrap();
    let expected = generate(&automaton, 10, Some(3)).unwrap().text;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| generate(&automaton, 10, Some(3)).unwrap().text))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
