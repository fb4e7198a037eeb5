use geofes_filter::{EvalError, LikePattern, LikeSyntax};
use rstest::rstest;

fn matches(pattern: &str, text: &str) -> bool {
    LikePattern::compile(pattern, &LikeSyntax::default()).unwrap().is_match(text).unwrap()
}

#[rstest]
#[case("Main*", "Main Street", true)]
#[case("Main*", "main street", false)]
#[case("*Street", "Main Street", true)]
#[case("*in S*", "Main Street", true)]
#[case("M?in*", "Main Street", true)]
#[case("M?in", "Main Street", false)]
#[case("*", "", true)]
#[case("a*b*c", "a--b--c", true)]
#[case("a*b*c", "a--c--b", false)]
#[case("(1.5)?", "(1.5)x", true)]
#[case("[A-Z]*", "[A-Z] ok", true)]
#[case("[A-Z]*", "B", false)]
#[case("line*", "line\nbreak", true)]
fn default_syntax(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
    assert_eq!(matches(pattern, text), expected, "{pattern} ~ {text}");
}

#[rstest]
#[case(r"100\*", "100*", true)]
#[case(r"100\*", "1000", false)]
#[case(r"what\?", "what?", true)]
#[case(r"a\\b", r"a\b", true)]
fn escaped_meta_characters_are_literal(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
    assert_eq!(matches(pattern, text), expected);
}

#[rstest]
fn custom_meta_characters() {
    let syntax = LikeSyntax { wild_card: '%', single_char: '_', escape_char: '!', match_case: true };
    let p = LikePattern::compile("A_!%%", &syntax).unwrap();
    assert!(p.is_match("AB% off").unwrap());
    assert!(!p.is_match("AB off").unwrap());
    // default wildcards are plain characters here
    let p = LikePattern::compile("*?", &syntax).unwrap();
    assert!(p.is_match("*?").unwrap());
    assert!(!p.is_match("x").unwrap());
}

#[rstest]
#[case("Main*")]
#[case("m?IN st*")]
#[case("*STREET")]
fn case_folding(#[case] pattern: &str) {
    let syntax = LikeSyntax { match_case: false, ..LikeSyntax::default() };
    assert!(LikePattern::compile(pattern, &syntax).unwrap().is_match("MAIN Street").unwrap());
}

#[rstest]
#[case('*', '*', '\\')]
#[case('*', '?', '*')]
#[case('*', '?', '?')]
fn colliding_meta_characters_are_rejected(#[case] wild: char, #[case] single: char, #[case] escape: char) {
    let syntax = LikeSyntax { wild_card: wild, single_char: single, escape_char: escape, match_case: true };
    assert!(matches!(LikePattern::compile("a*", &syntax), Err(EvalError::InvalidLikePattern { .. })));
}

#[rstest]
fn dangling_escape_is_rejected() {
    assert!(matches!(
        LikePattern::compile("abc\\", &LikeSyntax::default()),
        Err(EvalError::InvalidLikePattern { .. })
    ));
}
