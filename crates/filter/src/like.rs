//! `PropertyIsLike` pattern matching.
//!
//! Patterns use three configurable meta characters: a wildcard matching any
//! run of characters, a single-character wildcard and an escape character that
//! makes the following character literal. Simple shapes (`abc`, `abc*`, `*abc`,
//! `*abc*`) are matched with string operations, everything else is translated to
//! an anchored regular expression.

use fancy_regex::{Regex, RegexBuilder};

use crate::error::EvalError;

/// Meta characters and case handling of one `PropertyIsLike`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LikeSyntax {
    pub wild_card: char,
    pub single_char: char,
    pub escape_char: char,
    pub match_case: bool,
}

impl Default for LikeSyntax {
    fn default() -> Self {
        Self { wild_card: '*', single_char: '?', escape_char: '\\', match_case: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyRun,
    AnyOne,
}

#[derive(Debug)]
enum Matcher {
    Everything,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(Regex),
}

#[derive(Debug)]
pub struct LikePattern {
    source: String,
    matcher: Matcher,
    fold_case: bool,
}

impl LikePattern {
    pub fn compile(pattern: &str, syntax: &LikeSyntax) -> Result<Self, EvalError> {
        let invalid = |reason| EvalError::InvalidLikePattern { pattern: pattern.to_string(), reason };
        let LikeSyntax { wild_card, single_char, escape_char, match_case } = *syntax;
        if wild_card == single_char || wild_card == escape_char || single_char == escape_char {
            return Err(invalid("wildcard, single character and escape must be distinct"));
        }

        let mut tokens = Vec::with_capacity(pattern.len());
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            let token = if c == escape_char {
                Token::Literal(chars.next().ok_or_else(|| invalid("pattern ends with an escape character"))?)
            } else if c == wild_card {
                Token::AnyRun
            } else if c == single_char {
                Token::AnyOne
            } else {
                Token::Literal(c)
            };
            // consecutive runs collapse
            if !(token == Token::AnyRun && tokens.last() == Some(&Token::AnyRun)) {
                tokens.push(token);
            }
        }

        let fold_case = !match_case;
        let matcher = match simple_shape(&tokens, fold_case) {
            Some(m) => m,
            None => Matcher::Regex(build_regex(pattern, &tokens, fold_case)?),
        };
        Ok(Self { source: pattern.to_string(), matcher, fold_case })
    }

    pub fn is_match(&self, text: &str) -> Result<bool, EvalError> {
        let folded;
        let text = if self.fold_case && !matches!(self.matcher, Matcher::Regex(_)) {
            folded = text.to_lowercase();
            folded.as_str()
        } else {
            text
        };
        Ok(match &self.matcher {
            Matcher::Everything => true,
            Matcher::Exact(s) => text == s,
            Matcher::Prefix(p) => text.starts_with(p.as_str()),
            Matcher::Suffix(s) => text.ends_with(s.as_str()),
            Matcher::Contains(c) => text.contains(c.as_str()),
            Matcher::Regex(re) => re
                .is_match(text)
                .map_err(|e| EvalError::Regex { pattern: self.source.clone(), source: Box::new(e) })?,
        })
    }
}

/// Literal-only patterns with wildcards at most at either end.
fn simple_shape(tokens: &[Token], fold_case: bool) -> Option<Matcher> {
    if tokens.contains(&Token::AnyOne) {
        return None;
    }
    let leading = tokens.first() == Some(&Token::AnyRun);
    let trailing = tokens.len() > 1 && tokens.last() == Some(&Token::AnyRun);
    let inner = &tokens[usize::from(leading)..tokens.len() - usize::from(trailing)];
    let mut literal = String::with_capacity(inner.len());
    for t in inner {
        match t {
            Token::Literal(c) => literal.push(*c),
            _ => return None,
        }
    }
    if fold_case {
        literal = literal.to_lowercase();
    }
    Some(match (leading, trailing) {
        (true, _) if literal.is_empty() => Matcher::Everything,
        (false, false) => Matcher::Exact(literal),
        (false, true) => Matcher::Prefix(literal),
        (true, false) => Matcher::Suffix(literal),
        (true, true) => Matcher::Contains(literal),
    })
}

fn build_regex(pattern: &str, tokens: &[Token], fold_case: bool) -> Result<Regex, EvalError> {
    let mut re = String::with_capacity(tokens.len() * 2 + 2);
    re.push('^');
    for t in tokens {
        match t {
            Token::AnyRun => re.push_str(".*"),
            Token::AnyOne => re.push('.'),
            Token::Literal(c) => {
                if is_regex_meta(*c) {
                    re.push('\\');
                }
                re.push(*c);
            }
        }
    }
    re.push('$');
    let mut builder = RegexBuilder::new(&re);
    builder.case_insensitive(fold_case);
    builder.dot_matches_new_line(true);
    builder
        .build()
        .map_err(|e| EvalError::Regex { pattern: pattern.to_string(), source: Box::new(e) })
}

fn is_regex_meta(c: char) -> bool {
    matches!(c, '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$')
}
