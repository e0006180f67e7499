//! Integration tests for the template lexer.

use confgen::template::{Lexer, ParseError, Token};

fn tokens(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input, ".");
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token().unwrap() {
        tokens.push(token);
    }
    tokens
}

// =============================================================================
// Text and markup
// =============================================================================

#[test]
fn plain_text_is_one_token() {
    assert_eq!(
        tokens("no markup here\nat all"),
        vec![Token::Text("no markup here\nat all".into())]
    );
}

#[test]
fn empty_input_has_no_tokens() {
    assert!(tokens("").is_empty());
}

#[test]
fn element_with_attribute() {
    assert_eq!(
        tokens("hello <a x=\"1\">"),
        vec![
            Token::Text("hello ".into()),
            Token::OpenMarkup,
            Token::Identifier("a".into()),
            Token::Identifier("x".into()),
            Token::Equals,
            Token::QuotedString("1".into()),
            Token::CloseMarkup,
        ]
    );
}

#[test]
fn self_closing_and_close_elements() {
    assert_eq!(
        tokens("<br/></p>"),
        vec![
            Token::OpenMarkup,
            Token::Identifier("br".into()),
            Token::Slash,
            Token::CloseMarkup,
            Token::OpenMarkup,
            Token::Slash,
            Token::Identifier("p".into()),
            Token::CloseMarkup,
        ]
    );
}

#[test]
fn identifiers_may_contain_dashes_and_digits() {
    assert_eq!(
        tokens("<usb-host_2>")[1],
        Token::Identifier("usb-host_2".into())
    );
}

#[test]
fn quoted_string_escapes() {
    assert_eq!(
        tokens(r#"<a v="x\"y\\z">"#)[4],
        Token::QuotedString(r#"x"y\z"#.into())
    );
}

#[test]
fn pushed_back_token_is_returned_first() {
    let mut lexer = Lexer::new("text", ".");
    lexer.push_token(Token::Slash);
    assert_eq!(lexer.next_token().unwrap(), Some(Token::Slash));
    assert_eq!(lexer.next_token().unwrap(), Some(Token::Text("text".into())));
    assert_eq!(lexer.next_token().unwrap(), None);
}

// =============================================================================
// Comments and lines
// =============================================================================

#[test]
fn comment_line_leaves_no_blank_line() {
    assert_eq!(
        tokens("a\n<!-- note -->\nb"),
        vec![Token::Text("a\n".into()), Token::Text("b".into())]
    );
}

#[test]
fn comment_followed_by_text_keeps_the_text() {
    assert_eq!(
        tokens("<!-- x --> tail\n"),
        vec![Token::Text(" tail\n".into())]
    );
}

#[test]
fn comment_may_contain_markup() {
    assert_eq!(
        tokens("<!-- <a x=\"1\"> -->z"),
        vec![Token::Text("z".into())]
    );
}

#[test]
fn line_counter_follows_line_breaks() {
    let mut lexer = Lexer::new("a\r\nb\nc\rd", ".");
    assert_eq!(
        lexer.next_token().unwrap(),
        Some(Token::Text("a\r\nb\nc\rd".into()))
    );
    assert_eq!(lexer.line(), 4);
}

#[test]
fn comments_count_lines() {
    let mut lexer = Lexer::new("<!--\n\n-->\nx", ".");
    assert_eq!(lexer.next_token().unwrap(), Some(Token::Text("x".into())));
    assert_eq!(lexer.line(), 4);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn eof_inside_comment() {
    let err = Lexer::new("<!-- open", ".").next_token().unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"unexpected end of file at line 1: inside comment");
}

#[test]
fn eof_inside_markup() {
    let mut lexer = Lexer::new("x\n<a", ".");
    assert_eq!(lexer.next_token().unwrap(), Some(Token::Text("x\n".into())));
    assert_eq!(lexer.next_token().unwrap(), Some(Token::OpenMarkup));
    assert_eq!(
        lexer.next_token().unwrap(),
        Some(Token::Identifier("a".into()))
    );
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { line: 2, .. }));
}

#[test]
fn eof_inside_quoted_string() {
    let mut lexer = Lexer::new("<a v=\"abc", ".");
    for _ in 0..4 {
        lexer.next_token().unwrap();
    }
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    assert!(err.to_string().contains("quoted string"));
}

#[test]
fn unexpected_character_inside_markup() {
    let mut lexer = Lexer::new("<a ?>", ".");
    lexer.next_token().unwrap();
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: unexpected character '?' inside markup");
}
