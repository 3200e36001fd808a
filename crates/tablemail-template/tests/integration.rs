//! End-to-end tests for realistic mail-merge templates.

use std::collections::BTreeMap;

use tablemail_template::{Segment, Template, TemplateSyntaxError};

fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const LETTER: &str = "Dear {?title [$title] [$last]!!{$first}},\n\
Your balance is {$balance}.{?note \nNote: [$note]}\n";

#[test]
fn letter_with_title_and_note() {
    let t = Template::compile(LETTER).unwrap();
    let out = t.render(&row(&[
        ("title", "Dr."),
        ("first", "Grace"),
        ("last", "Hopper"),
        ("balance", "0"),
        ("note", "thanks for paying early"),
    ]));
    assert_eq!(
        out,
        "Dear Dr. Hopper,\nYour balance is 0.\nNote: thanks for paying early\n"
    );
}

#[test]
fn letter_without_optional_columns() {
    let t = Template::compile(LETTER).unwrap();
    let out = t.render(&row(&[("first", "Alan"), ("title", ""), ("balance", "10")]));
    assert_eq!(out, "Dear Alan,\nYour balance is 10.\n");
}

#[test]
fn one_template_many_rows() {
    let t = Template::compile("{$id}:{?email [$email]!!-}").unwrap();
    let rows = [
        row(&[("id", "1"), ("email", "a@x.org")]),
        row(&[("id", "2")]),
        row(&[("id", "3"), ("email", "")]),
    ];
    let rendered: Vec<String> = rows.iter().map(|r| t.render(r)).collect();
    assert_eq!(rendered, vec!["1:a@x.org", "2:-", "3:-"]);
}

#[test]
fn legacy_templates_with_stray_braces_still_render() {
    let t = Template::compile("function() { return {$value}; }").unwrap();
    assert_eq!(
        t.render(&row(&[("value", "42")])),
        "function() { return 42; }"
    );
}

#[test]
fn syntax_errors_have_readable_messages() {
    let err = Template::compile("{?vip Welcome back").unwrap_err();
    assert_eq!(
        err.to_string(),
        "conditional on 'vip' opened at offset 0 is never closed"
    );

    let err = Template::compile("Sale!! {$item}").unwrap_err();
    assert_eq!(err, TemplateSyntaxError::StrayElse { offset: 4 });
    assert_eq!(
        err.to_string(),
        "else separator '!!' at offset 4 is outside any conditional"
    );
}

#[test]
fn nested_error_offsets_are_absolute() {
    let err = Template::compile("ab{?x {?y oops}").unwrap_err();
    assert_eq!(
        err,
        TemplateSyntaxError::UnclosedConditional {
            column: "x".to_string(),
            offset: 2,
        }
    );
}

#[test]
fn synthesized_matches_handwritten() {
    let synthesized = Template::synthesize_default(["a", "b", "c"]);
    let compiled = Template::compile("{$a} {$b} {$c}").unwrap();
    assert_eq!(synthesized.segments(), compiled.segments());
    assert_eq!(
        compiled.segments()[1],
        Segment::Literal(" ".to_string())
    );
}

#[test]
fn stray_brace_in_conditional_body_is_text() {
    let template = Template::compile("{?note Note { see [$note]}!").unwrap();
    assert_eq!(
        template.render(&row(&[("note", "below")])),
        "Note { see below!"
    );
    assert_eq!(template.render(&row(&[])), "!");
}
