//! Integration tests for template parsing into a tree.

use std::fs;

use confgen::template::{Declaration, ParseError, parse_template};
use confgen::tree::{NodeKind, Tree};

fn parse(text: &str) -> Tree {
    parse_template(text, ".").unwrap()
}

fn parse_err(text: &str) -> ParseError {
    parse_template(text, ".").unwrap_err()
}

/// Concatenates every text node in document order.
fn all_text(tree: &Tree) -> String {
    let mut out = String::new();
    tree.visit(&mut |_, node| {
        if let NodeKind::Text(text) = node.kind() {
            out.push_str(text);
        }
        Ok::<bool, ()>(true)
    })
    .unwrap();
    out
}

// =============================================================================
// Structure
// =============================================================================

#[test]
fn text_only_template() {
    let tree = parse("just text\n");
    assert_eq!(tree.outline(), "text \"just text\\n\"\n");
}

#[test]
fn empty_template_is_empty_tree() {
    assert!(parse("").is_empty());
}

#[test]
fn declarations_and_blocks() {
    let tree = parse(concat!(
        "<config name=\"usb\" default=\"yes\"/>\n",
        "<property name=\"SPEED\">full</property>\n",
        "<usb>speed=##SPEED##\n",
        "</usb>\n",
    ));
    assert_eq!(
        tree.outline(),
        concat!(
            "config usb (default)\n",
            "text \"\\n\"\n",
            "property SPEED\n",
            "text \"\\n\"\n",
            "block usb\n",
            "  text \"speed=##SPEED##\\n\"\n",
            "text \"\\n\"\n",
        )
    );
}

#[test]
fn nested_conditional_blocks() {
    let tree = parse("<a>1<b>2</b>3</a>");
    assert_eq!(
        tree.outline(),
        concat!(
            "block a\n",
            "  text \"1\"\n",
            "  block b\n",
            "    text \"2\"\n",
            "  text \"3\"\n",
        )
    );
}

#[test]
fn property_inside_config_is_scoped() {
    let tree = parse(concat!(
        "<config name=\"debug\">\n",
        "  <description>Debug build</description>\n",
        "  <property name=\"OPT\" overrideable=\"no\">-O0</property>\n",
        "</config>",
    ));
    assert_eq!(tree.outline(), "property OPT in debug\nconfig debug\n");

    let kinds: Vec<&NodeKind> = tree.children(None).map(|id| tree.kind(id)).collect();
    let NodeKind::Declaration(Declaration::Property(property)) = kinds[0] else {
        panic!("expected property, got {:?}", kinds[0]);
    };
    assert_eq!(property.value, "-O0");
    assert_eq!(property.scope.as_deref(), Some("debug"));
    assert!(!property.overridable);

    let NodeKind::Declaration(Declaration::Config(config)) = kinds[1] else {
        panic!("expected config, got {:?}", kinds[1]);
    };
    assert_eq!(config.description, "Debug build");
    assert!(!config.default_selected);
}

#[test]
fn define_and_require_keep_expression_source() {
    let tree = parse(concat!(
        "<define name=\"both\">a && b</define>",
        "<require><description>needs a</description>a</require>",
    ));
    assert_eq!(tree.outline(), "define both 'a && b'\nrequire <anon> 'a'\n");
}

#[test]
fn overridable_spelling_is_accepted() {
    let tree = parse("<property name=\"P\" overridable=\"no\">v</property>");
    let id = tree.first_child(None).unwrap();
    let NodeKind::Declaration(Declaration::Property(property)) = tree.kind(id) else {
        panic!("expected property");
    };
    assert!(!property.overridable);
}

#[test]
fn project_declaration() {
    let tree = parse("<project name=\"demo\"><description> Demo board </description></project>");
    let id = tree.first_child(None).unwrap();
    let NodeKind::Declaration(Declaration::Project(project)) = tree.kind(id) else {
        panic!("expected project");
    };
    assert_eq!(project.name.as_deref(), Some("demo"));
    assert_eq!(project.description, "Demo board");
}

#[test]
fn node_lines_are_recorded() {
    let tree = parse("a\nb\n<c>x</c>");
    let ids: Vec<_> = tree.children(None).collect();
    assert_eq!(tree.node(ids[0]).line(), 1);
    assert_eq!(tree.node(ids[1]).line(), 3);
}

#[test]
fn comments_are_dropped_from_the_tree() {
    let tree = parse("<!-- header -->\n<a>x<!-- inner -->y</a>");
    assert_eq!(
        tree.outline(),
        "block a\n  text \"x\"\n  text \"y\"\n"
    );
}

// =============================================================================
// Includes
// =============================================================================

#[test]
fn includes_resolve_relative_to_the_including_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(
        dir.path().join("sub/part.tpl"),
        "<include path=\"leaf.tpl\"/>middle\n",
    )
    .unwrap();
    fs::write(dir.path().join("sub/leaf.tpl"), "leaf\n").unwrap();

    let tree = parse_template(
        "first\n<include path=\"sub/part.tpl\"/>\nlast\n",
        dir.path(),
    )
    .unwrap();
    assert_eq!(all_text(&tree), "first\nleaf\nmiddle\n\nlast\n");
}

#[test]
fn include_open_close_pair() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("inc.tpl"), "<a>inside</a>").unwrap();
    let tree = parse_template("<include path=\"inc.tpl\"></include>", dir.path()).unwrap();
    assert_eq!(tree.outline(), "block a\n  text \"inside\"\n");
}

#[test]
fn line_numbers_continue_across_includes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.tpl"), "x\n<oops").unwrap();
    let err = parse_template("a\nb\n<include path=\"bad.tpl\"/>", dir.path()).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    assert_eq!(err.line(), 4);
}

#[test]
fn same_file_may_be_included_twice() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("part.tpl"), "part\n").unwrap();
    let tree = parse_template(
        "<include path=\"part.tpl\"/><include path=\"part.tpl\"/>",
        dir.path(),
    )
    .unwrap();
    assert_eq!(all_text(&tree), "part\npart\n");
}

#[test]
fn file_including_itself() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("t.tpl"), "x\n<include path=\"t.tpl\"/>\n").unwrap();
    let err = parse_template("<include path=\"t.tpl\"/>", dir.path()).unwrap_err();
    let ParseError::Syntax { line, message } = &err else {
        panic!("expected syntax error, got {err:?}");
    };
    assert_eq!(*line, 2);
    assert!(message.starts_with("recursive include of"));
    assert!(message.ends_with("t.tpl'"));
}

#[test]
fn include_cycle_through_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("a.tpl"), "<include path=\"sub/b.tpl\"/>").unwrap();
    fs::write(dir.path().join("sub/b.tpl"), "\n\n<include path=\"../a.tpl\"/>").unwrap();
    let err = parse_template("<include path=\"a.tpl\"/>", dir.path()).unwrap_err();
    assert!(matches!(err, ParseError::Syntax { line: 3, .. }));
    assert!(err.to_string().contains("recursive include of"));
}

#[test]
fn missing_include_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_template("\n<include path=\"nope.tpl\"/>", dir.path()).unwrap_err();
    let ParseError::Include { path, line, .. } = &err else {
        panic!("expected include error, got {err:?}");
    };
    assert!(path.ends_with("nope.tpl"));
    assert_eq!(*line, 2);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn missing_name_attribute() {
    let err = parse_err("<config default=\"yes\"/>");
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: <config> is missing the 'name' attribute");
}

#[test]
fn mismatched_close_element() {
    let err = parse_err("<a>text</b>");
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: mismatched close element </b>, expected </a>");
}

#[test]
fn stray_close_element() {
    let err = parse_err("text</b>");
    assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
}

#[test]
fn unclosed_conditional_block() {
    let err = parse_err("<a>\ntext");
    insta::assert_snapshot!(err.to_string(), @"unexpected end of file at line 2: unclosed conditional block <a>");
}

#[test]
fn unclosed_declaration() {
    let err = parse_err("<define name=\"d\">a");
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    assert!(err.to_string().contains("<define>"));
}

#[test]
fn stray_content_inside_config() {
    let err = parse_err("<config name=\"x\">stray</config>");
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: unexpected content inside <config>");
}

#[test]
fn invalid_yes_no_value() {
    let err = parse_err("<config name=\"x\" default=\"maybe\"/>");
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: invalid value 'maybe' for 'default' attribute, expected 'yes' or 'no'");
}

#[test]
fn element_nested_in_define() {
    let err = parse_err("<define name=\"d\"><a/></define>");
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: unexpected element <a> inside <define>");
}

#[test]
fn include_without_path() {
    let err = parse_err("<include/>");
    insta::assert_snapshot!(err.to_string(), @"syntax error at line 1: <include> is missing the 'path' attribute");
}

#[test]
fn attribute_without_value() {
    let err = parse_err("<a b>");
    assert!(err.to_string().contains("expected '=' after attribute 'b'"));
}
