use minitmpl::parser::MAX_BLOCK_DEPTH;
use minitmpl::{Context, Error, ErrorKind, Template, Value};
use serde_json::json;

// ── Plain text and unusual input ──

#[test]
fn empty_template_produces_empty_output() {
    assert_eq!(Template::new("").unwrap().render(&Context::new()).unwrap(), "");
}

#[test]
fn plain_text_renders_identically() {
    for text in [
        "Hello, world!",
        "  leading and trailing  \n",
        "braces { } % and }} alone",
        "こんにちは 🌍",
        "<b>\"quoted\" & 'single'</b>",
    ] {
        let rendered = Template::new(text).unwrap().render(&Context::new()).unwrap();
        assert_eq!(rendered, text);
    }
}

#[test]
fn special_characters_in_values_are_not_escaped() {
    let ctx = Context::new().with("content", "Hello <world> & \"friends\"");
    let rendered = minitmpl::render("{{ content }}", &ctx).unwrap();
    assert_eq!(rendered, "Hello <world> & \"friends\"");
}

#[test]
fn null_renders_as_nothing() {
    let ctx = Context::new().with("nothing", Value::Null);
    assert_eq!(minitmpl::render("[{{ nothing }}]", &ctx).unwrap(), "[]");
}

#[test]
fn empty_iterable_renders_nothing() {
    let ctx = Context::new().with("xs", Vec::<i32>::new());
    assert_eq!(minitmpl::render("a{% each xs %}x{% end %}b", &ctx).unwrap(), "ab");
}

#[test]
fn else_contributes_no_output() {
    let ctx = Context::new().with("flag", true);
    assert_eq!(
        minitmpl::render("{% if flag %}yes{% else %}no{% end %}", &ctx).unwrap(),
        "yes"
    );
}

#[test]
fn end_may_carry_a_label() {
    let ctx = Context::new().with("xs", vec![1, 2]);
    assert_eq!(
        minitmpl::render("{% each xs %}{{ iter }}{% endeach %}", &ctx).unwrap(),
        "12"
    );
}

// ── Compile-time failures ──

#[test]
fn syntax_errors_carry_the_offending_text() {
    let cases = [
        ("{% loop xs %}{% end %}", "{% loop xs %}"),
        ("{% each %}{% end %}", "each"),
        ("{% if a b %}{% end %}", "if a b"),
        ("{% call %}", "call"),
        ("x {% end %}", "{% end %}"),
        ("{% if a %}never closed", "{% if a %}"),
        ("before {{ unclosed", "before {{ unclosed"),
    ];
    for (src, fragment) in cases {
        match Template::new(src) {
            Err(Error::Syntax { fragment: got, .. }) => assert_eq!(got, fragment, "{src}"),
            other => panic!("expected syntax error for {src:?}, got {other:?}"),
        }
    }
}

#[test]
fn innermost_unclosed_block_is_reported() {
    let err = Template::new("{% each a %}{% if b %}x{% end %}{% each c %}").unwrap_err();
    assert_eq!(
        err,
        Error::Syntax {
            fragment: "{% each c %}".into(),
            reason: "block is never closed",
        }
    );
}

#[test]
fn nesting_up_to_the_limit_renders() {
    let src = format!(
        "{}x{}",
        "{% if 1 %}".repeat(MAX_BLOCK_DEPTH),
        "{% end %}".repeat(MAX_BLOCK_DEPTH)
    );
    let rendered = Template::new(src).unwrap().render(&Context::new()).unwrap();
    assert_eq!(rendered, "x");
}

#[test]
fn blocks_nested_too_deeply_fail_to_compile() {
    let src = format!(
        "{}x{}",
        "{% if 1 %}".repeat(20_000),
        "{% end %}".repeat(20_000)
    );
    assert_eq!(
        Template::new(src).unwrap_err(),
        Error::Syntax {
            fragment: "{% if 1 %}".into(),
            reason: "blocks nested too deeply",
        }
    );
}

#[test]
fn deeply_nested_literal_falls_back_to_a_name() {
    let src = format!("{{{{ {} }}}}", "[".repeat(5_000));
    let template = Template::new(src).expect("compiles");
    assert_eq!(template.render(&Context::new()).unwrap_err().kind(), ErrorKind::Context);
}

// ── Render-time failures ──

#[test]
fn missing_variable_names_full_path() {
    let ctx = Context::from_json(json!({"user": {"profile": {}}})).unwrap();
    let err = minitmpl::render("{{ user.profile.email }}", &ctx).unwrap_err();
    assert_eq!(err, Error::context("user.profile.email"));
    assert_eq!(err.to_string(), "Cannot resolve 'user.profile.email'.");
}

#[test]
fn outer_names_need_the_escape_inside_loops() {
    let ctx = Context::new().with("xs", vec![1]).with("title", "t");
    let err = minitmpl::render("{% each xs %}{{ title }}{% end %}", &ctx).unwrap_err();
    assert_eq!(err, Error::context("title"));
}

#[test]
fn unknown_operator_fails_at_render_not_compile() {
    let template = Template::new("{% if a <> b %}x{% end %}").expect("compiles");
    let ctx = Context::new().with("a", 1).with("b", 2);
    assert_eq!(template.render(&ctx).unwrap_err(), Error::operator("<>"));
}

#[test]
fn unknown_operator_is_reported_before_rhs_lookup() {
    let ctx = Context::new().with("a", 1);
    let err = minitmpl::render("{% if a <> missing %}x{% end %}", &ctx).unwrap_err();
    assert_eq!(err, Error::operator("<>"));
}

#[test]
fn incomparable_values_fail() {
    let ctx = Context::new().with("a", "text").with("b", 2);
    let err = minitmpl::render("{% if a > b %}x{% end %}", &ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Template);
}

#[test]
fn non_iterable_fails() {
    let ctx = Context::new().with("n", 3);
    let err = minitmpl::render("{% each n %}x{% end %}", &ctx).unwrap_err();
    assert_eq!(err, Error::template("'n' (int) is not iterable"));
}

#[test]
fn non_callable_fails() {
    let ctx = Context::new().with("f", "not a function");
    let err = minitmpl::render("{% call f %}", &ctx).unwrap_err();
    assert_eq!(err, Error::template("'f' is not callable"));
}

#[test]
fn missing_call_argument_fails_with_context_error() {
    let ctx = Context::new().with("f", Value::function(|_, _| Ok(Value::Null)));
    let err = minitmpl::render("{% call f missing %}", &ctx).unwrap_err();
    assert_eq!(err, Error::context("missing"));
}

#[test]
fn errors_from_functions_propagate() {
    let ctx = Context::new().with(
        "boom",
        Value::function(|_, _| Err(Error::template("exploded"))),
    );
    let err = minitmpl::render("a{% call boom %}b", &ctx).unwrap_err();
    assert_eq!(err, Error::template("exploded"));
}

#[test]
fn failure_in_one_render_does_not_affect_the_next() {
    let template = Template::new("{{ x }}").unwrap();
    assert!(template.render(&Context::new()).is_err());
    assert_eq!(template.render(&Context::new().with("x", 1)).unwrap(), "1");
}

#[test]
fn templates_are_shareable_across_threads() {
    let template = std::sync::Arc::new(Template::new("{{ n }}").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let template = std::sync::Arc::clone(&template);
            std::thread::spawn(move || template.render(&Context::new().with("n", n)).unwrap())
        })
        .collect();
    let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec!["0", "1", "2", "3"]);
}
