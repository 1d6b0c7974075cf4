//! Rendering of printable trees built through a session.

use pooled_ast::{Arena, AstSession, PrintableItem};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn renders_function_body() {
    init_logging();
    let arena = Arena::new();
    let session = AstSession::new(&arena);

    let root = session.root_scope();
    let function = root.append_scope();
    function.set_prefix("int main()");
    function.append_line("return 0;");
    // Declarations discovered late still print ahead of the body.
    function.prepend_line("int y;");
    function.prepend_line("int x;");

    let loop_body = function.append_scope();
    loop_body.set_prefix("do");
    loop_body.set_suffix("while (x);");
    loop_body.append_line("x--;");

    let expected = "\
int main() {
\tint x;
\tint y;
\treturn 0;
\tdo {
\t\tx--;
\t} while (x);
}
";
    assert_eq!(root.render(), expected);
}

#[test]
fn print_with_base_indent() {
    init_logging();
    let arena = Arena::new();
    let session = AstSession::new(&arena);
    let root = session.root_scope();
    let scope = root.append_scope();
    scope.append_line("nop;");

    let mut out = String::new();
    root.print_root(&mut out, 2).unwrap();
    assert_eq!(out, "\t\t{\n\t\t\tnop;\n\t\t}\n");
}

#[test]
fn many_items_span_several_buffers() {
    init_logging();
    let arena = Arena::new();
    let session = AstSession::new(&arena);
    let root = session.root_scope();
    for i in 0..50 {
        root.append_line(&format!("s{};", i));
    }

    let rendered = root.render();
    assert_eq!(rendered.lines().count(), 50);
    assert!(rendered.starts_with("s0;\ns1;\n"));
    assert!(rendered.ends_with("s49;\n"));

    let lines: Vec<_> = root
        .items()
        .filter_map(|item| item.as_line())
        .map(|line| line.line().to_str().unwrap().to_owned())
        .collect();
    assert_eq!(lines.len(), 50);
    assert_eq!(lines[10], "s10;");

    match root.last_item() {
        Some(PrintableItem::Line(line)) => assert_eq!(line.line().as_bytes(), b"s49;"),
        other => panic!("unexpected last item {:?}", other),
    }
}

#[test]
fn empty_scope_prints_braces_only() {
    init_logging();
    let arena = Arena::new();
    let session = AstSession::new(&arena);
    let root = session.root_scope();
    let empty = root.append_scope();
    empty.set_prefix("else");

    assert!(empty.is_empty());
    assert_eq!(root.render(), "else {\n}\n");
}
