use pretty_assertions::assert_eq;

use crate::error::Error;

fn compile(source: &str) -> String {
    crate::compile("test", source).unwrap()
}

fn lines(source: &str) -> Vec<String> {
    compile(source).lines().map(str::to_owned).collect()
}

#[test]
fn program_frame() {
    assert_eq!(
        lines(""),
        vec!["\"test.mexe\" = main in", "!{{", "}}*BASIS;"]
    );
}

#[test]
fn function_frame_and_local_initialization() {
    assert_eq!(
        lines("f(){ var a, b; }"),
        vec![
            "\"test.mexe\" = main in",
            "!{{",
            "#\"f[f0]\" =",
            "[",
            "(MakeVal null)",
            "(Push)",
            "(Push)",
            "(Return)",
            "];",
            "}}*BASIS;",
        ]
    );
}

#[test]
fn if_in_tail_position_returns_on_both_edges() {
    // the worked example from the language reference
    assert_eq!(
        lines("f(x){ if (x) { return 1; } else { return 0; }; }"),
        vec![
            "\"test.mexe\" = main in",
            "!{{",
            "#\"f[f1]\" =",
            "[",
            "(Fetch 0)",
            "(GoFalse _1)",
            "(MakeValR 1)",
            "(Go _2)",
            "_1:",
            "(MakeValR 0)",
            "_2:",
            "(Return)",
            "];",
            "}}*BASIS;",
        ]
    );
}

#[test]
fn tail_call_law() {
    let asm = compile("f(x){ return f(x); }");
    assert!(asm.contains("(CallR #\"f[f1]\" 1)"), "{}", asm);
    // no plain call followed by a plain return for the tail call
    assert!(
        !asm.lines().any(|l| l.starts_with("(Call ")),
        "{}",
        asm
    );
}

#[test]
fn call_arguments_use_the_push_protocol() {
    let asm = compile("f(x, y){ g(x, y); }");
    let block: Vec<&str> = asm
        .lines()
        .skip_while(|l| *l != "[")
        .take_while(|l| *l != "];")
        .collect();
    assert_eq!(
        block,
        vec![
            "[",
            "(Fetch 0)",
            "(FetchP 1)",
            "(Call #\"g[f2]\" 2)",
            "(Return)",
        ]
    );
}

#[test]
fn zero_argument_call_emits_placeholder_push() {
    let asm = compile("f(){ g(); }");
    assert!(asm.contains("(Push)\n(Call #\"g[f0]\" 0)"), "{}", asm);

    let asm = compile("f(){ return g(); }");
    assert!(asm.contains("(Push)\n(CallR #\"g[f0]\" 0)"), "{}", asm);

    // and in push context, as the second argument of an outer call
    let asm = compile("f(x){ h(x, g()); }");
    assert!(asm.contains("(Push)\n(Call #\"g[f0]\" 0)"), "{}", asm);
}

#[test]
fn nested_call_arguments_are_fully_pushed() {
    let asm = compile("f(x, y){ g(x, h(y, x)); }");
    let block: Vec<&str> = asm
        .lines()
        .skip_while(|l| *l != "[")
        .take_while(|l| *l != "];")
        .collect();
    assert_eq!(
        block,
        vec![
            "[",
            "(Fetch 0)",
            "(FetchP 1)",
            "(FetchP 0)",
            "(Call #\"h[f2]\" 2)",
            "(Call #\"g[f2]\" 2)",
            "(Return)",
        ]
    );
}

#[test]
fn store_variants_by_context() {
    let asm = compile("f(x){ x = 1; g(0, x = 2); return x = 3; }");
    assert!(asm.contains("(MakeVal 1)\n(Store 0)"), "{}", asm);
    assert!(asm.contains("(MakeVal 2)\n(StoreP 0)"), "{}", asm);
    assert!(asm.contains("(MakeVal 3)\n(StoreR 0)"), "{}", asm);
}

#[test]
fn short_circuit_and_or_not() {
    assert_eq!(
        lines("f(x, y){ x && y; x || y; !x; }")[4..13].to_vec(),
        vec![
            "(Fetch 0)",
            "(GoFalse _1)",
            "(Fetch 1)",
            "_1:",
            "(Fetch 0)",
            "(GoTrue _2)",
            "(Fetch 1)",
            "_2:",
            "(Fetch 0)",
        ]
    );
    let asm = compile("f(x){ !x; }");
    assert!(asm.contains("(Fetch 0)\n(Not)"), "{}", asm);
}

#[test]
fn while_loop_shape() {
    assert_eq!(
        lines("f(x){ while (x) { x = -x; }; }")[4..13].to_vec(),
        vec![
            "_1:",
            "(Fetch 0)",
            "(GoFalse _2)",
            "(Fetch 0)",
            "(Call #\"-[f1]\" 1)",
            "(Store 0)",
            "(Go _1)",
            "_2:",
            "(Return)",
        ]
    );
}

#[test]
fn literal_conditions_fold_at_compile_time() {
    // if (false): only the false edge, no runtime test
    let asm = compile("f(){ if (false) { 1; } else { 2; }; }");
    assert!(!asm.contains("(GoTrue"), "{}", asm);
    assert!(!asm.contains("(GoFalse"), "{}", asm);
    assert!(asm.contains("(Go _1)"), "{}", asm);

    // while (false): the loop is never entered
    let asm = compile("f(){ while (false) { 1; }; }");
    assert!(!asm.contains("(GoFalse"), "{}", asm);
    assert!(asm.contains("(Go _2)"), "{}", asm);

    // null is the other falsy spelling
    let asm = compile("f(){ while (null) { 1; }; }");
    assert!(asm.contains("(Go _2)"), "{}", asm);

    // any other literal always takes the true edge: no jump at all here,
    // the false target is simply never taken
    let asm = compile("f(){ while (true) { 1; }; }");
    assert!(!asm.contains("(GoTrue"), "{}", asm);
    assert!(!asm.contains("(GoFalse"), "{}", asm);
    assert!(asm.contains("(Go _1)"), "{}", asm);
}

#[test]
fn if_in_return_position_requires_else() {
    assert_eq!(
        crate::compile("test", "f(x){ return if (x) { 1; }; }"),
        Err(Error::MissingElse)
    );
}

#[test]
fn push_context_falls_back_to_explicit_push() {
    // && has no P form: the push is spelled out before the value lowering
    let asm = compile("f(x, y){ g(x, y && x); }");
    let block: Vec<&str> = asm
        .lines()
        .skip_while(|l| *l != "[")
        .take_while(|l| *l != "];")
        .collect();
    assert_eq!(
        block,
        vec![
            "[",
            "(Fetch 0)",
            "(Push)",
            "(Fetch 1)",
            "(GoFalse _1)",
            "(Fetch 0)",
            "_1:",
            "(Call #\"g[f2]\" 2)",
            "(Return)",
        ]
    );
}

#[test]
fn labels_are_unique_and_resolved_across_the_program() {
    let asm = compile(
        "f(x){ if (x) { 1; } elsif (x) { 2; } else { 3; }; }
         g(x){ while (x) { if (x) { x = 0; }; }; }
         h(x, y){ x && y || !y; }",
    );

    let mut defined = Vec::new();
    let mut referenced = Vec::new();
    for line in asm.lines() {
        if line.starts_with('_') && line.ends_with(':') {
            defined.push(line.trim_end_matches(':').to_owned());
        } else if let Some(rest) = line
            .strip_prefix("(Go _")
            .or_else(|| line.strip_prefix("(GoTrue _"))
            .or_else(|| line.strip_prefix("(GoFalse _"))
        {
            referenced.push(format!("_{}", rest.trim_end_matches(')')));
        }
    }

    let mut unique = defined.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), defined.len(), "duplicate label definition");
    for lab in &referenced {
        assert!(defined.contains(lab), "jump to undefined label {}", lab);
    }
}

#[test]
fn label_numbering_continues_across_functions() {
    let asm = compile("f(x){ if (x) { 1; }; } g(x){ if (x) { 2; }; }");
    // first function uses _1/_2, the second continues with _3/_4
    assert!(asm.contains("_3:"), "{}", asm);
    assert!(asm.contains("_4:"), "{}", asm);
}

#[test]
fn fresh_generator_is_deterministic() {
    let source = "f(x){ while (x) { if (x) { 1; } else { 2; }; }; }";
    assert_eq!(compile(source), compile(source));
}

#[test]
fn functions_are_emitted_in_source_order() {
    let asm = compile("a(){} b(){} c(){}");
    let a = asm.find("#\"a[f0]\"").unwrap();
    let b = asm.find("#\"b[f0]\"").unwrap();
    let c = asm.find("#\"c[f0]\"").unwrap();
    assert!(a < b && b < c);
}
