#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;

use cidx_diagnostic::{ErrorCode, Severity};
use cidx_ir::{CancellationToken, Dialect, FileId, Name, SharedInterner, Span, Token};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::{Preprocessor, ScanContext};
use crate::config::ScannerInfo;
use crate::log::{LogEntry, PreprocessorLog};
use crate::macros::MacroDef;
use crate::provider::InMemoryProvider;
use crate::requestor::SourceElementRequestor;

const MAIN: &str = "/p/main.c";

fn scanner(files: &[(&str, &str)], info: &ScannerInfo) -> Preprocessor {
    let mut provider = InMemoryProvider::new();
    for (path, text) in files {
        provider.add(*path, text);
    }
    let main = files
        .iter()
        .find(|(path, _)| *path == MAIN)
        .map_or("", |(_, text)| *text);
    let ctx = ScanContext::new(SharedInterner::new(), Arc::new(provider));
    Preprocessor::new(ctx, info, Dialect::Cpp, MAIN, Arc::from(main))
}

fn drain(pp: &mut Preprocessor) -> Vec<Token> {
    let mut out = Vec::new();
    loop {
        let tok = pp.next_token().unwrap();
        if tok.is_eof() {
            return out;
        }
        out.push(tok);
    }
}

fn spell(pp: &Preprocessor, tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| pp.interner().lookup(t.text))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Preprocess `files` (one of which is [`MAIN`]) and spell the output.
fn run_files(files: &[(&str, &str)], info: &ScannerInfo) -> (String, Preprocessor) {
    let mut pp = scanner(files, info);
    let tokens = drain(&mut pp);
    (spell(&pp, &tokens), pp)
}

fn run(source: &str) -> (String, Preprocessor) {
    run_files(&[(MAIN, source)], &ScannerInfo::default())
}

fn codes(pp: &Preprocessor) -> Vec<ErrorCode> {
    pp.problems().iter().map(|d| d.code).collect()
}

#[test]
fn object_macro_expands() {
    let (out, pp) = run("#define N 42\nint x = N;\n");
    assert_eq!(out, "int x = 42 ;");
    assert!(pp.problems().is_empty());
}

#[test]
fn self_reference_is_not_reexpanded() {
    assert_eq!(run("#define A A\nA\n").0, "A");
    assert_eq!(run("#define foo a foo b\nfoo\n").0, "a foo b");
    assert_eq!(run("#define x y\n#define y x\nx y\n").0, "x y");
}

#[test]
fn function_macro_name_without_call() {
    assert_eq!(run("#define F(x) x\nF;\n").0, "F ;");
    assert_eq!(run("#define F(x) x\nF\n").0, "F");
}

#[test]
fn function_macro_arguments_nest() {
    let (out, _) = run("#define ADD(a, b) ((a) + (b))\nADD(1, f(2, 3))\n");
    assert_eq!(out, "( ( 1 ) + ( f ( 2 , 3 ) ) )");
}

#[test]
fn invocation_may_span_lines() {
    let (out, _) = run("#define F(a, b) a b\nF(1,\n  2)\n");
    assert_eq!(out, "1 2");
}

#[test]
fn stringize_escapes_literals() {
    let (out, _) = run("#define S(x) #x\nS(a  +  \"q\\n\")\n");
    assert_eq!(out, r#""a + \"q\\n\"""#);
}

#[test]
fn paste_joins_tokens() {
    let (out, pp) = run("#define CAT(a, b) a##b\nCAT(x, y) CAT(1, 2) CAT(, z) CAT(<, <)\n");
    assert_eq!(out, "xy 12 z <<");
    assert!(pp.problems().is_empty());
}

#[test]
fn invalid_paste_keeps_both_tokens() {
    let (out, pp) = run("#define CAT(a, b) a##b\nCAT(+, /)\n");
    assert_eq!(out, "+ /");
    assert_eq!(codes(&pp), vec![ErrorCode::P1009]);
}

#[test]
fn pasted_name_is_rescanned() {
    let (out, _) = run("#define CAT(a, b) a##b\n#define xy 7\nCAT(x, y)\n");
    assert_eq!(out, "7");
}

#[test]
fn variadic_macros() {
    let (out, _) = run("#define V(f, ...) f(__VA_ARGS__)\nV(g, 1, (2, 3))\nV(h)\n");
    assert_eq!(out, "g ( 1 , ( 2 , 3 ) ) h ( )");

    let (out, _) = run("#define N(args...) [args]\nN(1, 2)\n");
    assert_eq!(out, "[ 1 , 2 ]");
}

#[test]
fn gnu_comma_elision() {
    let (out, _) = run("#define P(fmt, ...) printf(fmt, ## __VA_ARGS__)\nP(\"a\")\nP(\"b\", 1)\n");
    assert_eq!(out, r#"printf ( "a" ) printf ( "b" , 1 )"#);
}

#[test]
fn standard_rescanning_example() {
    let source = "\
#define x 3
#define f(a) f(x * (a))
#undef x
#define x 2
#define g f
#define z z[0]
#define h g(~
#define m(a) a(w)
#define w 0,1
#define t(a) a
#define p() int
#define q(x) x
#define r(x,y) x ## y
#define str(x) # x
f(y+1) + f(f(z)) % t(t(g)(0) + t)(1);
g(x+(3,4)-w) | h 5) & m
(f)^m(m);
";
    let (out, pp) = run(source);
    assert_eq!(
        out,
        "f ( 2 * ( y + 1 ) ) + f ( 2 * ( f ( 2 * ( z [ 0 ] ) ) ) ) % f ( 2 * ( 0 ) ) + t ( 1 ) ; \
         f ( 2 * ( 2 + ( 3 , 4 ) - 0 , 1 ) ) | f ( 2 * ( ~ 5 ) ) & f ( 2 * ( 0 , 1 ) ) ^ m ( 0 , 1 ) ;"
    );
    assert!(pp.problems().is_empty());
}

#[test]
fn argument_count_mismatch_leaves_invocation() {
    let (out, pp) = run("#define F(a, b) a\nF(1)\n");
    assert_eq!(out, "F ( 1 )");
    assert_eq!(codes(&pp), vec![ErrorCode::P1011]);
}

#[test]
fn unterminated_invocation() {
    let (out, pp) = run("#define F(a) a\nF(1\n");
    assert_eq!(out, "F ( 1");
    assert_eq!(codes(&pp), vec![ErrorCode::P1012]);
}

#[test]
fn malformed_defines() {
    let (_, pp) = run("#define\n#define 3 x\n#define defined 1\n#define F(a, a) a\n#define G(a) #b\n#define H ## x\n");
    assert_eq!(codes(&pp), vec![ErrorCode::P1003; 6]);
}

#[test]
fn incompatible_redefinition_warns() {
    let (_, pp) = run("#define A 1\n#define A 1\n#define A 2\n");
    assert_eq!(codes(&pp), vec![ErrorCode::P1005]);
    assert_eq!(pp.problems()[0].severity, Severity::Warning);
}

#[test]
fn undef_removes_definition() {
    let (out, pp) = run("#define A 1\n#undef A\nA\n");
    assert_eq!(out, "A");
    let undef = pp.location_map().entries().iter().find_map(|e| match e {
        LogEntry::Undef { was_defined, .. } => Some(*was_defined),
        _ => None,
    });
    assert_eq!(undef, Some(true));
}

#[test]
fn conditionals_select_branches() {
    let source = "\
#define A 1
#if A && !defined(B)
yes
#elif 1
no1
#else
no2
#endif
#ifdef B
no3
#else
else
#endif
#ifndef B
ndef
#endif
";
    let (out, pp) = run(source);
    assert_eq!(out, "yes else ndef");
    assert!(pp.problems().is_empty());
    assert_eq!(pp.location_map().skipped_ranges(FileId::MAIN).count(), 2);
}

#[test]
fn elif_chain_takes_first_true_branch() {
    let (out, _) = run("#if 0\na\n#elif 2 > 3\nb\n#elif 1\nc\n#elif 1\nd\n#else\ne\n#endif\n");
    assert_eq!(out, "c");
}

#[test]
fn nested_conditionals_in_skipped_group() {
    let (out, _) = run("#if 0\n#if 1\nx\n#else\nw\n#endif\ny\n#else\nz\n#endif\n");
    assert_eq!(out, "z");
}

#[test]
fn skipped_text_is_not_lexed_for_problems() {
    let (out, pp) = run("#if 0\nit's \"unterminated\n#endif\nok\n");
    assert_eq!(out, "ok");
    assert!(pp.problems().is_empty());
}

#[test]
fn unbalanced_conditionals() {
    let (_, pp) = run("#endif\n#else\n#if 1\n");
    assert_eq!(codes(&pp), vec![ErrorCode::P1006; 3]);

    let (_, pp) = run("#if 1\n#else\n#else\n#endif\n");
    assert_eq!(codes(&pp), vec![ErrorCode::P1006]);
}

#[test]
fn if_expression_problems() {
    let (out, pp) = run("#if 1 / 0\na\n#endif\n#if 0 && 1 / 0\nb\n#endif\n#if (1\nc\n#endif\nd\n");
    assert_eq!(out, "d");
    assert_eq!(codes(&pp), vec![ErrorCode::P1008, ErrorCode::P1007]);
}

#[test]
fn if_expands_macros_after_defined() {
    let (out, _) = run("#define V 3\n#define IS(x) ((x) > 2)\n#if IS(V) && defined V\nbig\n#endif\n");
    assert_eq!(out, "big");
}

#[test]
fn quote_include_from_current_directory() {
    let files = [(MAIN, "#include \"a.h\"\nmain_tok\n"), ("/p/a.h", "a_tok\n")];
    let (out, pp) = run_files(&files, &ScannerInfo::default());
    assert_eq!(out, "a_tok main_tok");
    let map = pp.location_map();
    assert_eq!(map.file_count(), 2);
    assert_eq!(map.file_id(Path::new("/p/a.h")), Some(FileId::new(1)));
    let inclusions = map
        .entries()
        .iter()
        .filter(|e| matches!(e, LogEntry::StartInclusion { .. } | LogEntry::EndInclusion { .. }))
        .count();
    assert_eq!(inclusions, 2);
}

#[test]
fn system_include_uses_search_path() {
    let files = [
        (MAIN, "#include <s.h>\n#include \"s.h\"\n"),
        ("/sys/s.h", "s\n"),
        ("/p/s.h", "local\n"),
    ];
    let info = ScannerInfo {
        include_paths: vec!["/sys".into()],
        ..ScannerInfo::default()
    };
    let (out, _) = run_files(&files, &info);
    assert_eq!(out, "s local");
}

#[test]
fn include_next_continues_search() {
    let files = [
        (MAIN, "#include <n.h>\n"),
        ("/i1/n.h", "one\n#include_next <n.h>\n"),
        ("/i2/n.h", "two\n"),
    ];
    let info = ScannerInfo {
        include_paths: vec!["/i1".into(), "/i2".into()],
        ..ScannerInfo::default()
    };
    assert_eq!(run_files(&files, &info).0, "one two");
}

#[test]
fn search_path_can_be_replaced() {
    let files = [
        (MAIN, "#include <w.h>\nend\n"),
        ("/old/w.h", "old\n"),
        ("/new/w.h", "new\n"),
    ];
    let info = ScannerInfo {
        include_paths: vec!["/old".into()],
        ..ScannerInfo::default()
    };
    let mut pp = scanner(&files, &info);
    pp.overwrite_include_paths(vec!["/missing".into()]);
    pp.add_include_path("/new");
    let tokens = drain(&mut pp);
    assert_eq!(spell(&pp, &tokens), "new end");
    assert_eq!(pp.line_number_for_offset(0), 1);
    assert_eq!(pp.line_number_for_offset(15), 2);
}

#[test]
fn computed_include() {
    let files = [
        (MAIN, "#define H \"a.h\"\n#define SYS <b.h>\n#include H\n#include SYS\n"),
        ("/p/a.h", "a\n"),
        ("/inc/b.h", "b\n"),
    ];
    let info = ScannerInfo {
        include_paths: vec!["/inc".into()],
        ..ScannerInfo::default()
    };
    assert_eq!(run_files(&files, &info).0, "a b");
}

#[test]
fn pragma_once_and_include_guards() {
    let files = [
        (MAIN, "#include \"o.h\"\n#include \"o.h\"\n#include \"g.h\"\n#include \"g.h\"\n"),
        ("/p/o.h", "#pragma once\nonce\n"),
        ("/p/g.h", "// guard\n#ifndef G_H\n#define G_H\nguarded\n#endif\n"),
    ];
    let (out, pp) = run_files(&files, &ScannerInfo::default());
    assert_eq!(out, "once guarded");
    let entered = pp
        .location_map()
        .entries()
        .iter()
        .filter(|e| matches!(e, LogEntry::StartInclusion { .. }))
        .count();
    assert_eq!(entered, 2);
}

#[test]
fn unguarded_header_is_reentered() {
    let files = [
        (MAIN, "#include \"u.h\"\n#include \"u.h\"\n"),
        ("/p/u.h", "#ifndef U_H\n#define U_H\n#endif\nafter\n"),
    ];
    assert_eq!(run_files(&files, &ScannerInfo::default()).0, "after after");
}

#[test]
fn include_depth_is_bounded() {
    let files = [(MAIN, "#include \"r.h\"\n"), ("/p/r.h", "r\n#include \"r.h\"\n")];
    let info = ScannerInfo {
        max_include_depth: 4,
        ..ScannerInfo::default()
    };
    let (out, pp) = run_files(&files, &info);
    assert_eq!(out, "r r r");
    assert_eq!(codes(&pp), vec![ErrorCode::P1010]);
}

#[test]
fn missing_include_is_logged_and_reported() {
    let (out, pp) = run("#include \"nope.h\"\nafter\n");
    assert_eq!(out, "after");
    assert_eq!(codes(&pp), vec![ErrorCode::P1001]);
    let resolved = pp.location_map().entries().iter().find_map(|e| match e {
        LogEntry::Include { header, resolved, .. } => Some((header.clone(), resolved.clone())),
        _ => None,
    });
    assert_eq!(resolved, Some(("nope.h".to_owned(), None)));
}

#[test]
fn has_include_operator() {
    let files = [
        (MAIN, "#if __has_include(\"a.h\")\nyes\n#endif\n#if __has_include(<nope.h>)\nno\n#endif\n#ifdef __has_include\nsupported\n#endif\n"),
        ("/p/a.h", ""),
    ];
    assert_eq!(run_files(&files, &ScannerInfo::default()).0, "yes supported");
}

#[test]
fn line_oriented_directives() {
    let (out, pp) = run("#error stop  here\n#warning careful\n#frobnicate\n#line x\n#line 10 \"f.c\"\n# 7 \"g.c\" 1\n#pragma pack(1)\n#ident \"v\"\n#\nok\n");
    assert_eq!(out, "ok");
    assert_eq!(
        codes(&pp),
        vec![ErrorCode::P1004, ErrorCode::P1013, ErrorCode::P1002, ErrorCode::P1014]
    );
    assert_eq!(pp.problems()[0].message, "#error stop here");
    assert!(pp.problems()[0].is_error());
    assert!(!pp.problems()[1].is_error());
}

#[test]
fn dynamic_macros() {
    let (out, _) = run("a __LINE__\n__LINE__ __COUNTER__ __COUNTER__\n#define L __LINE__\n\nL __FILE__ __INCLUDE_LEVEL__\n");
    assert_eq!(out, "a 1 2 0 1 5 \"/p/main.c\" 0");
}

#[test]
fn line_directive_renumbers_following_lines() {
    let (out, pp) = run("__LINE__\n#line 100\n__LINE__\n__LINE__\n# 7 \"g.c\"\n__LINE__\n");
    assert_eq!(out, "1 100 101 7");
    assert!(pp.problems().is_empty());
}

#[test]
fn include_level_counts_nesting() {
    let files = [(MAIN, "#include \"l.h\"\n"), ("/p/l.h", "__INCLUDE_LEVEL__ __FILE__ __BASE_FILE__\n")];
    let (out, _) = run_files(&files, &ScannerInfo::default());
    assert_eq!(out, "1 \"/p/l.h\" \"/p/main.c\"");
}

#[test]
fn command_line_definitions() {
    let mut info = ScannerInfo::default();
    info.define("X=3");
    info.define("F(a)=a+1");
    info.define("GONE");
    info.undefines.push("GONE".to_owned());
    let (out, _) = run_files(&[(MAIN, "X F(2) GONE __cplusplus\n")], &info);
    assert_eq!(out, "3 2 + 1 GONE 201703L");
}

#[test]
fn definitions_added_through_the_api() {
    let mut pp = scanner(&[(MAIN, "A B\n")], &ScannerInfo::default());
    pp.add_definition_str("A", "alpha");
    let b = pp.interner().intern("B");
    let beta = Token::new(cidx_ir::TokenKind::Ident, pp.interner().intern("beta"), Span::DUMMY, crate::BUILTIN_FILE);
    pp.add_definition(MacroDef::object(b, vec![beta]));
    assert!(pp.get_definition("A").is_some());
    let tokens = drain(&mut pp);
    assert_eq!(spell(&pp, &tokens), "alpha beta");
    assert!(pp.undefine("A"));
    assert!(pp.get_definition("A").is_none());
}

#[test]
fn macro_files_contribute_definitions_only() {
    let files = [(MAIN, "FROM_M\n"), ("/p/m.h", "#define FROM_M 7\nignored\n")];
    let info = ScannerInfo {
        macro_files: vec!["m.h".into()],
        ..ScannerInfo::default()
    };
    assert_eq!(run_files(&files, &info).0, "7");
}

#[test]
fn forced_includes_come_first() {
    let files = [(MAIN, "main\n"), ("/p/pre1.h", "pre1\n"), ("/p/pre2.h", "pre2\n")];
    let info = ScannerInfo {
        include_files: vec!["pre1.h".into(), "/p/pre2.h".into()],
        ..ScannerInfo::default()
    };
    assert_eq!(run_files(&files, &info).0, "pre1 pre2 main");
}

#[test]
fn keywords_are_classified_on_output() {
    let mut pp = scanner(&[(MAIN, "#define T int\nT x and y\n")], &ScannerInfo::default());
    let tokens = drain(&mut pp);
    assert!(tokens[0].is_keyword(cidx_ir::Keyword::Int));
    assert_eq!(tokens[1].kind, cidx_ir::TokenKind::Ident);
    assert!(tokens[2].is_punct(cidx_ir::Punct::AmpAmp));
}

#[test]
fn expanded_tokens_point_at_invocation() {
    let mut pp = scanner(&[(MAIN, "#define N 42\nx N\n#define F(a) a\nF( 1 )\n")], &ScannerInfo::default());
    let tokens = drain(&mut pp);
    assert_eq!(tokens[0].span, Span::new(13, 14));
    assert!(!tokens[0].is_expanded());
    assert_eq!(tokens[1].span, Span::new(15, 16));
    let exp = tokens[1].expansion.unwrap();
    let info = pp.location_map().expansion(exp).unwrap();
    assert_eq!(pp.interner().lookup(info.macro_name), "N");
    // "#define F(a) a\n" starts at 17 and is 15 bytes long.
    assert_eq!(tokens[2].span, Span::new(32, 38));
    assert_eq!(tokens[2].file, FileId::MAIN);
}

#[test]
fn nested_expansions_chain_to_outermost() {
    let mut pp = scanner(&[(MAIN, "#define A B\n#define B 1\nA\n")], &ScannerInfo::default());
    let tokens = drain(&mut pp);
    let chain = pp.location_map().expansion_chain(tokens[0].expansion.unwrap());
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].depth, 1);
    assert_eq!(chain[1].invocation, Span::new(24, 25));
    assert_eq!(tokens[0].span, Span::new(24, 25));
}

#[derive(Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl PreprocessorLog for Recorder {
    fn start_translation_unit(&mut self, _: FileId, path: &Path) {
        self.events.lock().push(format!("start {}", path.display()));
    }
    fn end_translation_unit(&mut self, _: FileId, offset: u32) {
        self.events.lock().push(format!("end {offset}"));
    }
    fn start_inclusion(&mut self, _: FileId, directive: Span, _: FileId, path: &Path) {
        self.events.lock().push(format!("enter {} at {directive}", path.display()));
    }
    fn end_inclusion(&mut self, _: FileId, offset: u32) {
        self.events.lock().push(format!("leave {offset}"));
    }
    fn define_object_style_macro(&mut self, def: &MacroDef) {
        self.events.lock().push(format!("define {}", def.span));
    }
    fn start_object_style_expansion(&mut self, _: Name, _: FileId, invocation: Span) {
        self.events.lock().push(format!("expand {invocation}"));
    }
    fn encounter_pound_ifdef(&mut self, _: FileId, directive: Span, _: Name, taken: bool) {
        self.events.lock().push(format!("ifdef {directive} {taken}"));
    }
    fn encounter_pound_endif(&mut self, _: FileId, directive: Span) {
        self.events.lock().push(format!("endif {directive}"));
    }
}

#[test]
fn log_receives_events_with_offsets() {
    let files = [
        (MAIN, "#define M 1\n#include \"h.h\"\nM\n#ifdef Q\n#endif\n"),
        ("/p/h.h", "h\n"),
    ];
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut pp = scanner(&files, &ScannerInfo::default());
    pp.set_log(Box::new(Recorder {
        events: Arc::clone(&events),
    }));
    drain(&mut pp);
    let span = |a: u32, b: u32| Span::new(a, b).to_string();
    assert_eq!(
        *events.lock(),
        vec![
            "start /p/main.c".to_owned(),
            format!("define {}", span(0, 11)),
            format!("enter /p/h.h at {}", span(12, 26)),
            "leave 2".to_owned(),
            format!("expand {}", span(27, 28)),
            format!("ifdef {} false", span(29, 37)),
            format!("endif {}", span(38, 44)),
            "end 45".to_owned(),
        ]
    );
}

#[derive(Default)]
struct Elements {
    seen: Arc<Mutex<Vec<String>>>,
}

impl SourceElementRequestor for Elements {
    fn enter_inclusion(&mut self, path: &Path, _: FileId, _: Span) {
        self.seen.lock().push(format!("include {}", path.display()));
    }
    fn accept_macro(&mut self, name: &str, _: FileId, _: Span, function_style: bool) {
        self.seen.lock().push(format!("macro {name} {function_style}"));
    }
    fn accept_macro_use(&mut self, name: &str, _: FileId, _: Span) {
        self.seen.lock().push(format!("use {name}"));
    }
    fn accept_problem(&mut self, problem: &cidx_diagnostic::Diagnostic) {
        self.seen.lock().push(format!("problem {}", problem.code));
    }
}

#[test]
fn requestor_sees_macros_and_inclusions() {
    let files = [
        (MAIN, "#define F(x) G\n#define G 1\n#include \"e.h\"\nF(2)\n#bogus\n"),
        ("/p/e.h", ""),
    ];
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut pp = scanner(&files, &ScannerInfo::default());
    pp.set_requestor(Box::new(Elements {
        seen: Arc::clone(&seen),
    }));
    drain(&mut pp);
    assert_eq!(
        *seen.lock(),
        vec![
            "macro F true",
            "macro G false",
            "include /p/e.h",
            "use F",
            "problem P1002",
        ]
    );
}

#[test]
fn cancellation_stops_the_scan() {
    let cancel = CancellationToken::new();
    let provider = InMemoryProvider::new();
    let ctx = ScanContext::new(SharedInterner::new(), Arc::new(provider)).with_cancel(cancel.clone());
    let mut pp = Preprocessor::new(ctx, &ScannerInfo::default(), Dialect::C, MAIN, Arc::from("a b c\n"));
    assert!(pp.next_token().is_ok());
    cancel.cancel();
    assert!(pp.next_token().is_err());
}

#[test]
fn eof_repeats_after_end() {
    let mut pp = scanner(&[(MAIN, "x")], &ScannerInfo::default());
    assert!(!pp.next_token().unwrap().is_eof());
    assert!(pp.next_token().unwrap().is_eof());
    assert!(pp.next_token().unwrap().is_eof());
    let ends = pp
        .location_map()
        .entries()
        .iter()
        .filter(|e| matches!(e, LogEntry::EndTranslationUnit { .. }))
        .count();
    assert_eq!(ends, 1);
}

mod properties {
    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    use super::*;

    const NAMES: [&str; 5] = ["M0", "M1", "M2", "M3", "M4"];

    /// Body items: a macro name by index, or a plain word.
    fn item() -> impl Strategy<Value = String> {
        prop_oneof![
            (0..NAMES.len()).prop_map(|i| NAMES[i].to_owned()),
            prop::sample::select(vec!["a", "b", "1", "+"]).prop_map(str::to_owned),
        ]
    }

    /// Object-like expansion by the textbook rule: a name is not expanded
    /// while its own expansion is in progress.
    fn reference(word: &str, bodies: &[Vec<String>], active: &mut FxHashSet<String>, out: &mut Vec<String>) {
        match NAMES.iter().position(|n| *n == word) {
            Some(i) if !active.contains(word) => {
                active.insert(word.to_owned());
                for w in &bodies[i] {
                    reference(w, bodies, active, out);
                }
                active.remove(word);
            }
            _ => out.push(word.to_owned()),
        }
    }

    proptest! {
        #[test]
        fn object_macros_match_reference(
            bodies in prop::collection::vec(prop::collection::vec(item(), 0..4), NAMES.len()),
            input in prop::collection::vec(item(), 1..8),
        ) {
            let mut source = String::new();
            for (name, body) in NAMES.iter().zip(&bodies) {
                source.push_str(&format!("#define {name} {}\n", body.join(" ")));
            }
            source.push_str(&input.join(" "));
            source.push('\n');

            let mut expected = Vec::new();
            for word in &input {
                reference(word, &bodies, &mut FxHashSet::default(), &mut expected);
            }
            let (out, pp) = run(&source);
            prop_assert_eq!(out, expected.join(" "));
            prop_assert!(pp.problems().is_empty());
        }

        #[test]
        fn arbitrary_text_terminates(source in "[a-c#()\n ,]{0,40}") {
            let text = format!("#define a b(a)\n#define b(x) c x a\n#define c(y) y\n{source}");
            let mut pp = scanner(&[(MAIN, &text)], &ScannerInfo::default());
            let tokens = drain(&mut pp);
            prop_assert!(tokens.len() < 10_000);
        }
    }
}
