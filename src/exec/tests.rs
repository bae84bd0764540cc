//! Tests for the execution protocol
//!
//! Protocol tests run against a stub engine script so they stay
//! hermetic. The end-to-end scenarios at the bottom talk to a real
//! `souffle` binary and skip themselves when none is installed.

use super::*;
use crate::context::Context;
use crate::error::{ExecutionError, SouffleError};
use crate::syntax::{Atom, BodyItem, Io, Relation, Rule, Term, Type, TypeDef, Value};

use std::path::Path;
use std::time::Duration;

fn graph_context() -> Context {
    let mut ctx = Context::new("Graph");
    ctx.add(Relation::new(
        "edge",
        vec![("from", Type::symbol()), ("to", Type::symbol())],
    ))
    .unwrap();
    ctx.add(Relation::new("reachable", vec![("node", Type::symbol())]).with_io(Io::Output))
        .unwrap();
    ctx.add_fact("edge", vec!["A".into(), "B".into()]).unwrap();
    ctx.add(Rule::new(
        vec![Atom::new("reachable", vec![Term::var("X")])],
        vec![BodyItem::atom(Atom::new(
            "edge",
            vec![Term::var("X"), Term::wildcard()],
        ))],
    ))
    .unwrap();
    ctx
}

fn str_row(cells: &[&str]) -> Vec<Value> {
    cells.iter().map(|c| Value::Str(c.to_string())).collect()
}

#[cfg(unix)]
mod stub_engine_tests {
    use super::*;

    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Shell preamble extracting the fact/output directories and the
    /// program path the way the real engine would
    const ARG_PARSE: &str = r#"
facts=""
out=""
prog=""
while [ $# -gt 0 ]; do
  case "$1" in
    -F) facts="$2"; shift 2 ;;
    -D) out="$2"; shift 2 ;;
    *.dl) prog="$1"; shift ;;
    *) shift ;;
  esac
done
"#;

    fn stub_engine(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("stub-engine.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n{}\n", ARG_PARSE, body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Options pointing at a stub engine, with working areas created
    /// under `parent` so cleanup is observable
    fn stub_options(binary: PathBuf, parent: &Path) -> ExecutorOptions {
        ExecutorOptions {
            binary,
            work_dir: Some(parent.to_path_buf()),
            ..ExecutorOptions::default()
        }
    }

    fn assert_no_leftovers(parent: &Path) {
        let leftovers: Vec<_> = fs::read_dir(parent).unwrap().collect();
        assert!(
            leftovers.is_empty(),
            "working area leaked: {:?}",
            leftovers
        );
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let parent = TempDir::new().unwrap();
        let executor = Executor::with_options(stub_options(
            PathBuf::from("/nonexistent/souffle-binary"),
            parent.path(),
        ));
        let err = executor.execute(&graph_context()).unwrap_err();
        assert!(matches!(
            err,
            SouffleError::Execution(ExecutionError::Spawn { .. })
        ));
        assert_no_leftovers(parent.path());
    }

    #[test]
    fn test_engine_failure_carries_diagnostics() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(scratch.path(), "echo 'type error at line 3' >&2\nexit 1");
        let executor = Executor::with_options(stub_options(binary, parent.path()));

        let err = executor.execute(&graph_context()).unwrap_err();
        match err {
            SouffleError::Execution(ExecutionError::EngineFailed { code, stderr }) => {
                assert_eq!(code, Some(1));
                assert!(stderr.contains("type error at line 3"));
            }
            other => panic!("expected EngineFailed, got {:?}", other),
        }
        assert_no_leftovers(parent.path());
    }

    #[test]
    fn test_output_rows_preserve_engine_order() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        // Engine order is opaque but must be passed through untouched
        let binary = stub_engine(scratch.path(), "printf 'B\\nA\\nC\\n' > \"$out/reachable.csv\"");
        let executor = Executor::with_options(stub_options(binary, parent.path()));

        let result = executor.execute(&graph_context()).unwrap();
        assert_eq!(
            result.rows("reachable").unwrap(),
            &[str_row(&["B"]), str_row(&["A"]), str_row(&["C"])]
        );
        assert_no_leftovers(parent.path());
    }

    #[test]
    fn test_missing_output_file_yields_zero_rows() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(scratch.path(), "exit 0");
        let executor = Executor::with_options(stub_options(binary, parent.path()));

        let result = executor.execute(&graph_context()).unwrap();
        assert_eq!(result.rows("reachable").unwrap(), &[] as &[Vec<Value>]);
    }

    fn totals_context() -> Context {
        let mut ctx = Context::new("Totals");
        ctx.add(
            Relation::new(
                "total",
                vec![
                    ("n", Type::number()),
                    ("w", Type::float()),
                    ("u", Type::unsigned()),
                    ("tag", Type::symbol()),
                ],
            )
            .with_io(Io::Output),
        )
        .unwrap();
        ctx
    }

    #[test]
    fn test_numeric_columns_coerced() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(
            scratch.path(),
            "printf '%s\\t%s\\t%s\\t%s\\n' -3 1.5 7 ok > \"$out/total.csv\"",
        );
        let executor = Executor::with_options(stub_options(binary, parent.path()));

        let result = executor.execute(&totals_context()).unwrap();
        assert_eq!(
            result.rows("total").unwrap(),
            &[vec![
                Value::Int(-3),
                Value::Float(1.5),
                Value::Uint(7),
                Value::Str("ok".to_string()),
            ]]
        );
    }

    #[test]
    fn test_raw_cells_without_processing() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(
            scratch.path(),
            "printf '%s\\t%s\\t%s\\t%s\\n' -3 1.5 7 ok > \"$out/total.csv\"",
        );
        let mut options = stub_options(binary, parent.path());
        options.process_results = false;
        let executor = Executor::with_options(options);

        let result = executor.execute(&totals_context()).unwrap();
        assert_eq!(
            result.rows("total").unwrap(),
            &[str_row(&["-3", "1.5", "7", "ok"])]
        );
    }

    #[test]
    fn test_malformed_numeric_cell_is_execution_error() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(
            scratch.path(),
            "printf 'abc\\t1.5\\t7\\tok\\n' > \"$out/total.csv\"",
        );
        let executor = Executor::with_options(stub_options(binary, parent.path()));

        let err = executor.execute(&totals_context()).unwrap_err();
        assert!(matches!(
            err,
            SouffleError::Execution(ExecutionError::MalformedOutput { .. })
        ));
        // Parse failure is an exit path like any other: no leaked state
        assert_no_leftovers(parent.path());
    }

    #[test]
    fn test_timeout_kills_engine_and_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(scratch.path(), "sleep 5");
        let mut options = stub_options(binary, parent.path());
        options.timeout = Some(Duration::from_millis(100));
        let executor = Executor::with_options(options);

        let err = executor.execute(&graph_context()).unwrap_err();
        assert!(matches!(
            err,
            SouffleError::Execution(ExecutionError::Timeout(_))
        ));
        assert_no_leftovers(parent.path());
    }

    fn fed_context() -> Context {
        let mut ctx = Context::new("Fed");
        ctx.add(
            Relation::new(
                "edge",
                vec![("from", Type::symbol()), ("to", Type::symbol())],
            )
            .with_io(Io::Input),
        )
        .unwrap();
        ctx.add(
            Relation::new(
                "echoed",
                vec![("from", Type::symbol()), ("to", Type::symbol())],
            )
            .with_io(Io::Output),
        )
        .unwrap();
        ctx.add_fact("edge", vec!["A".into(), "B".into()]).unwrap();
        ctx.add_fact("edge", vec!["B".into(), "C".into()]).unwrap();
        ctx
    }

    #[test]
    fn test_facts_dir_mode_moves_facts_into_files() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        // Echo the fact file back as an output relation and make sure the
        // serialized source no longer carries the rows inline
        let binary = stub_engine(
            scratch.path(),
            "cat \"$facts/edge.facts\" > \"$out/echoed.csv\"\ngrep 'edge(\"' \"$prog\" > /dev/null && exit 1\nexit 0",
        );
        let mut options = stub_options(binary, parent.path());
        options.facts_dir = true;
        let executor = Executor::with_options(options);

        let result = executor.execute(&fed_context()).unwrap();
        assert_eq!(
            result.rows("echoed").unwrap(),
            &[str_row(&["A", "B"]), str_row(&["B", "C"])]
        );
    }

    #[test]
    fn test_inline_mode_still_writes_empty_fact_file() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        // The engine requires a fact file for every .input relation even
        // when all facts stay inline
        let binary = stub_engine(
            scratch.path(),
            "test -f \"$facts/edge.facts\" || exit 1\ntest -s \"$facts/edge.facts\" && exit 1\ncat \"$facts/edge.facts\" > \"$out/echoed.csv\"",
        );
        let executor = Executor::with_options(stub_options(binary, parent.path()));

        let result = executor.execute(&fed_context()).unwrap();
        assert_eq!(result.rows("echoed").unwrap(), &[] as &[Vec<Value>]);
    }

    #[test]
    fn test_concurrent_invocations_are_isolated() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(
            scratch.path(),
            "printf 'X\\n' > \"$out/reachable.csv\"",
        );
        let executor = Executor::with_options(stub_options(binary, parent.path()));
        let ctx = graph_context();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| executor.execute(&ctx).unwrap()))
                .collect();
            for handle in handles {
                let result = handle.join().unwrap();
                assert_eq!(result.rows("reachable").unwrap(), &[str_row(&["X"])]);
            }
        });
        assert_no_leftovers(parent.path());
    }

    #[tokio::test]
    async fn test_async_executor_success() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(scratch.path(), "printf 'B\\nA\\n' > \"$out/reachable.csv\"");
        let executor = AsyncExecutor::with_options(stub_options(binary, parent.path()));

        let result = executor.execute(&graph_context()).await.unwrap();
        assert_eq!(
            result.rows("reachable").unwrap(),
            &[str_row(&["B"]), str_row(&["A"])]
        );
        assert_no_leftovers(parent.path());
    }

    #[tokio::test]
    async fn test_async_timeout_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let binary = stub_engine(scratch.path(), "sleep 5");
        let mut options = stub_options(binary, parent.path());
        options.timeout = Some(Duration::from_millis(100));
        let executor = AsyncExecutor::with_options(options);

        let err = executor.execute(&graph_context()).await.unwrap_err();
        assert!(matches!(
            err,
            SouffleError::Execution(ExecutionError::Timeout(_))
        ));
        assert_no_leftovers(parent.path());
    }
}

/// End-to-end scenarios against a real engine. Each test skips itself
/// when no `souffle` binary is installed.
mod engine_e2e_tests {
    use super::*;

    fn souffle_available() -> bool {
        std::process::Command::new("souffle")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn sorted(mut rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
        rows.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
        rows
    }

    #[test]
    fn test_transitive_closure() {
        if !souffle_available() {
            eprintln!("skipping: no souffle binary on PATH");
            return;
        }
        init_tracing();

        let mut ctx = Context::new("Reachability");
        ctx.add(Relation::new(
            "edge",
            vec![("from", Type::symbol()), ("to", Type::symbol())],
        ))
        .unwrap();
        ctx.add(Relation::new("reachable", vec![("node", Type::symbol())]).with_io(Io::Output))
            .unwrap();
        ctx.add_fact("edge", vec!["A".into(), "B".into()]).unwrap();
        ctx.add_fact("edge", vec!["B".into(), "C".into()]).unwrap();
        ctx.add_fact("edge", vec!["C".into(), "D".into()]).unwrap();
        ctx.add(Rule::new(
            vec![Atom::new("reachable", vec![Term::var("X")])],
            vec![BodyItem::atom(Atom::new(
                "edge",
                vec![Term::var("X"), Term::wildcard()],
            ))],
        ))
        .unwrap();
        ctx.add(Rule::new(
            vec![Atom::new("reachable", vec![Term::var("Y")])],
            vec![
                BodyItem::atom(Atom::new("reachable", vec![Term::var("X")])),
                BodyItem::atom(Atom::new("edge", vec![Term::var("X"), Term::var("Y")])),
            ],
        ))
        .unwrap();

        let result = Executor::new().execute(&ctx).unwrap();
        assert_eq!(
            sorted(result.rows("reachable").unwrap().to_vec()),
            vec![
                str_row(&["A"]),
                str_row(&["B"]),
                str_row(&["C"]),
                str_row(&["D"]),
            ]
        );
    }

    #[test]
    fn test_ancestor() {
        if !souffle_available() {
            eprintln!("skipping: no souffle binary on PATH");
            return;
        }
        init_tracing();

        let mut ctx = Context::new("AncestorRelation");
        ctx.add(Relation::new(
            "parent",
            vec![("child", Type::symbol()), ("parent", Type::symbol())],
        ))
        .unwrap();
        ctx.add(
            Relation::new(
                "ancestor",
                vec![("descendant", Type::symbol()), ("ancestor", Type::symbol())],
            )
            .with_io(Io::Output),
        )
        .unwrap();
        ctx.add_fact("parent", vec!["B".into(), "A".into()]).unwrap();
        ctx.add_fact("parent", vec!["C".into(), "A".into()]).unwrap();
        ctx.add_fact("parent", vec!["D".into(), "B".into()]).unwrap();
        ctx.add_fact("parent", vec!["E".into(), "C".into()]).unwrap();
        ctx.add(Rule::new(
            vec![Atom::new("ancestor", vec![Term::var("X"), Term::var("Y")])],
            vec![BodyItem::atom(Atom::new(
                "parent",
                vec![Term::var("X"), Term::var("Y")],
            ))],
        ))
        .unwrap();
        ctx.add(Rule::new(
            vec![Atom::new("ancestor", vec![Term::var("X"), Term::var("Z")])],
            vec![
                BodyItem::atom(Atom::new("parent", vec![Term::var("X"), Term::var("Y")])),
                BodyItem::atom(Atom::new("ancestor", vec![Term::var("Y"), Term::var("Z")])),
            ],
        ))
        .unwrap();

        let executor = Executor::with_options(ExecutorOptions {
            process_results: false,
            ..ExecutorOptions::default()
        });
        let result = executor.execute(&ctx).unwrap();
        assert_eq!(
            sorted(result.rows("ancestor").unwrap().to_vec()),
            vec![
                str_row(&["B", "A"]),
                str_row(&["C", "A"]),
                str_row(&["D", "A"]),
                str_row(&["D", "B"]),
                str_row(&["E", "A"]),
                str_row(&["E", "C"]),
            ]
        );
    }

    #[test]
    fn test_equivalence_type_alias() {
        if !souffle_available() {
            eprintln!("skipping: no souffle binary on PATH");
            return;
        }
        init_tracing();

        let mut ctx = Context::new("EquivalenceTypes");
        ctx.add(TypeDef::equivalence("Alias", Type::symbol())).unwrap();
        ctx.add(Relation::new(
            "assign",
            vec![("a", Type::custom("Alias")), ("b", Type::custom("Alias"))],
        ))
        .unwrap();
        ctx.add(
            Relation::new(
                "alias",
                vec![("a", Type::custom("Alias")), ("b", Type::custom("Alias"))],
            )
            .with_io(Io::Output),
        )
        .unwrap();
        ctx.add_fact("assign", vec!["v1".into(), "v2".into()]).unwrap();
        ctx.add(Rule::new(
            vec![Atom::new("alias", vec![Term::var("X"), Term::var("Y")])],
            vec![BodyItem::atom(Atom::new(
                "assign",
                vec![Term::var("X"), Term::var("Y")],
            ))],
        ))
        .unwrap();

        // Custom-typed columns serialize exactly like their primitive base
        let result = Executor::new().execute(&ctx).unwrap();
        assert_eq!(
            result.rows("alias").unwrap(),
            &[str_row(&["v1", "v2"])]
        );
    }
}
