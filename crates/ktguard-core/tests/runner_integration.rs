//! End-to-end runs over temporary project directories.

use ktguard_core::{
    Baseline, Config, FailureKind, ListenerRef, Mode, NodeId, NodeKind, ProcessorListener, Rule,
    RuleBox, RuleContext, RuleFactory, RulesConfig, Runner, SyntaxTree, TreeConsistencyError,
    Violation, Warning, WarningRegistry,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

static BAD_NAME: Warning = Warning::new("BAD_NAME", "1.1", "identifier should not be named bad", true);

struct RenameBad;

impl Rule for RenameBad {
    fn name(&self) -> &'static str {
        "rename-bad"
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&BAD_NAME];
        &WARNINGS
    }

    fn visit_node(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        if tree.kind(node) == NodeKind::Identifier && tree.leaf_text(node) == "bad" {
            ctx.warn_and_fix(tree, &BAD_NAME, node, "bad", |tree| tree.set_leaf_text(node, "good"))?;
        }
        Ok(())
    }
}

fn rename_bad(_: &RulesConfig) -> RuleBox {
    Box::new(RenameBad)
}

const FACTORIES: &[RuleFactory] = &[rename_bad];

fn registry() -> Arc<WarningRegistry> {
    Arc::new(WarningRegistry::new([&BAD_NAME]).unwrap())
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    dir
}

fn runner(dir: &Path, mode: Mode) -> Runner {
    Runner::builder()
        .root(dir)
        .registry(registry())
        .rules(FACTORIES)
        .mode(mode)
        .build()
        .unwrap()
}

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl ProcessorListener for Events {
    fn before_all(&self, files: &[PathBuf]) {
        self.0.lock().unwrap().push(format!("before_all {}", files.len()));
    }

    fn after(&self, file: &Path, violations: &[Violation]) {
        self.0
            .lock()
            .unwrap()
            .push(format!("after {} {}", file.display(), violations.len()));
    }

    fn after_all(&self) {
        self.0.lock().unwrap().push("after_all".to_string());
    }
}

#[test]
fn test_check_reports_without_writing() {
    let dir = project(&[("src/A.kt", "val bad = 1\nval x = bad\n")]);
    let result = runner(dir.path(), Mode::Check).run(&[]).unwrap();

    assert_eq!(result.files_checked, 1);
    assert_eq!(result.violations.len(), 2);
    let first = &result.violations[0];
    assert_eq!(first.location.file, PathBuf::from("src/A.kt"));
    assert_eq!((first.location.line, first.location.column), (1, 5));
    assert_eq!(result.violations[1].location.line, 2);
    assert!(first.can_be_auto_corrected);
    assert!(!first.corrected);
    assert_eq!(result.exit_code(), 1);

    let content = std::fs::read_to_string(dir.path().join("src/A.kt")).unwrap();
    assert_eq!(content, "val bad = 1\nval x = bad\n");
}

#[test]
fn test_fix_writes_changed_files_only() {
    let dir = project(&[("A.kt", "val bad = 1\n"), ("B.kt", "val ok = 1\n")]);
    let result = runner(dir.path(), Mode::Fix).run(&[]).unwrap();

    assert_eq!(result.files_checked, 2);
    assert_eq!(result.updated_files, [PathBuf::from("A.kt")]);
    assert_eq!(result.corrected_count(), 1);
    assert!(!result.has_remaining());
    assert_eq!(result.exit_code(), 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("A.kt")).unwrap(), "val good = 1\n");

    let again = runner(dir.path(), Mode::Fix).run(&[]).unwrap();
    assert!(again.violations.is_empty());
    assert!(again.updated_files.is_empty());
}

#[test]
fn test_parse_failure_does_not_stop_batch() {
    let dir = project(&[("A.kt", "fun f() {\n"), ("B.kt", "val bad = 1\n")]);
    let result = runner(dir.path(), Mode::Check).run(&[]).unwrap();

    assert_eq!(result.files_checked, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].file, PathBuf::from("A.kt"));
    assert_eq!(result.failures[0].kind, FailureKind::Parse);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.exit_code(), 1);
}

#[test]
fn test_failures_only_exit_code() {
    let dir = project(&[("A.kt", "val s = \"open\n")]);
    let result = runner(dir.path(), Mode::Check).run(&[]).unwrap();
    assert!(result.violations.is_empty());
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn test_baseline_generated_then_applied() {
    let dir = project(&[("A.kt", "val bad = 1\n")]);
    let baseline = dir.path().join("config/baseline.json");

    let first = Runner::builder()
        .root(dir.path())
        .registry(registry())
        .rules(FACTORIES)
        .baseline(&baseline)
        .build()
        .unwrap();
    assert!(first.generates_baseline());
    let result = first.run(&[]).unwrap();
    assert_eq!(result.violations.len(), 1);

    let saved = Baseline::try_to_load(&baseline).unwrap().unwrap();
    assert_eq!(saved.entry_count(), 1);

    let second = Runner::builder()
        .root(dir.path())
        .registry(registry())
        .rules(FACTORIES)
        .baseline(&baseline)
        .build()
        .unwrap();
    assert!(!second.generates_baseline());
    let result = second.run(&[]).unwrap();
    assert!(result.violations.is_empty());
    assert_eq!(result.baselined, 1);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn test_baseline_surfaces_added_duplicate() {
    let dir = project(&[("A.kt", "val bad = 1\n")]);
    let baseline = dir.path().join("baseline.json");
    let with_baseline = || {
        Runner::builder()
            .root(dir.path())
            .registry(registry())
            .rules(FACTORIES)
            .baseline(&baseline)
            .build()
            .unwrap()
    };

    assert_eq!(with_baseline().run(&[]).unwrap().violations.len(), 1);
    let unchanged = with_baseline().run(&[]).unwrap();
    assert!(unchanged.violations.is_empty());

    std::fs::write(dir.path().join("A.kt"), "val bad = 1\nval x = bad\n").unwrap();
    let result = with_baseline().run(&[]).unwrap();
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.baselined, 1);
    assert_eq!(result.exit_code(), 1);
}

#[test]
fn test_disabled_warning_and_unknown_rule() {
    let dir = project(&[("A.kt", "val bad = 1\n")]);
    let config = Config::parse("[rules.BAD_NAME]\nenabled = false\n").unwrap();
    let result = Runner::builder()
        .root(dir.path())
        .config(config)
        .registry(registry())
        .rules(FACTORIES)
        .build()
        .unwrap()
        .run(&[])
        .unwrap();
    assert!(result.violations.is_empty());

    let config = Config::parse("[rules.BAD_NAMES]\nenabled = false\n").unwrap();
    let err = Runner::builder()
        .root(dir.path())
        .config(config)
        .registry(registry())
        .rules(FACTORIES)
        .build();
    assert!(err.is_err());
}

#[test]
fn test_listener_sees_every_file() {
    let dir = project(&[("A.kt", "val bad = 1\n"), ("b/B.kt", "val a = 1\n")]);
    let events = Arc::new(Events::default());
    let listener: ListenerRef = events.clone();
    Runner::builder()
        .root(dir.path())
        .registry(registry())
        .rules(FACTORIES)
        .listener(listener)
        .parallelism(1)
        .build()
        .unwrap()
        .run(&[])
        .unwrap();

    let events = events.0.lock().unwrap();
    assert_eq!(events.first().map(String::as_str), Some("before_all 2"));
    assert_eq!(events.last().map(String::as_str), Some("after_all"));
    assert!(events.contains(&"after A.kt 1".to_string()));
    assert!(events.contains(&format!("after {} 0", Path::new("b/B.kt").display())));
}

#[test]
fn test_excluded_directories_are_skipped() {
    let dir = project(&[("build/Gen.kt", "val bad = 1\n"), ("src/A.kt", "val a = 1\n")]);
    let result = runner(dir.path(), Mode::Check).run(&[]).unwrap();
    assert_eq!(result.files_checked, 1);
    assert!(result.violations.is_empty());
}
