//! End-to-end scenario tests, exercised against the extraction/quality/
//! revision/cache pipeline directly with hand-built `LoadedPackage` values
//! rather than a live `gonav-goload` subprocess — the actual Go toolchain
//! runs outside this codebase, so these stand in for the fixtures a real
//! subprocess run would produce.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use gonav_engine::cache::{AnalysisCache, AnalysisPayload, CacheStatus, CachedAnalysis};
use gonav_engine::loader::{ImportDiagnostic, LoadedPackage, RawObject, RawReceiver};
use gonav_engine::module_meta::ModuleMetadata;
use gonav_engine::stdlib::StdlibClassifier;
use gonav_engine::{extract, quality, revision};
use gonav_common::CacheKey;

fn object(name: &str, kind: &str, file: &str, line: u32, column: u32, signature: &str) -> RawObject {
    RawObject {
        name: name.to_string(),
        kind: kind.to_string(),
        file: file.to_string(),
        line,
        column,
        signature: signature.to_string(),
        receiver: None,
    }
}

/// Scenario A — Complete local analysis: `module complete.test`, one file
/// importing `fmt`/`os` with no errors, a `main` function and a `Version`
/// constant.
#[test]
fn scenario_a_complete_local_analysis() {
    let repo_root = Path::new("/repo");
    let module_meta = ModuleMetadata::parse("module complete.test\ngo 1.x\n");
    let classifier = StdlibClassifier::new();
    let go_env = HashMap::new();

    let pkg = LoadedPackage {
        name: "main".to_string(),
        path: "complete.test".to_string(),
        dir: "/repo".to_string(),
        compiled_files: vec!["/repo/main.go".to_string()],
        objects: vec![
            object("main", "function", "/repo/main.go", 5, 6, "func()"),
            object("Version", "constant", "/repo/main.go", 8, 7, "string"),
        ],
        files: vec![],
        imports: vec![
            ImportDiagnostic { import_path: "fmt".to_string(), error: None },
            ImportDiagnostic { import_path: "os".to_string(), error: None },
        ],
        package_errors: vec![],
        type_info_available: true,
        ast_available: true,
    };

    let info = extract::build_package_info(
        &pkg, repo_root, Path::new("/sbx/gomodcache"), &module_meta, &classifier, repo_root, &go_env,
    );
    assert!(info.symbols.contains_key("main"));
    assert!(info.symbols.contains_key("Version"));

    let q = quality::assess(&pkg);
    assert!(q.is_complete);
    assert_eq!(q.quality_score, 1.0);
    assert!(q.missing_dependencies.is_empty());
    q.check_invariants().unwrap();
}

/// Scenario B — Partial analysis with missing dependency, then a `no_change`
/// response for a repeated request carrying the same revision.
#[tokio::test]
async fn scenario_b_partial_with_missing_dependency_then_no_change() {
    let manifest = "module example.com/m\ngo 1.x\n\nrequire example.com/missing v1.0.0\n";
    let module_meta = ModuleMetadata::parse(manifest);

    let pkg = LoadedPackage {
        name: "m".to_string(),
        path: "example.com/m".to_string(),
        dir: "/repo".to_string(),
        compiled_files: vec!["/repo/main.go".to_string()],
        objects: vec![],
        files: vec![],
        imports: vec![ImportDiagnostic {
            import_path: "example.com/missing/lib".to_string(),
            error: Some(
                "could not import example.com/missing/lib (no required module provides package)"
                    .to_string(),
            ),
        }],
        package_errors: vec![],
        type_info_available: true,
        ast_available: true,
    };

    let q = quality::assess(&pkg);
    assert!(!q.is_complete);
    assert!(q.missing_dependencies.contains(&"example.com/missing/lib".to_string()));
    q.check_invariants().unwrap();

    let key = CacheKey::package("example.com/m");
    let r1 = revision::revision(&key.to_string(), &q, 0, 0);

    let cache = AnalysisCache::new();
    cache
        .set(
            key.clone(),
            CachedAnalysis {
                revision: r1.clone(),
                payload: AnalysisPayload::Package(gonav_common::model::PackageInfo::empty(
                    "example.com/m",
                )),
                quality: q,
                timestamp: Instant::now(),
                missing_dependencies: vec!["example.com/missing/lib".to_string()],
                dependency_loading_in_progress: false,
                is_complete: false,
            },
        )
        .await;

    let (entry, status) = cache.get(&key, Some(r1.as_str())).await;
    assert_eq!(status, CacheStatus::NoChange);
    assert_eq!(entry.unwrap().revision, r1);
}

/// Scenario C — Revision stability under dependency reordering: two packages
/// whose missing-import diagnostics arrive in swapped order produce the same
/// revision.
#[test]
fn scenario_c_revision_stable_under_reordering() {
    fn pkg_with_imports(imports: Vec<ImportDiagnostic>) -> LoadedPackage {
        LoadedPackage {
            name: "m".to_string(),
            path: "example.com/m".to_string(),
            imports,
            type_info_available: true,
            ast_available: true,
            ..Default::default()
        }
    }

    let forward = pkg_with_imports(vec![
        ImportDiagnostic {
            import_path: "example.com/a".to_string(),
            error: Some("could not import example.com/a (no required module provides package)".to_string()),
        },
        ImportDiagnostic {
            import_path: "example.com/b".to_string(),
            error: Some("could not import example.com/b (no required module provides package)".to_string()),
        },
    ]);
    let reversed = pkg_with_imports(vec![
        ImportDiagnostic {
            import_path: "example.com/b".to_string(),
            error: Some("could not import example.com/b (no required module provides package)".to_string()),
        },
        ImportDiagnostic {
            import_path: "example.com/a".to_string(),
            error: Some("could not import example.com/a (no required module provides package)".to_string()),
        },
    ]);

    let q_forward = quality::assess(&forward);
    let q_reversed = quality::assess(&reversed);
    assert_eq!(q_forward.missing_dependencies, q_reversed.missing_dependencies);

    let key = CacheKey::package("example.com/m");
    let r_forward = revision::revision(&key.to_string(), &q_forward, 2, 3);
    let r_reversed = revision::revision(&key.to_string(), &q_reversed, 2, 3);
    assert_eq!(r_forward, r_reversed);
}

/// Scenario D — Method qualification: a pointer-receiver `Write` and a
/// value-receiver `Read` on the same type never collide and are never stored
/// bare.
#[test]
fn scenario_d_method_qualification_injectivity() {
    let module_meta = ModuleMetadata::parse("module example.com/m\n");
    let classifier = StdlibClassifier::new();
    let go_env = HashMap::new();

    let pkg = LoadedPackage {
        name: "buf".to_string(),
        path: "example.com/m/buf".to_string(),
        objects: vec![
            RawObject {
                name: "Write".to_string(),
                kind: "function".to_string(),
                file: "/repo/buf/buffer.go".to_string(),
                line: 10,
                column: 1,
                signature: "func(s string)".to_string(),
                receiver: Some(RawReceiver { type_name: "Buffer".to_string(), is_pointer: true }),
            },
            RawObject {
                name: "Read".to_string(),
                kind: "function".to_string(),
                file: "/repo/buf/buffer.go".to_string(),
                line: 20,
                column: 1,
                signature: "func() string".to_string(),
                receiver: Some(RawReceiver { type_name: "Buffer".to_string(), is_pointer: false }),
            },
        ],
        ..Default::default()
    };

    let info = extract::build_package_info(
        &pkg, Path::new("/repo"), Path::new("/sbx/gomodcache"), &module_meta, &classifier,
        Path::new("/repo"), &go_env,
    );
    assert!(info.symbols.contains_key("(*Buffer).Write"));
    assert!(info.symbols.contains_key("Buffer.Read"));
    assert!(!info.symbols.contains_key("Write"));
    assert!(!info.symbols.contains_key("Read"));
}

/// Scenario E — External file-path rewriting: a symbol resolved from inside
/// the sandbox's module cache gets a module-relative `file` and a
/// `name@version`-shaped `package`.
#[test]
fn scenario_e_external_file_path_rewriting() {
    let module_meta = ModuleMetadata::parse("module example.com/m\n\nrequire host.tld/owner/mod v1.2.3\n");
    let gomodcache = Path::new("/sbx/gomodcache");

    let pkg = LoadedPackage {
        name: "m".to_string(),
        path: "example.com/m".to_string(),
        objects: vec![object(
            "Helper",
            "function",
            "/sbx/gomodcache/host.tld/owner/mod@v1.2.3/sub/dir/file.go",
            12,
            3,
            "func()",
        )],
        ..Default::default()
    };

    // The extractor qualifies `owning_package_path` by the object's own
    // package, which in this harness is the package under analysis itself;
    // exercise the lower-level path-recovery helper with the external import
    // path directly, matching how `build_symbol`/`build_target_symbol` drive
    // it for a symbol whose owning package actually is external.
    let loc = gonav_engine::extract::paths::recover_external_location(
        &pkg.objects[0].file,
        gomodcache,
    )
    .expect("external location recoverable");
    assert_eq!(loc.relative_file, "sub/dir/file.go");
    assert_eq!(loc.module_path, "host.tld/owner/mod");
    assert_eq!(loc.version, "v1.2.3");

    let (_, version) = module_meta.resolve("host.tld/owner/mod/sub/dir");
    assert_eq!(version, "v1.2.3");
    let label = gonav_engine::extract::paths::external_package_label("host.tld/owner/mod/sub/dir", &version);
    assert_eq!(label, "host.tld/owner/mod/sub/dir@v1.2.3");
}

/// Scenario F — Position-based click: two references to the same name on
/// the same line but different columns are distinguishable by the click
/// column they contain.
#[test]
fn scenario_f_position_based_click_disambiguation() {
    use gonav_common::model::{FileInfo, Reference, ReferenceType};

    let mut info = FileInfo::empty("package main\n");
    info.references.push(Reference {
        name: "Foo".to_string(),
        line: 10,
        column: 5,
        reference_type: ReferenceType::Local,
        definition_id: Some("def_1".to_string()),
        target: None,
    });
    info.references.push(Reference {
        name: "Foo".to_string(),
        line: 10,
        column: 20,
        reference_type: ReferenceType::Internal,
        definition_id: None,
        target: None,
    });

    let first = info.reference_at(10, 6).expect("click inside first Foo");
    assert_eq!(first.column, 5);
    let second = info.reference_at(10, 21).expect("click inside second Foo");
    assert_eq!(second.column, 20);
    assert!(info.reference_at(10, 15).is_none());
}
