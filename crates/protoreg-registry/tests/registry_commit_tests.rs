// Integration tests for the registry façade: commit creation, content
// dedup, reference resolution, file reassembly, and module lifecycle.

mod common;

use common::{input, memory_registry, push};
use protoreg_core::context::OpContext;
use protoreg_core::digest::{Digest, ModuleDigest};
use protoreg_core::manifest::{Manifest, ManifestEntry};
use protoreg_core::RegistryError;
use protoreg_registry::{CommitInput, ModuleRef};

const PROTO: &[u8] = b"syntax = \"proto3\";";

#[test]
fn test_create_commit_and_fetch_files_roundtrip() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let files: &[(&str, &[u8])] = &[
        ("petstore/v1/pets.proto", PROTO),
        ("petstore/v1/store.proto", b"syntax = \"proto3\"; // store"),
    ];
    let commit = registry
        .create_commit(&ctx, &module, input(files, &["main"]))
        .unwrap();

    let (fetched, fetched_commit) = registry.files_and_commit(&ctx, &module, "main").unwrap();
    assert_eq!(fetched_commit.id, commit.id);

    // Files come back in manifest (path) order with matching bytes
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].path, "petstore/v1/pets.proto");
    assert_eq!(fetched[0].content, PROTO);
    assert_eq!(fetched[0].digest, Digest::shake256_of(PROTO));
    assert_eq!(fetched[1].path, "petstore/v1/store.proto");
}

#[test]
fn test_commit_dedup_across_labels() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let files: &[(&str, &[u8])] = &[("a.proto", PROTO)];
    let first = registry
        .create_commit(&ctx, &module, input(files, &["main"]))
        .unwrap();
    let second = registry
        .create_commit(&ctx, &module, input(files, &["v1.0.0"]))
        .unwrap();

    // Same content, same commit; no second record
    assert_eq!(first.id, second.id);
    let page = registry
        .list_commits(&ctx, &first.module_id, 10, None)
        .unwrap();
    assert_eq!(page.commits.len(), 1);

    // Both labels resolve to the shared commit
    assert_eq!(registry.commit(&ctx, &module, "main").unwrap().id, first.id);
    assert_eq!(
        registry.commit(&ctx, &module, "v1.0.0").unwrap().id,
        first.id
    );
}

#[test]
fn test_file_order_does_not_change_identity() {
    let registry = memory_registry();
    let ctx = OpContext::new();

    let forward = ModuleRef::new("acme", "forward");
    let reverse = ModuleRef::new("acme", "reverse");

    let c1 = registry
        .create_commit(
            &ctx,
            &forward,
            input(&[("z.proto", b"z"), ("a.proto", b"a")], &[]),
        )
        .unwrap();
    let c2 = registry
        .create_commit(
            &ctx,
            &reverse,
            input(&[("a.proto", b"a"), ("z.proto", b"z")], &[]),
        )
        .unwrap();

    // Same file set in a different order: same files digest across modules
    assert_eq!(c1.files_digest, c2.files_digest);

    // Within one module, the permuted set dedups to the same commit
    let again = registry
        .create_commit(
            &ctx,
            &forward,
            input(&[("a.proto", b"a"), ("z.proto", b"z")], &[]),
        )
        .unwrap();
    assert_eq!(again.id, c1.id);
}

#[test]
fn test_label_moves_to_newer_commit() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let c1 = push(&registry, &ctx, &module, &[("a.proto", b"v1")], &[]);
    let c2 = push(&registry, &ctx, &module, &[("a.proto", b"v2")], &[]);
    assert_ne!(c1.id, c2.id);

    // Empty label list defaults to main, which now points at the newer commit
    assert_eq!(registry.commit(&ctx, &module, "main").unwrap().id, c2.id);
    assert_eq!(registry.commit(&ctx, &module, "").unwrap().id, c2.id);
}

#[test]
fn test_reference_falls_back_to_commit_id() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let commit = push(&registry, &ctx, &module, &[("a.proto", PROTO)], &[]);

    let resolved = registry.commit(&ctx, &module, &commit.id).unwrap();
    assert_eq!(resolved.id, commit.id);

    let err = registry.commit(&ctx, &module, "no-such-ref").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_commit_by_id_cross_module_safety() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let petstore = ModuleRef::new("acme", "petstore");
    let payments = ModuleRef::new("acme", "payments");

    let pet_commit = push(&registry, &ctx, &petstore, &[("a.proto", b"pet")], &[]);
    push(&registry, &ctx, &payments, &[("b.proto", b"pay")], &[]);

    // A commit of another module is invisible through this module's scope
    let err = registry
        .commit_by_id(&ctx, &payments, &pet_commit.id)
        .unwrap_err();
    assert!(err.is_not_found());

    // Also via the label/commit-id reference path
    let err = registry.commit(&ctx, &payments, &pet_commit.id).unwrap_err();
    assert!(err.is_not_found());

    // But the owning module resolves it
    let ok = registry.commit_by_id(&ctx, &petstore, &pet_commit.id).unwrap();
    assert_eq!(ok.id, pet_commit.id);

    // And the commit resolves back to its module
    let owning = registry.module_by_commit_id(&ctx, &pet_commit.id).unwrap();
    assert_eq!(owning.name, "petstore");
}

#[test]
fn test_module_digest_composition_with_deps() {
    let registry = memory_registry();
    let ctx = OpContext::new();

    let base = ModuleRef::new("acme", "base");
    let base_commit = push(&registry, &ctx, &base, &[("base.proto", b"base")], &[]);

    let app = ModuleRef::new("acme", "app");
    let app_files: &[(&str, &[u8])] = &[("app.proto", b"app")];
    let app_commit = push(&registry, &ctx, &app, app_files, &[&base_commit]);

    // The app's B5 folds the base's B5 in
    let manifest = Manifest::from_entries(
        app_files
            .iter()
            .map(|(path, content)| ManifestEntry {
                path: path.to_string(),
                digest: Digest::shake256_of(content),
            })
            .collect(),
    );
    let expected =
        ModuleDigest::b5(&manifest, std::slice::from_ref(&base_commit.module_digest)).unwrap();
    assert_eq!(app_commit.module_digest, expected);
    assert_eq!(app_commit.dep_commit_ids, vec![base_commit.id.clone()]);
}

#[test]
fn test_unresolvable_dep_skipped_in_module_digest() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "app");

    let files: &[(&str, &[u8])] = &[("app.proto", b"app")];
    let commit = registry
        .create_commit(
            &ctx,
            &module,
            CommitInput {
                dep_commit_ids: vec!["ffffffffffffffffffffffffffffffff".to_string()],
                ..input(files, &[])
            },
        )
        .unwrap();

    // The absent dep contributes nothing to the B5 input, but the dep id is
    // still recorded on the commit
    let manifest = Manifest::from_entries(vec![ManifestEntry {
        path: "app.proto".to_string(),
        digest: Digest::shake256_of(b"app"),
    }]);
    assert_eq!(
        commit.module_digest,
        ModuleDigest::b5(&manifest, &[]).unwrap()
    );
    assert_eq!(commit.dep_commit_ids.len(), 1);
}

#[test]
fn test_create_module_idempotent_keeps_description() {
    let registry = memory_registry();
    let ctx = OpContext::new();

    let first = registry
        .create_module(&ctx, "acme", "petstore", "pet APIs")
        .unwrap();
    let second = registry
        .create_module(&ctx, "acme", "petstore", "a different description")
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.description, "pet APIs");
}

#[test]
fn test_owner_materializes_lazily_and_lists() {
    let registry = memory_registry();
    let ctx = OpContext::new();

    push(
        &registry,
        &ctx,
        &ModuleRef::new("acme", "petstore"),
        &[("a.proto", b"a")],
        &[],
    );
    push(
        &registry,
        &ctx,
        &ModuleRef::new("acme", "payments"),
        &[("b.proto", b"b")],
        &[],
    );

    let modules = registry.list_modules(&ctx, "acme").unwrap();
    let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["payments", "petstore"]);

    let err = registry.list_modules(&ctx, "nobody").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_module_removes_labels_keeps_commits() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let commit = push(&registry, &ctx, &module, &[("a.proto", PROTO)], &[]);
    let module_id = commit.module_id.clone();

    registry.delete_module(&ctx, "acme", "petstore").unwrap();

    assert!(registry
        .module(&ctx, "acme", "petstore")
        .unwrap_err()
        .is_not_found());
    assert!(registry.list_labels(&ctx, &module_id).unwrap().is_empty());

    // Content-addressed state stays reachable by commit id
    let (files, _) = registry
        .files_and_commit_by_commit_id(&ctx, &commit.id)
        .unwrap();
    assert_eq!(files.len(), 1);

    // Second delete is success
    registry.delete_module(&ctx, "acme", "petstore").unwrap();
}

#[test]
fn test_list_commits_pages_newest_first() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let mut ids = Vec::new();
    for i in 0..5u8 {
        ids.push(push(&registry, &ctx, &module, &[("a.proto", &[i])], &[]).id);
    }
    let module_id = registry.module(&ctx, "acme", "petstore").unwrap().id;
    ids.reverse();

    let mut listed = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = registry
            .list_commits(&ctx, &module_id, 2, token.as_deref())
            .unwrap();
        listed.extend(page.commits.into_iter().map(|c| c.id));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(listed, ids);
}

#[test]
fn test_invalid_inputs_rejected() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let err = registry
        .create_commit(&ctx, &module, input(&[("../escape.proto", b"x")], &[]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidPath { .. }));

    let err = registry
        .create_commit(&ctx, &module, input(&[("a.proto", b"x")], &["bad/label"]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidLabelName { .. }));
}

#[test]
fn test_cancelled_context_short_circuits() {
    let registry = memory_registry();
    let ctx = OpContext::new();
    ctx.cancel_token().cancel();

    let err = registry
        .create_commit(
            &ctx,
            &ModuleRef::new("acme", "petstore"),
            input(&[("a.proto", b"x")], &[]),
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::Cancelled { .. }));
}
