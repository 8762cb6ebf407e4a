//! Amending aggregations: versioned, non-destructive updates

mod common;

use common::{TestStore, promote_to_head};
use multibag::amend::{Amender, Amendment};
use multibag::combine::BagCombiner;
use multibag::{DirResolver, HeadBag};

/// A v1 aggregation: one payload member plus a payload-free head
fn seed_aggregation(store: &TestStore) -> HeadBag {
    store.create_bag("member_1", &[
        ("data/stable.txt", b"unchanged".as_slice()),
        ("data/patched.txt", b"old content".as_slice()),
    ]);
    let head_root = store.create_bag("family_1", &[]);
    promote_to_head(
        &head_root,
        "1",
        &["member_1", "family_1"],
        &[
            ("data/stable.txt", "member_1"),
            ("data/patched.txt", "member_1"),
        ],
        &[],
    );
    HeadBag::open(&head_root).unwrap()
}

#[test]
fn test_new_member_becomes_head() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);
    store.create_bag("patch_2", &[("data/patched.txt", b"new content".as_slice())]);

    let amendment = Amendment::new("2").with_member(store.bag_path("patch_2"));
    let head = Amender::amend(&prev, &amendment, &store.path.join("v2")).unwrap();

    assert_eq!(head.bag().name(), "patch_2");
    assert_eq!(head.head_version().unwrap(), "2");
    assert_eq!(
        head.member_names().unwrap(),
        ["member_1", "family_1", "patch_2"]
    );
    assert_eq!(
        head.lookup_file("data/patched.txt").unwrap().as_deref(),
        Some("patch_2"),
        "reintroduced path is re-owned"
    );
    assert_eq!(
        head.lookup_file("data/stable.txt").unwrap().as_deref(),
        Some("member_1")
    );

    let deps = head.deprecates();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].version, "1");
    assert_eq!(deps[0].head_bag.as_deref(), Some("family_1"));

    // the previous aggregation is untouched
    assert_eq!(
        HeadBag::open(&store.bag_path("family_1"))
            .unwrap()
            .head_version()
            .unwrap(),
        "1"
    );
}

#[test]
fn test_headless_amendment_creates_fresh_head() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);

    let amendment = Amendment::new("2").with_deleted("data/patched.txt");
    let head = Amender::amend(&prev, &amendment, &store.path).unwrap();

    assert_eq!(head.bag().name(), "family_2");
    assert!(head.deleted().unwrap().contains("data/patched.txt"));
    assert_eq!(
        head.member_names().unwrap(),
        ["member_1", "family_1", "family_2"]
    );
    assert!(head.bag().payload_files().unwrap().is_empty());
}

#[test]
fn test_reintroduction_clears_deletion() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);

    // v2 deletes the path, v3 brings it back
    let v2 = Amender::amend(
        &prev,
        &Amendment::new("2").with_deleted("data/patched.txt"),
        &store.path,
    )
    .unwrap();
    store.create_bag("revival_3", &[("data/patched.txt", b"revived".as_slice())]);
    let v3 = Amender::amend(
        &v2,
        &Amendment::new("3").with_member(store.bag_path("revival_3")),
        &store.path.join("v3"),
    )
    .unwrap();

    assert!(v2.deleted().unwrap().contains("data/patched.txt"));
    assert!(!v3.deleted().unwrap().contains("data/patched.txt"));
}

#[test]
fn test_dropped_member_leaves_table_and_lookup() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);
    store.create_bag("replacement_2", &[
        ("data/stable.txt", b"unchanged".as_slice()),
        ("data/patched.txt", b"new content".as_slice()),
    ]);

    let amendment = Amendment::new("2")
        .with_member(store.bag_path("replacement_2"))
        .with_dropped_member("member_1");
    let head = Amender::amend(&prev, &amendment, &store.path.join("v2")).unwrap();

    assert_eq!(head.member_names().unwrap(), ["family_1", "replacement_2"]);
    assert_eq!(
        head.lookup_file("data/stable.txt").unwrap().as_deref(),
        Some("replacement_2")
    );
    assert!(head.files_in_member("member_1").unwrap().is_empty());
}

#[test]
fn test_version_reuse_is_rejected() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);

    let err = Amender::amend(&prev, &Amendment::new("1"), &store.path).unwrap_err();
    assert!(err.to_string().contains('1'), "got: {err}");

    // versions deeper in the chain are also off limits
    let v2 = Amender::amend(
        &prev,
        &Amendment::new("2").replicating_deprecation_chain(),
        &store.path,
    )
    .unwrap();
    assert!(Amender::amend(&v2, &Amendment::new("1"), &store.path).is_err());
}

#[test]
fn test_replicated_chain_reaches_the_oldest_version() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);

    let v2 = Amender::amend(&prev, &Amendment::new("2"), &store.path).unwrap();
    let v3 = Amender::amend(
        &v2,
        &Amendment::new("3").replicating_deprecation_chain(),
        &store.path,
    )
    .unwrap();

    let versions: Vec<_> = v3.deprecates().into_iter().map(|d| d.version).collect();
    assert_eq!(versions, ["2", "1"]);
}

#[test]
fn test_amended_aggregation_combines_with_update_applied() {
    let store = TestStore::new();
    let prev = seed_aggregation(&store);
    store.create_bag("patch_2", &[("data/patched.txt", b"new content".as_slice())]);

    let head = Amender::amend(
        &prev,
        &Amendment::new("2").with_member(store.bag_path("patch_2")),
        &store.path.join("v2"),
    )
    .unwrap();

    let combined = BagCombiner::new(&head)
        .with_resolver(DirResolver::new(&store.path))
        .combine_into(&store.path, "restored_v2")
        .unwrap();
    assert_eq!(combined.read_text("data/patched.txt").unwrap(), "new content");
    assert_eq!(combined.read_text("data/stable.txt").unwrap(), "unchanged");
}
