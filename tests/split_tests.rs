//! Split planning and plan execution against real on-disk bags

mod common;

use common::{TestStore, as_refs, uniform_payload};
use multibag::split::{PlanExecutor, SplitConstraints, SplitPlan, Splitter, WellPackedSplitter};
use multibag::store::Bag;
use multibag::{HeadBag, NeighborlySplitter};

#[test]
fn test_plan_covers_every_file_exactly_once() {
    let store = TestStore::new();
    let payload = uniform_payload(7, 1200);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();

    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(3000))
        .unwrap();

    assert!(plan.is_complete(&bag).unwrap());
    let mut seen = std::collections::BTreeSet::new();
    for manifest in plan.manifests() {
        for path in &manifest.paths {
            assert!(seen.insert(path.clone()), "{path} assigned twice");
        }
    }
    assert_eq!(seen, bag.non_special_files().unwrap());
}

#[test]
fn test_twenty_files_pack_into_five_bags_plus_head() {
    let store = TestStore::new();
    let payload = uniform_payload(20, 5000);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();

    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(20000))
        .unwrap();

    let manifests = plan.manifests();
    assert_eq!(manifests.len(), 6, "five payload bags and the head");
    for manifest in &manifests[..5] {
        assert_eq!(manifest.paths.len(), 4);
        assert_eq!(manifest.total_size, 20000);
    }
    assert!(
        manifests[5].paths.is_empty(),
        "nothing was reserved for the head"
    );
}

#[test]
fn test_plans_are_deterministic() {
    let store = TestStore::new();
    let payload = uniform_payload(12, 700);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();
    let constraints = SplitConstraints::new(2000);

    let a = WellPackedSplitter::new().plan(&bag, &constraints).unwrap();
    let b = WellPackedSplitter::new().plan(&bag, &constraints).unwrap();
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());

    let a = NeighborlySplitter::new().plan(&bag, &constraints).unwrap();
    let b = NeighborlySplitter::new().plan(&bag, &constraints).unwrap();
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn test_reserved_paths_land_in_head_manifest() {
    let store = TestStore::new();
    let root = store.create_bag(
        "prog",
        &[
            ("data/a.bin", &[1u8; 400][..]),
            ("data/b.bin", &[2u8; 400][..]),
            ("data/preserve.txt", b"keep me with the head"),
        ],
    );
    let bag = Bag::open(&root).unwrap();

    let constraints =
        SplitConstraints::new(500).with_reserved_for_head(["data/preserve.txt"]);
    let plan = WellPackedSplitter::new().plan(&bag, &constraints).unwrap();

    let head = plan.head_manifest().unwrap();
    assert!(head.contains("data/preserve.txt"));
    for manifest in &plan.manifests()[..plan.manifests().len() - 1] {
        assert!(!manifest.contains("data/preserve.txt"));
    }
    assert!(plan.is_complete(&bag).unwrap());
}

#[test]
fn test_single_bag_doubles_as_head() {
    let store = TestStore::new();
    let root = store.create_bag("prog", &[("data/a.bin", &[1u8; 100][..])]);
    let bag = Bag::open(&root).unwrap();

    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(100_000))
        .unwrap();
    assert_eq!(plan.manifests().len(), 1);

    let out = store.path.join("out");
    std::fs::create_dir(&out).unwrap();
    let bags = PlanExecutor::new(&plan, &bag, &out).execute_all().unwrap();
    assert_eq!(bags.len(), 1);

    let head = HeadBag::open(&bags[0]).unwrap();
    assert_eq!(head.member_names().unwrap(), ["prog_1"]);
    assert_eq!(
        head.lookup_file("data/a.bin").unwrap().as_deref(),
        Some("prog_1")
    );
}

#[test]
fn test_execution_is_lazy() {
    let store = TestStore::new();
    let payload = uniform_payload(8, 1000);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();
    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(2000))
        .unwrap();

    let out = store.path.join("out");
    std::fs::create_dir(&out).unwrap();
    let mut bags = PlanExecutor::new(&plan, &bag, &out).execute();

    let first = bags.next().unwrap().unwrap();
    assert!(first.ends_with("prog_1"));
    let written: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(written, ["prog_1"], "later bags are not written yet");

    let rest: Result<Vec<_>, _> = bags.collect();
    assert_eq!(rest.unwrap().len(), plan.manifests().len() - 1);
}

#[test]
fn test_executed_head_bag_metadata() {
    let store = TestStore::new();
    let payload = uniform_payload(4, 1000);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();
    let mut plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(2000))
        .unwrap();
    plan.head_version = "3".to_string();

    let out = store.path.join("out");
    std::fs::create_dir(&out).unwrap();
    let bags = PlanExecutor::new(&plan, &bag, &out).execute_all().unwrap();

    let head = HeadBag::open(bags.last().unwrap()).unwrap();
    assert_eq!(head.head_version().unwrap(), "3");
    let names = head.member_names().unwrap();
    assert_eq!(names.last().unwrap(), head.bag().name());
    assert_eq!(names.len(), bags.len());

    // every payload file is registered to the member that carries it
    for (path, _) in &payload {
        let owner = head.lookup_file(path).unwrap().expect("registered path");
        let member = Bag::open(&out.join(&owner)).unwrap();
        assert!(member.is_file(path), "{path} not in {owner}");
    }

    // the source info survives verbatim as the aggregation snapshot
    let snapshot = head.aggregation_info().unwrap().expect("snapshot written");
    assert_eq!(
        snapshot.get("Source-Organization"),
        Some("Example Research Institute")
    );

    // member bags identify themselves but remember the source identity
    let member = Bag::open(&bags[0]).unwrap();
    assert_eq!(member.info().get("Internal-Sender-Identifier"), Some("prog_1"));
    assert_eq!(
        member.info().get("Multibag-Source-Internal-Sender-Identifier"),
        Some("prog")
    );
    assert!(member.info().get("Payload-Oxum").is_some());
}

#[test]
fn test_reexecution_is_idempotent() {
    let store = TestStore::new();
    let payload = uniform_payload(6, 1000);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();
    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(2000))
        .unwrap();

    let out = store.path.join("out");
    std::fs::create_dir(&out).unwrap();
    let first = PlanExecutor::new(&plan, &bag, &out).execute_all().unwrap();

    let marker = first[0].join("data");
    let before = std::fs::metadata(&marker).unwrap().modified().unwrap();
    let second = PlanExecutor::new(&plan, &bag, &out).execute_all().unwrap();
    let after = std::fs::metadata(&marker).unwrap().modified().unwrap();

    assert_eq!(first, second);
    assert_eq!(before, after, "resume must not rewrite finished bags");
}

#[test]
fn test_mismatched_existing_bag_is_a_collision() {
    let store = TestStore::new();
    let payload = uniform_payload(6, 1000);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();
    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(2000))
        .unwrap();

    let out = store.path.join("out");
    std::fs::create_dir(&out).unwrap();
    // an unrelated bag already holds the first output name
    store.create_bag("decoy", &[("data/other.bin", &[9u8; 10][..])]);
    std::fs::rename(store.bag_path("decoy"), out.join("prog_1")).unwrap();

    let results: Vec<_> = PlanExecutor::new(&plan, &bag, &out).execute().collect();
    let err = results[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("prog_1"), "got: {err}");
    assert_eq!(results.len(), 1, "execution halts at the collision");
}

#[test]
fn test_plan_survives_json_persistence() {
    let store = TestStore::new();
    let payload = uniform_payload(6, 1000);
    let root = store.create_bag("prog", &as_refs(&payload));
    let bag = Bag::open(&root).unwrap();
    let plan = WellPackedSplitter::new()
        .plan(&bag, &SplitConstraints::new(2000))
        .unwrap();

    let restored = SplitPlan::from_json(&plan.to_json().unwrap()).unwrap();
    let out = store.path.join("out");
    std::fs::create_dir(&out).unwrap();
    let bags = PlanExecutor::new(&restored, &bag, &out).execute_all().unwrap();
    assert_eq!(bags.len(), plan.manifests().len());
}
