use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tempfile::TempDir;

use super::classifier::{EventClassifier, WatchRules, dedupe_nested};
use super::debouncer::{DEBOUNCE_MS, Debouncer, Merge, REBUILD_COOLDOWN_MS, merge_kinds};
use super::router::changes_to_messages;
use super::types::{ChangeKind, ChangeSet};
use crate::actor::messages::BuildMsg;
use crate::config::{ProjectConfig, test_project_config};
use crate::pipeline::{Stage, StageSet};

fn make_config(content: &str) -> (TempDir, ProjectConfig) {
    let temp = TempDir::new().unwrap();
    let config = test_project_config(temp.path(), content);
    (temp, config)
}

fn touch(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "x").unwrap();
    path
}

fn modified(paths: &[&PathBuf]) -> FxHashMap<PathBuf, ChangeKind> {
    paths
        .iter()
        .map(|p| ((*p).clone(), ChangeKind::Modified))
        .collect()
}

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

// =============================================================================
// Debouncer
// =============================================================================

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new();
    assert!(!debouncer.is_ready());
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.scss"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.scss"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.scss"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[Path::new("/tmp/a.scss")], ChangeKind::Created);
    assert_eq!(debouncer.changes[Path::new("/tmp/b.scss")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[Path::new("/tmp/c.scss")], ChangeKind::Removed);
}

#[test]
fn test_metadata_events_ignored() {
    let mut debouncer = Debouncer::new();
    let kind = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ));
    debouncer.add_event(&make_event(vec!["/tmp/a.scss"], kind));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_temp_file_ignored() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/real.js"], modify_kind()));
    let first_time = debouncer.last_event.unwrap();

    std::thread::sleep(Duration::from_millis(5));

    debouncer.add_event(&make_event(
        vec!["/tmp/.layout.scss.swp", "/tmp/main.js~", "/tmp/4913"],
        modify_kind(),
    ));
    assert_eq!(debouncer.last_event.unwrap(), first_time);
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_merge_kinds() {
    use ChangeKind::*;
    assert_eq!(merge_kinds(Removed, Created), Merge::Replace(Created));
    assert_eq!(merge_kinds(Removed, Modified), Merge::Replace(Modified));
    assert_eq!(merge_kinds(Modified, Removed), Merge::Replace(Removed));
    assert_eq!(merge_kinds(Created, Removed), Merge::Discard);
    assert_eq!(merge_kinds(Created, Modified), Merge::Keep);
    assert_eq!(merge_kinds(Modified, Modified), Merge::Keep);
}

#[test]
fn test_dedup_first_event_wins() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.scss"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.scss"], modify_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(debouncer.changes[Path::new("/tmp/a.scss")], ChangeKind::Created);
}

#[test]
fn test_dedup_same_event() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.scss", "/tmp/a.scss"], modify_kind()));
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    assert!(debouncer.changes.is_empty());

    // Nothing left to deliver: polling stops instead of spinning
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    assert_eq!(debouncer.changes[Path::new("/tmp/a.js")], ChangeKind::Created);
}

#[test]
fn test_sleep_duration_no_events() {
    let debouncer = Debouncer::new();
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_sleep_duration_after_event() {
    let mut debouncer = Debouncer::new();
    debouncer.last_event = Some(std::time::Instant::now());

    let dur = debouncer.sleep_duration();
    assert!(dur >= Duration::from_millis(DEBOUNCE_MS - 10));
    assert!(dur <= Duration::from_millis(DEBOUNCE_MS + 10));
}

#[test]
fn test_sleep_duration_respects_cooldown() {
    let mut debouncer = Debouncer::new();
    debouncer.last_event = Some(std::time::Instant::now());
    debouncer.last_batch = Some(std::time::Instant::now());

    let dur = debouncer.sleep_duration();
    assert!(dur >= Duration::from_millis(REBUILD_COOLDOWN_MS - 10));
    assert!(dur <= Duration::from_millis(REBUILD_COOLDOWN_MS + 10));
}

#[test]
fn test_take_after_quiet_window() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.scss"], modify_kind()));
    assert!(debouncer.take_if_ready().is_none());

    debouncer.last_event =
        Some(std::time::Instant::now() - Duration::from_millis(DEBOUNCE_MS + 1));
    let taken = debouncer.take_if_ready().unwrap();
    assert_eq!(taken.len(), 1);
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_batch.is_some());
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn test_classify_by_watch_rules() {
    let (tmp, config) = make_config("");
    let root = &config.root;
    let scss = touch(root, "assets/sass/components/_nav.scss");
    let js = touch(root, "assets/js/src/menu.js");
    let php = touch(root, "templates/header.php");
    let other = touch(root, "README.md");
    let rules = WatchRules::new(&config);

    let set = EventClassifier::classify(modified(&[&scss, &js, &php, &other]), &rules).unwrap();
    assert_eq!(
        set.stages,
        [Stage::Styles, Stage::Scripts].into_iter().collect::<StageSet>()
    );
    assert_eq!(set.reload, vec![php]);
    assert!(!set.config_changed);
    drop(tmp);
}

#[test]
fn test_classify_ignores_derived_outputs() {
    let (_tmp, config) = make_config("[watch]\nreload = [\"./**/*\"]\nscripts = [\"./assets/js/**/*.js\"]");
    let bundle = touch(&config.root, "assets/js/scripts.js");
    let css = touch(&config.root, "assets/css/layout.css");
    let rules = WatchRules::new(&config);

    assert!(EventClassifier::classify(modified(&[&bundle, &css]), &rules).is_none());
}

#[test]
fn test_classify_config_change() {
    let (_tmp, config) = make_config("");
    let rules = WatchRules::new(&config);

    let set = EventClassifier::classify(modified(&[&config.config_path]), &rules).unwrap();
    assert!(set.config_changed);
}

#[test]
fn test_classify_load_path_partial() {
    let (_tmp, config) =
        make_config("[styles]\nload_paths = [\"./vendor/sass\"]\n\n[watch]\nreload = []");
    let partial = touch(&config.root, "vendor/sass/_grid.scss");
    let readme = touch(&config.root, "vendor/sass/README.md");
    let rules = WatchRules::new(&config);

    let set = EventClassifier::classify(modified(&[&partial, &readme]), &rules).unwrap();
    assert_eq!(set.stages, StageSet::only(Stage::Styles));
    assert!(rules.roots().contains(&config.root.join("vendor/sass")));
}

#[test]
fn test_classify_removed_script() {
    let (_tmp, config) = make_config("");
    let gone = config.root.join("assets/js/src/old.js");
    let rules = WatchRules::new(&config);

    let mut raw = FxHashMap::default();
    raw.insert(gone, ChangeKind::Modified);

    let set = EventClassifier::classify(raw, &rules).unwrap();
    assert_eq!(set.stages, StageSet::only(Stage::Scripts));
}

#[test]
fn test_correct_by_existence() {
    let (_tmp, config) = make_config("");
    let present = touch(&config.root, "a.php");
    let missing = config.root.join("b.php");

    let mut changes = FxHashMap::default();
    changes.insert(present.clone(), ChangeKind::Removed);
    changes.insert(missing.clone(), ChangeKind::Created);
    EventClassifier::correct_by_existence(&mut changes);

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[&present], ChangeKind::Modified);
}

#[test]
fn test_filter_actionable_drops_directories() {
    let (_tmp, config) = make_config("");
    let dir = config.root.join("assets/js/src");
    fs::create_dir_all(&dir).unwrap();

    let mut changes = FxHashMap::default();
    changes.insert(dir, ChangeKind::Modified);
    EventClassifier::filter_actionable(&mut changes);
    assert!(changes.is_empty());
}

#[test]
fn test_dedupe_nested_roots() {
    let mut paths = vec![
        PathBuf::from("/site/assets/sass"),
        PathBuf::from("/site"),
        PathBuf::from("/site/assets/js/src"),
        PathBuf::from("/vendor/sass"),
        PathBuf::from("/vendor/sass"),
    ];
    dedupe_nested(&mut paths);
    assert_eq!(paths, vec![PathBuf::from("/site"), PathBuf::from("/vendor/sass")]);
}

#[test]
fn test_default_roots_collapse_to_project_root() {
    let (_tmp, config) = make_config("");
    // `./**/*.php` reloads from the root, which covers every other rule
    assert_eq!(WatchRules::new(&config).roots(), vec![config.root.clone()]);
}

// =============================================================================
// Routing
// =============================================================================

#[test]
fn test_changes_to_messages() {
    let (_tmp, config) = make_config("");
    let changes = ChangeSet {
        stages: StageSet::only(Stage::Styles),
        reload: vec![config.root.join("templates/footer.php")],
        config_changed: false,
    };

    let messages = changes_to_messages(changes, &config);
    assert_eq!(
        messages,
        vec![
            BuildMsg::Run {
                stages: StageSet::only(Stage::Styles)
            },
            BuildMsg::Reload {
                reason: "templates/footer.php changed".into()
            },
        ]
    );
}

#[test]
fn test_config_change_supersedes() {
    let (_tmp, config) = make_config("");
    let changes = ChangeSet {
        stages: StageSet::all(),
        reload: vec![config.root.join("a.php"), config.root.join("b.php")],
        config_changed: true,
    };
    assert_eq!(
        changes_to_messages(changes, &config),
        vec![BuildMsg::ConfigChanged]
    );
}
