// End-to-end reconciliation tests against real temporary directories.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use jailconf::{
    Action, DesiredState, FailureKind, JailOptions, JailParams, JailSettings, MANAGED_MARKER,
    Reconciler, SettingKey,
};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let n = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut dir = std::env::temp_dir();
        dir.push(format!("jailconf-it-{name}-{}-{n}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn reconciler(dir: &TempDir) -> Reconciler {
    Reconciler::new(JailOptions::with_jail_directory(dir.path())).expect("valid options")
}

fn all_keys_params(name: &str, seed: i64) -> JailParams {
    let mut params = JailParams::new(name);
    params.enabled = seed % 2 == 0;
    params.port = Some(format!("port-{seed}"));
    params.filter = Some(format!("filter-{seed}"));
    params.logpath = Some(format!("/var/log/{seed}.log"));
    params.maxretry = Some(seed * 7 + 1);
    params.findtime = Some(format!("{seed}m"));
    params.bantime = Some(format!("{seed}h"));
    params.action = Some(format!("action-{seed}[name={name}]"));
    params
}

fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut entries = std::fs::read_dir(dir)
        .expect("list")
        .map(|e| {
            let e = e.expect("entry");
            (
                e.file_name().to_string_lossy().into_owned(),
                std::fs::read(e.path()).expect("read"),
            )
        })
        .collect::<Vec<_>>();
    entries.sort();
    entries
}

#[test]
fn sshd_scenario_on_empty_directory() {
    let dir = TempDir::new("scenario");
    let settings = JailSettings::new(true)
        .with(SettingKey::Port, "22")
        .and_then(|s| s.with(SettingKey::MaxRetry, "3"))
        .expect("valid");
    let desired = DesiredState::new("sshd", dir.path(), settings);

    let rec = reconciler(&dir);
    let outcome = rec.reconcile(&desired, false).expect("reconcile ok");
    assert!(outcome.succeeded);
    assert!(outcome.changed);
    assert_eq!(outcome.path, dir.path().join("sshd.conf"));

    let stored = rec.codec().read(&outcome.path).expect("read ok");
    assert_eq!(stored.section_name, "sshd");
    assert_eq!(stored.settings.len(), 3);
    assert_eq!(stored.settings.get("enabled").map(String::as_str), Some("true"));
    assert_eq!(stored.settings.get("port").map(String::as_str), Some("22"));
    assert_eq!(stored.settings.get("maxretry").map(String::as_str), Some("3"));
}

#[test]
fn reconcile_is_idempotent() {
    let dir = TempDir::new("idempotent");
    let rec = reconciler(&dir);

    let first = rec.apply(all_keys_params("nginx", 4), false).expect("ok");
    assert!(first.changed);
    let after_first = snapshot(dir.path());

    let second = rec.apply(all_keys_params("nginx", 4), false).expect("ok");
    assert!(second.succeeded);
    assert!(!second.changed);
    assert_eq!(snapshot(dir.path()), after_first);
}

#[test]
fn dry_run_predicts_the_real_run() {
    let dir = TempDir::new("dryrun");
    let rec = reconciler(&dir);

    let steps = [
        all_keys_params("postfix", 1),
        all_keys_params("postfix", 1),
        all_keys_params("postfix", 2),
        {
            let mut p = JailParams::new("postfix");
            p.present = false;
            p
        },
        {
            let mut p = JailParams::new("postfix");
            p.present = false;
            p
        },
    ];

    for params in steps {
        let before = snapshot(dir.path());
        let dry = rec.apply(params.clone(), true).expect("dry ok");
        assert_eq!(snapshot(dir.path()), before, "dry run mutated the directory");

        let real = rec.apply(params, false).expect("real ok");
        assert_eq!(dry.changed, real.changed);
        assert_eq!(dry.action, real.action);
        assert_eq!(dry.previous, real.previous);
    }
}

#[test]
fn written_settings_read_back_unchanged() {
    let dir = TempDir::new("roundtrip");
    let rec = reconciler(&dir);

    for seed in 0..4 {
        let name = format!("jail-{seed}");
        let desired = all_keys_params(&name, seed)
            .into_desired_state(rec.options())
            .expect("valid");
        let path = rec.codec().path_for(&name, dir.path());
        rec.codec()
            .write(&name, &desired.settings, &path)
            .expect("write ok");

        let stored = rec.codec().read(&path).expect("read ok");
        assert_eq!(stored.section_name, name);
        assert_eq!(&stored.settings, desired.settings.as_map());
        let expected_enabled = if seed % 2 == 0 { "true" } else { "false" };
        assert_eq!(
            stored.settings.get("enabled").map(String::as_str),
            Some(expected_enabled)
        );
    }
}

#[test]
fn foreign_file_is_left_byte_for_byte() {
    let dir = TempDir::new("foreign");
    let rec = reconciler(&dir);
    let path = dir.path().join("sshd.conf");
    let foreign: &[u8] = b"# Managed by Puppet\n[sshd]\nenabled = true\nport = 2222\n";
    std::fs::write(&path, foreign).expect("write");

    let mut absent = JailParams::new("sshd");
    absent.present = false;

    for (params, dry_run) in [
        (all_keys_params("sshd", 3), false),
        (all_keys_params("sshd", 3), true),
        (absent, false),
    ] {
        let outcome = rec.apply(params, dry_run).expect("ok");
        assert!(!outcome.succeeded);
        assert!(!outcome.changed);
        assert_eq!(outcome.failure, Some(FailureKind::UnmanagedFile));
        assert!(outcome.message.is_some());
    }
    assert_eq!(std::fs::read(&path).expect("read"), foreign);
}

#[test]
fn forced_overwrite_marks_the_file() {
    let dir = TempDir::new("force");
    let rec = reconciler(&dir);
    let path = dir.path().join("sshd.conf");
    std::fs::write(&path, "hand edited, not even ini\n").expect("write");

    let mut params = all_keys_params("sshd", 6);
    params.force = true;
    let outcome = rec.apply(params.clone(), false).expect("ok");
    assert!(outcome.succeeded);
    assert!(outcome.changed);
    assert_eq!(outcome.action, Action::Update);

    let text = std::fs::read_to_string(&path).expect("read");
    assert_eq!(text.lines().next(), Some(MANAGED_MARKER));
    assert_eq!(text.lines().nth(1), Some("[sshd]"));

    let outcome = rec.apply(params, false).expect("ok");
    assert!(!outcome.changed);
}

#[test]
fn absence_converges() {
    let dir = TempDir::new("absence");
    let rec = reconciler(&dir);
    let mut absent = JailParams::new("sshd");
    absent.present = false;

    let outcome = rec.apply(absent.clone(), false).expect("ok");
    assert!(outcome.succeeded);
    assert!(!outcome.changed);

    rec.apply(all_keys_params("sshd", 8), false).expect("ok");
    let outcome = rec.apply(absent, false).expect("ok");
    assert!(outcome.succeeded);
    assert!(outcome.changed);
    assert_eq!(outcome.action, Action::Delete);
    assert!(snapshot(dir.path()).is_empty());
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = TempDir::new("nodir");
    let mut params = JailParams::new("sshd");
    params.jail_directory = Some(dir.path().join("does-not-exist"));

    let err = reconciler(&dir).apply(params, false).expect_err("must fail");
    assert!(matches!(err, jailconf::Error::IoError { .. }), "{err:?}");
}

#[cfg(feature = "json")]
#[test]
fn json_report_mirrors_module_output() {
    let dir = TempDir::new("json");
    let rec = reconciler(&dir);
    let args = format!(
        r#"{{"name":"sshd","port":"22","maxretry":3,"jail_directory":{:?}}}"#,
        dir.path().to_string_lossy()
    );

    let outcome = rec
        .apply(JailParams::from_json(&args).expect("args"), false)
        .expect("ok");
    let report: serde_json::Value =
        serde_json::from_str(&outcome.to_json().expect("json")).expect("valid json");
    assert_eq!(report["changed"], true);
    assert_eq!(report["failed"], false);
    assert_eq!(report["configuration"]["maxretry"], "3");
    assert!(report.get("msg").is_none());

    let args = args.replace("\"22\"", "\"2222\"");
    let outcome = rec
        .apply(JailParams::from_json(&args).expect("args"), false)
        .expect("ok");
    let report: serde_json::Value =
        serde_json::from_str(&outcome.to_json().expect("json")).expect("valid json");
    assert_eq!(report["previous_configuration"]["port"], "22");
    assert_eq!(report["configuration"]["port"], "2222");
}
