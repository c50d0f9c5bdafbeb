use super::*;
use tempfile::TempDir;

fn sandbox() -> (TempDir, Sandbox) {
    let temp_dir = TempDir::new().unwrap();
    let sandbox = Sandbox::new(temp_dir.path().join("root")).unwrap();
    (temp_dir, sandbox)
}

fn real_root(sandbox: &Sandbox) -> PathBuf {
    sandbox.root().canonicalize().unwrap()
}

#[test]
fn test_layout_is_created_lazily() {
    let (_temp, sandbox) = sandbox();
    assert!(!sandbox.root().exists());

    sandbox.ensure_layout().unwrap();
    assert!(sandbox.workspace().is_dir());
    assert!(sandbox.logs().is_dir());
    assert!(sandbox.tmp().is_dir());
    assert_eq!(sandbox.log_file(), sandbox.root().join("logs").join("psyker.log"));
}

#[test]
fn test_relative_path_resolves_under_root() {
    let (_temp, sandbox) = sandbox();
    let resolved = sandbox.resolve_under_root("workspace/x").unwrap();
    assert!(resolved.starts_with(real_root(&sandbox)));
    assert!(resolved.ends_with("workspace/x"));
}

#[test]
fn test_workspace_relative_resolution() {
    let (_temp, sandbox) = sandbox();
    let resolved = sandbox.resolve_in_workspace("build/out.txt").unwrap();
    assert_eq!(
        resolved,
        real_root(&sandbox).join("workspace").join("build").join("out.txt")
    );
}

#[test]
fn test_parent_escape_is_rejected() {
    let (_temp, sandbox) = sandbox();
    let err = sandbox.resolve_under_root("../x").unwrap_err();
    assert_eq!(err.kind_name(), "SandboxError");
    assert!(err.message().contains("is outside sandbox root"));

    let err = sandbox.resolve_in_workspace("../../escape.txt").unwrap_err();
    assert_eq!(err.kind_name(), "SandboxError");
}

#[test]
fn test_dot_dot_that_stays_inside_is_accepted() {
    let (_temp, sandbox) = sandbox();
    let resolved = sandbox.resolve_in_workspace("../tmp/scratch").unwrap();
    assert_eq!(resolved, real_root(&sandbox).join("tmp").join("scratch"));
}

#[test]
fn test_outside_absolute_path_is_rejected() {
    let (temp, sandbox) = sandbox();
    let outside = temp.path().join("elsewhere.txt");
    let err = sandbox
        .resolve_under_root(outside.to_str().unwrap())
        .unwrap_err();
    assert_eq!(err.kind_name(), "SandboxError");
}

#[test]
fn test_absolute_path_inside_root_is_accepted() {
    let (_temp, sandbox) = sandbox();
    let inside = sandbox.workspace().join("a.txt");
    let resolved = sandbox.resolve_under_root(inside.to_str().unwrap()).unwrap();
    assert_eq!(resolved, real_root(&sandbox).join("workspace").join("a.txt"));
}

#[cfg(unix)]
#[test]
fn test_symlink_pointing_outside_is_rejected() {
    let (temp, sandbox) = sandbox();
    sandbox.ensure_layout().unwrap();
    let outside = temp.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("secret.txt"), "secret").unwrap();
    std::os::unix::fs::symlink(&outside, sandbox.workspace().join("link")).unwrap();

    let err = sandbox.resolve_in_workspace("link/secret.txt").unwrap_err();
    assert_eq!(err.kind_name(), "SandboxError");
    assert!(err.message().contains("escapes sandbox root"));
}

#[cfg(unix)]
#[test]
fn test_symlink_with_missing_tail_is_rejected() {
    let (temp, sandbox) = sandbox();
    sandbox.ensure_layout().unwrap();
    let outside = temp.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, sandbox.root().join("link")).unwrap();

    let err = sandbox.resolve_under_root("link/new/dir").unwrap_err();
    assert_eq!(err.kind_name(), "SandboxError");
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_pointing_outside_is_rejected() {
    let (temp, sandbox) = sandbox();
    sandbox.ensure_layout().unwrap();
    let target = temp.path().join("not-yet-created.txt");
    std::os::unix::fs::symlink(&target, sandbox.root().join("dangling")).unwrap();

    let err = sandbox.resolve_under_root("dangling").unwrap_err();
    assert_eq!(err.kind_name(), "SandboxError");
}

#[cfg(unix)]
#[test]
fn test_relative_dangling_link_resolves_from_real_parent() {
    let (_temp, sandbox) = sandbox();
    sandbox.ensure_layout().unwrap();
    let nested = sandbox.root().join("real").join("sub");
    fs::create_dir_all(&nested).unwrap();
    std::os::unix::fs::symlink(&nested, sandbox.root().join("link")).unwrap();
    std::os::unix::fs::symlink("../target.txt", nested.join("pending")).unwrap();

    let resolved = sandbox.resolve_under_root("link/pending").unwrap();
    assert_eq!(resolved, real_root(&sandbox).join("real").join("target.txt"));
}

#[cfg(unix)]
#[test]
fn test_symlink_inside_root_is_followed() {
    let (_temp, sandbox) = sandbox();
    sandbox.ensure_layout().unwrap();
    fs::write(sandbox.workspace().join("real.txt"), "x").unwrap();
    std::os::unix::fs::symlink(
        sandbox.workspace().join("real.txt"),
        sandbox.root().join("alias.txt"),
    )
    .unwrap();

    let resolved = sandbox.resolve_under_root("alias.txt").unwrap();
    assert_eq!(resolved, real_root(&sandbox).join("workspace").join("real.txt"));
}

#[test]
fn test_reset_clears_workspace_and_tmp_but_keeps_logs() {
    let (_temp, sandbox) = sandbox();
    sandbox.ensure_layout().unwrap();
    fs::write(sandbox.workspace().join("a.txt"), "a").unwrap();
    fs::write(sandbox.tmp().join("b.txt"), "b").unwrap();
    sandbox.log("alpha", "w1", "fs.open", "ok").unwrap();

    let cleared = sandbox.reset(false).unwrap();

    assert_eq!(cleared, vec![sandbox.workspace(), sandbox.tmp()]);
    assert!(sandbox.workspace().is_dir());
    assert!(!sandbox.workspace().join("a.txt").exists());
    assert!(!sandbox.tmp().join("b.txt").exists());
    assert!(sandbox.log_file().exists());
}

#[test]
fn test_reset_with_logs_clears_log_file() {
    let (_temp, sandbox) = sandbox();
    sandbox.log("alpha", "w1", "fs.open", "ok").unwrap();

    let cleared = sandbox.reset(true).unwrap();

    assert_eq!(cleared.len(), 3);
    assert!(sandbox.logs().is_dir());
    assert!(!sandbox.log_file().exists());
}

#[test]
fn test_log_appends_tab_separated_lines() {
    let (_temp, sandbox) = sandbox();
    sandbox.log("alpha", "w1", "fs.open", "ok").unwrap();
    sandbox.log("alpha", "w2", "exec.cmd", "error").unwrap();

    let content = fs::read_to_string(sandbox.log_file()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    let fields: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(fields.len(), 5);
    assert!(chrono::DateTime::parse_from_rfc3339(fields[0]).is_ok());
    assert_eq!(&fields[1..], ["agent=alpha", "worker=w1", "op=fs.open", "status=ok"]);
    assert!(lines[1].ends_with("worker=w2\top=exec.cmd\tstatus=error"));
}

#[test]
fn test_normalize_lexically() {
    assert_eq!(
        normalize_lexically(Path::new("/a/b/../c/./d")),
        PathBuf::from("/a/c/d")
    );
    assert_eq!(normalize_lexically(Path::new("/a/../..")), PathBuf::from("/"));
}
