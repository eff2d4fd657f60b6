/// Version lines printed by `--version`
///
/// `GIT_REF` and `BUILT_BY` are picked up from the build environment when set.
pub fn version_lines() -> Vec<String> {
    let mut lines = vec![format!("App-Version: {}", env!("CARGO_PKG_VERSION"))];
    if let Some(git_ref) = option_env!("GIT_REF").filter(|s| !s.is_empty()) {
        lines.push(format!("Git-Ref: {git_ref}"));
    }
    if let Some(built_by) = option_env!("BUILT_BY").filter(|s| !s.is_empty()) {
        lines.push(format!("Built-By: {built_by}"));
    }
    lines
}
