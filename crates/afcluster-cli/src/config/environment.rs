use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// First executable called `program` in the directories of `path_var`.
///
/// On Windows each extension listed in `PATHEXT` is tried as well.
pub fn find_in_path_var(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    let names = candidate_names(program);
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

/// Looks `program` up on the process `PATH`.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|path_var| find_in_path_var(program, &path_var))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(windows)]
fn candidate_names(program: &str) -> Vec<OsString> {
    let pathext =
        std::env::var_os("PATHEXT").unwrap_or_else(|| OsString::from(".EXE;.BAT;.CMD"));
    let mut names = vec![OsString::from(program)];
    for ext in pathext.to_string_lossy().split(';').filter(|e| !e.is_empty()) {
        names.push(OsString::from(format!("{}{}", program, ext)));
    }
    names
}

#[cfg(not(windows))]
fn candidate_names(program: &str) -> Vec<OsString> {
    vec![OsString::from(program)]
}
