//! One-time extraction of the evaluator executable into a working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Copy `bundle_dir/file_name` into `working_dir` unless it is already there.
///
/// The copy goes through a temporary file and a rename, so a target that
/// exists is always complete and is never touched again.
pub fn extract_executable(bundle_dir: &Path, file_name: &str, working_dir: &Path) -> io::Result<PathBuf> {
    let target = working_dir.join(file_name);
    if target.exists() {
        log::debug!("Evaluator already extracted at {}", target.display());
        return Ok(target);
    }

    let source = bundle_dir.join(file_name);
    if !source.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("evaluator binary not found at {}", source.display()),
        ));
    }

    fs::create_dir_all(working_dir)?;
    let staging = working_dir.join(format!(".{file_name}.{}.partial", std::process::id()));
    fs::copy(&source, &staging)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&staging, fs::Permissions::from_mode(0o755))?;
    }

    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        // another extraction finished first
        if target.exists() {
            return Ok(target);
        }
        return Err(e);
    }

    log::debug!("Extracted evaluator to {}", target.display());
    Ok(target)
}
