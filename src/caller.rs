//! Opener identity resolution.

#[cfg(target_os = "linux")]
use tracing::debug;

/// Resolves the executable path of the process that opened a file.
///
/// Returns an empty string when the process has already exited or `/proc`
/// is not readable; the profile still records the pid.
#[cfg(target_os = "linux")]
pub fn executable_path(pid: u32) -> String {
    let link = format!("/proc/{pid}/exe");
    match std::fs::read_link(&link) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            debug!(pid, error = %e, "caller executable resolution failed");
            String::new()
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn executable_path(_pid: u32) -> String {
    String::new()
}
