use std::ffi::OsString;

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Finds the launcher that owns the instance lock.
///
/// The PID recorded in the lock is preferred, otherwise the first other
/// process running under the same executable name is taken.
pub fn find_running_instance(holder: Option<u32>) -> Option<u32> {
    let own_pid = std::process::id();
    let exe_name = own_executable_name()?;

    let mut system = System::new();

    if let Some(pid) = holder.filter(|pid| *pid != own_pid) {
        let holder_pid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[holder_pid]), true);
        if let Some(process) = system.process(holder_pid) {
            if process.name() == exe_name.as_os_str() {
                return Some(pid);
            }
        }
    }

    system.refresh_processes(ProcessesToUpdate::All, true);
    let mut others = system
        .processes_by_exact_name(exe_name.as_os_str())
        .map(|process| process.pid().as_u32())
        .filter(|pid| *pid != own_pid);
    let found = others.next();
    found
}

fn own_executable_name() -> Option<OsString> {
    let exe = std::env::current_exe().ok()?;
    exe.file_name().map(|name| name.to_os_string())
}

/// Brings the main window of `pid` to the front, restoring it if minimized.
#[cfg(target_os = "windows")]
pub fn bring_to_front(pid: u32) -> bool {
    use windows::core::BOOL;
    use windows::Win32::Foundation::{HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindow, GetWindowThreadProcessId, IsIconic, IsWindowVisible,
        SetForegroundWindow, ShowWindow, GW_OWNER, SW_RESTORE,
    };

    struct FindData {
        pid: u32,
        hwnd: HWND,
    }

    unsafe extern "system" fn enum_windows_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let data = &mut *(lparam.0 as *mut FindData);
        let mut window_pid: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut window_pid));
        if window_pid != data.pid {
            return BOOL(1);
        }
        // Top level windows only
        let owner = GetWindow(hwnd, GW_OWNER).unwrap_or(HWND(std::ptr::null_mut()));
        if owner.0.is_null() && IsWindowVisible(hwnd).as_bool() {
            data.hwnd = hwnd;
            return BOOL(0);
        }
        BOOL(1)
    }

    let mut data = FindData {
        pid,
        hwnd: HWND(std::ptr::null_mut()),
    };
    unsafe {
        let _ = EnumWindows(Some(enum_windows_proc), LPARAM(&mut data as *mut _ as isize));
    }
    if data.hwnd.0.is_null() {
        tracing::warn!(pid, "Running launcher has no visible window");
        return false;
    }
    unsafe {
        if IsIconic(data.hwnd).as_bool() {
            let _ = ShowWindow(data.hwnd, SW_RESTORE);
        }
        SetForegroundWindow(data.hwnd).as_bool()
    }
}

#[cfg(not(target_os = "windows"))]
pub fn bring_to_front(pid: u32) -> bool {
    tracing::info!(pid, "Raising another window is only supported on Windows");
    false
}

/// Hands control to the launcher that is already running.
pub fn yield_to_running_instance(holder: Option<u32>) {
    match find_running_instance(holder) {
        Some(pid) => {
            let raised = bring_to_front(pid);
            tracing::info!(pid, raised, "Yielding to running launcher");
        }
        None => tracing::warn!(?holder, "Could not find the running launcher"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_never_the_running_instance() {
        assert_ne!(
            Some(std::process::id()),
            find_running_instance(Some(std::process::id()))
        );
    }

    #[test]
    fn unknown_holder_is_ignored() {
        let found = find_running_instance(Some(4_000_000_000));
        assert_ne!(Some(4_000_000_000), found);
    }
}
