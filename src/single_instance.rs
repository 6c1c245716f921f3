use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;

use crate::config::get_config_folder;
use crate::error::LauncherError;

/// Command line flag set by the launcher when it restarts itself.
pub const RESTART_FLAG: &str = "--restarting";

/// Application specific lock name, random enough not to collide with other software.
pub const LOCK_NAME: &str = "GameDiskLauncher-4b7e19c2a05d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Normal,
    Restarting,
}

impl StartMode {
    pub fn from_args(args: &[String]) -> Self {
        if args.iter().any(|arg| arg == RESTART_FLAG) {
            StartMode::Restarting
        } else {
            StartMode::Normal
        }
    }
}

/// A named lock shared by every launcher process on the machine.
pub trait InstanceMutex {
    /// Returns `Ok(false)` when another process holds the lock.
    fn try_acquire(&mut self) -> std::io::Result<bool>;
    fn release(&mut self);
    /// Process id of the current holder, when it can be told.
    fn holder(&self) -> Option<u32>;
}

/// Holds the lock for as long as it lives.
pub struct InstanceGuard<M: InstanceMutex> {
    mutex: M,
}

impl<M: InstanceMutex> InstanceGuard<M> {
    pub fn release(self) {}
}

impl<M: InstanceMutex> Drop for InstanceGuard<M> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}

pub enum Acquisition<M: InstanceMutex> {
    Active(InstanceGuard<M>),
    Yielded { holder: Option<u32> },
}

impl<M: InstanceMutex> Acquisition<M> {
    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        matches!(self, Acquisition::Active(_))
    }
}

/// Decides whether this process may show its window.
///
/// A restarted launcher waits for the previous process to let go of the lock
/// before giving up, a normal launch yields right away.
pub fn acquire<M: InstanceMutex>(
    mut mutex: M,
    mode: StartMode,
    wait: Duration,
    poll: Duration,
) -> Acquisition<M> {
    if try_acquire_logged(&mut mutex) {
        return Acquisition::Active(InstanceGuard { mutex });
    }

    if mode == StartMode::Restarting {
        let attempts = (wait.as_millis() / poll.as_millis().max(1)) as u64;
        tracing::info!(attempts, "Waiting for previous launcher to exit");
        for _ in 0..attempts {
            std::thread::sleep(poll);
            if try_acquire_logged(&mut mutex) {
                return Acquisition::Active(InstanceGuard { mutex });
            }
        }
        tracing::warn!("{}", LauncherError::SingleInstanceTimeout);
    }

    let holder = mutex.holder();
    tracing::info!(?holder, "Another launcher is already running");
    Acquisition::Yielded { holder }
}

fn try_acquire_logged<M: InstanceMutex>(mutex: &mut M) -> bool {
    match mutex.try_acquire() {
        Ok(acquired) => acquired,
        Err(err) => {
            tracing::error!("Could not check instance lock: {err}");
            false
        }
    }
}

pub fn get_lock_file_path() -> PathBuf {
    get_config_folder().join(format!("{LOCK_NAME}.lock"))
}

/// Exclusive advisory lock on a file in the per-user folder.
///
/// The OS drops the lock together with the process, so a crashed launcher
/// never leaves anything to clean up. The owner's PID goes into a separate
/// `.pid` file because some platforms refuse reads of a locked file.
pub struct LockFileMutex {
    path: PathBuf,
    file: Option<File>,
}

impl LockFileMutex {
    pub fn new() -> Self {
        Self::at(get_lock_file_path())
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn pid_path(&self) -> PathBuf {
        self.path.with_extension("pid")
    }

    fn write_pid(&self) -> std::io::Result<()> {
        let mut pid_file = File::create(self.pid_path())?;
        write!(pid_file, "{}", std::process::id())?;
        pid_file.sync_all()
    }
}

impl InstanceMutex for LockFileMutex {
    fn try_acquire(&mut self) -> std::io::Result<bool> {
        if self.file.is_some() {
            return Ok(true);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if is_contended(&err) => return Ok(false),
            Err(err) => return Err(err),
        }
        self.file = Some(file);
        if let Err(err) = self.write_pid() {
            // Only the foreground hand-off needs it
            tracing::warn!("Could not record launcher PID: {err}");
        }
        tracing::debug!(path = %self.path.display(), "Instance lock acquired");
        Ok(true)
    }

    fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        if read_pid(&self.pid_path()) == Some(std::process::id()) {
            let _ = std::fs::remove_file(self.pid_path());
        }
        if let Err(err) = file.unlock() {
            tracing::warn!("Could not unlock instance lock: {err}");
        }
        tracing::debug!(path = %self.path.display(), "Instance lock released");
    }

    fn holder(&self) -> Option<u32> {
        read_pid(&self.pid_path())
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::{Arc, Barrier};

    use super::*;

    /// Lock held by someone else until `free_after` attempts have been made.
    struct ContestedMutex {
        attempts: Rc<Cell<u32>>,
        free_after: Option<u32>,
        released: Rc<Cell<bool>>,
    }

    impl ContestedMutex {
        fn new(free_after: Option<u32>) -> Self {
            Self {
                attempts: Rc::new(Cell::new(0)),
                free_after,
                released: Rc::new(Cell::new(false)),
            }
        }
    }

    impl InstanceMutex for ContestedMutex {
        fn try_acquire(&mut self) -> std::io::Result<bool> {
            self.attempts.set(self.attempts.get() + 1);
            Ok(self
                .free_after
                .map(|free_after| self.attempts.get() > free_after)
                .unwrap_or(false))
        }

        fn release(&mut self) {
            self.released.set(true);
        }

        fn holder(&self) -> Option<u32> {
            Some(4242)
        }
    }

    const WAIT: Duration = Duration::from_millis(50);
    const POLL: Duration = Duration::from_millis(5);

    #[test]
    fn restart_flag_selects_restarting_mode() {
        let args = vec!["disk-launcher".to_string(), RESTART_FLAG.to_string()];
        assert_eq!(StartMode::Restarting, StartMode::from_args(&args));
        assert_eq!(StartMode::Normal, StartMode::from_args(&args[..1]));
    }

    #[test]
    fn uncontested_lock_is_active() {
        let acquisition = acquire(ContestedMutex::new(Some(0)), StartMode::Normal, WAIT, POLL);
        assert!(acquisition.is_active());
    }

    #[test]
    fn normal_mode_yields_without_waiting() {
        let mutex = ContestedMutex::new(Some(1));
        let attempts = mutex.attempts.clone();

        let acquisition = acquire(mutex, StartMode::Normal, WAIT, POLL);

        assert!(matches!(acquisition, Acquisition::Yielded { holder: Some(4242) }));
        assert_eq!(1, attempts.get());
    }

    #[test]
    fn restarting_mode_waits_until_the_last_attempt() {
        // 50ms / 5ms = 10 retries after the first attempt
        let mutex = ContestedMutex::new(Some(10));
        let attempts = mutex.attempts.clone();

        let acquisition = acquire(mutex, StartMode::Restarting, WAIT, POLL);

        assert!(acquisition.is_active());
        assert_eq!(11, attempts.get());
    }

    #[test]
    fn restarting_mode_gives_up_after_the_bound() {
        let mutex = ContestedMutex::new(Some(11));
        let attempts = mutex.attempts.clone();

        let acquisition = acquire(mutex, StartMode::Restarting, WAIT, POLL);

        assert!(!acquisition.is_active());
        assert_eq!(11, attempts.get());
    }

    #[test]
    fn guard_releases_on_drop() {
        let mutex = ContestedMutex::new(Some(0));
        let released = mutex.released.clone();

        if let Acquisition::Active(guard) = acquire(mutex, StartMode::Normal, WAIT, POLL) {
            assert!(!released.get());
            guard.release();
        }

        assert!(released.get());
    }

    /// Races two acquisitions of the same lock file from separate threads.
    fn race_for_lock(path: &Path) -> Vec<Acquisition<LockFileMutex>> {
        let barrier = Arc::new(Barrier::new(2));
        let racers: Vec<_> = (0..2)
            .map(|_| {
                let barrier = barrier.clone();
                let path = path.to_path_buf();
                std::thread::spawn(move || {
                    let mutex = LockFileMutex::at(path);
                    barrier.wait();
                    acquire(mutex, StartMode::Normal, WAIT, POLL)
                })
            })
            .collect();
        racers.into_iter().map(|r| r.join().unwrap()).collect()
    }

    fn lock_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(format!("{LOCK_NAME}.lock"))
    }

    #[test]
    fn concurrent_launches_admit_one_instance() {
        for _ in 0..50 {
            let dir = tempfile::tempdir().unwrap();
            let results = race_for_lock(&lock_path(&dir));
            assert_eq!(1, results.iter().filter(|a| a.is_active()).count());
        }
    }

    #[test]
    fn concurrent_launches_after_crash_admit_one_instance() {
        for _ in 0..50 {
            let dir = tempfile::tempdir().unwrap();
            let path = lock_path(&dir);
            // What a crashed launcher leaves behind
            std::fs::write(&path, "4000000000").unwrap();
            std::fs::write(path.with_extension("pid"), "4000000000").unwrap();

            let results = race_for_lock(&path);

            assert_eq!(1, results.iter().filter(|a| a.is_active()).count());
        }
    }

    #[test]
    fn second_launch_yields_to_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        let first = acquire(LockFileMutex::at(path.clone()), StartMode::Normal, WAIT, POLL);
        let second = acquire(LockFileMutex::at(path.clone()), StartMode::Normal, WAIT, POLL);

        assert!(first.is_active());
        assert!(matches!(
            second,
            Acquisition::Yielded { holder: Some(pid) } if pid == std::process::id()
        ));

        drop(first);
        assert!(!path.with_extension("pid").exists());
        assert!(acquire(LockFileMutex::at(path), StartMode::Normal, WAIT, POLL).is_active());
    }

    #[test]
    fn restarted_instance_takes_over_released_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        let old = acquire(LockFileMutex::at(path.clone()), StartMode::Normal, WAIT, POLL);

        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            drop(old);
        });
        let new = acquire(
            LockFileMutex::at(path),
            StartMode::Restarting,
            Duration::from_secs(5),
            POLL,
        );
        releaser.join().unwrap();

        assert!(new.is_active());
    }

    #[test]
    fn recorded_pid_of_a_live_process_does_not_hold_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        // A running process that never took the lock, as after PID reuse
        std::fs::write(&path, std::process::id().to_string()).unwrap();
        std::fs::write(path.with_extension("pid"), std::process::id().to_string()).unwrap();

        let acquisition = acquire(LockFileMutex::at(path.clone()), StartMode::Normal, WAIT, POLL);

        assert!(acquisition.is_active());
    }
}
