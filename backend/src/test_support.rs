//! In-memory adapters, fixtures and clock doubles for unit tests and the
//! `tests/` suites. Compiled for tests and behind the `test-support` feature.

pub mod scratch {
    //! Temporary directories read back through `cap_std`.

    use std::io;
    use std::path::Path;

    use cap_std::{ambient_authority, fs::Dir};
    use tempfile::TempDir;

    /// A temporary directory that is removed on drop.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lms_backend::test_support::scratch::ScratchDir;
    ///
    /// let scratch = ScratchDir::new()?;
    /// scratch.write("certificate.html", b"<html></html>")?;
    /// assert!(scratch.contains("certificate.html"));
    /// assert_eq!(scratch.read_to_string("certificate.html")?, "<html></html>");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub struct ScratchDir {
        temp: TempDir,
        dir: Dir,
    }

    impl ScratchDir {
        pub fn new() -> io::Result<Self> {
            let temp = TempDir::new()?;
            let dir = Dir::open_ambient_dir(temp.path(), ambient_authority())?;
            Ok(Self { temp, dir })
        }

        pub fn path(&self) -> &Path {
            self.temp.path()
        }

        pub fn contains(&self, name: impl AsRef<Path>) -> bool {
            self.dir.exists(name)
        }

        pub fn read_to_string(&self, name: impl AsRef<Path>) -> io::Result<String> {
            self.dir.read_to_string(name)
        }

        pub fn write(&self, name: impl AsRef<Path>, contents: &[u8]) -> io::Result<()> {
            self.dir.write(name, contents)
        }
    }
}

mod clock;
mod engine;
pub mod fixtures;
mod in_memory_store;
mod lookups;
mod recorders;

pub use clock::MutableClock;
pub use engine::TestEngine;
pub use in_memory_store::InMemoryLearningStore;
pub use lookups::{InMemoryIdentityLookup, InMemorySubscriptionLookup};
pub use recorders::{RecordingCertificateRenderer, RecordingNotifier};
