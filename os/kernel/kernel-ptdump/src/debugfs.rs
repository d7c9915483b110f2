//! # Debug file registry
//!
//! A minimal, in-kernel registry of named, read-only text files. Each file is
//! backed by a [`SeqShow`] implementation that renders the full contents into
//! a [`SeqFile`] on every read; nothing is cached between reads.
//!
//! Access is checked against the file's [`FileMode`]: the registry's files are
//! owned by uid/gid `0`, so a mode of `0o400` admits only the superuser.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use log::debug;

/// Default number of files a registry accepts.
pub const DEFAULT_MAX_FILES: usize = 64;

/// Unix-style permission bits of a registry file.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FileMode(u16);

impl FileMode {
    pub const OWNER_READ: Self = Self(0o400);
    pub const GROUP_READ: Self = Self(0o040);
    pub const OTHER_READ: Self = Self(0o004);

    #[must_use]
    pub const fn new(bits: u16) -> Self {
        Self(bits & 0o777)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether `caller` may read a file with this mode owned by uid/gid `0`.
    #[must_use]
    pub const fn allows_read(self, caller: Caller) -> bool {
        let bit = if caller.uid == 0 {
            Self::OWNER_READ
        } else if caller.gid == 0 {
            Self::GROUP_READ
        } else {
            Self::OTHER_READ
        };
        self.0 & bit.0 != 0
    }
}

/// Identity of the task reading a file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Caller {
    pub uid: u32,
    pub gid: u32,
}

impl Caller {
    pub const ROOT: Self = Self { uid: 0, gid: 0 };

    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }
}

/// Output buffer a [`SeqShow`] renders into.
#[derive(Debug, Default)]
pub struct SeqFile {
    buf: String,
}

impl SeqFile {
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: String::new() }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.buf
    }
}

impl fmt::Write for SeqFile {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

/// Renders the contents of a registry file.
pub trait SeqShow: Send + Sync {
    /// Write the complete file contents into `seq`.
    ///
    /// # Errors
    /// Any formatting error aborts the read.
    fn show(&self, seq: &mut SeqFile) -> fmt::Result;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebugFsError {
    #[error("invalid file name")]
    InvalidName,
    #[error("file already exists: {0}")]
    AlreadyExists(&'static str),
    #[error("no space left for new files")]
    NoSpace,
    #[error("no such file")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("failed to render file contents")]
    Render,
}

struct DebugFsFile {
    name: &'static str,
    mode: FileMode,
    show: Box<dyn SeqShow>,
}

/// Registry of named debug files.
pub struct DebugFs {
    files: Vec<DebugFsFile>,
    max_files: usize,
}

impl Default for DebugFs {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugFs {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_files(DEFAULT_MAX_FILES)
    }

    #[must_use]
    pub const fn with_max_files(max_files: usize) -> Self {
        Self {
            files: Vec::new(),
            max_files,
        }
    }

    /// Register `name`, served by `show`.
    ///
    /// # Errors
    /// - [`DebugFsError::InvalidName`] for empty names or names containing `/`.
    /// - [`DebugFsError::AlreadyExists`] if `name` is taken.
    /// - [`DebugFsError::NoSpace`] if the registry is full.
    pub fn create_file(
        &mut self,
        name: &'static str,
        mode: FileMode,
        show: Box<dyn SeqShow>,
    ) -> Result<(), DebugFsError> {
        if name.is_empty() || name.contains('/') {
            return Err(DebugFsError::InvalidName);
        }
        if self.find(name).is_some() {
            return Err(DebugFsError::AlreadyExists(name));
        }
        if self.files.len() >= self.max_files {
            return Err(DebugFsError::NoSpace);
        }

        debug!("debugfs: created {name} (mode {:#o})", mode.bits());
        self.files.push(DebugFsFile { name, mode, show });
        Ok(())
    }

    /// Render `name` for `caller`.
    ///
    /// # Errors
    /// - [`DebugFsError::NotFound`] if no such file is registered.
    /// - [`DebugFsError::PermissionDenied`] if the mode excludes `caller`.
    /// - [`DebugFsError::Render`] if the file's renderer fails.
    pub fn read(&self, name: &str, caller: Caller) -> Result<String, DebugFsError> {
        let file = self.find(name).ok_or(DebugFsError::NotFound)?;
        if !file.mode.allows_read(caller) {
            return Err(DebugFsError::PermissionDenied);
        }

        let mut seq = SeqFile::new();
        file.show.show(&mut seq).map_err(|_| DebugFsError::Render)?;
        Ok(seq.into_string())
    }

    /// Mode of `name`, if registered.
    #[must_use]
    pub fn mode(&self, name: &str) -> Option<FileMode> {
        self.find(name).map(|f| f.mode)
    }

    /// Names of all registered files, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.files.iter().map(|f| f.name)
    }

    fn find(&self, name: &str) -> Option<&DebugFsFile> {
        self.files.iter().find(|f| f.name == name)
    }
}
