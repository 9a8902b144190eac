//! Options of an unlock request.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Set of unlock options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UnlockOptions: u8 {
        /// Commit as a private version
        const PRIVATE_VERSION = 1;
        /// Content was uploaded during the checkout
        const UPLOAD = 2;
        /// Content was edited through WebDAV
        const WEBDAV = 4;
        /// Release a lock held by someone else
        const FORCE = 8;
    }
}

impl UnlockOptions {
    /// The working copy carries new content to commit.
    pub fn commits_content(self) -> bool {
        self.intersects(Self::UPLOAD | Self::WEBDAV)
    }
}

impl fmt::Display for UnlockOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter_names().map(|(name, _)| name.to_lowercase()).collect();
        write!(f, "[{}]", names.join(","))
    }
}

/// A single option, for callers holding raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnlockOption {
    PrivateVersion = 1,
    Upload = 2,
    Webdav = 4,
    Force = 8,
}

impl UnlockOption {
    pub fn mask(self) -> u8 {
        self as u8
    }

    /// Is this option set in `bits`?
    pub fn is_selected(self, bits: u8) -> bool {
        bits & self.mask() != 0
    }

    pub fn add(self, bits: u8) -> u8 {
        bits | self.mask()
    }

    pub fn remove(self, bits: u8) -> u8 {
        bits & !self.mask()
    }
}

impl From<UnlockOption> for UnlockOptions {
    fn from(option: UnlockOption) -> Self {
        UnlockOptions::from_bits_retain(option.mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_match_flags() {
        assert_eq!(UnlockOptions::from(UnlockOption::PrivateVersion), UnlockOptions::PRIVATE_VERSION);
        assert_eq!(UnlockOptions::from(UnlockOption::Upload), UnlockOptions::UPLOAD);
        assert_eq!(UnlockOptions::from(UnlockOption::Webdav), UnlockOptions::WEBDAV);
        assert_eq!(UnlockOption::Force.mask(), UnlockOptions::FORCE.bits());
    }

    #[test]
    fn test_add_is_idempotent() {
        let bits = UnlockOption::Force.add(0);
        assert_eq!(bits, 8);
        assert_eq!(UnlockOption::Force.add(bits), 8);
        let bits = UnlockOption::PrivateVersion.add(bits);
        assert_eq!(bits, 9);
        assert!(UnlockOption::PrivateVersion.is_selected(bits));
        assert!(UnlockOption::Force.is_selected(bits));
        assert!(!UnlockOption::Upload.is_selected(bits));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let bits = UnlockOption::Webdav.remove(13);
        assert_eq!(bits, 9);
        assert_eq!(UnlockOption::Webdav.remove(bits), 9);
        assert_eq!(UnlockOption::Force.remove(UnlockOption::PrivateVersion.remove(bits)), 0);
    }

    #[test]
    fn test_option_set() {
        let options = UnlockOptions::UPLOAD | UnlockOptions::PRIVATE_VERSION;
        assert!(options.commits_content());
        assert_eq!(options.bits(), 3);
        assert_eq!(options.to_string(), "[private_version,upload]");
        assert!(!options.difference(UnlockOptions::UPLOAD).commits_content());
        assert_eq!(UnlockOptions::from_bits_truncate(0xff), UnlockOptions::all());
        assert_eq!(UnlockOptions::empty().to_string(), "[]");
    }
}
