use crate::alloc::Chain;
use crate::fs::FsError;
use crate::{MAX_FILES, MAX_NAME_LEN};

/// One directory slot. The slot is in use iff its name is non-empty.
#[derive(Debug, Default)]
pub(crate) struct FileEntry {
    name: String,
    /// Length of the file contents in bytes.
    size: usize,
    chain: Option<Chain>,
}

impl FileEntry {
    pub fn in_use(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn chain(&self) -> Option<&Chain> {
        self.chain.as_ref()
    }

    fn claim(&mut self, name: &str) {
        debug_assert!(!self.in_use());
        self.name = name.to_owned();
        self.size = 0;
        self.chain = None;
    }

    /// Empties the file, handing its chain back to the caller to free.
    pub fn take_chain(&mut self) -> Option<Chain> {
        self.size = 0;
        self.chain.take()
    }

    pub fn set_contents(&mut self, chain: Option<Chain>, size: usize) {
        debug_assert!(self.chain.is_none());
        self.chain = chain;
        self.size = size;
    }

    /// Resets the slot to free and returns whatever chain it held.
    fn release(&mut self) -> Option<Chain> {
        self.name.clear();
        self.take_chain()
    }
}

/// Rejects names the directory cannot store.
pub(crate) fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() {
        return Err(FsError::InvalidArgument("filename is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::InvalidArgument("filename too large"));
    }
    Ok(())
}

/// Fixed table of file entries, searched linearly.
pub(crate) struct Directory {
    entries: [FileEntry; MAX_FILES],
}

impl Directory {
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| FileEntry::default()),
        }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.in_use() && e.name == name)
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.in_use())
    }

    pub fn get(&self, slot: usize) -> &FileEntry {
        &self.entries[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut FileEntry {
        &mut self.entries[slot]
    }

    pub fn claim(&mut self, slot: usize, name: &str) {
        self.entries[slot].claim(name);
    }

    pub fn release(&mut self, slot: usize) -> Option<Chain> {
        self.entries[slot].release()
    }

    /// Names of in-use entries in slot order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.in_use())
            .map(|e| e.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_longer_than_limit_are_rejected() {
        assert!(validate_name("eleven_char").is_ok());
        match validate_name("twelve_chars").unwrap_err() {
            FsError::InvalidArgument(reason) => assert_eq!(reason, "filename too large"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(validate_name("").is_err());
    }

    #[test]
    fn name_length_counts_bytes() {
        // Six two-byte characters.
        assert!(validate_name("éééééé").is_err());
    }

    #[test]
    fn find_only_matches_in_use_entries() {
        let mut dir = Directory::new();
        assert_eq!(dir.find("a"), None);

        dir.claim(2, "a");
        assert_eq!(dir.find("a"), Some(2));
        assert_eq!(dir.find("A"), None);

        dir.release(2);
        assert_eq!(dir.find("a"), None);
    }

    #[test]
    fn free_slots_are_found_lowest_first() {
        let mut dir = Directory::new();
        dir.claim(0, "a");
        dir.claim(1, "b");
        assert_eq!(dir.find_free_slot(), Some(2));

        dir.release(0);
        assert_eq!(dir.find_free_slot(), Some(0));

        dir.claim(0, "a");
        dir.claim(2, "c");
        dir.claim(3, "d");
        dir.claim(4, "e");
        assert_eq!(dir.find_free_slot(), None);
    }

    #[test]
    fn names_follow_slot_order() {
        let mut dir = Directory::new();
        dir.claim(3, "z");
        dir.claim(1, "y");
        assert_eq!(dir.names(), vec!["y", "z"]);

        dir.release(3);
        dir.claim(0, "x");
        assert_eq!(dir.names(), vec!["x", "y"]);
    }
}
