//! Bounded, insertion-ordered collection of generated images
//!
//! The gallery only stores records. Deciding *when* to evict and
//! telling observers about it is the manager's job, so the selection
//! can be cleared before a record disappears.

use super::data::{ImageId, ImageRecord};

/// Default number of images shown at once
pub const MAX_IMAGES: usize = 10;

#[derive(Debug)]
pub struct Gallery {
    /// Oldest first
    images: Vec<ImageRecord>,
    capacity: usize,
}

impl Gallery {
    pub fn new(capacity: usize) -> Self {
        Self {
            images: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.images.len() >= self.capacity
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.images.iter().any(|image| image.id() == id)
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.iter().find(|image| image.id() == id)
    }

    /// All records, oldest first
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn ids(&self) -> Vec<ImageId> {
        self.images.iter().map(ImageRecord::id).collect()
    }

    /// Pick the record to drop when the gallery is full: the oldest one
    /// that is not selected, or the absolute oldest if every record is.
    pub fn eviction_candidate<F>(&self, is_selected: F) -> Option<ImageId>
    where
        F: Fn(ImageId) -> bool,
    {
        self.images
            .iter()
            .find(|image| !is_selected(image.id()))
            .or_else(|| self.images.first())
            .map(ImageRecord::id)
    }

    /// Append a record. Returns false (and changes nothing) if a record
    /// with the same id is already present.
    ///
    /// The caller must make room first; pushing into a full gallery is a
    /// logic error.
    pub fn push(&mut self, record: ImageRecord) -> bool {
        if self.contains(record.id()) {
            return false;
        }
        debug_assert!(!self.is_full(), "gallery is full, evict before pushing");
        self.images.push(record);
        true
    }

    /// Remove a record by id, returning it if it was present
    pub fn remove(&mut self, id: ImageId) -> Option<ImageRecord> {
        let index = self.images.iter().position(|image| image.id() == id)?;
        Some(self.images.remove(index))
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new(MAX_IMAGES)
    }
}
