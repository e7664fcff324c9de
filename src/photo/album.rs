//! Append-only collection of oriented photos.
//!
//! Shared between the session (sole writer), the UI and the forwarder job.
//! Photos are never removed or reordered, so an index taken from
//! [`PhotoAlbum::len`] stays valid for [`PhotoAlbum::since`].

use std::sync::{Arc, Mutex, MutexGuard};

/// One completed photo.  Cloning shares the bytes.
pub type Photo = Arc<[u8]>;

#[derive(Debug, Clone, Default)]
pub struct PhotoAlbum {
    photos: Arc<Mutex<Vec<Photo>>>,
}

impl PhotoAlbum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a photo and return its index.
    pub fn push(&self, photo: Vec<u8>) -> usize {
        let mut photos = self.lock();
        photos.push(Photo::from(photo));
        photos.len() - 1
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Photo> {
        self.lock().get(index).cloned()
    }

    /// All photos in arrival order.
    pub fn snapshot(&self) -> Vec<Photo> {
        self.lock().clone()
    }

    /// Photos appended at or after `index`.
    pub fn since(&self, index: usize) -> Vec<Photo> {
        self.lock().get(index..).map(<[Photo]>::to_vec).unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Photo>> {
        self.photos
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_indices_in_order() {
        let album = PhotoAlbum::new();
        assert_eq!(album.push(vec![1]), 0);
        assert_eq!(album.push(vec![2]), 1);
        assert_eq!(album.len(), 2);
        assert_eq!(&*album.get(1).unwrap(), &[2]);
        assert!(album.get(2).is_none());
    }

    #[test]
    fn since_returns_tail() {
        let album = PhotoAlbum::new();
        for i in 0..5u8 {
            album.push(vec![i]);
        }
        let tail: Vec<u8> = album.since(3).iter().map(|p| p[0]).collect();
        assert_eq!(tail, vec![3, 4]);
        assert!(album.since(5).is_empty());
        assert!(album.since(99).is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let album = PhotoAlbum::new();
        let view = album.clone();
        album.push(b"jpeg".to_vec());
        assert_eq!(view.len(), 1);
        assert_eq!(view.snapshot().len(), 1);
    }
}
