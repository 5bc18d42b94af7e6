// PreviewCache - Keeps the decoded preview of the current selection
//
// Every session change triggers a render, but the preview only changes when a
// new selection's data URI arrives. Entries are keyed by the data URI's
// allocation, so a reselected file decodes again.

use crate::models::Preview;
use std::sync::Arc;

/// Single-entry cache of a decoded preview image
#[derive(Debug)]
pub struct PreviewCache<I> {
    key: Option<Arc<str>>,
    image: Option<I>,
}

impl<I> Default for PreviewCache<I> {
    fn default() -> Self {
        Self {
            key: None,
            image: None,
        }
    }
}

impl<I: Clone> PreviewCache<I> {
    /// Return the image for `preview`, running `decode` only when the preview
    /// differs from the cached one. A failed decode is cached as well.
    pub fn get_or_decode<F>(&mut self, preview: Option<&Preview>, decode: F) -> Option<I>
    where
        F: FnOnce() -> Option<I>,
    {
        let Some(preview) = preview else {
            self.key = None;
            self.image = None;
            return None;
        };

        let hit = self
            .key
            .as_ref()
            .is_some_and(|key| Arc::ptr_eq(key, &preview.data_uri));
        if !hit {
            self.image = decode();
            self.key = Some(Arc::clone(&preview.data_uri));
        }

        self.image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_same_preview_decodes_once() {
        let mut cache = PreviewCache::default();
        let preview = Preview::new("data:image/png;base64,AAAA");
        let decodes = Cell::new(0);
        let decode = || {
            decodes.set(decodes.get() + 1);
            Some(7u32)
        };

        assert_eq!(cache.get_or_decode(Some(&preview), decode), Some(7));
        assert_eq!(cache.get_or_decode(Some(&preview.clone()), decode), Some(7));
        assert_eq!(cache.get_or_decode(Some(&preview), decode), Some(7));
        assert_eq!(decodes.get(), 1);
    }

    #[test]
    fn test_new_selection_decodes_again() {
        let mut cache = PreviewCache::default();
        let first = Preview::new("data:image/png;base64,AAAA");
        // Same bytes, different selection
        let second = Preview::new("data:image/png;base64,AAAA");

        assert_eq!(cache.get_or_decode(Some(&first), || Some(1u32)), Some(1));
        assert_eq!(cache.get_or_decode(Some(&second), || Some(2u32)), Some(2));
    }

    #[test]
    fn test_cleared_preview_drops_entry() {
        let mut cache = PreviewCache::default();
        let preview = Preview::new("data:image/png;base64,AAAA");

        cache.get_or_decode(Some(&preview), || Some(1u32));
        assert_eq!(cache.get_or_decode(None, || Some(9u32)), None);
        assert_eq!(cache.get_or_decode(Some(&preview), || Some(3u32)), Some(3));
    }

    #[test]
    fn test_failed_decode_is_not_retried() {
        let mut cache: PreviewCache<u32> = PreviewCache::default();
        let preview = Preview::new("data:image/png;base64,AAAA");
        let decodes = Cell::new(0);
        let decode = || {
            decodes.set(decodes.get() + 1);
            None
        };

        assert_eq!(cache.get_or_decode(Some(&preview), decode), None);
        assert_eq!(cache.get_or_decode(Some(&preview), decode), None);
        assert_eq!(decodes.get(), 1);
    }
}
