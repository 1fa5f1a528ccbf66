//! Unordered list whose elements remember their own index.
//!
//! Removal swaps the last element into the hole, so it is O(1) but does not
//! preserve order. The displaced element's stored index is patched on the
//! spot, which lets an element be removed by value without a scan.

/// An element that stores its index inside a [`BackRefList`].
pub trait BackReferenced {
    /// Index of this element in its list, or `None` if it is not in one.
    fn back_index(&self) -> Option<usize>;

    /// Record the element's index. `None` means removed.
    fn set_back_index(&mut self, index: Option<usize>);
}

/// Unordered list with O(1) removal through back-references.
#[derive(Debug, Clone)]
pub struct BackRefList<T: BackReferenced> {
    items: Vec<T>,
}

impl<T: BackReferenced> Default for BackRefList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BackReferenced> BackRefList<T> {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append `item` and record its index on it. Returns the index.
    pub fn push(&mut self, mut item: T) -> usize {
        let index = self.items.len();
        item.set_back_index(Some(index));
        self.items.push(item);
        index
    }

    /// Remove the element at `index` by swapping the last element into its
    /// place. Returns `None` if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let mut removed = self.items.swap_remove(index);
        removed.set_back_index(None);
        if let Some(moved) = self.items.get_mut(index) {
            moved.set_back_index(Some(index));
        }
        Some(removed)
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Iterate in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Remove every element, clearing their back-references.
    pub fn clear(&mut self) {
        for mut item in self.items.drain(..) {
            item.set_back_index(None);
        }
    }
}

impl<T: BackReferenced + PartialEq> BackRefList<T> {
    /// Remove `item` using its recorded index.
    ///
    /// Returns `None` if the item is not in this list (no index, or the slot
    /// holds a different element).
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let index = item.back_index()?;
        if self.items.get(index) != Some(item) {
            return None;
        }
        self.swap_remove(index)
    }

    /// Whether `item` is stored in this list.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        item.back_index()
            .is_some_and(|index| self.items.get(index) == Some(item))
    }
}

impl<'a, T: BackReferenced> IntoIterator for &'a BackRefList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
