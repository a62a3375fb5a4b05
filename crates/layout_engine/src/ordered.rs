//! Growable sequence kept sorted by a numeric key.
//!
//! Columns store their cells and position records here. Insertion goes
//! before any item with an equal key, so the latest record at a given `top`
//! is met first when scanning downward.

use std::slice;

pub trait Keyed {
    fn key(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderedList<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> OrderedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item` in key order and returns its index.
    pub fn insert(&mut self, item: T) -> usize {
        let key = item.key();
        let at = self.items.partition_point(|other| other.key() < key);
        self.items.insert(at, item);
        at
    }

    /// Items strictly above `key`, then the items at or below it.
    pub fn split_at_key(&self, key: f64) -> (&[T], &[T]) {
        let at = self.items.partition_point(|item| item.key() < key);
        self.items.split_at(at)
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Keyed> FromIterator<T> for OrderedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.insert(item);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a OrderedList<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
