use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeBounds;

/// An object storable in a [`Table`].
///
/// Every object has a stable primary id assigned at insertion, one unique
/// secondary key, and one ordered (non-unique) scan key. Tables that need no
/// meaningful key use the id itself or `()`.
pub trait TableObject: Clone {
    type Key: Ord + Clone;
    type SortKey: Ord + Clone;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
    fn key(&self) -> Self::Key;
    fn sort_key(&self) -> Self::SortKey;
}

/// Pre-images recorded by one undo session. `None` means the object did not
/// exist when the session opened.
struct UndoLayer<T: TableObject> {
    revision: u64,
    old_values: BTreeMap<u64, Option<T>>,
    old_next_id: u64,
}

/// A typed, multi-indexed, undo-capable object table.
pub struct Table<T: TableObject> {
    items: BTreeMap<u64, T>,
    by_key: BTreeMap<T::Key, u64>,
    by_sort: BTreeSet<(T::SortKey, u64)>,
    next_id: u64,
    undo: Vec<UndoLayer<T>>,
}

impl<T: TableObject> Default for Table<T> {
    fn default() -> Self {
        Table {
            items: BTreeMap::new(),
            by_key: BTreeMap::new(),
            by_sort: BTreeSet::new(),
            next_id: 0,
            undo: Vec::new(),
        }
    }
}

impl<T: TableObject> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn record_pre_image(&mut self, id: u64) {
        if let Some(layer) = self.undo.last_mut() {
            layer
                .old_values
                .entry(id)
                .or_insert_with(|| self.items.get(&id).cloned());
        }
    }

    fn index_insert(&mut self, obj: &T) {
        self.by_key.insert(obj.key(), obj.id());
        self.by_sort.insert((obj.sort_key(), obj.id()));
    }

    fn index_remove(&mut self, obj: &T) {
        self.by_key.remove(&obj.key());
        self.by_sort.remove(&(obj.sort_key(), obj.id()));
    }

    /// Insert a new object built by `make` from its assigned id. Returns the
    /// id. Panics if the object's unique key is already taken — callers check
    /// existence first, as a duplicate key is a logic error at this layer.
    pub fn insert(&mut self, make: impl FnOnce(u64) -> T) -> u64 {
        let id = self.next_id;
        let mut obj = make(id);
        obj.set_id(id);
        assert!(
            !self.by_key.contains_key(&obj.key()),
            "duplicate unique key inserted into table"
        );
        self.record_pre_image(id);
        self.next_id += 1;
        self.index_insert(&obj);
        self.items.insert(id, obj);
        id
    }

    pub fn find(&self, id: u64) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn find_by_key(&self, key: &T::Key) -> Option<&T> {
        self.by_key.get(key).and_then(|id| self.items.get(id))
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.by_key.contains_key(key)
    }

    /// Apply `mutate` to the object with the given id, maintaining indices
    /// and recording the pre-image. Returns false when the id is unknown.
    pub fn modify(&mut self, id: u64, mutate: impl FnOnce(&mut T)) -> bool {
        let Some(current) = self.items.get(&id) else {
            return false;
        };
        let old_key = current.key();
        let old_sort = current.sort_key();
        self.record_pre_image(id);
        let obj = self.items.get_mut(&id).expect("checked above");
        mutate(obj);
        let new_key = obj.key();
        let new_sort = obj.sort_key();
        if new_key != old_key {
            self.by_key.remove(&old_key);
            self.by_key.insert(new_key, id);
        }
        if new_sort != old_sort {
            self.by_sort.remove(&(old_sort, id));
            self.by_sort.insert((new_sort, id));
        }
        true
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.record_pre_image(id);
        let obj = self.items.remove(&id)?;
        self.index_remove(&obj);
        Some(obj)
    }

    /// Iterate in primary-id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Iterate in scan-key order.
    pub fn iter_by_sort(&self) -> impl Iterator<Item = &T> {
        self.by_sort.iter().map(|(_, id)| &self.items[id])
    }

    /// Iterate a range of unique keys in key order.
    pub fn iter_by_key_range<R: RangeBounds<T::Key>>(&self, range: R) -> impl Iterator<Item = &T> {
        self.by_key.range(range).map(|(_, id)| &self.items[id])
    }

    /// The first object in scan-key order, if any.
    pub fn first_by_sort(&self) -> Option<&T> {
        self.by_sort.iter().next().map(|(_, id)| &self.items[id])
    }

    // ── Undo sessions ────────────────────────────────────────────────────────

    pub fn session_depth(&self) -> usize {
        self.undo.len()
    }

    /// Open a new undo layer tagged with `revision`.
    pub fn begin(&mut self, revision: u64) {
        self.undo.push(UndoLayer {
            revision,
            old_values: BTreeMap::new(),
            old_next_id: self.next_id,
        });
    }

    /// Roll back every mutation recorded by the newest layer.
    pub fn undo(&mut self) {
        let Some(layer) = self.undo.pop() else {
            return;
        };
        for (id, pre) in layer.old_values {
            if let Some(current) = self.items.remove(&id) {
                self.index_remove(&current);
            }
            if let Some(old) = pre {
                self.index_insert(&old);
                self.items.insert(id, old);
            }
        }
        self.next_id = layer.old_next_id;
    }

    /// Merge the newest layer into its parent. The parent's pre-images win:
    /// only ids it has not yet touched are adopted from the child.
    pub fn squash(&mut self) {
        let Some(child) = self.undo.pop() else {
            return;
        };
        let Some(parent) = self.undo.last_mut() else {
            return;
        };
        for (id, pre) in child.old_values {
            parent.old_values.entry(id).or_insert(pre);
        }
    }

    /// Discard undo layers whose revision is at or below `revision`; their
    /// mutations become permanent.
    pub fn commit(&mut self, revision: u64) {
        let keep = self
            .undo
            .iter()
            .position(|layer| layer.revision > revision)
            .unwrap_or(self.undo.len());
        self.undo.drain(..keep);
    }

    /// Roll back every open layer, newest first.
    pub fn undo_all(&mut self) {
        while !self.undo.is_empty() {
            self.undo();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u64,
        name: String,
        due: i64,
        value: i64,
    }

    impl TableObject for Row {
        type Key = String;
        type SortKey = i64;
        fn id(&self) -> u64 {
            self.id
        }
        fn set_id(&mut self, id: u64) {
            self.id = id;
        }
        fn key(&self) -> String {
            self.name.clone()
        }
        fn sort_key(&self) -> i64 {
            self.due
        }
    }

    fn row(name: &str, due: i64, value: i64) -> impl FnOnce(u64) -> Row + '_ {
        move |id| Row {
            id,
            name: name.to_string(),
            due,
            value,
        }
    }

    #[test]
    fn insert_find_modify_remove() {
        let mut t: Table<Row> = Table::new();
        let a = t.insert(row("alice", 10, 1));
        let b = t.insert(row("bob", 5, 2));
        assert_eq!(t.find(a).unwrap().value, 1);
        assert_eq!(t.find_by_key(&"bob".to_string()).unwrap().id, b);

        t.modify(a, |r| r.value = 7);
        assert_eq!(t.find(a).unwrap().value, 7);

        assert!(t.remove(b).is_some());
        assert!(t.find_by_key(&"bob".to_string()).is_none());
    }

    #[test]
    fn sort_index_tracks_mutation() {
        let mut t: Table<Row> = Table::new();
        t.insert(row("alice", 10, 0));
        let b = t.insert(row("bob", 5, 0));
        assert_eq!(t.first_by_sort().unwrap().name, "bob");

        t.modify(b, |r| r.due = 99);
        assert_eq!(t.first_by_sort().unwrap().name, "alice");
    }

    #[test]
    fn undo_restores_everything() {
        let mut t: Table<Row> = Table::new();
        let a = t.insert(row("alice", 10, 1));

        t.begin(1);
        t.modify(a, |r| r.value = 100);
        let b = t.insert(row("bob", 5, 2));
        t.remove(a);
        t.undo();

        assert_eq!(t.find(a).unwrap().value, 1);
        assert!(t.find(b).is_none());
        assert!(t.find_by_key(&"bob".to_string()).is_none());
        // id allocation rewinds too
        let c = t.insert(row("carol", 1, 3));
        assert_eq!(c, b);
    }

    #[test]
    fn squash_preserves_parent_pre_images() {
        let mut t: Table<Row> = Table::new();
        let a = t.insert(row("alice", 10, 1));

        t.begin(1);
        t.modify(a, |r| r.value = 2);
        t.begin(2);
        t.modify(a, |r| r.value = 3);
        t.squash();
        // the squashed layer remembers value == 1, not value == 2
        t.undo();
        assert_eq!(t.find(a).unwrap().value, 1);
    }

    #[test]
    fn commit_discards_old_layers() {
        let mut t: Table<Row> = Table::new();
        let a = t.insert(row("alice", 10, 1));

        t.begin(1);
        t.modify(a, |r| r.value = 2);
        t.begin(2);
        t.modify(a, |r| r.value = 3);

        t.commit(1);
        assert_eq!(t.session_depth(), 1);
        t.undo_all();
        // revision 1 became permanent, revision 2 rolled back
        assert_eq!(t.find(a).unwrap().value, 2);
    }

    #[test]
    fn nested_undo_is_layered() {
        let mut t: Table<Row> = Table::new();
        let a = t.insert(row("alice", 10, 1));
        t.begin(1);
        t.modify(a, |r| r.value = 2);
        t.begin(2);
        t.modify(a, |r| r.value = 3);
        t.undo();
        assert_eq!(t.find(a).unwrap().value, 2);
        t.undo();
        assert_eq!(t.find(a).unwrap().value, 1);
    }

    #[test]
    fn key_range_iteration() {
        let mut t: Table<Row> = Table::new();
        t.insert(row("alice", 1, 0));
        t.insert(row("bob", 2, 0));
        t.insert(row("carol", 3, 0));
        let names: Vec<_> = t
            .iter_by_key_range("b".to_string().."c".to_string())
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, vec!["bob"]);
    }
}
