use viewsync::{
    Record, Result, Store,
    tree::PathRecord,
    view::{Searchable, SortBy, ViewSync},
};

// ==========================
// RECORD FIXTURES
// ==========================

/// A keyed record with a display name and a sortable score.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: u32,
    pub name: String,
    pub score: i64,
}

impl Record for Contact {
    type Key = u32;

    fn key(&self) -> &u32 {
        &self.id
    }
}

impl Searchable for Contact {
    fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
    }
}

pub fn contact(id: u32, name: &str, score: i64) -> Contact {
    Contact {
        id,
        name: name.to_string(),
        score,
    }
}

pub fn by_score() -> SortBy<Contact> {
    SortBy::key(|c: &Contact| c.score)
}

pub fn by_name() -> SortBy<Contact> {
    SortBy::key(|c: &Contact| c.name.clone())
}

/// A path-bearing leaf with a size, for tree tests.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
}

impl PathRecord for FileEntry {
    fn path(&self) -> &str {
        &self.path
    }
}

impl Searchable for FileEntry {
    fn matches_text(&self, needle: &str) -> bool {
        self.path.to_lowercase().contains(needle)
    }
}

pub fn file(path: &str, size: u64) -> FileEntry {
    FileEntry {
        path: path.to_string(),
        size,
    }
}

pub fn entry_size(entry: &FileEntry) -> u64 {
    entry.size
}

// ==========================
// VIEW ASSERTION HELPERS
// ==========================

/// Visible items of `view`, cloned in row order.
pub fn visible<R, V>(view: &V, store: &Store<R>) -> Result<Vec<R>>
where
    R: Record + Clone,
    V: ViewSync<R>,
{
    view.projection()
        .visible()
        .iter()
        .map(|handle| store.get(*handle).cloned())
        .collect()
}

/// Visible keys of `view` in row order.
pub fn visible_keys<R, V>(view: &V, store: &Store<R>) -> Result<Vec<R::Key>>
where
    R: Record,
    V: ViewSync<R>,
{
    view.projection()
        .visible()
        .iter()
        .map(|handle| store.get(*handle).map(|item| item.key().clone()))
        .collect()
}

/// Asserts the view invariants, panicking with the violation message.
pub fn assert_consistent<R, V>(view: &V, store: &Store<R>)
where
    R: Record,
    V: ViewSync<R>,
{
    if let Err(violation) = view.check_invariants(store) {
        panic!("view invariant violated: {violation}");
    }
}
