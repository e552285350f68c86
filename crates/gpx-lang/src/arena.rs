use serde::{Deserialize, Serialize};
use std::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// A type-safe identifier for elements stored in an [`Arena`].
///
/// The phantom key means an `ArenaId<A>` cannot be used to access elements
/// of an arena keyed on `B`.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArenaId<K> {
    id: u32,
    #[serde(skip)]
    _phantom_data: PhantomData<K>,
}

impl<K> Copy for ArenaId<K> {}

impl<K> Clone for ArenaId<K> {
    #[inline(always)]
    fn clone(&self) -> ArenaId<K> {
        *self
    }
}

impl<K> PartialEq for ArenaId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for ArenaId<K> {}

impl<K> PartialOrd for ArenaId<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for ArenaId<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<K> std::hash::Hash for ArenaId<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K> fmt::Debug for ArenaId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id)
    }
}

impl<K> From<u32> for ArenaId<K> {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl<K> From<usize> for ArenaId<K> {
    fn from(id: usize) -> Self {
        Self::new(id as u32)
    }
}

impl<K> ArenaId<K> {
    /// Creates a new arena identifier from a raw `u32` index.
    pub const fn new(id: u32) -> ArenaId<K> {
        Self {
            id,
            _phantom_data: PhantomData,
        }
    }

    pub const fn index(&self) -> usize {
        self.id as usize
    }
}

/// A slot arena.
///
/// Removed slots are recycled by later allocations, so an id stays valid
/// until the element it points to is removed. Accessing a removed or foreign
/// id through `Index` panics; use [`Arena::get`] for a checked lookup.
#[derive(Debug, Clone)]
pub struct Arena<T, K = T> {
    items: Vec<Option<T>>,
    free: Vec<u32>,
    _key: PhantomData<K>,
}

impl<T, K> Default for Arena<T, K> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T, K> Arena<T, K> {
    /// Creates a new arena with the specified initial capacity.
    pub fn new(size: usize) -> Self {
        Arena {
            items: Vec::with_capacity(size),
            free: Vec::new(),
            _key: PhantomData,
        }
    }

    /// Allocates a value in the arena and returns its identifier.
    pub fn alloc(&mut self, value: T) -> ArenaId<K> {
        match self.free.pop() {
            Some(id) => {
                self.items[id as usize] = Some(value);
                ArenaId::new(id)
            }
            None => {
                let arena_id = self.items.len() as u32;
                self.items.push(Some(value));
                ArenaId::new(arena_id)
            }
        }
    }

    /// Removes the element stored under `id`, freeing its slot.
    pub fn remove(&mut self, id: ArenaId<K>) -> Option<T> {
        let value = self.items.get_mut(id.index())?.take()?;
        self.free.push(id.id);
        Some(value)
    }

    /// Returns the number of live elements in the arena.
    pub fn len(&self) -> usize {
        self.items.len() - self.free.len()
    }

    /// Returns `true` if the arena contains no live elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the element at the given `ArenaId`, or `None` if it is not live.
    pub fn get(&self, id: ArenaId<K>) -> Option<&T> {
        self.items.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ArenaId<K>) -> Option<&mut T> {
        self.items.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ArenaId<K>) -> bool {
        self.get(id).is_some()
    }

    /// Maps every live element, keeping ids and free slots intact.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Arena<U, K> {
        Arena {
            items: self.items.iter().map(|item| item.as_ref().map(&mut f)).collect(),
            free: self.free.clone(),
            _key: PhantomData,
        }
    }

    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<Arena<U, K>, E> {
        let items = self
            .items
            .iter()
            .map(|item| item.as_ref().map(&mut f).transpose())
            .collect::<Result<Vec<_>, E>>()?;

        Ok(Arena {
            items,
            free: self.free.clone(),
            _key: PhantomData,
        })
    }
}

impl<T, K> Index<ArenaId<K>> for Arena<T, K> {
    type Output = T;

    fn index(&self, index: ArenaId<K>) -> &Self::Output {
        match self.get(index) {
            Some(item) => item,
            None => panic!("arena id {:?} is not live", index),
        }
    }
}

impl<T, K> IndexMut<ArenaId<K>> for Arena<T, K> {
    fn index_mut(&mut self, index: ArenaId<K>) -> &mut Self::Output {
        match self.get_mut(index) {
            Some(item) => item,
            None => panic!("arena id {:?} is not live", index),
        }
    }
}
