//! Generational arena and generation-checked side tables.
//!
//! Document nodes live in an [`Arena`] and are addressed by [`GenIndex`].
//! Freeing a slot bumps its generation, so an old index can never resolve to
//! the node that later reuses the slot.
//!
//! [`SecondaryMap`] stores per-node data outside the arena. Lookups check the
//! generation too, which makes it behave like an identity-keyed weak map: an
//! entry written for a node that has since been freed is invisible to every
//! later node allocated in the same slot.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenIndex {
    pub index: u32,
    pub generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
    next_free: Option<u32>,
}

pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Store `value` and return its index, reusing a freed slot when one exists.
    pub fn allocate(&mut self, value: T) -> GenIndex {
        self.len += 1;
        match self.free_head {
            Some(i) => {
                let slot = &mut self.slots[i as usize];
                self.free_head = slot.next_free.take();
                slot.value = Some(value);
                GenIndex {
                    index: i,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                    next_free: None,
                });
                GenIndex {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub fn get(&self, id: GenIndex) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: GenIndex) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Free the slot behind `id`. Returns `None` for stale or unknown indices.
    pub fn deallocate(&mut self, id: GenIndex) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_head;
        self.free_head = Some(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn contains(&self, id: GenIndex) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (GenIndex, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    GenIndex {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

// ---------------------------------------------------------------------------
// SecondaryMap
// ---------------------------------------------------------------------------

/// Side table keyed by [`GenIndex`].
///
/// Each slot remembers the generation it was written for; a key with a
/// different generation reads as absent and overwrites the stale entry on
/// insert.
pub struct SecondaryMap<V> {
    slots: Vec<Option<(u32, V)>>,
    len: usize,
}

impl<V> Default for SecondaryMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SecondaryMap<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    pub fn get(&self, key: GenIndex) -> Option<&V> {
        match self.slots.get(key.index as usize) {
            Some(Some((generation, value))) if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: GenIndex) -> Option<&mut V> {
        match self.slots.get_mut(key.index as usize) {
            Some(Some((generation, value))) if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: GenIndex) -> bool {
        self.get(key).is_some()
    }

    /// Insert `value` for `key`, returning the previous value for the same key.
    /// A stale entry left by an older generation is dropped silently.
    pub fn insert(&mut self, key: GenIndex, value: V) -> Option<V> {
        let i = key.index as usize;
        if i >= self.slots.len() {
            self.slots.resize_with(i + 1, || None);
        }
        match self.slots[i].replace((key.generation, value)) {
            Some((generation, old)) if generation == key.generation => Some(old),
            Some(_) => None,
            None => {
                self.len += 1;
                None
            }
        }
    }

    pub fn remove(&mut self, key: GenIndex) -> Option<V> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if !matches!(slot, Some((generation, _)) if *generation == key.generation) {
            return None;
        }
        self.len -= 1;
        slot.take().map(|(_, value)| value)
    }

    /// Mutable access to the entry for `key`, inserting `V::default()` first if
    /// it is absent or stale.
    pub fn entry_or_default(&mut self, key: GenIndex) -> &mut V
    where
        V: Default,
    {
        if !self.contains_key(key) {
            self.insert(key, V::default());
        }
        let slot = &mut self.slots[key.index as usize];
        &mut slot.get_or_insert_with(|| (key.generation, V::default())).1
    }

    /// Keep only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(GenIndex, &mut V) -> bool) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let kept = match slot {
                Some((generation, value)) => keep(
                    GenIndex {
                        index: i as u32,
                        generation: *generation,
                    },
                    value,
                ),
                None => continue,
            };
            if !kept {
                *slot = None;
                self.len -= 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = GenIndex> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|(generation, _)| GenIndex {
                index: i as u32,
                generation: *generation,
            })
        })
    }
}
