//! Generation-checked storage for per-stream state.

/// Handle to one registered stream.
///
/// Keys are copyable and stay valid until the stream is removed. A key held
/// past removal is detected by its generation and never aliases a later
/// registration that reuses the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Growable slot storage with stable, generation-checked keys.
///
/// Lookup, insertion, and removal are O(1); iteration visits live slots in
/// index order, so per-stream output ordering is stable across calls.
#[derive(Debug)]
pub struct StreamArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for StreamArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `value` and return its key, reusing a tombstoned slot if any.
    pub fn insert(&mut self, value: T) -> StreamKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            StreamKey {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            StreamKey {
                index,
                generation: 0,
            }
        }
    }

    /// Remove and return the entry behind `key`, if it is still live.
    pub fn remove(&mut self, key: StreamKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        value
    }

    pub fn contains(&self, key: StreamKey) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: StreamKey) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, key: StreamKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Iterate live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (StreamKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    StreamKey {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Iterate live entries mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StreamKey, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.value.as_mut().map(move |value| {
                    (
                        StreamKey {
                            index: index as u32,
                            generation,
                        },
                        value,
                    )
                })
            })
    }

    /// Keys of all live entries, in slot order.
    pub fn keys(&self) -> Vec<StreamKey> {
        self.iter().map(|(key, _)| key).collect()
    }

    /// Drop every entry for which `keep` returns `false`, recycling its slot.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(StreamKey, &mut T) -> bool,
    {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            let key = StreamKey {
                index: index as u32,
                generation: slot.generation,
            };
            let drop_entry = match slot.value.as_mut() {
                Some(value) => !keep(key, value),
                None => false,
            };
            if drop_entry {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                self.len -= 1;
            }
        }
    }
}
