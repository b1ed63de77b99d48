use serde::{Deserialize, Serialize};

/// Stable handle to a ball slot, carrying a generation counter so that a
/// handle goes stale once its slot has been freed and reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallId {
    index: usize,
    generation: u32,
}

impl BallId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Generational arena that hands out stable [`BallId`]s while preventing
/// use-after-free through stale handles.
///
/// Iteration runs in slot order. Under the registry's last-created-first
/// removal policy freed slots are always the highest-indexed ones, so slot
/// order coincides with creation order — the deterministic iteration order
/// the collision predictor relies on.
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    generations: Vec<u32>,
    free: Vec<usize>,
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
            generations: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Inserts a value built from the id it will live under.
    pub fn insert_with(&mut self, create: impl FnOnce(BallId) -> T) -> BallId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                self.slots.len() - 1
            }
        };
        let id = BallId::new(index, self.generations[index]);
        self.slots[index] = Some(create(id));
        id
    }

    pub fn insert(&mut self, value: T) -> BallId {
        self.insert_with(|_| value)
    }

    pub fn get(&self, id: BallId) -> Option<&T> {
        if self.is_valid(id) {
            self.slots.get(id.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: BallId) -> Option<&mut T> {
        if self.is_valid(id) {
            self.slots.get_mut(id.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    /// Frees the slot and bumps its generation, invalidating the handle.
    pub fn remove(&mut self, id: BallId) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = self.slots.get_mut(id.index())?;
        let value = slot.take();
        if value.is_some() {
            self.generations[id.index()] = self.generations[id.index()].wrapping_add(1);
            self.free.push(id.index());
        }
        value
    }

    /// Frees every live slot, invalidating all outstanding handles.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.generations[index] = self.generations[index].wrapping_add(1);
                self.free.push(index);
            }
        }
    }

    /// Live entries with their ids, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BallId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (BallId::new(index, self.generations[index]), item))
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = BallId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, id: BallId) -> bool {
        self.generations
            .get(id.index())
            .copied()
            .map(|generation| generation == id.generation())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trip() {
        let mut arena = Arena::new();
        let id = arena.insert(7);
        assert_eq!(arena.get(id), Some(&7));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn removed_handle_goes_stale() {
        let mut arena = Arena::new();
        let id = arena.insert("a");
        assert_eq!(arena.remove(id), Some("a"));
        assert!(arena.get(id).is_none());
        assert_eq!(arena.remove(id), None);

        let reused = arena.insert("b");
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused.generation(), id.generation());
        assert!(arena.get(id).is_none());
        assert_eq!(arena.get(reused), Some(&"b"));
    }

    #[test]
    fn iteration_follows_slot_order() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let c = arena.insert(3);
        arena.remove(b);

        let order: Vec<_> = arena.ids().collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn clear_invalidates_all_handles() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        arena.clear();
        assert!(arena.is_empty());
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_none());
    }

    #[test]
    fn insert_with_sees_final_id() {
        let mut arena = Arena::new();
        let id = arena.insert_with(|id| id.index());
        assert_eq!(arena.get(id), Some(&id.index()));
    }
}
