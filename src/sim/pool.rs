//! Fixed-capacity object pool
//!
//! Slots are allocated once and never freed; "despawning" only flips the
//! active flag. Two acquisition orders are offered: a rotating cursor (road
//! sections) and first-free in array order (traffic).

/// Index of a pool slot
pub type SlotId = usize;

#[derive(Debug, Clone)]
pub struct Pool<T> {
    items: Vec<T>,
    active: Vec<bool>,
    cursor: usize,
}

impl<T> Pool<T> {
    /// Build `capacity` inactive items
    pub fn new(capacity: usize, mut make: impl FnMut(SlotId) -> T) -> Self {
        Self {
            items: (0..capacity).map(&mut make).collect(),
            active: vec![false; capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    pub fn is_active(&self, id: SlotId) -> bool {
        self.active.get(id).copied().unwrap_or(false)
    }

    /// Claim a free slot scanning from the cursor (wrapping). Advances the
    /// cursor past the claimed slot.
    pub fn acquire(&mut self) -> Option<SlotId> {
        let n = self.items.len();
        for step in 0..n {
            let id = (self.cursor + step) % n;
            if !self.active[id] {
                self.active[id] = true;
                self.cursor = (id + 1) % n;
                return Some(id);
            }
        }
        None
    }

    /// Claim the lowest-indexed free slot
    pub fn acquire_first(&mut self) -> Option<SlotId> {
        let id = self.active.iter().position(|a| !*a)?;
        self.active[id] = true;
        Some(id)
    }

    /// Claim a specific slot. Returns false if it is taken or out of range.
    pub fn claim(&mut self, id: SlotId) -> bool {
        match self.active.get_mut(id) {
            Some(active) if !*active => {
                *active = true;
                true
            }
            _ => false,
        }
    }

    /// Mark a slot free. Returns false if it was already free.
    pub fn release(&mut self, id: SlotId) -> bool {
        match self.active.get_mut(id) {
            Some(active) if *active => {
                *active = false;
                true
            }
            _ => false,
        }
    }

    /// Free every slot and rewind the cursor
    pub fn release_all(&mut self) {
        self.active.fill(false);
        self.cursor = 0;
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    /// Every slot, active or not, in array order
    pub fn iter_all(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.items.iter().enumerate()
    }

    pub fn iter_all_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.items.iter_mut().enumerate()
    }

    /// Active slots in array order
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(id, _)| self.active[*id])
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        let active = &self.active;
        self.items
            .iter_mut()
            .enumerate()
            .filter(move |(id, _)| active[*id])
    }
}
