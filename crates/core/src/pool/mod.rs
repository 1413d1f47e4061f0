//! Fixed-capacity entity pool with intrusive active and free lists.
//!
//! All `N` payloads live in one boxed slice allocated up front. Each slot is
//! linked into exactly one of two lists by index:
//!
//! - the **active list**, circular and headed by a sentinel slot at index `N`,
//!   newest entity first;
//! - the **free list**, singly linked, order irrelevant.
//!
//! `create` and `delete` are O(1) and never allocate. `delete` hands back the
//! handle *before* the removed slot, which is what lets a traversal remove the
//! entity it is visiting and carry on without skipping or revisiting anyone.

use std::fmt;

const NONE: u32 = u32::MAX;

/// Lifecycle hooks run by the pool.
///
/// Slots are reset to `Default` right before `on_create`, so a payload never
/// sees state left behind by a previous occupant.
pub trait Pooled: Default {
    fn on_create(&mut self) {}
    fn on_destroy(&mut self) {}
}

/// Opaque reference to a pool slot.
///
/// Valid until the slot it names is deleted. The value of
/// [`EntityPool::head`], which `delete` returns when the first entity is
/// removed, names the list head and is only useful as a traversal cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Outcome of one per-tick update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Keep,
    Delete,
}

#[derive(Clone, Copy)]
struct Link {
    prev: u32,
    next: u32,
}

/// `N` slots of `T`, see the module docs.
pub struct EntityPool<T: Pooled, const N: usize> {
    items: Box<[T]>,
    links: Box<[Link]>,
    free_head: u32,
    size: usize,
}

impl<T: Pooled, const N: usize> EntityPool<T, N> {
    const SENTINEL: u32 = N as u32;

    pub fn new() -> Self {
        assert!(N > 0, "pool capacity must be greater than zero");
        assert!(N < NONE as usize, "pool capacity too large");

        let items = (0..N).map(|_| T::default()).collect::<Vec<_>>();
        let mut links = (0..N as u32)
            .map(|i| Link {
                prev: NONE,
                next: if i + 1 < N as u32 { i + 1 } else { NONE },
            })
            .collect::<Vec<_>>();
        links.push(Link {
            prev: Self::SENTINEL,
            next: Self::SENTINEL,
        });

        Self {
            items: items.into_boxed_slice(),
            links: links.into_boxed_slice(),
            free_head: 0,
            size: 0,
        }
    }

    /// The list head, usable as a cursor before the first entity.
    pub fn head(&self) -> Handle {
        Handle(Self::SENTINEL)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn free_count(&self) -> usize {
        N - self.size
    }

    /// Takes a free slot, puts it at the front of the active list and runs
    /// its construction hook. `None` when every slot is in use.
    pub fn create(&mut self) -> Option<Handle> {
        if self.free_head == NONE {
            return None;
        }

        let slot = self.free_head;
        self.free_head = self.links[slot as usize].next;

        let first = self.links[Self::SENTINEL as usize].next;
        self.links[first as usize].prev = slot;
        self.links[slot as usize] = Link {
            prev: Self::SENTINEL,
            next: first,
        };
        self.links[Self::SENTINEL as usize].next = slot;
        self.size += 1;

        let item = &mut self.items[slot as usize];
        *item = T::default();
        item.on_create();
        Some(Handle(slot))
    }

    /// [`create`](Self::create), then hands the fresh payload to `init`.
    pub fn create_with(&mut self, init: impl FnOnce(&mut T)) -> Option<Handle> {
        let handle = self.create()?;
        init(&mut self.items[handle.index()]);
        Some(handle)
    }

    /// Runs the destruction hook, moves the slot to the free list and returns
    /// the handle that preceded it in the active list (possibly the head).
    ///
    /// Continue a forward traversal from the returned handle, never from the
    /// deleted one.
    pub fn delete(&mut self, handle: Handle) -> Handle {
        debug_assert!(self.is_active(handle), "delete of inactive slot {}", handle.0);
        if !self.is_active(handle) {
            return self.head();
        }

        let slot = handle.0;
        self.items[slot as usize].on_destroy();

        let Link { prev, next } = self.links[slot as usize];
        self.links[prev as usize].next = next;
        self.links[next as usize].prev = prev;
        self.links[slot as usize] = Link {
            prev: NONE,
            next: self.free_head,
        };
        self.free_head = slot;
        self.size -= 1;

        Handle(prev)
    }

    /// Whether `handle` names a slot on the active list.
    pub fn is_active(&self, handle: Handle) -> bool {
        handle.0 < Self::SENTINEL && self.links[handle.0 as usize].prev != NONE
    }

    /// Newest active entity.
    pub fn first(&self) -> Option<Handle> {
        self.next(self.head())
    }

    /// Entity after `cursor` in traversal order.
    pub fn next(&self, cursor: Handle) -> Option<Handle> {
        if cursor != self.head() && !self.is_active(cursor) {
            return None;
        }
        let next = self.links[cursor.index()].next;
        (next != Self::SENTINEL).then_some(Handle(next))
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.is_active(handle).then(|| &self.items[handle.index()])
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if self.is_active(handle) {
            Some(&mut self.items[handle.index()])
        } else {
            None
        }
    }

    /// Runs `update` on every active entity, newest first. Returning
    /// [`Step::Delete`] removes the entity being visited; the traversal resumes
    /// from its predecessor so every survivor is visited exactly once.
    pub fn update_all(&mut self, mut update: impl FnMut(&mut T) -> Step) {
        let mut cursor = self.head();
        while let Some(current) = self.next(cursor) {
            cursor = match update(&mut self.items[current.index()]) {
                Step::Keep => current,
                Step::Delete => self.delete(current),
            };
        }
    }

    /// Read-only traversal in update order.
    pub fn draw_all(&self, mut draw: impl FnMut(&T)) {
        for item in self.iter() {
            draw(item);
        }
    }

    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            pool: self,
            cursor: self.head(),
        }
    }

    /// Destroys every active entity and returns all slots to the free list.
    pub fn clear(&mut self) {
        let mut cursor = self.links[Self::SENTINEL as usize].next;
        while cursor != Self::SENTINEL {
            let next = self.links[cursor as usize].next;
            self.items[cursor as usize].on_destroy();
            self.links[cursor as usize] = Link {
                prev: NONE,
                next: self.free_head,
            };
            self.free_head = cursor;
            cursor = next;
        }
        self.links[Self::SENTINEL as usize] = Link {
            prev: Self::SENTINEL,
            next: Self::SENTINEL,
        };
        self.size = 0;
    }
}

impl<T: Pooled, const N: usize> Default for EntityPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pooled, const N: usize> fmt::Debug for EntityPool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("capacity", &N)
            .field("size", &self.size)
            .finish()
    }
}

/// Active entities, newest first.
pub struct Iter<'a, T: Pooled, const N: usize> {
    pool: &'a EntityPool<T, N>,
    cursor: Handle,
}

impl<'a, T: Pooled, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.pool.next(self.cursor)?;
        self.cursor = next;
        Some(&self.pool.items[next.index()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Tagged {
        id: u32,
        created: bool,
        visits: u32,
    }

    impl Pooled for Tagged {
        fn on_create(&mut self) {
            self.created = true;
        }

        fn on_destroy(&mut self) {
            self.created = false;
        }
    }

    fn spawn<const N: usize>(pool: &mut EntityPool<Tagged, N>, id: u32) -> Option<Handle> {
        pool.create_with(|t| t.id = id)
    }

    fn ids<const N: usize>(pool: &EntityPool<Tagged, N>) -> Vec<u32> {
        pool.iter().map(|t| t.id).collect()
    }

    #[test]
    fn create_runs_hook_and_orders_newest_first() {
        let mut pool = EntityPool::<Tagged, 4>::new();
        for id in 1..=3 {
            spawn(&mut pool, id).unwrap();
        }

        assert_eq!(ids(&pool), vec![3, 2, 1]);
        assert!(pool.iter().all(|t| t.created));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn deleting_during_update_visits_survivors_once() {
        let mut pool = EntityPool::<Tagged, 4>::new();
        for id in 1..=4 {
            spawn(&mut pool, id).unwrap();
        }

        let mut visited = Vec::new();
        pool.update_all(|t| {
            visited.push(t.id);
            t.visits += 1;
            if t.id == 1 || t.id == 3 {
                Step::Delete
            } else {
                Step::Keep
            }
        });

        assert_eq!(visited, vec![4, 3, 2, 1]);
        assert_eq!(pool.len(), 2);
        assert_eq!(ids(&pool), vec![4, 2]);
        assert!(pool.iter().all(|t| t.visits == 1));
    }

    #[test]
    fn capacity_is_a_hard_bound() {
        let mut pool = EntityPool::<Tagged, 4>::new();
        for id in 0..4 {
            assert!(spawn(&mut pool, id).is_some());
        }
        assert!(spawn(&mut pool, 99).is_none());
        assert_eq!(pool.len(), 4);
        assert_eq!(ids(&pool), vec![3, 2, 1, 0]);
    }

    #[test]
    fn delete_returns_the_predecessor() {
        let mut pool = EntityPool::<Tagged, 4>::new();
        let a = spawn(&mut pool, 1).unwrap();
        let b = spawn(&mut pool, 2).unwrap();

        // Order is b, a: deleting a returns b, deleting b returns the head.
        assert_eq!(pool.delete(a), b);
        assert_eq!(pool.delete(b), pool.head());
        assert!(pool.is_empty());
        assert!(pool.get(a).is_none());
    }

    #[test]
    fn manual_cursor_traversal_matches_update_all() {
        let mut pool = EntityPool::<Tagged, 8>::new();
        for id in 0..6 {
            spawn(&mut pool, id).unwrap();
        }

        let mut cursor = pool.head();
        while let Some(current) = pool.next(cursor) {
            let id = pool.get(current).map(|t| t.id).unwrap();
            cursor = if id % 2 == 0 { pool.delete(current) } else { current };
        }

        assert_eq!(ids(&pool), vec![5, 3, 1]);
    }

    #[test]
    fn freed_slots_are_reused_with_fresh_payloads() {
        let mut pool = EntityPool::<Tagged, 2>::new();
        let a = spawn(&mut pool, 7).unwrap();
        pool.get_mut(a).unwrap().visits = 5;
        pool.delete(a);

        let b = pool.create().unwrap();
        let item = pool.get(b).unwrap();
        assert_eq!(item.visits, 0);
        assert_eq!(item.id, 0);
        assert!(item.created);
    }

    #[test]
    fn clear_resets_to_all_free() {
        let mut pool = EntityPool::<Tagged, 3>::new();
        for id in 0..3 {
            spawn(&mut pool, id).unwrap();
        }
        pool.clear();

        assert!(pool.is_empty());
        assert!(pool.first().is_none());
        for id in 0..3 {
            assert!(spawn(&mut pool, id).is_some());
        }
        assert!(spawn(&mut pool, 3).is_none());
    }

    #[test]
    fn draw_all_does_not_mutate() {
        let mut pool = EntityPool::<Tagged, 4>::new();
        spawn(&mut pool, 1).unwrap();
        spawn(&mut pool, 2).unwrap();

        let mut seen = Vec::new();
        pool.draw_all(|t| seen.push(t.id));
        assert_eq!(seen, vec![2, 1]);
        assert_eq!(pool.len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create(u32),
        DeleteNth(usize),
        Sweep(u32),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<u32>().prop_map(Op::Create),
            3 => (0usize..16).prop_map(Op::DeleteNth),
            2 => (1u32..5).prop_map(Op::Sweep),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_a_newest_first_list(ops in proptest::collection::vec(op(), 0..200)) {
            let mut pool = EntityPool::<Tagged, 8>::new();
            let mut model: Vec<u32> = Vec::new();

            for op in ops {
                match op {
                    Op::Create(id) => {
                        let created = spawn(&mut pool, id).is_some();
                        prop_assert_eq!(created, model.len() < 8);
                        if created {
                            model.insert(0, id);
                        }
                    }
                    Op::DeleteNth(n) => {
                        let mut cursor = pool.first();
                        for _ in 0..n {
                            cursor = cursor.and_then(|c| pool.next(c));
                        }
                        if let Some(handle) = cursor {
                            pool.delete(handle);
                            model.remove(n);
                        }
                    }
                    Op::Sweep(modulus) => {
                        pool.update_all(|t| if t.id % modulus == 0 { Step::Delete } else { Step::Keep });
                        model.retain(|id| id % modulus != 0);
                    }
                    Op::Clear => {
                        pool.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(ids(&pool), model.clone());
                prop_assert_eq!(pool.len(), model.len());
                prop_assert!(pool.len() <= pool.capacity());
            }
        }
    }
}
