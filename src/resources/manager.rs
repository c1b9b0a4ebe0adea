use super::{DecodedImage, ResourceHandle};
use crate::types::GeneratedImage;
use crate::Result;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Structures that can hold a reference to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Cache,
    History,
    Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceStats {
    /// Resources currently held in memory.
    pub live: usize,
    /// Resources released since startup.
    pub released: u64,
    pub history_len: usize,
    pub history_capacity: usize,
}

struct Slot {
    image: Arc<DecodedImage>,
    owners: HashSet<Owner>,
}

struct Inner {
    next_id: u64,
    live: HashMap<ResourceHandle, Slot>,
    /// Newest first.
    history: VecDeque<GeneratedImage>,
    display: Option<GeneratedImage>,
    released_total: u64,
}

impl Inner {
    fn detach(&mut self, handle: ResourceHandle, owner: Owner) -> bool {
        match self.live.get_mut(&handle) {
            Some(slot) => {
                slot.owners.remove(&owner);
            }
            None => return false,
        }
        self.release_unowned(handle)
    }

    fn release_unowned(&mut self, handle: ResourceHandle) -> bool {
        let unowned = self
            .live
            .get(&handle)
            .is_some_and(|slot| slot.owners.is_empty());
        if unowned {
            self.live.remove(&handle);
            self.released_total += 1;
            debug!(resource = %handle, "resource released");
        }
        unowned
    }

    fn attach(&mut self, handle: ResourceHandle, owner: Owner) -> bool {
        match self.live.get_mut(&handle) {
            Some(slot) => {
                slot.owners.insert(owner);
                true
            }
            None => false,
        }
    }
}

/// Central owner bookkeeping for decoded images.
///
/// All mutations happen under one synchronous lock that is never held across
/// an await point.
pub struct ResourceLifecycleManager {
    history_capacity: usize,
    inner: Mutex<Inner>,
}

impl ResourceLifecycleManager {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history_capacity: history_capacity.max(1),
            inner: Mutex::new(Inner {
                next_id: 1,
                live: HashMap::new(),
                history: VecDeque::new(),
                display: None,
                released_total: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a decoded image. The new handle has no owners until one attaches.
    pub fn create(&self, image: DecodedImage) -> ResourceHandle {
        let mut inner = self.lock();
        let handle = ResourceHandle::from_raw(inner.next_id);
        inner.next_id += 1;
        inner.live.insert(
            handle,
            Slot {
                image: Arc::new(image),
                owners: HashSet::new(),
            },
        );
        handle
    }

    /// Decode a network payload and register it.
    pub fn decode(&self, bytes: Bytes, content_type: Option<&str>) -> Result<ResourceHandle> {
        let image = DecodedImage::decode(bytes, content_type)?;
        Ok(self.create(image))
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<Arc<DecodedImage>> {
        self.lock().live.get(&handle).map(|s| Arc::clone(&s.image))
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.lock().live.contains_key(&handle)
    }

    pub fn owners(&self, handle: ResourceHandle) -> HashSet<Owner> {
        self.lock()
            .live
            .get(&handle)
            .map(|s| s.owners.clone())
            .unwrap_or_default()
    }

    /// Add `owner` to the handle's owning set. Returns false if the handle is gone.
    pub fn attach(&self, handle: ResourceHandle, owner: Owner) -> bool {
        self.lock().attach(handle, owner)
    }

    /// Remove `owner` from the owning set. Returns true if this released the resource.
    pub fn detach(&self, handle: ResourceHandle, owner: Owner) -> bool {
        self.lock().detach(handle, owner)
    }

    /// Release a resource nobody owns, such as a decoded image that was never
    /// stored. A handle that still has owners stays live; releasing twice is
    /// a no-op. Returns true if this call released it.
    pub fn release(&self, handle: ResourceHandle) -> bool {
        self.lock().release_unowned(handle)
    }

    /// True if the handle was issued by this manager and has been released.
    pub fn is_released(&self, handle: ResourceHandle) -> bool {
        let inner = self.lock();
        handle.id() < inner.next_id && !inner.live.contains_key(&handle)
    }

    /// Put a result at the front of the history buffer, evicting the oldest
    /// entries beyond capacity.
    pub fn push_history(&self, image: GeneratedImage) {
        let mut inner = self.lock();
        let handle = image.resource_handle;
        inner.attach(handle, Owner::History);
        inner.history.push_front(image);
        while inner.history.len() > self.history_capacity {
            let Some(evicted) = inner.history.pop_back() else {
                break;
            };
            let h = evicted.resource_handle;
            let still_in_history = inner.history.iter().any(|g| g.resource_handle == h);
            if !still_in_history {
                inner.detach(h, Owner::History);
            }
        }
    }

    /// Newest first.
    pub fn history(&self) -> Vec<GeneratedImage> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        let mut inner = self.lock();
        let drained: Vec<_> = inner.history.drain(..).collect();
        let mut seen = HashSet::new();
        for item in drained {
            if seen.insert(item.resource_handle) {
                inner.detach(item.resource_handle, Owner::History);
            }
        }
    }

    /// Replace the display slot. `None` clears it.
    pub fn set_display(&self, image: Option<GeneratedImage>) {
        let mut inner = self.lock();
        let new_handle = image.as_ref().map(|g| g.resource_handle);
        if let Some(h) = new_handle {
            inner.attach(h, Owner::Display);
        }
        let old = std::mem::replace(&mut inner.display, image);
        if let Some(old) = old {
            if Some(old.resource_handle) != new_handle {
                inner.detach(old.resource_handle, Owner::Display);
            }
        }
    }

    pub fn display(&self) -> Option<GeneratedImage> {
        self.lock().display.clone()
    }

    pub fn stats(&self) -> ResourceStats {
        let inner = self.lock();
        ResourceStats {
            live: inner.live.len(),
            released: inner.released_total,
            history_len: inner.history.len(),
            history_capacity: self.history_capacity,
        }
    }
}
