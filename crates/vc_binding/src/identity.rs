//! Object identity tracking for back-references.
//!
//! Both maps live for one read or write call.

use alloc::boxed::Box;
use core::any::{Any, TypeId, type_name};

use crate::hash::{FixedHashState, HashMap};
use crate::{ErrorKind, Result, SerializationError};

/// Name of the struct field carrying an object id.
pub const ID_FIELD: &str = "@id";

/// Outcome of [`ObjectIdWriter::assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectId {
    /// First encounter: write the object with this id.
    New(u32),
    /// Already written: emit this id as a back-reference.
    Seen(u32),
}

/// Write side: object identity to sequential id, starting from 1.
#[derive(Debug, Default)]
pub struct ObjectIdWriter {
    ids: HashMap<(usize, TypeId), u32>,
    last: u32,
}

impl ObjectIdWriter {
    pub fn new() -> Self {
        Self {
            ids: HashMap::with_hasher(FixedHashState),
            last: 0,
        }
    }

    /// Looks up or allocates the id of the object at `address`.
    pub fn assign(&mut self, address: usize, type_id: TypeId) -> ObjectId {
        if let Some(&id) = self.ids.get(&(address, type_id)) {
            return ObjectId::Seen(id);
        }
        self.last += 1;
        self.ids.insert((address, type_id), self.last);
        ObjectId::New(self.last)
    }

    /// Number of objects registered so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Read side: id to the materialized shared handle.
#[derive(Default)]
pub struct ObjectIdReader {
    objects: HashMap<u32, Box<dyn Any>>,
}

impl ObjectIdReader {
    pub fn new() -> Self {
        Self {
            objects: HashMap::with_hasher(FixedHashState),
        }
    }

    /// Registers `handle` under `id`. Every id is registered once.
    pub fn register<H: Any>(&mut self, id: u32, handle: H) -> Result<()> {
        if self.objects.contains_key(&id) {
            return Err(SerializationError::new(
                ErrorKind::Shape,
                alloc::format!("object id {id} is defined twice"),
            ));
        }
        self.objects.insert(id, Box::new(handle));
        Ok(())
    }

    /// Returns a clone of the handle registered under `id`.
    pub fn resolve<H: Any + Clone>(&self, id: u32) -> Result<H> {
        let object = self.objects.get(&id).ok_or_else(|| {
            SerializationError::new(
                ErrorKind::UnknownReference,
                alloc::format!("back-reference to unknown object id {id}"),
            )
        })?;
        log::trace!("resolved back-reference {id}");
        object.downcast_ref::<H>().cloned().ok_or_else(|| {
            SerializationError::new(
                ErrorKind::Shape,
                alloc::format!("object id {id} does not refer to a `{}`", type_name::<H>()),
            )
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::any::TypeId;

    use super::{ObjectId, ObjectIdReader, ObjectIdWriter};
    use crate::ErrorKind;

    #[test]
    fn writer_ids_are_sequential_and_stable() {
        let mut ids = ObjectIdWriter::new();
        let t = TypeId::of::<u32>();
        assert_eq!(ids.assign(0x10, t), ObjectId::New(1));
        assert_eq!(ids.assign(0x20, t), ObjectId::New(2));
        assert_eq!(ids.assign(0x10, t), ObjectId::Seen(1));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn reader_rejects_unknown_duplicate_and_mistyped_ids() {
        let mut ids = ObjectIdReader::new();
        let shared = Rc::new(5u32);
        ids.register(1, shared.clone()).unwrap();

        let back: Rc<u32> = ids.resolve(1).unwrap();
        assert!(Rc::ptr_eq(&back, &shared));

        assert_eq!(ids.resolve::<Rc<u32>>(2).unwrap_err().kind(), ErrorKind::UnknownReference);
        assert_eq!(ids.register(1, shared).unwrap_err().kind(), ErrorKind::Shape);
        assert!(ids.resolve::<Rc<i64>>(1).is_err());
    }
}
