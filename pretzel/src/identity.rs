use derive_more::{Deref, From};
use std::any::Any;
use std::rc::Rc;

/// Identity handle: the address of an in-memory object, stable for the
/// duration of one encode or decode call tree.
#[derive(From, Deref, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct ObjId(usize);

impl ObjId {
    /// Handle registered for a composite that was skipped rather than
    /// materialized during decode.
    pub(crate) const ABSENT: Self = Self(0);

    pub fn of<T: ?Sized>(obj: &T) -> Self {
        Self(obj as *const T as *const () as usize)
    }

    pub fn of_rc<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

/// 1-based sequence number assigned to a composite the first time it is
/// encountered during one top-level encode or decode; link records carry it
/// as their back-reference target.
#[derive(From, Deref, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Position(u64);

/// Type-erased shared handle to a decoded object.
pub type ObjShared = Rc<dyn Any>;
