//! Typed indices and the arenas they index.
//!
//! Every declaration in the IR lives in an [`IdVec`] owned by the
//! [`Module`](crate::Module). Cross references (an expression naming a
//! variable, a type slot naming a declared type, a scope naming its parent)
//! are plain `u32` ids, so the tree of owned expressions never holds a
//! pointer into a sibling structure.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Conversion between a typed id and an arena position.
pub trait Idx: Copy + Eq {
    fn from_usize(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! define_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl Idx for $name {
            #[inline]
            fn from_usize(index: usize) -> Self {
                Self(to_u32(index, stringify!($name)))
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id! {
    /// Index of a lexical scope.
    ScopeId
}
define_id! {
    /// Index of a type entry. Builtin types occupy the first slots.
    TypeId
}
define_id! {
    /// Index of a function or macro declaration.
    FuncId
}
define_id! {
    /// Index of a variable (argument or local).
    VarId
}
define_id! {
    /// Index of a template type declaration.
    TemplateId
}
define_id! {
    /// Index of a module-level constant.
    ConstId
}
define_id! {
    /// Block label. Minted from a module-wide counter, never reused.
    LabelId
}

/// Convert an arena length to a `u32` id, panicking on overflow.
///
/// Four billion entries of any kind is far beyond what a single module can
/// produce; hitting this is a compiler bug.
#[inline]
fn to_u32(value: usize, what: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("too many {what} entries: {value}"))
}

/// A `Vec` indexed by a typed id.
#[derive(Clone, PartialEq, Eq)]
pub struct IdVec<I, T> {
    items: Vec<T>,
    _marker: PhantomData<fn(I) -> I>,
}

impl<I: Idx, T> IdVec<I, T> {
    pub const fn new() -> Self {
        IdVec {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Append an entry and return its id.
    pub fn push(&mut self, item: T) -> I {
        let id = I::from_usize(self.items.len());
        self.items.push(item);
        id
    }

    /// The id the next [`push`](Self::push) will return.
    pub fn next_id(&self) -> I {
        I::from_usize(self.items.len())
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All ids currently allocated, in allocation order.
    ///
    /// Collected eagerly so callers may push while iterating.
    pub fn ids(&self) -> Vec<I> {
        (0..self.items.len()).map(I::from_usize).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (I::from_usize(index), item))
    }
}

impl<I: Idx, T> Default for IdVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> Index<I> for IdVec<I, T> {
    type Output = T;

    #[inline]
    fn index(&self, id: I) -> &T {
        &self.items[id.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IdVec<I, T> {
    #[inline]
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }
}

impl<I: Idx + fmt::Debug, T: fmt::Debug> fmt::Debug for IdVec<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
