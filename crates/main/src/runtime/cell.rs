////////////////////////////////////////////////////////////////////////////////
// This file is part of "Apogee", an embeddable native object binding         //
// runtime for scripting environments.                                        //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/apogee/blob/master/EULA.md                 //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2025 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::{
    any::Any,
    fmt::{Debug, Formatter},
    ops::Deref,
    ptr::NonNull,
    rc::Rc,
};

use crate::runtime::{Lineage, ScriptType};

/// An opaque wrapper binding a native object to the scripting environment.
///
/// A Cell holds a shared-ownership reference to the native object together
/// with a copy of the object's static type [Lineage]. Cells are created when
/// native code pushes an object through
/// [ScriptEngine::give](crate::runtime::ScriptEngine::give), and finalized
/// by the engine's collector once the scripting side can no longer reach
/// them.
///
/// Ownership is shared: native code may independently hold the same
/// underlying `Rc` outside any Cell. The object survives as long as any
/// holder, native or scripting-side, retains a reference.
///
/// ## Type testing
///
/// [Cell::is] and [Cell::to] scan the embedded lineage for the requested
/// type's identity. A match at any depth of the chain authorizes the access;
/// the returned [TypedRef] always views the full original object, never a
/// copy or a slice of it. A mismatch is a normal, silent outcome.
///
/// ## Finalization
///
/// [Cell::finalize] releases the shared reference. The first invocation
/// clears the reference slot, so repeated finalization is a no-op, and
/// finalization never panics. Every access checks the slot first: a released
/// Cell answers `false`/`None` instead of dereferencing freed data.
pub struct Cell {
    data: Option<Rc<dyn Any>>,
    lineage: Rc<Lineage>,
}

impl Debug for Cell {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.lineage.leaf().name();

        match &self.data {
            None => formatter.write_fmt(format_args!("{name}(released)")),

            Some(data) => {
                formatter.write_fmt(format_args!("{name}({:p})", Rc::as_ptr(data) as *const ()))
            }
        }
    }
}

impl Cell {
    #[inline(always)]
    pub(crate) fn new(data: Rc<dyn Any>, lineage: Rc<Lineage>) -> Self {
        Self {
            data: Some(data),
            lineage,
        }
    }

    /// Returns true if the requested type appears in this Cell's lineage at
    /// any depth.
    ///
    /// A released Cell answers false for every type.
    #[inline(always)]
    pub fn is<T: ScriptType>(&self) -> bool {
        if self.data.is_none() {
            return false;
        }

        self.lineage.includes(T::identity())
    }

    /// Returns a typed shared reference to the underlying object, viewed as
    /// the type `T`.
    ///
    /// The lineage scan only authorizes the cast: a match at a non-leaf
    /// depth still yields a reference onto the full original object. A
    /// mismatch, or a released Cell, yields None.
    pub fn to<T: ScriptType>(&self) -> Option<TypedRef<T>> {
        let data = self.data.as_ref()?;

        let ancestor = self.lineage.find(T::identity())?;

        let view: &dyn Any = match &ancestor.project {
            None => data.as_ref(),
            Some(project) => project(data.as_ref()),
        };

        // A failed downcast here means two distinct declared types share one
        // identity value. Declaration-time clash checks make this outcome
        // unreachable for well-formed setups; the silent miss path keeps the
        // `to` contract regardless.
        let target = view.downcast_ref::<T>()?;

        Some(TypedRef {
            target: NonNull::from(target),
            owner: Rc::clone(data),
        })
    }

    /// Releases the shared reference to the native object.
    ///
    /// The underlying object is deallocated only if this Cell was its last
    /// holder. Repeated finalization is a no-op.
    #[inline(always)]
    pub fn finalize(&mut self) {
        self.data = None;
    }

    /// Returns true if this Cell has been [finalized](Cell::finalize).
    #[inline(always)]
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Returns the raw address of the underlying object, or None if the Cell
    /// has been released.
    ///
    /// The address identifies the allocation for debugging purposes only.
    #[inline(always)]
    pub fn address(&self) -> Option<usize> {
        let data = self.data.as_ref()?;

        Some(Rc::as_ptr(data) as *const () as usize)
    }

    /// Returns the lineage embedded into this Cell at creation.
    #[inline(always)]
    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }
}

/// A typed shared view of the native object held by a [Cell].
///
/// The view keeps the underlying allocation alive for its own lifetime and
/// dereferences to the ancestor type requested from [Cell::to]. It never
/// copies the object.
pub struct TypedRef<T: ScriptType> {
    target: NonNull<T>,
    owner: Rc<dyn Any>,
}

impl<T: ScriptType + Debug> Debug for TypedRef<T> {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self.deref(), formatter)
    }
}

impl<T: ScriptType> Deref for TypedRef<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        // Safety: `target` points into the allocation owned by `owner`. The
        //         Rc keeps the allocation alive and its contents never move.
        unsafe { self.target.as_ref() }
    }
}

impl<T: ScriptType> TypedRef<T> {
    /// Returns the raw address of the viewed data.
    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.target.as_ptr()
    }

    /// Returns the raw address of the underlying allocation.
    ///
    /// Two TypedRefs view the same object if and only if their owner
    /// addresses are equal, regardless of the ancestor types they view it
    /// as.
    #[inline(always)]
    pub fn owner_ptr(&self) -> *const () {
        Rc::as_ptr(&self.owner) as *const ()
    }
}
