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
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use ahash::AHashMap;
use log::debug;

use crate::{
    report::debug_unreachable,
    runtime::{
        lineage::Projection,
        probe::TypeCapabilities,
        RuntimeError,
        RuntimeResult,
        ScriptFn,
        TypeIdentity,
    },
};

/// A native Rust type that can be exposed to the scripting environment.
///
/// The two mandatory items are the user-facing [name](Self::type_name) and
/// the derived [identity](Self::identity). Everything else is an optional
/// capability with a neutral default: a type opts into construction,
/// serialization, instance methods, or namespaced functions simply by
/// overriding the corresponding function. The
/// [capability probe](TypeCapabilities::probe) collects the overridden
/// surface without ever failing, so registration proceeds uniformly
/// regardless of which hooks a type chooses to implement.
///
/// Implementing a hook never registers the type by itself. Types enter the
/// engine through [declare](crate::runtime::ScriptEngine::declare) (or
/// [declare_with_parent](crate::runtime::ScriptEngine::declare_with_parent))
/// followed by [register](crate::runtime::ScriptEngine::register).
///
/// ```
/// use apogee::runtime::ScriptType;
///
/// struct Shape;
///
/// impl ScriptType for Shape {
///     fn type_name() -> &'static str {
///         "Shape"
///     }
/// }
///
/// assert_eq!(<Shape>::identity(), apogee::runtime::TypeIdentity::of("Shape"));
/// ```
pub trait ScriptType: Any {
    /// Returns the user-facing name of the type.
    ///
    /// The name doubles as the registration path in the scripting namespace
    /// and may be dotted (`"geometry.Shape"`); intermediate namespace levels
    /// are created on demand.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Returns the stable numeric identity of the type.
    ///
    /// The default derives the identity from [type_name](Self::type_name).
    /// Overriding this function is only useful for assigning explicit
    /// identifiers instead of derived hashes.
    #[inline(always)]
    fn identity() -> TypeIdentity
    where
        Self: Sized,
    {
        TypeIdentity::of(Self::type_name())
    }

    /// An optional factory hook, installed as the `new` function of the
    /// type's namespace table and as its call sugar.
    #[inline(always)]
    fn constructor() -> Option<ScriptFn>
    where
        Self: Sized,
    {
        None
    }

    /// An optional hook converting an instance into a generic structured
    /// representation (a table), installed as the `toTable` metatable entry.
    #[inline(always)]
    fn to_table() -> Option<ScriptFn>
    where
        Self: Sized,
    {
        None
    }

    /// An optional hook reconstructing an instance from a generic structured
    /// representation, installed as the `fromTable` metatable entry and
    /// mirrored onto the type's namespace table.
    #[inline(always)]
    fn from_table() -> Option<ScriptFn>
    where
        Self: Sized,
    {
        None
    }

    /// Instance methods of the type, in declaration order.
    ///
    /// Methods of a derived type override same-named methods of its
    /// ancestors in the flattened method table.
    #[inline(always)]
    fn instance_methods() -> Vec<(&'static str, ScriptFn)>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Free functions installed into the type's namespace table, in
    /// declaration order.
    #[inline(always)]
    fn namespaced_functions() -> Vec<(&'static str, ScriptFn)>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// An introspection descriptor of a [declared](ScriptType) type.
///
/// Created once per type when the type is declared; immutable thereafter.
///
/// The [Display] implementation prints the user-facing name of the type.
pub struct TypeMeta {
    name: &'static str,
    identity: TypeIdentity,
    parent: Option<TypeIdentity>,
    capabilities: TypeCapabilities,
    upcast: Option<Projection>,
}

impl Debug for TypeMeta {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TypeMeta")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("parent", &self.parent)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Display for TypeMeta {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name)
    }
}

impl PartialEq for TypeMeta {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.identity.eq(&other.identity)
    }
}

impl Eq for TypeMeta {}

impl Hash for TypeMeta {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state)
    }
}

impl Ord for TypeMeta {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity.cmp(&other.identity)
    }
}

impl PartialOrd for TypeMeta {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TypeMeta {
    /// Returns the user-facing name of the type.
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the stable numeric identity of the type.
    #[inline(always)]
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// Returns the identity of the declared parent type, or None for a root
    /// type.
    #[inline(always)]
    pub fn parent(&self) -> Option<TypeIdentity> {
        self.parent
    }

    /// Returns the probed capability surface of the type.
    #[inline(always)]
    pub fn capabilities(&self) -> &TypeCapabilities {
        &self.capabilities
    }

    #[inline(always)]
    pub(crate) fn upcast(&self) -> Option<&Projection> {
        self.upcast.as_ref()
    }
}

/// The registry of declared types.
///
/// The registry is owned by the [ScriptEngine](crate::runtime::ScriptEngine)
/// and populated through explicit declaration calls during environment
/// setup. Each declaration verifies that the identity of the new name does
/// not clash with any previously declared identity, and that the declared
/// parent (if any) already exists.
#[derive(Default)]
pub struct TypeRegistry {
    index: AHashMap<TypeIdentity, TypeMeta>,
}

impl Debug for TypeRegistry {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let mut list = formatter.debug_list();

        for meta in self.index.values() {
            list.entry(&meta.name);
        }

        list.finish()
    }
}

impl TypeRegistry {
    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self {
            index: AHashMap::new(),
        }
    }

    /// Returns the descriptor of a declared type, or None if the identity is
    /// unknown.
    #[inline(always)]
    pub fn get(&self, identity: TypeIdentity) -> Option<&TypeMeta> {
        self.index.get(&identity)
    }

    /// Returns true if a type with this identity has been declared.
    #[inline(always)]
    pub fn contains(&self, identity: TypeIdentity) -> bool {
        self.index.contains_key(&identity)
    }

    /// Returns the number of declared types.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no types have been declared.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn declare<T: ScriptType>(&mut self) -> RuntimeResult<()> {
        self.insert::<T>(None, None)
    }

    pub(crate) fn declare_with_parent<T, P, F>(&mut self, upcast: F) -> RuntimeResult<()>
    where
        T: ScriptType,
        P: ScriptType,
        F: for<'a> Fn(&'a T) -> &'a P + 'static,
    {
        let parent = P::identity();

        if !self.index.contains_key(&parent) {
            return Err(RuntimeError::UndeclaredParent {
                child: T::type_name(),
                parent: P::type_name(),
            });
        }

        let projection: Projection = Rc::new(move |object: &dyn Any| -> &dyn Any {
            match object.downcast_ref::<T>() {
                Some(object) => upcast(object),

                // Safety: The lineage resolver applies this projection only
                //         to objects whose preceding lineage entry is `T`.
                None => unsafe {
                    debug_unreachable!("Upcast projection applied to a foreign object.")
                },
            }
        });

        self.insert::<T>(Some(parent), Some(projection))
    }

    fn insert<T: ScriptType>(
        &mut self,
        parent: Option<TypeIdentity>,
        upcast: Option<Projection>,
    ) -> RuntimeResult<()> {
        let name = T::type_name();
        let identity = T::identity();

        if let Some(existing) = self.index.get(&identity) {
            if existing.name == name {
                return Err(RuntimeError::TypeRedeclared { name });
            }

            return Err(RuntimeError::IdentityClash {
                declared: name,
                existing: existing.name,
                identity,
            });
        }

        let meta = TypeMeta {
            name,
            identity,
            parent,
            capabilities: TypeCapabilities::probe::<T>(),
            upcast,
        };

        debug!("{name} declared as {identity}.");

        if self.index.insert(identity, meta).is_some() {
            // Safety: Uniqueness checked above.
            unsafe { debug_unreachable!("Duplicate type meta entry.") }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RuntimeError, ScriptType, TypeIdentity, TypeRegistry};

    struct Shape;

    impl ScriptType for Shape {
        fn type_name() -> &'static str {
            "Shape"
        }
    }

    struct Circle {
        shape: Shape,
    }

    impl ScriptType for Circle {
        fn type_name() -> &'static str {
            "Circle"
        }
    }

    struct Orphan;

    impl ScriptType for Orphan {
        fn type_name() -> &'static str {
            "Orphan"
        }
    }

    #[test]
    fn test_declaration_order() {
        let mut registry = TypeRegistry::new();

        assert!(matches!(
            registry.declare_with_parent::<Circle, Shape, _>(|circle| &circle.shape),
            Err(RuntimeError::UndeclaredParent { .. }),
        ));

        registry.declare::<Shape>().unwrap();

        registry
            .declare_with_parent::<Circle, Shape, _>(|circle| &circle.shape)
            .unwrap();

        assert_eq!(registry.len(), 2);

        let meta = registry.get(<Circle>::identity()).unwrap();

        assert_eq!(meta.name(), "Circle");
        assert_eq!(meta.parent(), Some(<Shape>::identity()));
    }

    #[test]
    fn test_redeclaration() {
        let mut registry = TypeRegistry::new();

        registry.declare::<Orphan>().unwrap();

        assert!(matches!(
            registry.declare::<Orphan>(),
            Err(RuntimeError::TypeRedeclared { name: "Orphan" }),
        ));
    }

    #[test]
    fn test_identity_clash() {
        struct Left;

        impl ScriptType for Left {
            fn type_name() -> &'static str {
                "Left"
            }

            fn identity() -> TypeIdentity {
                TypeIdentity::of("Occupied")
            }
        }

        struct Right;

        impl ScriptType for Right {
            fn type_name() -> &'static str {
                "Right"
            }

            fn identity() -> TypeIdentity {
                TypeIdentity::of("Occupied")
            }
        }

        let mut registry = TypeRegistry::new();

        registry.declare::<Left>().unwrap();

        assert!(matches!(
            registry.declare::<Right>(),
            Err(RuntimeError::IdentityClash { .. }),
        ));

        // The clash aborted the offending declaration alone.
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(<Left>::identity()));
    }
}
