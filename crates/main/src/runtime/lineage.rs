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
    rc::Rc,
};

use ahash::AHashMap;
use compact_str::CompactString;

use crate::{
    report::debug_unreachable,
    runtime::{ty::TypeRegistry, ScriptFn, TypeIdentity},
};

// Maps a `&dyn Any` view of the concrete object to the `&dyn Any` view of an
// ancestor embedded in it. Projections are composed transitively during
// lineage resolution, so any ancestor entry can project the concrete object
// directly.
pub(crate) type Projection = Rc<dyn for<'a> Fn(&'a dyn Any) -> &'a dyn Any>;

/// One generation of a [Lineage]: a type identity together with the
/// projection that views the concrete object as this ancestor.
pub struct Ancestor {
    pub(crate) identity: TypeIdentity,
    pub(crate) name: &'static str,
    pub(crate) project: Option<Projection>,
}

impl Debug for Ancestor {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name)
    }
}

impl Ancestor {
    /// Returns the identity of this generation's type.
    #[inline(always)]
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// Returns the user-facing name of this generation's type.
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The ordered ancestor chain of a declared type, most-derived first.
///
/// The chain is non-empty: its first entry is the type itself, and the last
/// entry is the root of the hierarchy (the type whose declaration names no
/// parent). Object handles embed a shared copy of their static type's
/// lineage at creation; the copy never changes afterwards.
///
/// Type compatibility tests ([Cell::is](crate::runtime::Cell::is),
/// [Cell::to](crate::runtime::Cell::to)) scan this chain for the requested
/// identity instead of relying on native run-time type information.
pub struct Lineage {
    entries: Vec<Ancestor>,
}

impl Debug for Lineage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.debug_list().entries(&self.entries).finish()
    }
}

impl Lineage {
    // Walks the declared parent chain of `identity` upward, composing upcast
    // projections along the way.
    //
    // The caller guarantees that `identity` is declared. Parent links always
    // refer to previously declared types, so the walk terminates.
    pub(crate) fn resolve(registry: &TypeRegistry, identity: TypeIdentity) -> Self {
        let mut entries = Vec::new();

        let mut cursor = Some(identity);

        // The projection that views the concrete object as the generation
        // currently being pushed. The most-derived entry views the object
        // as-is.
        let mut project: Option<Projection> = None;

        while let Some(identity) = cursor {
            let Some(meta) = registry.get(identity) else {
                break;
            };

            entries.push(Ancestor {
                identity,
                name: meta.name(),
                project: project.clone(),
            });

            // This generation's own upcast step extends the projection for
            // the parent entry.
            if let Some(step) = meta.upcast() {
                let step = step.clone();

                project = Some(match project.take() {
                    None => step,
                    Some(prev) => Rc::new(move |object: &dyn Any| step(prev(object))),
                });
            }

            cursor = meta.parent();
        }

        Self { entries }
    }

    /// Returns the chain entries, most-derived first.
    #[inline(always)]
    pub fn entries(&self) -> &[Ancestor] {
        &self.entries
    }

    /// Returns the most-derived entry: the type the exposed object actually
    /// is.
    #[inline(always)]
    pub fn leaf(&self) -> &Ancestor {
        match self.entries.first() {
            Some(leaf) => leaf,

            // Safety: Lineages are created by `resolve` for declared types
            //         only, and a declared type always contributes its own
            //         entry.
            None => unsafe { debug_unreachable!("Empty lineage.") },
        }
    }

    /// Returns true if the chain contains the requested identity at any
    /// depth.
    #[inline(always)]
    pub fn includes(&self, identity: TypeIdentity) -> bool {
        self.entries.iter().any(|entry| entry.identity == identity)
    }

    #[inline(always)]
    pub(crate) fn find(&self, identity: TypeIdentity) -> Option<&Ancestor> {
        self.entries.iter().find(|entry| entry.identity == identity)
    }
}

// Builds the flattened method table of a type: ancestor methods merged
// root-most first, each more-derived generation overlaid on top, so that a
// same-named method of a more-derived type always wins. Dispatch is thereby
// resolved once, at registration time, into a flat table.
pub(crate) fn flatten_methods(
    registry: &TypeRegistry,
    identity: TypeIdentity,
) -> AHashMap<CompactString, ScriptFn> {
    let mut methods = AHashMap::new();

    merge_methods(registry, identity, &mut methods);

    methods
}

fn merge_methods(
    registry: &TypeRegistry,
    identity: TypeIdentity,
    into: &mut AHashMap<CompactString, ScriptFn>,
) {
    let Some(meta) = registry.get(identity) else {
        return;
    };

    if let Some(parent) = meta.parent() {
        merge_methods(registry, parent, into);
    }

    for (name, function) in meta.capabilities().instance_methods() {
        into.insert(CompactString::new(name), function.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::runtime::{
        lineage::{flatten_methods, Lineage},
        ty::TypeRegistry,
        RuntimeResult,
        ScriptEngine,
        ScriptFn,
        ScriptType,
        Value,
    };

    struct Shape;

    impl ScriptType for Shape {
        fn type_name() -> &'static str {
            "Shape"
        }

        fn instance_methods() -> Vec<(&'static str, ScriptFn)> {
            fn area(_: &mut ScriptEngine, _: &[Value]) -> RuntimeResult<Value> {
                Ok(Value::Num(0.0))
            }

            fn name(_: &mut ScriptEngine, _: &[Value]) -> RuntimeResult<Value> {
                Ok(Value::from("shape"))
            }

            vec![("area", Rc::new(area) as ScriptFn), ("name", Rc::new(name))]
        }
    }

    struct Circle {
        shape: Shape,
    }

    impl ScriptType for Circle {
        fn type_name() -> &'static str {
            "Circle"
        }

        fn instance_methods() -> Vec<(&'static str, ScriptFn)> {
            fn area(_: &mut ScriptEngine, _: &[Value]) -> RuntimeResult<Value> {
                Ok(Value::Num(12.0))
            }

            vec![("area", Rc::new(area) as ScriptFn)]
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();

        registry.declare::<Shape>().unwrap();

        registry
            .declare_with_parent::<Circle, Shape, _>(|circle| &circle.shape)
            .unwrap();

        registry
    }

    #[test]
    fn test_lineage_order() {
        let registry = registry();

        let lineage = Lineage::resolve(&registry, <Circle>::identity());

        let identities = lineage
            .entries()
            .iter()
            .map(|entry| entry.identity())
            .collect::<Vec<_>>();

        assert_eq!(identities, vec![<Circle>::identity(), <Shape>::identity()]);
        assert_eq!(lineage.leaf().name(), "Circle");

        assert!(lineage.includes(<Shape>::identity()));
        assert!(!lineage.includes(crate::runtime::TypeIdentity::of("Square")));

        let root = Lineage::resolve(&registry, <Shape>::identity());

        assert_eq!(root.entries().len(), 1);
        assert_eq!(root.leaf().name(), "Shape");
    }

    #[test]
    fn test_method_flattening() {
        let registry = registry();

        let mut engine = ScriptEngine::new();

        let circle = flatten_methods(&registry, <Circle>::identity());

        // Derived definition wins over the ancestor's.
        let area = circle.get("area").unwrap().clone();
        assert_eq!(area(&mut engine, &[]).unwrap(), Value::Num(12.0));

        // Inherited method survives the merge.
        let name = circle.get("name").unwrap().clone();
        assert_eq!(name(&mut engine, &[]).unwrap(), Value::from("shape"));

        let shape = flatten_methods(&registry, <Shape>::identity());

        let area = shape.get("area").unwrap().clone();
        assert_eq!(area(&mut engine, &[]).unwrap(), Value::Num(0.0));
    }
}
