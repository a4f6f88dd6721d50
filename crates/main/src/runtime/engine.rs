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

use std::rc::Rc;

use ahash::AHashMap;
use compact_str::CompactString;
use strsim::jaro_winkler;

use crate::runtime::{
    ident::split_path,
    memory::ScriptHeap,
    ty::TypeRegistry,
    Cell,
    Lineage,
    RuntimeError,
    RuntimeResult,
    ScriptType,
    TableRef,
    TypedRef,
    TypeIdentity,
    Value,
};

// Similarity floor below which a member name is not worth suggesting.
const SUGGESTION_THRESHOLD: f64 = 0.75;

// The per-type artifacts produced by registration: the shared instance
// metatable assigned to every exposed object of the type, and the resolved
// lineage embedded into their Cells.
pub(crate) struct InstalledType {
    pub(crate) metatable: TableRef,
    pub(crate) lineage: Rc<Lineage>,
}

/// The single-threaded scripting engine hosting declared native types, their
/// registration artifacts, and the script-visible heap.
///
/// An engine instance owns four cooperating parts:
///
///  - The type registry of [declared](ScriptEngine::declare) native types.
///  - The heap of script-visible tables and exposed native objects.
///  - The globals table, the root of the scripting namespace.
///  - The cache of [registered](ScriptEngine::register) types.
///
/// The engine is deliberately `!Send` and `!Sync`. One engine serves one
/// script context; independent contexts get independent engines.
///
/// ## Object lifecycle
///
/// Native objects enter the scripting side through [give](ScriptEngine::give)
/// and leave it when [collect](ScriptEngine::collect) proves them
/// unreachable. Collection finalizes the object's [Cell], releasing the
/// engine's shared ownership; the native side's own `Rc` holders are not
/// affected.
pub struct ScriptEngine {
    pub(crate) registry: TypeRegistry,
    pub(crate) heap: ScriptHeap,
    pub(crate) globals: TableRef,
    pub(crate) installed: AHashMap<TypeIdentity, InstalledType>,
}

impl Default for ScriptEngine {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    /// Creates an empty engine with a fresh globals table.
    pub fn new() -> Self {
        let mut heap = ScriptHeap::new();

        let globals = heap.alloc_table();

        Self {
            registry: TypeRegistry::new(),
            heap,
            globals,
            installed: AHashMap::new(),
        }
    }

    /// Declares a root native type (a type without a parent).
    ///
    /// Declaration makes the type known to the engine and probes its
    /// capability surface, but does not install anything into the scripting
    /// namespace yet; that is the job of [register](ScriptEngine::register).
    ///
    /// Returns [RuntimeError::TypeRedeclared] if the type was already
    /// declared, and [RuntimeError::IdentityClash] if another declared type
    /// name hashes to the same identity.
    #[inline(always)]
    pub fn declare<T: ScriptType>(&mut self) -> RuntimeResult<()> {
        self.registry.declare::<T>()
    }

    /// Declares a native type deriving from a previously declared parent.
    ///
    /// The `upcast` function views an instance of `T` as its parent `P`. The
    /// engine composes these steps transitively, so an exposed object is
    /// accessible as any of its ancestors regardless of hierarchy depth.
    ///
    /// Returns [RuntimeError::UndeclaredParent] if `P` was not declared
    /// before `T`. Declaring parents first keeps hierarchy cycles
    /// unrepresentable.
    #[inline(always)]
    pub fn declare_with_parent<T, P, F>(&mut self, upcast: F) -> RuntimeResult<()>
    where
        T: ScriptType,
        P: ScriptType,
        F: for<'a> Fn(&'a T) -> &'a P + 'static,
    {
        self.registry.declare_with_parent::<T, P, F>(upcast)
    }

    /// Grants access to the registry of declared types.
    #[inline(always)]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Exposes a native object to the scripting environment.
    ///
    /// The engine takes shared ownership: the caller may keep its own `Rc`
    /// holders, and the object survives as long as any side retains one.
    ///
    /// The object's type must be declared and [registered]
    /// (ScriptEngine::register) beforehand; otherwise the call returns
    /// [RuntimeError::UndeclaredType] or [RuntimeError::UnregisteredType].
    pub fn give<T: ScriptType>(&mut self, object: Rc<T>) -> RuntimeResult<Value> {
        let identity = T::identity();

        if !self.registry.contains(identity) {
            return Err(RuntimeError::UndeclaredType {
                name: T::type_name(),
            });
        }

        let Some(installed) = self.installed.get(&identity) else {
            return Err(RuntimeError::UnregisteredType {
                name: T::type_name(),
            });
        };

        let metatable = installed.metatable;
        let cell = Cell::new(object, Rc::clone(&installed.lineage));

        Ok(Value::Foreign(self.heap.alloc_foreign(cell, metatable)))
    }

    /// Exposes an optional native object, mapping the absent case to
    /// [Value::Nil].
    #[inline(always)]
    pub fn give_opt<T: ScriptType>(&mut self, object: Option<Rc<T>>) -> RuntimeResult<Value> {
        match object {
            Some(object) => self.give(object),
            None => Ok(Value::Nil),
        }
    }

    /// Returns true if `value` is an exposed native object whose lineage
    /// includes the type `T`.
    ///
    /// Stale references and finalized objects answer false.
    #[inline(always)]
    pub fn is<T: ScriptType>(&self, value: &Value) -> bool {
        match self.cell(value) {
            Some(cell) => cell.is::<T>(),
            None => false,
        }
    }

    /// Returns a typed shared view of the exposed native object behind
    /// `value`, viewed as the type `T`.
    ///
    /// `T` may be the object's concrete type or any of its declared
    /// ancestors; either way the view covers the full original object. A
    /// kind mismatch, a lineage miss, a stale reference, or a finalized
    /// object all yield None.
    #[inline(always)]
    pub fn to<T: ScriptType>(&self, value: &Value) -> Option<TypedRef<T>> {
        self.cell(value)?.to::<T>()
    }

    /// Returns the [Cell] of an exposed native object, if `value` refers to
    /// a live one.
    #[inline(always)]
    pub fn cell(&self, value: &Value) -> Option<&Cell> {
        let foreign = value.as_foreign()?;

        Some(&self.heap.foreign(foreign)?.cell)
    }

    /// Returns the globals table, the root of the scripting namespace.
    #[inline(always)]
    pub fn globals(&self) -> TableRef {
        self.globals
    }

    /// Allocates a fresh empty table on the engine's heap.
    ///
    /// The table is unreachable from the globals graph until stored
    /// somewhere reachable; an intervening [collect](ScriptEngine::collect)
    /// without a root for it sweeps it.
    #[inline(always)]
    pub fn new_table(&mut self) -> TableRef {
        self.heap.alloc_table()
    }

    /// Reads a field of a table.
    ///
    /// A missing field and a stale table reference both read as
    /// [Value::Nil].
    #[inline(always)]
    pub fn get(&self, table: TableRef, key: &str) -> Value {
        let Some(entry) = self.heap.table(table) else {
            return Value::Nil;
        };

        entry.fields.get(key).cloned().unwrap_or(Value::Nil)
    }

    /// Writes a field of a table.
    ///
    /// Returns [RuntimeError::Expired] if the table reference is stale.
    pub fn set(&mut self, table: TableRef, key: &str, value: Value) -> RuntimeResult<()> {
        let Some(entry) = self.heap.table_mut(table) else {
            return Err(RuntimeError::Expired {
                operation: "table update",
            });
        };

        entry.fields.insert(CompactString::new(key), value);

        Ok(())
    }

    /// Assigns a metatable to a table.
    ///
    /// Returns [RuntimeError::Expired] if either reference is stale.
    pub fn set_metatable(&mut self, table: TableRef, metatable: TableRef) -> RuntimeResult<()> {
        if self.heap.table(metatable).is_none() {
            return Err(RuntimeError::Expired {
                operation: "metatable assignment",
            });
        }

        let Some(entry) = self.heap.table_mut(table) else {
            return Err(RuntimeError::Expired {
                operation: "metatable assignment",
            });
        };

        entry.metatable = Some(metatable);

        Ok(())
    }

    /// Returns the metatable of a value.
    ///
    /// Exposed native objects always carry the metatable installed for their
    /// type; tables carry one only if explicitly assigned.
    pub fn metatable_of(&self, value: &Value) -> Option<TableRef> {
        match value {
            Value::Table(table) => self.heap.table(*table)?.metatable,
            Value::Foreign(foreign) => Some(self.heap.foreign(*foreign)?.metatable),
            _ => None,
        }
    }

    /// Resolves a dotted namespace path into a table, creating missing
    /// intermediate levels on demand.
    ///
    /// `namespace("geometry.shapes")` ensures that the globals table has a
    /// `geometry` table with a `shapes` table inside, and returns the
    /// innermost one. Existing levels are reused as-is.
    ///
    /// Returns [RuntimeError::BadPath] if the path is empty or contains
    /// malformed segments, and [RuntimeError::PathCollision] if an existing
    /// non-table value occupies one of the levels.
    pub fn namespace(&mut self, path: &str) -> RuntimeResult<TableRef> {
        let segments = split_path(path)?;

        let mut cursor = self.globals;

        for segment in segments {
            let existing = match self.heap.table(cursor) {
                Some(entry) => entry.fields.get(segment).cloned(),

                None => {
                    return Err(RuntimeError::Expired {
                        operation: "namespace traversal",
                    })
                }
            };

            cursor = match existing {
                Some(Value::Table(table)) => table,

                None | Some(Value::Nil) => {
                    let table = self.heap.alloc_table();

                    if let Some(entry) = self.heap.table_mut(cursor) {
                        entry
                            .fields
                            .insert(CompactString::new(segment), Value::Table(table));
                    }

                    table
                }

                Some(_) => {
                    return Err(RuntimeError::PathCollision {
                        path: CompactString::new(path),
                        segment: CompactString::new(segment),
                    })
                }
            };
        }

        Ok(cursor)
    }

    /// Reads the value at a dotted namespace path.
    ///
    /// Any miss along the way, including a malformed path, reads as
    /// [Value::Nil]. This is the non-erroring counterpart of
    /// [namespace](ScriptEngine::namespace).
    pub fn lookup(&self, path: &str) -> Value {
        let Ok(segments) = split_path(path) else {
            return Value::Nil;
        };

        let mut current = Value::Table(self.globals);

        for segment in segments {
            let Value::Table(table) = current else {
                return Value::Nil;
            };

            let Some(entry) = self.heap.table(table) else {
                return Value::Nil;
            };

            current = entry.fields.get(segment).cloned().unwrap_or(Value::Nil);
        }

        current
    }

    /// Performs the member lookup protocol on a value.
    ///
    /// For tables, the lookup reads the field directly. For exposed native
    /// objects, the raw entries of the installed metatable are consulted
    /// first; on a miss, the metatable's `__index` hook (if any) is invoked
    /// with the receiver and the key. An overall miss reads as [Value::Nil].
    ///
    /// Indexing nil is an error; indexing other scalar values is a type
    /// mismatch.
    pub fn index(&mut self, receiver: &Value, key: &str) -> RuntimeResult<Value> {
        match receiver {
            Value::Table(table) => {
                let Some(entry) = self.heap.table(*table) else {
                    return Err(RuntimeError::Expired {
                        operation: "table indexing",
                    });
                };

                Ok(entry.fields.get(key).cloned().unwrap_or(Value::Nil))
            }

            Value::Foreign(foreign) => {
                let (raw, hook) = {
                    let Some(entry) = self.heap.foreign(*foreign) else {
                        return Err(RuntimeError::Expired {
                            operation: "object indexing",
                        });
                    };

                    let Some(metatable) = self.heap.table(entry.metatable) else {
                        return Ok(Value::Nil);
                    };

                    (
                        metatable.fields.get(key).cloned(),
                        metatable.fields.get("__index").cloned(),
                    )
                };

                if let Some(value) = raw {
                    if !value.is_nil() {
                        return Ok(value);
                    }
                }

                match hook {
                    Some(Value::Fn(hook)) => hook(self, &[receiver.clone(), Value::from(key)]),
                    _ => Ok(Value::Nil),
                }
            }

            Value::Nil => Err(RuntimeError::Nil {
                operation: "member lookup",
            }),

            other => Err(RuntimeError::TypeMismatch {
                expected: "a table or a foreign object",
                provided: CompactString::new(other.describe()),
            }),
        }
    }

    /// Performs the call protocol on a value.
    ///
    /// Functions are called directly. A table is callable if its metatable
    /// supplies a `__call` hook; the hook receives the table itself
    /// prepended to the arguments. Everything else returns
    /// [RuntimeError::NotCallable].
    pub fn call(&mut self, callee: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
        match callee {
            Value::Fn(function) => {
                let function = function.clone();

                function(self, arguments)
            }

            Value::Table(table) => {
                let hook = self
                    .heap
                    .table(*table)
                    .and_then(|entry| entry.metatable)
                    .and_then(|metatable| self.heap.table(metatable))
                    .and_then(|metatable| metatable.fields.get("__call").cloned());

                let Some(Value::Fn(hook)) = hook else {
                    return Err(RuntimeError::NotCallable {
                        provided: CompactString::new(callee.describe()),
                    });
                };

                let mut forwarded = Vec::with_capacity(arguments.len() + 1);

                forwarded.push(callee.clone());
                forwarded.extend_from_slice(arguments);

                hook(self, &forwarded)
            }

            other => Err(RuntimeError::NotCallable {
                provided: CompactString::new(other.describe()),
            }),
        }
    }

    /// Looks up a member of `receiver` and calls it with the receiver
    /// prepended to the arguments.
    ///
    /// An unresolved member surfaces as [RuntimeError::UnknownMember],
    /// carrying the closest installed member name when one resembles the
    /// request.
    pub fn invoke_method(
        &mut self,
        receiver: &Value,
        member: &str,
        arguments: &[Value],
    ) -> RuntimeResult<Value> {
        let target = self.index(receiver, member)?;

        if target.is_nil() {
            let (type_name, suggestion) = self.describe_miss(receiver, member);

            return Err(RuntimeError::UnknownMember {
                type_name,
                member: CompactString::new(member),
                suggestion,
            });
        }

        let mut forwarded = Vec::with_capacity(arguments.len() + 1);

        forwarded.push(receiver.clone());
        forwarded.extend_from_slice(arguments);

        self.call(&target, &forwarded)
    }

    /// Collects unreachable tables and exposed native objects.
    ///
    /// Reachability starts from the globals table, the caller-supplied
    /// `roots`, and the metatables of registered types. Each unreachable
    /// exposed object has its [Cell] finalized exactly once; the native
    /// side's own holders keep the underlying object alive.
    ///
    /// Returns the number of objects finalized.
    pub fn collect(&mut self, roots: &[Value]) -> usize {
        let mut pinned = Vec::with_capacity(self.installed.len() + roots.len());

        for installed in self.installed.values() {
            pinned.push(Value::Table(installed.metatable));
        }

        pinned.extend_from_slice(roots);

        self.heap.collect(self.globals, &pinned)
    }

    fn describe_miss(&self, receiver: &Value, member: &str) -> (CompactString, Option<CompactString>) {
        match receiver {
            Value::Foreign(foreign) => {
                let Some(entry) = self.heap.foreign(*foreign) else {
                    return (CompactString::new("a foreign object"), None);
                };

                let type_name = CompactString::new(entry.cell.lineage().leaf().name());

                let suggestion = match self.heap.table(entry.metatable) {
                    Some(metatable) => suggest(member, metatable.fields.keys()),
                    None => None,
                };

                (type_name, suggestion)
            }

            Value::Table(table) => {
                let suggestion = match self.heap.table(*table) {
                    Some(entry) => suggest(member, entry.fields.keys()),
                    None => None,
                };

                (CompactString::new("table"), suggestion)
            }

            other => (CompactString::new(other.describe()), None),
        }
    }
}

fn suggest<'a>(
    member: &str,
    candidates: impl Iterator<Item = &'a CompactString>,
) -> Option<CompactString> {
    let mut best: Option<(f64, &'a CompactString)> = None;

    for candidate in candidates {
        if candidate.starts_with("__") {
            continue;
        }

        let score = jaro_winkler(member, candidate.as_str());

        if score < SUGGESTION_THRESHOLD {
            continue;
        }

        match &best {
            Some((top, _)) if *top >= score => (),
            _ => best = Some((score, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate.clone())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::runtime::{
        Lineage,
        RuntimeError,
        RuntimeResult,
        ScriptEngine,
        ScriptFn,
        ScriptType,
        Value,
    };

    struct Sensor {
        reading: f64,
    }

    impl ScriptType for Sensor {
        fn type_name() -> &'static str {
            "Sensor"
        }
    }

    // Exposes a Sensor through a hand-assembled metatable, bypassing the
    // registration assembler tested elsewhere.
    fn expose_sensor(engine: &mut ScriptEngine, object: Rc<Sensor>) -> Value {
        use crate::runtime::{engine::InstalledType, Cell};

        engine.declare::<Sensor>().unwrap();

        let metatable = engine.new_table();

        fn reading(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
            let sensor = engine
                .to::<Sensor>(&arguments[0])
                .ok_or(RuntimeError::TypeMismatch {
                    expected: "a Sensor",
                    provided: arguments[0].describe().into(),
                })?;

            Ok(Value::Num(sensor.reading))
        }

        engine
            .set(metatable, "reading", Value::Fn(Rc::new(reading)))
            .unwrap();

        fn fallback(_: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
            match arguments[1].as_str() {
                Some("virtual") => Ok(Value::from("resolved by hook")),
                _ => Ok(Value::Nil),
            }
        }

        engine
            .set(metatable, "__index", Value::Fn(Rc::new(fallback)))
            .unwrap();

        let lineage = Rc::new(Lineage::resolve(&engine.registry, <Sensor>::identity()));

        engine.installed.insert(
            <Sensor>::identity(),
            InstalledType {
                metatable,
                lineage: Rc::clone(&lineage),
            },
        );

        let cell = Cell::new(object, lineage);

        Value::Foreign(engine.heap.alloc_foreign(cell, metatable))
    }

    #[test]
    fn test_namespace_assembly() {
        let mut engine = ScriptEngine::new();

        let shapes = engine.namespace("geometry.shapes").unwrap();

        // Repeated resolution reuses the existing levels.
        assert_eq!(engine.namespace("geometry.shapes").unwrap(), shapes);

        assert_eq!(engine.lookup("geometry.shapes"), Value::Table(shapes));
        assert_eq!(engine.lookup("geometry.missing"), Value::Nil);

        engine
            .set(engine.globals(), "point", Value::Num(1.0))
            .unwrap();

        let error = engine.namespace("point.x").unwrap_err();

        assert!(matches!(error, RuntimeError::PathCollision { .. }));

        // The failed resolution left the existing value untouched.
        assert_eq!(engine.lookup("point"), Value::Num(1.0));
    }

    #[test]
    fn test_table_access() {
        let mut engine = ScriptEngine::new();

        let table = engine.new_table();

        engine.set(table, "answer", Value::Num(42.0)).unwrap();

        assert_eq!(engine.get(table, "answer"), Value::Num(42.0));
        assert_eq!(engine.get(table, "question"), Value::Nil);

        // Unrooted: swept by the next collection.
        engine.collect(&[]);

        assert_eq!(engine.get(table, "answer"), Value::Nil);

        let error = engine.set(table, "answer", Value::Nil).unwrap_err();

        assert!(matches!(error, RuntimeError::Expired { .. }));
    }

    #[test]
    fn test_give_requires_registration() {
        let mut engine = ScriptEngine::new();

        let error = engine.give(Rc::new(Sensor { reading: 0.0 })).unwrap_err();

        assert!(matches!(error, RuntimeError::UndeclaredType { .. }));

        engine.declare::<Sensor>().unwrap();

        let error = engine.give(Rc::new(Sensor { reading: 0.0 })).unwrap_err();

        assert!(matches!(error, RuntimeError::UnregisteredType { .. }));
    }

    #[test]
    fn test_member_lookup_protocol() {
        let mut engine = ScriptEngine::new();

        let object = Rc::new(Sensor { reading: 36.6 });

        let exposed = expose_sensor(&mut engine, Rc::clone(&object));

        assert!(engine.is::<Sensor>(&exposed));
        assert_eq!(engine.to::<Sensor>(&exposed).unwrap().reading, 36.6);

        // Raw metatable entry resolves first.
        let reading = engine.invoke_method(&exposed, "reading", &[]).unwrap();

        assert_eq!(reading, Value::Num(36.6));

        // The __index hook covers what raw entries miss.
        let resolved = engine.index(&exposed, "virtual").unwrap();

        assert_eq!(resolved, Value::from("resolved by hook"));

        assert_eq!(engine.index(&exposed, "absent").unwrap(), Value::Nil);
    }

    #[test]
    fn test_member_miss_suggestion() {
        let mut engine = ScriptEngine::new();

        let exposed = expose_sensor(&mut engine, Rc::new(Sensor { reading: 0.0 }));

        let error = engine.invoke_method(&exposed, "raeding", &[]).unwrap_err();

        let RuntimeError::UnknownMember {
            type_name,
            member,
            suggestion,
        } = error
        else {
            panic!("Unexpected error kind.");
        };

        assert_eq!(type_name, "Sensor");
        assert_eq!(member, "raeding");
        assert_eq!(suggestion.as_deref(), Some("reading"));

        // Nothing resembles this request.
        let error = engine.invoke_method(&exposed, "quux", &[]).unwrap_err();

        let RuntimeError::UnknownMember { suggestion, .. } = error else {
            panic!("Unexpected error kind.");
        };

        assert!(suggestion.is_none());
    }

    #[test]
    fn test_call_protocol() {
        let mut engine = ScriptEngine::new();

        fn double(_: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
            match arguments.first().and_then(Value::as_num) {
                Some(value) => Ok(Value::Num(value * 2.0)),

                None => Err(RuntimeError::TypeMismatch {
                    expected: "a number",
                    provided: "something else".into(),
                }),
            }
        }

        let function = Value::Fn(Rc::new(double) as ScriptFn);

        assert_eq!(
            engine.call(&function, &[Value::Num(21.0)]).unwrap(),
            Value::Num(42.0),
        );

        // A table is callable through its metatable's __call hook, which
        // receives the table itself first.
        fn sugar(_: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
            assert!(matches!(arguments[0], Value::Table(_)));

            Ok(arguments[1].clone())
        }

        let table = engine.new_table();
        let metatable = engine.new_table();

        engine
            .set(metatable, "__call", Value::Fn(Rc::new(sugar)))
            .unwrap();
        engine.set_metatable(table, metatable).unwrap();

        assert_eq!(
            engine
                .call(&Value::Table(table), &[Value::from("echo")])
                .unwrap(),
            Value::from("echo"),
        );

        let error = engine.call(&Value::Num(1.0), &[]).unwrap_err();

        assert!(matches!(error, RuntimeError::NotCallable { .. }));
    }

    #[test]
    fn test_collection_pins_installed_metatables() {
        let mut engine = ScriptEngine::new();

        let exposed = expose_sensor(&mut engine, Rc::new(Sensor { reading: 1.0 }));

        // The object is unrooted, but the installed metatable survives the
        // sweep for future exposures.
        assert_eq!(engine.collect(&[]), 1);

        assert!(engine.cell(&exposed).is_none());
        assert!(!engine.is::<Sensor>(&exposed));

        let metatable = engine
            .installed
            .get(&<Sensor>::identity())
            .unwrap()
            .metatable;

        assert_eq!(engine.get(metatable, "reading").is_nil(), false);
    }
}
