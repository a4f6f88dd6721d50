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

use compact_str::format_compact;
use log::{error, info};

use crate::{
    report::debug_unreachable,
    runtime::{
        engine::InstalledType,
        lineage::{flatten_methods, Lineage},
        RuntimeError,
        RuntimeResult,
        ScriptEngine,
        ScriptFn,
        ScriptType,
        Value,
    },
};

impl ScriptEngine {
    /// Installs a [declared](ScriptEngine::declare) type into the scripting
    /// namespace.
    ///
    /// Registration assembles everything script code sees of the type:
    ///
    ///  1. The type's dotted name is resolved into a namespace table,
    ///     creating missing levels on demand. A malformed name or a
    ///     collision with an existing non-namespace value aborts the whole
    ///     registration before any artifact is created.
    ///  2. The instance metatable is populated with the builtin members
    ///     (`__gc`, `__tostring`, `topointer`, `metatable`), then overlaid
    ///     with the type's flattened method table. An inherited method
    ///     shadows a same-named builtin, and the type's own method shadows
    ///     both.
    ///  3. The `toTable` hook (if any) lands on the metatable; the
    ///     `fromTable` hook lands on both the metatable and the namespace
    ///     table.
    ///  4. Namespaced functions land on the namespace table. The
    ///     constructor hook (if any) becomes the table's `new` function and
    ///     its call sugar, so `Circle(2.0)` and `Circle.new(2.0)` coincide.
    ///
    /// Once registered, instances of the type can be exposed through
    /// [give](ScriptEngine::give).
    ///
    /// Returns [RuntimeError::UndeclaredType] if the type was never
    /// declared, and [RuntimeError::TypeRedeclared] if it was registered
    /// already.
    pub fn register<T: ScriptType>(&mut self) -> RuntimeResult<()> {
        let identity = T::identity();

        let Some(meta) = self.registry.get(identity) else {
            return Err(RuntimeError::UndeclaredType {
                name: T::type_name(),
            });
        };

        let name = meta.name();
        let capabilities = meta.capabilities().clone();

        if self.installed.contains_key(&identity) {
            return Err(RuntimeError::TypeRedeclared { name });
        }

        // Path problems abort before any registration artifact exists.
        let namespace = match self.namespace(name) {
            Ok(namespace) => namespace,

            Err(error) => {
                error!("{name} registration aborted: {error}");

                return Err(error);
            }
        };

        let metatable = self.heap.alloc_table();

        self.set(metatable, "__gc", Value::Fn(Rc::new(builtin_gc)))?;
        self.set(
            metatable,
            "__tostring",
            Value::Fn(Rc::new(builtin_tostring)),
        )?;
        self.set(metatable, "topointer", Value::Fn(Rc::new(builtin_topointer)))?;
        self.set(metatable, "metatable", Value::Fn(Rc::new(builtin_metatable)))?;

        for (method, function) in flatten_methods(&self.registry, identity) {
            self.set(metatable, &method, Value::Fn(function))?;
        }

        if let Some(to_table) = capabilities.to_table.clone() {
            self.set(metatable, "toTable", Value::Fn(to_table))?;
        }

        if let Some(from_table) = capabilities.from_table.clone() {
            self.set(metatable, "fromTable", Value::Fn(from_table.clone()))?;
            self.set(namespace, "fromTable", Value::Fn(from_table))?;
        }

        for (function_name, function) in capabilities.namespaced_functions() {
            self.set(namespace, function_name, Value::Fn(function.clone()))?;
        }

        if let Some(constructor) = capabilities.constructor.clone() {
            self.set(namespace, "new", Value::Fn(constructor.clone()))?;

            // The call protocol hands the callee table itself to the hook;
            // the constructor only wants the actual arguments.
            let sugar: ScriptFn =
                Rc::new(move |engine: &mut ScriptEngine, arguments: &[Value]| {
                    constructor(engine, arguments.get(1..).unwrap_or(&[]))
                });

            let sugar_host = self.heap.alloc_table();

            self.set(sugar_host, "__call", Value::Fn(sugar))?;
            self.set_metatable(namespace, sugar_host)?;
        }

        let lineage = Rc::new(Lineage::resolve(&self.registry, identity));

        let previous = self.installed.insert(
            identity,
            InstalledType { metatable, lineage },
        );

        if previous.is_some() {
            // Safety: Uniqueness checked above.
            unsafe { debug_unreachable!("Duplicate type installation.") }
        }

        info!("{name} registered.");

        Ok(())
    }
}

// Finalizes the receiver's Cell ahead of collection, releasing the engine's
// shared ownership early. Never errors: a misshaped receiver, a stale
// reference, and a repeated finalization are all silent no-ops.
fn builtin_gc(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
    let Some(Value::Foreign(foreign)) = arguments.first() else {
        return Ok(Value::Nil);
    };

    if let Some(entry) = engine.heap.foreign_mut(*foreign) {
        entry.cell.finalize();
    }

    Ok(Value::Nil)
}

// Renders the receiver as "TypeName: 0x...", identifying the underlying
// allocation.
fn builtin_tostring(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
    let Some(cell) = arguments.first().and_then(|receiver| engine.cell(receiver)) else {
        return Ok(Value::Nil);
    };

    let name = cell.lineage().leaf().name();

    let rendered = match cell.address() {
        Some(address) => format_compact!("{name}: {address:#x}"),
        None => format_compact!("{name}: released"),
    };

    Ok(Value::Str(rendered))
}

// Returns the address of the underlying allocation. Two exposed values
// answer equal addresses if and only if they wrap the same native object.
fn builtin_topointer(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
    let Some(cell) = arguments.first().and_then(|receiver| engine.cell(receiver)) else {
        return Ok(Value::Nil);
    };

    match cell.address() {
        Some(address) => Ok(Value::Str(format_compact!("{address:#x}"))),
        None => Ok(Value::Nil),
    }
}

// Returns the receiver's metatable.
fn builtin_metatable(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
    let metatable = arguments
        .first()
        .and_then(|receiver| engine.metatable_of(receiver));

    match metatable {
        Some(metatable) => Ok(Value::Table(metatable)),
        None => Ok(Value::Nil),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::runtime::{
        RuntimeError,
        RuntimeResult,
        ScriptEngine,
        ScriptFn,
        ScriptType,
        Value,
    };

    struct Shape {
        sides: usize,
    }

    impl ScriptType for Shape {
        fn type_name() -> &'static str {
            "Shape"
        }

        fn instance_methods() -> Vec<(&'static str, ScriptFn)> {
            fn area(_: &mut ScriptEngine, _: &[Value]) -> RuntimeResult<Value> {
                Ok(Value::Num(0.0))
            }

            fn describe(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
                let shape =
                    engine
                        .to::<Shape>(&arguments[0])
                        .ok_or(RuntimeError::TypeMismatch {
                            expected: "a Shape",
                            provided: arguments[0].describe().into(),
                        })?;

                Ok(Value::Num(shape.sides as f64))
            }

            vec![
                ("area", Rc::new(area) as ScriptFn),
                ("describe", Rc::new(describe)),
            ]
        }
    }

    struct Circle {
        shape: Shape,
        radius: f64,
    }

    impl Circle {
        fn with_radius(radius: f64) -> Self {
            Self {
                shape: Shape { sides: 0 },
                radius,
            }
        }
    }

    impl ScriptType for Circle {
        fn type_name() -> &'static str {
            "Circle"
        }

        fn constructor() -> Option<ScriptFn> {
            fn construct(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
                let radius = arguments.first().and_then(Value::as_num).ok_or(
                    RuntimeError::ArityMismatch {
                        function: "Circle.new".into(),
                        expected: 1,
                        provided: arguments.len(),
                    },
                )?;

                engine.give(Rc::new(Circle::with_radius(radius)))
            }

            Some(Rc::new(construct))
        }

        fn instance_methods() -> Vec<(&'static str, ScriptFn)> {
            fn area(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
                let circle =
                    engine
                        .to::<Circle>(&arguments[0])
                        .ok_or(RuntimeError::TypeMismatch {
                            expected: "a Circle",
                            provided: arguments[0].describe().into(),
                        })?;

                Ok(Value::Num(std::f64::consts::PI * circle.radius * circle.radius))
            }

            vec![("area", Rc::new(area) as ScriptFn)]
        }

        fn to_table() -> Option<ScriptFn> {
            fn to_table(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
                let radius = engine
                    .to::<Circle>(&arguments[0])
                    .ok_or(RuntimeError::TypeMismatch {
                        expected: "a Circle",
                        provided: arguments[0].describe().into(),
                    })?
                    .radius;

                let table = engine.new_table();

                engine.set(table, "radius", Value::Num(radius))?;

                Ok(Value::Table(table))
            }

            Some(Rc::new(to_table))
        }

        fn from_table() -> Option<ScriptFn> {
            fn from_table(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
                // Either fromTable(table) on the namespace, or
                // instance:fromTable(table); the table is the last argument.
                let table = arguments
                    .last()
                    .and_then(Value::as_table)
                    .ok_or(RuntimeError::TypeMismatch {
                        expected: "a table",
                        provided: "something else".into(),
                    })?;

                let radius = engine.get(table, "radius").as_num().unwrap_or(0.0);

                engine.give(Rc::new(Circle::with_radius(radius)))
            }

            Some(Rc::new(from_table))
        }

        fn namespaced_functions() -> Vec<(&'static str, ScriptFn)> {
            fn unit(engine: &mut ScriptEngine, _: &[Value]) -> RuntimeResult<Value> {
                engine.give(Rc::new(Circle::with_radius(1.0)))
            }

            vec![("unit", Rc::new(unit) as ScriptFn)]
        }
    }

    struct Grid;

    impl ScriptType for Grid {
        fn type_name() -> &'static str {
            "math.Grid"
        }
    }

    fn engine() -> ScriptEngine {
        let mut engine = ScriptEngine::new();

        engine.declare::<Shape>().unwrap();

        engine
            .declare_with_parent::<Circle, Shape, _>(|circle| &circle.shape)
            .unwrap();

        engine.register::<Shape>().unwrap();
        engine.register::<Circle>().unwrap();

        engine
    }

    #[test]
    fn test_registration_assembly() {
        let mut engine = engine();

        assert!(matches!(engine.lookup("Shape"), Value::Table(_)));

        let circle_table = engine.lookup("Circle").as_table().unwrap();

        assert!(matches!(engine.get(circle_table, "new"), Value::Fn(_)));
        assert!(matches!(engine.get(circle_table, "unit"), Value::Fn(_)));
        assert!(matches!(engine.get(circle_table, "fromTable"), Value::Fn(_)));

        // Dotted names install under nested namespace levels.
        engine.declare::<Grid>().unwrap();
        engine.register::<Grid>().unwrap();

        assert!(matches!(engine.lookup("math.Grid"), Value::Table(_)));

        // Double registration is rejected.
        let error = engine.register::<Circle>().unwrap_err();

        assert!(matches!(error, RuntimeError::TypeRedeclared { .. }));

        // Registration of an undeclared type is rejected.
        struct Stray;

        impl ScriptType for Stray {
            fn type_name() -> &'static str {
                "Stray"
            }
        }

        let error = engine.register::<Stray>().unwrap_err();

        assert!(matches!(error, RuntimeError::UndeclaredType { .. }));
    }

    #[test]
    fn test_construction_and_dispatch() {
        let mut engine = engine();

        let circle_table = engine.lookup("Circle");

        // Call sugar and the explicit `new` function coincide.
        let by_sugar = engine.call(&circle_table, &[Value::Num(2.0)]).unwrap();

        let new = engine.index(&circle_table, "new").unwrap();
        let by_new = engine.call(&new, &[Value::Num(2.0)]).unwrap();

        assert!(engine.is::<Circle>(&by_sugar));
        assert!(engine.is::<Circle>(&by_new));

        // The exposed object is accessible as any of its ancestors.
        assert!(engine.is::<Shape>(&by_sugar));
        assert!(engine.to::<Shape>(&by_sugar).is_some());

        // The derived method shadows the inherited one.
        let area = engine.invoke_method(&by_sugar, "area", &[]).unwrap();

        assert_eq!(area, Value::Num(std::f64::consts::PI * 4.0));

        // The inherited method survives flattening.
        let sides = engine.invoke_method(&by_sugar, "describe", &[]).unwrap();

        assert_eq!(sides, Value::Num(0.0));

        // Construction without the required argument unwinds cleanly.
        let error = engine.call(&circle_table, &[]).unwrap_err();

        assert!(matches!(error, RuntimeError::ArityMismatch { .. }));
    }

    #[test]
    fn test_collision_aborts_registration() {
        let mut engine = engine();

        struct Square;

        impl ScriptType for Square {
            fn type_name() -> &'static str {
                "Square"
            }
        }

        engine
            .set(engine.globals(), "Square", Value::Num(4.0))
            .unwrap();

        engine.declare::<Square>().unwrap();

        let error = engine.register::<Square>().unwrap_err();

        assert!(matches!(error, RuntimeError::PathCollision { .. }));

        // The failed registration left no artifacts.
        assert_eq!(engine.lookup("Square"), Value::Num(4.0));
        assert!(!engine.installed.contains_key(&<Square>::identity()));

        // Previously registered types remain fully usable.
        let circle = engine
            .call(&engine.lookup("Circle"), &[Value::Num(1.0)])
            .unwrap();

        assert!(engine.invoke_method(&circle, "area", &[]).is_ok());
    }

    #[test]
    fn test_missing_constructor() {
        let mut engine = engine();

        let shape_table = engine.lookup("Shape");

        assert_eq!(engine.index(&shape_table, "new").unwrap(), Value::Nil);

        let error = engine.call(&shape_table, &[]).unwrap_err();

        assert!(matches!(error, RuntimeError::NotCallable { .. }));
    }

    #[test]
    fn test_builtin_members() {
        let mut engine = engine();

        let object = Rc::new(Circle::with_radius(3.0));

        let first = engine.give(Rc::clone(&object)).unwrap();
        let second = engine.give(Rc::clone(&object)).unwrap();

        let rendered = engine.invoke_method(&first, "__tostring", &[]).unwrap();

        let rendered = rendered.as_str().unwrap().to_owned();

        assert!(rendered.starts_with("Circle: 0x"));

        // Two exposures of one native object share the allocation address.
        let left = engine.invoke_method(&first, "topointer", &[]).unwrap();
        let right = engine.invoke_method(&second, "topointer", &[]).unwrap();

        assert_eq!(left, right);

        let metatable = engine.invoke_method(&first, "metatable", &[]).unwrap();

        assert_eq!(metatable.as_table(), engine.metatable_of(&first));
    }

    #[test]
    fn test_explicit_release() {
        let mut engine = engine();

        let object = Rc::new(Circle::with_radius(1.0));

        let exposed = engine.give(Rc::clone(&object)).unwrap();

        assert_eq!(Rc::strong_count(&object), 2);

        engine.invoke_method(&exposed, "__gc", &[]).unwrap();

        // The engine's share is released; the native holder is unaffected.
        assert_eq!(Rc::strong_count(&object), 1);
        assert!(!engine.is::<Circle>(&exposed));

        // Repeated release is a no-op, not an error.
        engine.invoke_method(&exposed, "__gc", &[]).unwrap();

        assert_eq!(object.radius, 1.0);
    }

    #[test]
    fn test_collection_finalizes_once() {
        let mut engine = engine();

        let object = Rc::new(Circle::with_radius(2.0));

        let exposed = engine.give(Rc::clone(&object)).unwrap();

        assert_eq!(Rc::strong_count(&object), 2);

        // Rooted: survives.
        assert_eq!(engine.collect(&[exposed.clone()]), 0);
        assert!(engine.is::<Circle>(&exposed));

        // Unrooted: finalized exactly once.
        assert_eq!(engine.collect(&[]), 1);
        assert_eq!(Rc::strong_count(&object), 1);
        assert_eq!(engine.collect(&[]), 0);

        // Registration artifacts survive collection: new exposures work.
        let fresh = engine.give(object).unwrap();

        assert!(engine.is::<Circle>(&fresh));
    }

    #[test]
    fn test_serialization_hooks() {
        let mut engine = engine();

        let circle = engine
            .call(&engine.lookup("Circle"), &[Value::Num(5.0)])
            .unwrap();

        let serialized = engine.invoke_method(&circle, "toTable", &[]).unwrap();

        let table = serialized.as_table().unwrap();

        assert_eq!(engine.get(table, "radius"), Value::Num(5.0));

        // fromTable is mirrored onto the namespace table.
        let from_table = engine.lookup("Circle.fromTable");

        let restored = engine.call(&from_table, &[serialized]).unwrap();

        let restored = engine.to::<Circle>(&restored).unwrap();

        assert_eq!(restored.radius, 5.0);
    }
}
