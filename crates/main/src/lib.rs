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

//! # Apogee
//!
//! Apogee is an embeddable binding runtime that exposes native Rust types to
//! a scripting environment: you declare your types, describe their optional
//! capabilities (constructors, methods, serialization hooks), and the
//! runtime assembles everything script code sees of them, including a
//! collector that manages the lifetime of exposed objects.
//!
//! The whole public surface lives in the [runtime] module:
//!
//!  - [ScriptType](runtime::ScriptType) describes a bindable native type.
//!  - [ScriptEngine](runtime::ScriptEngine) hosts declarations,
//!    registrations, the scripting namespace, and the heap.
//!  - [Cell](runtime::Cell) and [TypedRef](runtime::TypedRef) bridge object
//!    lifetimes across the embedding boundary.
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use apogee::runtime::{
//!     RuntimeError,
//!     RuntimeResult,
//!     ScriptEngine,
//!     ScriptFn,
//!     ScriptType,
//!     Value,
//! };
//!
//! struct Shape {
//!     sides: usize,
//! }
//!
//! impl ScriptType for Shape {
//!     fn type_name() -> &'static str {
//!         "Shape"
//!     }
//!
//!     fn instance_methods() -> Vec<(&'static str, ScriptFn)> {
//!         fn area(_: &mut ScriptEngine, _: &[Value]) -> RuntimeResult<Value> {
//!             Ok(Value::Num(0.0))
//!         }
//!
//!         vec![("area", Rc::new(area) as ScriptFn)]
//!     }
//! }
//!
//! struct Circle {
//!     shape: Shape,
//!     radius: f64,
//! }
//!
//! impl ScriptType for Circle {
//!     fn type_name() -> &'static str {
//!         "Circle"
//!     }
//!
//!     fn constructor() -> Option<ScriptFn> {
//!         fn construct(
//!             engine: &mut ScriptEngine,
//!             arguments: &[Value],
//!         ) -> RuntimeResult<Value> {
//!             let radius = arguments
//!                 .first()
//!                 .and_then(Value::as_num)
//!                 .unwrap_or(1.0);
//!
//!             engine.give(Rc::new(Circle {
//!                 shape: Shape { sides: 0 },
//!                 radius,
//!             }))
//!         }
//!
//!         Some(Rc::new(construct))
//!     }
//!
//!     fn instance_methods() -> Vec<(&'static str, ScriptFn)> {
//!         fn area(engine: &mut ScriptEngine, arguments: &[Value]) -> RuntimeResult<Value> {
//!             let circle = engine.to::<Circle>(&arguments[0]).ok_or(
//!                 RuntimeError::TypeMismatch {
//!                     expected: "a Circle",
//!                     provided: arguments[0].describe().into(),
//!                 },
//!             )?;
//!
//!             Ok(Value::Num(std::f64::consts::PI * circle.radius * circle.radius))
//!         }
//!
//!         vec![("area", Rc::new(area) as ScriptFn)]
//!     }
//! }
//!
//! let mut engine = ScriptEngine::new();
//!
//! // Parents first; the upcast closure views a Circle as its Shape part.
//! engine.declare::<Shape>().unwrap();
//! engine
//!     .declare_with_parent::<Circle, Shape, _>(|circle| &circle.shape)
//!     .unwrap();
//!
//! engine.register::<Shape>().unwrap();
//! engine.register::<Circle>().unwrap();
//!
//! // `Circle(2.0)` is the call sugar of `Circle.new(2.0)`.
//! let circle = engine
//!     .call(&engine.lookup("Circle"), &[Value::Num(2.0)])
//!     .unwrap();
//!
//! assert!(engine.is::<Circle>(&circle));
//! assert!(engine.is::<Shape>(&circle));
//!
//! let area = engine.invoke_method(&circle, "area", &[]).unwrap();
//!
//! assert_eq!(area, Value::Num(std::f64::consts::PI * 4.0));
//! ```

mod report;

pub mod runtime;
