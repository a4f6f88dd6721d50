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

//! Native type binding and the scripting engine.
//!
//! The module provides the machinery that exposes native Rust types to the
//! scripting environment:
//!
//!  - [ScriptType] and [TypeCapabilities]: the binding surface of a native
//!    type, and its probed hook set.
//!  - [ScriptEngine]: declaration, registration, and the script-visible
//!    heap with its collector.
//!  - [Cell] and [TypedRef]: the lifetime boundary between the scripting
//!    side and native objects.
//!  - [Lineage] and [TypeIdentity]: hierarchy metadata backing type
//!    compatibility tests.

mod cell;
mod engine;
mod error;
mod ident;
mod lineage;
mod memory;
mod object;
mod package;
mod probe;
mod ty;

pub use crate::runtime::{
    cell::{Cell, TypedRef},
    engine::ScriptEngine,
    error::{RuntimeError, RuntimeResult},
    ident::TypeIdentity,
    lineage::{Ancestor, Lineage},
    memory::{ForeignRef, TableRef},
    object::{ScriptFn, Value},
    probe::TypeCapabilities,
    ty::{ScriptType, TypeMeta, TypeRegistry},
};
