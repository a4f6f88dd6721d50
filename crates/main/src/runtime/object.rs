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
    fmt::{Debug, Formatter},
    rc::Rc,
};

use compact_str::CompactString;

use crate::runtime::{
    memory::{ForeignRef, TableRef},
    RuntimeResult,
    ScriptEngine,
};

/// A native function exposed to the scripting environment.
///
/// Bound constructors, methods, namespaced functions, and serialization
/// hooks all share this shape. The function receives the
/// [ScriptEngine](crate::runtime::ScriptEngine) and the call arguments; for
/// method calls, the receiver is prepended as the first argument.
///
/// Errors returned from a ScriptFn unwind to the nearest caller boundary in
/// the current execution context. They never corrupt the engine: the
/// registry and every installed type remain usable afterwards.
pub type ScriptFn = Rc<dyn Fn(&mut ScriptEngine, &[Value]) -> RuntimeResult<Value>>;

/// A value visible to the scripting environment.
///
/// This is the exchange currency of the embedding boundary: bound functions
/// receive and return Values, and the engine's namespace tables store them.
///
/// Two reference variants address the engine's heap:
///
///  - [Value::Table] refers to a mutable table of string-keyed Values with
///    an optional metatable.
///  - [Value::Foreign] refers to an opaque wrapper around a native object
///    ([Cell](crate::runtime::Cell)), recognized by its type's installed
///    metatable.
///
/// Both are generation-tagged indices. Accessing a reference whose slot has
/// been swept by the collector silently degrades to the nil/miss path of the
/// corresponding operation.
#[derive(Clone, Default)]
pub enum Value {
    /// The environment's native "no value" marker.
    #[default]
    Nil,

    /// A boolean value.
    Bool(bool),

    /// A numeric value.
    Num(f64),

    /// A string value.
    Str(CompactString),

    /// A native function.
    Fn(ScriptFn),

    /// A reference to a table on the engine's heap.
    Table(TableRef),

    /// A reference to an exposed native object on the engine's heap.
    Foreign(ForeignRef),
}

impl Debug for Value {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil => formatter.write_str("Nil"),
            Self::Bool(value) => formatter.write_fmt(format_args!("Bool({value:?})")),
            Self::Num(value) => formatter.write_fmt(format_args!("Num({value:?})")),
            Self::Str(value) => formatter.write_fmt(format_args!("Str({value:?})")),
            Self::Fn(function) => {
                formatter.write_fmt(format_args!("Fn({:p})", Rc::as_ptr(function)))
            }
            Self::Table(table) => Debug::fmt(table, formatter),
            Self::Foreign(foreign) => Debug::fmt(foreign, formatter),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(this), Self::Bool(other)) => this.eq(other),
            (Self::Num(this), Self::Num(other)) => this.eq(other),
            (Self::Str(this), Self::Str(other)) => this.eq(other),
            (Self::Fn(this), Self::Fn(other)) => Rc::ptr_eq(this, other),
            (Self::Table(this), Self::Table(other)) => this.eq(other),
            (Self::Foreign(this), Self::Foreign(other)) => this.eq(other),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    #[inline(always)]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    #[inline(always)]
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

impl From<&str> for Value {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self::Str(CompactString::new(value))
    }
}

impl Value {
    /// Returns true if this value is [Nil](Value::Nil).
    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the underlying boolean, if this value is a boolean.
    #[inline(always)]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the underlying number, if this value is a number.
    #[inline(always)]
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the underlying string, if this value is a string.
    #[inline(always)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the underlying table reference, if this value is a table.
    #[inline(always)]
    pub fn as_table(&self) -> Option<TableRef> {
        match self {
            Self::Table(table) => Some(*table),
            _ => None,
        }
    }

    /// Returns the underlying foreign reference, if this value is an exposed
    /// native object.
    #[inline(always)]
    pub fn as_foreign(&self) -> Option<ForeignRef> {
        match self {
            Self::Foreign(foreign) => Some(*foreign),
            _ => None,
        }
    }

    /// Returns a user-facing description of this value's kind, suitable for
    /// error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "a boolean",
            Self::Num(_) => "a number",
            Self::Str(_) => "a string",
            Self::Fn(_) => "a function",
            Self::Table(_) => "a table",
            Self::Foreign(_) => "a foreign object",
        }
    }
}
