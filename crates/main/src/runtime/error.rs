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
    error::Error as StdError,
    fmt::{Debug, Display, Formatter},
    rc::Rc,
    result::Result as StdResult,
};

use compact_str::CompactString;

use crate::runtime::TypeIdentity;

/// A result of a runtime API call, which can either be a normal value or a
/// [RuntimeError].
pub type RuntimeResult<T> = StdResult<T, RuntimeError>;

/// Represents any error that may occur while declaring, registering, or
/// calling into exposed native types.
///
/// Two classes of failures intentionally do **not** produce RuntimeErrors:
///
///  - Type-mismatch outcomes of [Cell::to](crate::runtime::Cell::to) and
///    [Cell::is](crate::runtime::Cell::is) are ordinary `None`/`false`
///    results that the caller decides how to handle.
///  - Finalization never fails; repeated finalization is a no-op.
///
/// The [Display] implementation provides a brief description of the
/// underlying error.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum RuntimeError {
    /// An operation attempted to access data through a released or otherwise
    /// absent reference.
    Nil {
        /// A short description of the operation that required live data.
        operation: &'static str,
    },

    /// A reference addressed a heap slot that the collector has already
    /// swept, or that was never allocated.
    Expired {
        /// A short description of the operation that required a live slot.
        operation: &'static str,
    },

    /// A bound function received an argument of an unsupported type.
    TypeMismatch {
        /// A description of the acceptable argument.
        expected: &'static str,

        /// A description of the argument actually provided.
        provided: CompactString,
    },

    /// A bound function received the wrong number of arguments.
    ArityMismatch {
        /// The name of the function.
        function: CompactString,

        /// The number of arguments the function requires.
        expected: usize,

        /// The number of arguments actually provided.
        provided: usize,
    },

    /// The call protocol was applied to a value that is neither a function
    /// nor a table with constructor sugar.
    NotCallable {
        /// A description of the value that was called.
        provided: CompactString,
    },

    /// A member lookup on an exposed object did not resolve to anything.
    UnknownMember {
        /// The name of the object's type.
        type_name: CompactString,

        /// The requested member name.
        member: CompactString,

        /// The closest installed member name, if one resembles the request.
        suggestion: Option<CompactString>,
    },

    /// A registration path is empty or contains malformed segments.
    BadPath {
        /// The offending dotted path.
        path: CompactString,
    },

    /// A registration path runs through an existing value that is not a
    /// namespace table.
    PathCollision {
        /// The full dotted path being installed.
        path: CompactString,

        /// The segment where the collision occurred.
        segment: CompactString,
    },

    /// Two distinct type names hash to the same identity value.
    IdentityClash {
        /// The name being declared.
        declared: &'static str,

        /// The previously declared name with the same identity.
        existing: &'static str,

        /// The shared identity value.
        identity: TypeIdentity,
    },

    /// A type with this name has already been declared or registered.
    TypeRedeclared {
        /// The offending type name.
        name: &'static str,
    },

    /// A child type was declared before its parent.
    UndeclaredParent {
        /// The name of the child type being declared.
        child: &'static str,

        /// The name of the missing parent type.
        parent: &'static str,
    },

    /// An operation referred to a type that was never declared.
    UndeclaredType {
        /// The name of the missing type.
        name: &'static str,
    },

    /// An operation required a fully registered type, but the type was only
    /// declared.
    UnregisteredType {
        /// The name of the declared but unregistered type.
        name: &'static str,
    },

    /// A consumer-supplied hook failed with its own error.
    Custom {
        /// The underlying error value.
        cause: Rc<dyn StdError>,
    },
}

impl Display for RuntimeError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil { operation } => {
                formatter.write_fmt(format_args!("Nil data access during {operation}."))
            }

            Self::Expired { operation } => formatter.write_fmt(format_args!(
                "An expired reference was used during {operation}.",
            )),

            Self::TypeMismatch { expected, provided } => formatter.write_fmt(format_args!(
                "Argument type mismatch. Expected {expected}, but {provided} provided.",
            )),

            Self::ArityMismatch {
                function,
                expected,
                provided,
            } => formatter.write_fmt(format_args!(
                "Function {function} requires {expected} argument(s), \
                but {provided} provided.",
            )),

            Self::NotCallable { provided } => {
                formatter.write_fmt(format_args!("A value of {provided} is not callable."))
            }

            Self::UnknownMember {
                type_name,
                member,
                suggestion,
            } => {
                formatter.write_fmt(format_args!("Unknown member {type_name}.{member}."))?;

                if let Some(suggestion) = suggestion {
                    formatter
                        .write_fmt(format_args!(" Did you mean {type_name}.{suggestion}?"))?;
                }

                Ok(())
            }

            Self::BadPath { path } => match path.is_empty() {
                true => formatter.write_str("Empty registration path."),

                false => {
                    formatter.write_fmt(format_args!("Malformed registration path \"{path}\"."))
                }
            },

            Self::PathCollision { path, segment } => formatter.write_fmt(format_args!(
                "Registration path \"{path}\" collides with a non-namespace \
                value at \"{segment}\".",
            )),

            Self::IdentityClash {
                declared,
                existing,
                identity,
            } => formatter.write_fmt(format_args!(
                "Type name {declared} hashes to {identity}, which is already \
                occupied by {existing}. Rename one of the types.",
            )),

            Self::TypeRedeclared { name } => {
                formatter.write_fmt(format_args!("Type {name} already declared."))
            }

            Self::UndeclaredParent { child, parent } => formatter.write_fmt(format_args!(
                "Type {child} inherits {parent}, but {parent} was not \
                declared yet. Declare parent types first.",
            )),

            Self::UndeclaredType { name } => {
                formatter.write_fmt(format_args!("Type {name} was not declared."))
            }

            Self::UnregisteredType { name } => formatter.write_fmt(format_args!(
                "Type {name} was declared but not registered.",
            )),

            Self::Custom { cause } => Display::fmt(cause, formatter),
        }
    }
}

impl StdError for RuntimeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Custom { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl RuntimeError {
    /// Wraps an arbitrary consumer error into a RuntimeError, preserving it
    /// as the [source](StdError::source).
    #[inline(always)]
    pub fn custom(cause: impl StdError + 'static) -> Self {
        Self::Custom {
            cause: Rc::new(cause),
        }
    }
}
