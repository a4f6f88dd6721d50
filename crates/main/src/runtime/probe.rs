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

use std::fmt::{Debug, Formatter};

use crate::runtime::{ScriptFn, ScriptType};

/// The optional hook surface of a [ScriptType], collected in one pass.
///
/// Probing is a pure structural decision: it invokes the trait's hook
/// accessors, each of which either returns the bound implementation or its
/// neutral default (`None` / empty list). No hook implementation is ever
/// called during probing, and probing cannot fail.
///
/// ```
/// # use apogee::runtime::{ScriptType, TypeCapabilities};
/// #
/// struct Plain;
///
/// impl ScriptType for Plain {
///     fn type_name() -> &'static str {
///         "Plain"
///     }
/// }
///
/// let capabilities = TypeCapabilities::probe::<Plain>();
///
/// assert!(!capabilities.has_constructor());
/// assert!(capabilities.instance_methods().is_empty());
/// ```
#[derive(Clone)]
pub struct TypeCapabilities {
    pub(crate) constructor: Option<ScriptFn>,
    pub(crate) to_table: Option<ScriptFn>,
    pub(crate) from_table: Option<ScriptFn>,
    pub(crate) instance_methods: Vec<(&'static str, ScriptFn)>,
    pub(crate) namespaced_functions: Vec<(&'static str, ScriptFn)>,
}

impl Debug for TypeCapabilities {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TypeCapabilities")
            .field("constructor", &self.constructor.is_some())
            .field("to_table", &self.to_table.is_some())
            .field("from_table", &self.from_table.is_some())
            .field("instance_methods", &self.instance_methods.len())
            .field("namespaced_functions", &self.namespaced_functions.len())
            .finish()
    }
}

impl TypeCapabilities {
    /// Collects the hook surface of the type `T`.
    pub fn probe<T: ScriptType>() -> Self {
        Self {
            constructor: T::constructor(),
            to_table: T::to_table(),
            from_table: T::from_table(),
            instance_methods: T::instance_methods(),
            namespaced_functions: T::namespaced_functions(),
        }
    }

    /// Returns true if the type supplies a constructor hook.
    #[inline(always)]
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Returns true if the type supplies a `toTable` serialization hook.
    #[inline(always)]
    pub fn has_to_table(&self) -> bool {
        self.to_table.is_some()
    }

    /// Returns true if the type supplies a `fromTable` deserialization hook.
    #[inline(always)]
    pub fn has_from_table(&self) -> bool {
        self.from_table.is_some()
    }

    /// Returns the type's own instance methods, in declaration order.
    #[inline(always)]
    pub fn instance_methods(&self) -> &[(&'static str, ScriptFn)] {
        &self.instance_methods
    }

    /// Returns the type's namespaced functions, in declaration order.
    #[inline(always)]
    pub fn namespaced_functions(&self) -> &[(&'static str, ScriptFn)] {
        &self.namespaced_functions
    }
}
