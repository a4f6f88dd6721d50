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

use std::fmt::{Debug, Display, Formatter};

use compact_str::CompactString;

use crate::runtime::{RuntimeError, RuntimeResult};

/// A stable numeric fingerprint distinguishing one
/// [registered type](crate::runtime::ScriptType) from all others.
///
/// The identity is a 64-bit FNV-1a hash of the type's user-facing name,
/// computed in a `const` context. It remains stable across process runs for
/// the same name.
///
/// Hashing does not guarantee uniqueness by itself. The
/// [ScriptEngine](crate::runtime::ScriptEngine) verifies at declaration time
/// that no two declared names map to the same identity, and reports
/// [RuntimeError::IdentityClash](crate::runtime::RuntimeError::IdentityClash)
/// otherwise.
///
/// ```
/// # use apogee::runtime::TypeIdentity;
/// #
/// const SHAPE: TypeIdentity = TypeIdentity::of("Shape");
///
/// assert_eq!(SHAPE, TypeIdentity::of("Shape"));
/// assert_ne!(SHAPE, TypeIdentity::of("Circle"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeIdentity(u64);

impl Debug for TypeIdentity {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Display for TypeIdentity {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("{:#018x}", self.0))
    }
}

impl TypeIdentity {
    /// Computes the identity of a type name.
    ///
    /// This function is `const`; identities of statically known names can be
    /// precomputed at compile time.
    pub const fn of(name: &str) -> Self {
        let bytes = name.as_bytes();

        let mut hash = 0xcbf29ce484222325u64;
        let mut index = 0;

        while index < bytes.len() {
            hash ^= bytes[index] as u64;
            hash = hash.wrapping_mul(0x100000001b3);
            index += 1;
        }

        Self(hash)
    }

    /// Returns the underlying 64-bit hash value.
    #[inline(always)]
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

// Splits a dotted registration path ("geometry.Shape") into its segments,
// rejecting paths the namespace builder cannot represent: empty paths, empty
// segments, and segments that are not plain identifiers.
pub(crate) fn split_path(path: &str) -> RuntimeResult<Vec<&str>> {
    if path.is_empty() {
        return Err(RuntimeError::BadPath {
            path: CompactString::new(path),
        });
    }

    let segments = path.split('.').collect::<Vec<_>>();

    for segment in &segments {
        if !is_ident(segment) {
            return Err(RuntimeError::BadPath {
                path: CompactString::new(path),
            });
        }
    }

    Ok(segments)
}

fn is_ident(string: &str) -> bool {
    let mut chars = string.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    if !first.is_alphabetic() && first != '_' {
        return false;
    }

    chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use crate::runtime::{ident::split_path, RuntimeError, TypeIdentity};

    #[test]
    fn test_identity_stability() {
        assert_eq!(TypeIdentity::of("Atom"), TypeIdentity::of("Atom"));
        assert_ne!(TypeIdentity::of("Atom"), TypeIdentity::of("AtomContainer"));

        // FNV-1a 64 reference value for an empty input.
        assert_eq!(TypeIdentity::of("").into_inner(), 0xcbf29ce484222325);
    }

    #[test]
    fn test_path_splitting() {
        assert_eq!(split_path("Shape").unwrap(), vec!["Shape"]);
        assert_eq!(split_path("geo.Shape").unwrap(), vec!["geo", "Shape"]);

        for bad in ["", ".", "geo.", ".Shape", "geo..Shape", "geo.1st"] {
            assert!(matches!(
                split_path(bad),
                Err(RuntimeError::BadPath { .. })
            ));
        }
    }
}
