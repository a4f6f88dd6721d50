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

// Internal invariant reporting.
//
// The binding runtime never surfaces its own bugs as RuntimeErrors. Branches
// that cannot be reached under the module invariants terminate through the
// macros below instead.

macro_rules! system_panic {
    ($message:expr $(,)?) => {
        panic!(
            "Apogee internal error. This is a bug.\
            \nIf you see this message, please open an issue:\
            \nhttps://github.com/Eliah-Lakhin/apogee/issues\
            \n\n{}",
            $message,
        )
    };
}

macro_rules! debug_unreachable {
    ($message:expr $(,)?) => {{
        #[cfg(debug_assertions)]
        {
            $crate::report::unreachable_abort($message)
        }

        #[cfg(not(debug_assertions))]
        {
            ::std::hint::unreachable_unchecked()
        }
    }};
}

pub(crate) use debug_unreachable;
pub(crate) use system_panic;

// The macro expansion keeps the call site inside an `unsafe` block in both
// build profiles, so the function is deliberately unsafe even though the
// debug implementation merely panics.
#[cfg(debug_assertions)]
pub(crate) unsafe fn unreachable_abort(message: &str) -> ! {
    panic!(
        "Apogee unreachable code. This is a bug.\
        \nIf you see this message, please open an issue:\
        \nhttps://github.com/Eliah-Lakhin/apogee/issues\
        \n\n{message}",
    )
}
