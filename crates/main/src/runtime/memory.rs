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

use ahash::{AHashMap, AHashSet};
use compact_str::CompactString;
use log::trace;

use crate::{
    report::system_panic,
    runtime::{Cell, Value},
};

/// A reference to a table on the engine's heap.
///
/// The reference is a generation-tagged index. After the collector sweeps
/// the slot, the stale reference silently stops resolving; it never
/// addresses a slot reused by another table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub(super) index: usize,
    pub(super) generation: u64,
}

impl Debug for TableRef {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("Table(‹{}.{}›)", self.index, self.generation))
    }
}

/// A reference to an exposed native object (a [Cell]) on the engine's heap.
///
/// Generation-tagged in the same way as [TableRef].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignRef {
    pub(super) index: usize,
    pub(super) generation: u64,
}

impl Debug for ForeignRef {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!(
            "Foreign(‹{}.{}›)",
            self.index, self.generation,
        ))
    }
}

// A script-visible table: string-keyed fields plus an optional metatable.
pub(crate) struct TableEntry {
    pub(crate) fields: AHashMap<CompactString, Value>,
    pub(crate) metatable: Option<TableRef>,
}

// A script-visible foreign object: the Cell plus the installed metatable of
// its type, assigned when the object was pushed.
pub(crate) struct ForeignEntry {
    pub(crate) cell: Cell,
    pub(crate) metatable: TableRef,
}

struct Slot<T> {
    generation: u64,
    entry: Option<T>,
}

// The engine's script memory: generation-tagged arenas of tables and foreign
// objects, collected by reachability from the globals graph.
pub(crate) struct ScriptHeap {
    tables: Vec<Slot<TableEntry>>,
    foreigns: Vec<Slot<ForeignEntry>>,
    free_tables: Vec<usize>,
    free_foreigns: Vec<usize>,
}

impl ScriptHeap {
    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self {
            tables: Vec::new(),
            foreigns: Vec::new(),
            free_tables: Vec::new(),
            free_foreigns: Vec::new(),
        }
    }

    pub(crate) fn alloc_table(&mut self) -> TableRef {
        let entry = TableEntry {
            fields: AHashMap::new(),
            metatable: None,
        };

        match self.free_tables.pop() {
            Some(index) => {
                let slot = &mut self.tables[index];

                if slot.entry.is_some() {
                    system_panic!("Free list entry points to an occupied table slot.");
                }

                slot.entry = Some(entry);

                TableRef {
                    index,
                    generation: slot.generation,
                }
            }

            None => {
                let index = self.tables.len();

                self.tables.push(Slot {
                    generation: 1,
                    entry: Some(entry),
                });

                TableRef {
                    index,
                    generation: 1,
                }
            }
        }
    }

    pub(crate) fn alloc_foreign(&mut self, cell: Cell, metatable: TableRef) -> ForeignRef {
        let entry = ForeignEntry { cell, metatable };

        match self.free_foreigns.pop() {
            Some(index) => {
                let slot = &mut self.foreigns[index];

                if slot.entry.is_some() {
                    system_panic!("Free list entry points to an occupied foreign slot.");
                }

                slot.entry = Some(entry);

                ForeignRef {
                    index,
                    generation: slot.generation,
                }
            }

            None => {
                let index = self.foreigns.len();

                self.foreigns.push(Slot {
                    generation: 1,
                    entry: Some(entry),
                });

                ForeignRef {
                    index,
                    generation: 1,
                }
            }
        }
    }

    #[inline(always)]
    pub(crate) fn table(&self, table: TableRef) -> Option<&TableEntry> {
        let slot = self.tables.get(table.index)?;

        if slot.generation != table.generation {
            return None;
        }

        slot.entry.as_ref()
    }

    #[inline(always)]
    pub(crate) fn table_mut(&mut self, table: TableRef) -> Option<&mut TableEntry> {
        let slot = self.tables.get_mut(table.index)?;

        if slot.generation != table.generation {
            return None;
        }

        slot.entry.as_mut()
    }

    #[inline(always)]
    pub(crate) fn foreign(&self, foreign: ForeignRef) -> Option<&ForeignEntry> {
        let slot = self.foreigns.get(foreign.index)?;

        if slot.generation != foreign.generation {
            return None;
        }

        slot.entry.as_ref()
    }

    #[inline(always)]
    pub(crate) fn foreign_mut(&mut self, foreign: ForeignRef) -> Option<&mut ForeignEntry> {
        let slot = self.foreigns.get_mut(foreign.index)?;

        if slot.generation != foreign.generation {
            return None;
        }

        slot.entry.as_mut()
    }

    // Mark-and-sweep collection.
    //
    // Marks every table and foreign object reachable from `globals` and from
    // the caller-supplied `roots`, then sweeps the rest. Swept foreign
    // objects are finalized exactly once: the sweep takes the entry out of
    // its slot, so no later pass can observe it again. Finalization itself
    // never panics.
    //
    // Returns the number of foreign objects finalized.
    pub(crate) fn collect(&mut self, globals: TableRef, roots: &[Value]) -> usize {
        let mut live_tables = AHashSet::new();
        let mut live_foreigns = AHashSet::new();

        let mut worklist = Vec::with_capacity(roots.len() + 1);

        worklist.push(Value::Table(globals));
        worklist.extend_from_slice(roots);

        while let Some(value) = worklist.pop() {
            match value {
                Value::Table(table) => {
                    let Some(entry) = self.table(table) else {
                        continue;
                    };

                    if !live_tables.insert(table.index) {
                        continue;
                    }

                    for value in entry.fields.values() {
                        worklist.push(value.clone());
                    }

                    if let Some(metatable) = entry.metatable {
                        worklist.push(Value::Table(metatable));
                    }
                }

                Value::Foreign(foreign) => {
                    let Some(entry) = self.foreign(foreign) else {
                        continue;
                    };

                    if !live_foreigns.insert(foreign.index) {
                        continue;
                    }

                    worklist.push(Value::Table(entry.metatable));
                }

                _ => (),
            }
        }

        let mut finalized = 0;

        for (index, slot) in self.foreigns.iter_mut().enumerate() {
            if slot.entry.is_none() || live_foreigns.contains(&index) {
                continue;
            }

            // The entry leaves its slot before finalization; a repeated
            // sweep cannot reach it anymore.
            if let Some(mut entry) = slot.entry.take() {
                entry.cell.finalize();
            }

            slot.generation += 1;
            self.free_foreigns.push(index);

            finalized += 1;
        }

        let mut dropped_tables = 0;

        for (index, slot) in self.tables.iter_mut().enumerate() {
            if slot.entry.is_none() || live_tables.contains(&index) {
                continue;
            }

            slot.entry = None;
            slot.generation += 1;
            self.free_tables.push(index);

            dropped_tables += 1;
        }

        trace!("Collection: {finalized} foreign object(s) finalized, {dropped_tables} table(s) dropped.");

        finalized
    }
}
