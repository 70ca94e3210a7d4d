//! Module instances
//!
//! [`Instance::init`] turns a validated [`Module`] plus a resolved host
//! import list into a live instance: exports mapped, indirect-call tables
//! resolved, globals zeroed, memory allocated and seeded from its segments.
//! The instance is structurally immutable afterwards; only global cells and
//! memory bytes change while code runs.

use super::eval::{Evaluator, DEFAULT_MAX_CALL_DEPTH};
use super::{Fault, IndexSpace, InstantiationError, Memory, Value};
use crate::ast::{Expr, Module};
use std::collections::HashMap;

/// A resolved host import: called directly by `CallImport`, with no
/// interpreted frame of its own.
pub type HostFunc = Box<dyn Fn(Vec<Value>) -> Result<Option<Value>, Fault>>;

/// A live module instance.
///
/// Borrows the program tree it was instantiated from and owns all mutable
/// state. `invoke` takes `&mut self`, so exclusive access per call is a
/// compile-time property; sharing an instance across threads is not
/// supported.
pub struct Instance<'a> {
    module: &'a Module,
    imports: Vec<HostFunc>,
    /// Export name to function index; duplicates resolved last-wins.
    exports: HashMap<String, u32>,
    /// Indirect-call tables with every entry resolved at init.
    tables: Vec<Vec<u32>>,
    globals: Vec<Value>,
    memory: Memory,
    max_call_depth: usize,
}

impl<'a> Instance<'a> {
    /// Instantiate a module with its resolved host imports.
    ///
    /// The import list length must equal the module's declared import count;
    /// a mismatch is a configuration fault, as is a table entry naming a
    /// nonexistent function or an init segment outside the memory.
    pub fn init(module: &'a Module, imports: Vec<HostFunc>) -> Result<Self, InstantiationError> {
        if imports.len() != module.imports {
            return Err(InstantiationError::ImportCountMismatch {
                declared: module.imports,
                supplied: imports.len(),
            });
        }

        let mut memory = Memory::new(module.memory.as_ref().map_or(0, |m| m.initial));
        if let Some(descriptor) = &module.memory {
            memory.init(&descriptor.segments)?;
        }

        let globals = module.globals.iter().map(|&t| Value::zero(t)).collect();

        // Resolve table entries once, here, so a bad entry surfaces at
        // instantiation instead of at some later indirect call.
        let mut tables = Vec::with_capacity(module.tables.len());
        for (t, entries) in module.tables.iter().enumerate() {
            for (e, &func) in entries.iter().enumerate() {
                if func as usize >= module.functions.len() {
                    return Err(InstantiationError::UndefinedTableEntry {
                        table: t as u32,
                        entry: e as u32,
                        func,
                    });
                }
            }
            tables.push(entries.clone());
        }

        // Declaration order; a later export under the same name overrides
        // the earlier one.
        let mut exports = HashMap::new();
        for export in &module.exports {
            exports.insert(export.name.clone(), export.func);
        }

        Ok(Instance {
            module,
            imports,
            exports,
            tables,
            globals,
            memory,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        })
    }

    /// Invoke an exported function by name.
    ///
    /// Faults on an unknown export, an argument arity or kind mismatch, and
    /// on anything the evaluation itself raises. Returns the function's
    /// single optional result.
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>, Fault> {
        let func_idx = *self
            .exports
            .get(name)
            .ok_or_else(|| Fault::UndefinedExport(name.to_string()))?;
        Evaluator::new(self).invoke_function(func_idx, args)
    }

    /// Replace the bound on nested interpreted calls (default
    /// [`DEFAULT_MAX_CALL_DEPTH`]). Hosts with shallow stacks can lower it;
    /// exceeding it faults with [`Fault::CallStackOverflow`].
    pub fn set_call_depth_limit(&mut self, limit: usize) {
        self.max_call_depth = limit;
    }

    /// Read a global cell.
    pub fn global(&self, idx: u32) -> Result<Value, Fault> {
        self.globals
            .get(idx as usize)
            .copied()
            .ok_or(Fault::UndefinedIndex(IndexSpace::Global, idx))
    }

    /// Overwrite a global cell; the value must match the cell's declared kind.
    pub fn set_global(&mut self, idx: u32, value: Value) -> Result<(), Fault> {
        let cell = self
            .globals
            .get_mut(idx as usize)
            .ok_or(Fault::UndefinedIndex(IndexSpace::Global, idx))?;
        if cell.typ() != value.typ() {
            return Err(Fault::TypeMismatch {
                operand: 0,
                expected: cell.typ().to_string(),
                actual: value.typ(),
            });
        }
        *cell = value;
        Ok(())
    }

    /// Resolve one indirect-call table entry to a function index.
    pub(crate) fn table_entry(&self, table: u32, entry: u32) -> Result<u32, Fault> {
        let entries = self
            .tables
            .get(table as usize)
            .ok_or(Fault::UndefinedIndex(IndexSpace::Table, table))?;
        entries
            .get(entry as usize)
            .copied()
            .ok_or(Fault::UndefinedIndex(IndexSpace::TableEntry, entry))
    }

    pub(crate) fn import(&self, idx: u32) -> Option<&HostFunc> {
        self.imports.get(idx as usize)
    }

    /// The program tree this instance was built from.
    pub fn module(&self) -> &'a Module {
        self.module
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub(crate) fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub(crate) fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }
}

/// Evaluate one bare expression in an ephemeral instance: no imports, no
/// globals, no tables, zero-length memory. The expression is wrapped as a
/// nullary, local-less function and run to its optional value.
pub fn eval(expr: &Expr) -> Result<Option<Value>, Fault> {
    let module = Module::bare(expr.clone());
    let mut instance = Instance {
        module: &module,
        imports: Vec::new(),
        exports: HashMap::new(),
        tables: Vec::new(),
        globals: Vec::new(),
        memory: Memory::new(0),
        max_call_depth: DEFAULT_MAX_CALL_DEPTH,
    };
    Evaluator::new(&mut instance).invoke_function(0, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Export, Function, MemoryDescriptor, Segment, ValueType};

    fn nullary(body: Expr) -> Function {
        Function {
            params: vec![],
            result: None,
            locals: vec![],
            body,
        }
    }

    fn exported(name: &str, func: u32) -> Export {
        Export {
            name: name.to_string(),
            func,
        }
    }

    #[test]
    fn test_init_empty_module() {
        let module = Module::new();
        let instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.memory().size(), 0);
    }

    #[test]
    fn test_import_count_mismatch_is_config_fault() {
        let module = Module::new();
        let host: HostFunc = Box::new(|_| Ok(None));
        assert_eq!(
            Instance::init(&module, vec![host]).err().unwrap(),
            InstantiationError::ImportCountMismatch {
                declared: 0,
                supplied: 1
            }
        );
    }

    #[test]
    fn test_invoke_unknown_export_faults() {
        let module = Module::new();
        let mut instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(
            instance.invoke("nope", vec![]),
            Err(Fault::UndefinedExport("nope".to_string()))
        );
    }

    #[test]
    fn test_invoke_arity_checked() {
        let module = Module {
            functions: vec![Function {
                params: vec![ValueType::I32],
                result: Some(ValueType::I32),
                locals: vec![],
                body: Expr::GetLocal(0),
            }],
            exports: vec![exported("id", 0)],
            ..Module::default()
        };
        let mut instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(
            instance.invoke("id", vec![]),
            Err(Fault::ArityMismatch {
                expected: 1,
                actual: 0
            })
        );
        assert_eq!(
            instance.invoke("id", vec![Value::I64(1)]),
            Err(Fault::TypeMismatch {
                operand: 0,
                expected: "i32".to_string(),
                actual: ValueType::I64,
            })
        );
        assert_eq!(instance.invoke("id", vec![Value::I32(7)]).unwrap(), Some(Value::I32(7)));
    }

    #[test]
    fn test_duplicate_export_last_wins() {
        let module = Module {
            functions: vec![
                nullary(Expr::Const(Value::I32(1))),
                nullary(Expr::Const(Value::I32(2))),
            ],
            exports: vec![exported("f", 0), exported("f", 1)],
            ..Module::default()
        };
        let mut instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.invoke("f", vec![]).unwrap(), Some(Value::I32(2)));
    }

    #[test]
    fn test_bad_table_entry_caught_at_init() {
        let module = Module {
            functions: vec![nullary(Expr::Nop)],
            tables: vec![vec![0, 3]],
            ..Module::default()
        };
        assert_eq!(
            Instance::init(&module, vec![]).err().unwrap(),
            InstantiationError::UndefinedTableEntry {
                table: 0,
                entry: 1,
                func: 3
            }
        );
    }

    #[test]
    fn test_memory_seeded_from_segments() {
        let module = Module {
            memory: Some(MemoryDescriptor {
                initial: 8,
                segments: vec![Segment {
                    offset: 1,
                    data: vec![0xAB],
                }],
            }),
            ..Module::default()
        };
        let instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.memory().size(), 8);
        assert_eq!(
            instance
                .memory()
                .load(1, crate::ast::AccessWidth::W8, ValueType::I32, crate::ast::Sign::Unsigned)
                .unwrap(),
            Value::I32(0xAB)
        );
    }

    #[test]
    fn test_globals_zero_initialized() {
        let module = Module {
            globals: vec![ValueType::I32, ValueType::F64],
            ..Module::default()
        };
        let instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.global(0).unwrap(), Value::I32(0));
        assert!(instance.global(1).unwrap().same_bits(&Value::F64(0.0)));
        assert_eq!(
            instance.global(2),
            Err(Fault::UndefinedIndex(IndexSpace::Global, 2))
        );
    }

    #[test]
    fn test_state_shared_across_invocations() {
        let module = Module {
            functions: vec![
                nullary(Expr::SetGlobal(0, Box::new(Expr::Const(Value::I32(9))))),
                nullary(Expr::GetGlobal(0)),
            ],
            globals: vec![ValueType::I32],
            exports: vec![exported("set", 0), exported("get", 1)],
            ..Module::default()
        };
        let mut instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.invoke("get", vec![]).unwrap(), Some(Value::I32(0)));
        instance.invoke("set", vec![]).unwrap();
        assert_eq!(instance.invoke("get", vec![]).unwrap(), Some(Value::I32(9)));
    }

    #[test]
    fn test_eval_runs_in_ephemeral_instance() {
        assert_eq!(
            eval(&Expr::Const(Value::F64(2.5))).unwrap(),
            Some(Value::F64(2.5))
        );
        // No memory exists for a bare expression
        assert!(matches!(
            eval(&Expr::Load {
                kind: ValueType::I32,
                width: crate::ast::AccessWidth::W32,
                sign: crate::ast::Sign::Unsigned,
                addr: Box::new(Expr::Const(Value::I32(0))),
            }),
            Err(Fault::MemoryBounds { .. })
        ));
    }

    #[test]
    fn test_depth_limit_is_configurable() {
        let module = Module {
            functions: vec![nullary(Expr::Call { func: 0, args: vec![] })],
            exports: vec![exported("spin", 0)],
            ..Module::default()
        };
        let mut instance = Instance::init(&module, vec![]).unwrap();
        instance.set_call_depth_limit(4);
        assert_eq!(instance.invoke("spin", vec![]), Err(Fault::CallStackOverflow));
    }
}
