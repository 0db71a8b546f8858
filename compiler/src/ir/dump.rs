//! IR Dump Utility
//!
//! Pretty-prints the IR in a human-readable form. Regions are printed nested
//! under the instruction that opens them, with their merge block following
//! at the level of the region. Exits carry a `# if_N` / `# loop_N` /
//! `# switch_N` comment naming the region they leave.

use super::{
    BlockId, BlockRole, CaseSelector, FunctionId, InstId, InstructionKind, Module, ValueId,
    ValueKind,
};
use fxhash::FxHashMap;

/// Dump an entire module to a string.
pub fn disassemble(module: &Module) -> String {
    let mut dumper = Dumper::new(module);
    dumper.module();
    dumper.out
}

/// Dump a single function by name.
pub fn dump_function_by_name(module: &Module, name: &str) -> Option<String> {
    let id = module.function_by_name(name)?;
    let mut dumper = Dumper::new(module);
    dumper.function(id);
    Some(dumper.out)
}

struct Dumper<'m> {
    module: &'m Module,
    out: String,
    indent: usize,
    region_names: FxHashMap<InstId, String>,
    counters: [u32; 3],
}

impl<'m> Dumper<'m> {
    fn new(module: &'m Module) -> Self {
        Self {
            module,
            out: String::new(),
            indent: 0,
            region_names: FxHashMap::default(),
            counters: [0; 3],
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn module(&mut self) {
        let module = self.module;
        let root = module.root_block();
        if !module.block(root).is_empty() {
            self.line(&format!("{} = root {{", root));
            self.indent += 1;
            for &inst in &module.block(root).instructions {
                self.instruction(inst);
            }
            self.indent -= 1;
            self.line("}");
            self.line("");
        }
        let functions: Vec<FunctionId> = module.functions().map(|(id, _)| id).collect();
        for (i, id) in functions.into_iter().enumerate() {
            if i > 0 {
                self.line("");
            }
            self.function(id);
        }
    }

    fn function(&mut self, id: FunctionId) {
        let module = self.module;
        let function = module.function(id);
        let params: Vec<String> = function
            .params
            .iter()
            .map(|&p| format!("{}:{}", self.value(p), self.type_of(p)))
            .collect();
        let mut attrs = String::new();
        if let Some(stage) = function.stage {
            attrs.push_str(&format!("@{} ", stage));
        }
        if let Some([x, y, z]) = function.workgroup_size {
            attrs.push_str(&format!("@workgroup_size({}, {}, {}) ", x, y, z));
        }
        self.line(&format!(
            "%{} = {}func({}):{} {{",
            module.function_name(id),
            attrs,
            params.join(", "),
            module.types().name(function.return_type)
        ));
        self.indent += 1;
        self.block(function.start, None);
        self.indent -= 1;
        self.line("}");
    }

    fn block(&mut self, id: BlockId, comment: Option<String>) {
        let module = self.module;
        let block = module.block(id);
        let params = if block.params.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = block
                .params
                .iter()
                .map(|&p| format!("{}:{}", self.value(p), self.type_of(p)))
                .collect();
            format!(" ({})", list.join(", "))
        };
        let comment = comment.map(|c| format!("  # {}", c)).unwrap_or_default();
        self.line(&format!("{} = block{} {{{}", id, params, comment));
        self.indent += 1;
        for &inst in &block.instructions {
            self.instruction(inst);
        }
        self.indent -= 1;
        self.line("}");

        // A region's merge continues the enclosing block
        if let Some(&last) = block.instructions.last() {
            let kind = &module.instruction(last).kind;
            if let Some(merge) = kind.merge_block() {
                let name = self.region_name(last);
                self.block(merge, Some(format!("merge {}", name)));
            }
        }
    }

    fn region_name(&mut self, inst: InstId) -> String {
        if let Some(name) = self.region_names.get(&inst) {
            return name.clone();
        }
        let (slot, prefix) = match self.module.instruction(inst).kind {
            InstructionKind::If { .. } => (0, "if"),
            InstructionKind::Loop { .. } => (1, "loop"),
            _ => (2, "switch"),
        };
        self.counters[slot] += 1;
        let name = format!("{}_{}", prefix, self.counters[slot]);
        self.region_names.insert(inst, name.clone());
        name
    }

    fn value(&self, id: ValueId) -> String {
        let module = self.module;
        let Some(data) = module.try_value(id) else {
            return format!("<invalid {}>", id);
        };
        match data.kind {
            ValueKind::Constant(c) => module.constants().display(module.types(), c),
            _ => match module.name_of(id) {
                Some(name) => format!("%{}", name),
                None => format!("{}", id),
            },
        }
    }

    fn type_of(&self, id: ValueId) -> String {
        match self.module.try_value(id) {
            Some(v) => self.module.types().name(v.ty),
            None => "<invalid>".to_string(),
        }
    }

    fn values(&self, ids: &[ValueId]) -> String {
        ids.iter()
            .map(|&v| self.value(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn instruction(&mut self, id: InstId) {
        let module = self.module;
        let inst = module.instruction(id);
        let ops = &inst.operands;
        let prefix = match inst.result {
            Some(r) => format!("{}:{} = ", self.value(r), self.type_of(r)),
            None => String::new(),
        };

        let text = match &inst.kind {
            InstructionKind::Var { attributes } => {
                let mut text = "var".to_string();
                if !ops.is_empty() {
                    text.push_str(&format!(", {}", self.values(ops)));
                }
                if let Some(bp) = attributes.binding {
                    text.push_str(&format!(" @binding_point({}, {})", bp.group, bp.binding));
                }
                if let Some(b) = attributes.builtin {
                    text.push_str(&format!(" @builtin({})", b.name()));
                }
                if let Some(l) = attributes.location {
                    text.push_str(&format!(" @location({})", l));
                }
                text
            }
            InstructionKind::Swizzle { indices } => {
                let components: String = indices
                    .iter()
                    .map(|&i| ['x', 'y', 'z', 'w'].get(i as usize).copied().unwrap_or('?'))
                    .collect();
                format!("swizzle {}, {}", self.values(ops), components)
            }
            InstructionKind::UserCall(f) => {
                let callee = format!("%{}", module.function_name(*f));
                if ops.is_empty() {
                    format!("call {}", callee)
                } else {
                    format!("call {}, {}", callee, self.values(ops))
                }
            }
            InstructionKind::ExitIf(r)
            | InstructionKind::ExitLoop(r)
            | InstructionKind::ExitSwitch(r)
            | InstructionKind::NextIteration(r)
            | InstructionKind::Continue(r) => {
                let name = self.region_name(*r);
                let args = if ops.is_empty() {
                    String::new()
                } else {
                    format!(" {}", self.values(ops))
                };
                format!("{}{}  # {}", inst.kind.name(), args, name)
            }
            InstructionKind::BreakIf {
                loop_inst,
                num_next_iter,
            } => {
                let name = self.region_name(*loop_inst);
                let split = (1 + *num_next_iter as usize).min(ops.len());
                let cond = ops.first().map(|&c| self.value(c)).unwrap_or_default();
                let mut text = format!("break_if {}", cond);
                if split > 1 {
                    text.push_str(&format!(" next_iteration: [ {} ]", self.values(&ops[1..split])));
                }
                if split < ops.len() {
                    text.push_str(&format!(" exit_loop: [ {} ]", self.values(&ops[split..])));
                }
                format!("{}  # {}", text, name)
            }
            InstructionKind::If {
                true_block,
                false_block,
                merge,
            } => {
                let name = self.region_name(id);
                self.line(&format!(
                    "if {} [t: {}, f: {}, m: {}] {{  # {}",
                    self.values(ops),
                    true_block,
                    false_block,
                    merge,
                    name
                ));
                self.indent += 1;
                self.block(*true_block, Some("true".to_string()));
                self.block(*false_block, Some("false".to_string()));
                self.indent -= 1;
                self.line("}");
                return;
            }
            InstructionKind::Loop {
                initializer,
                body,
                continuing,
                merge,
            } => {
                let name = self.region_name(id);
                let has_init = !module.block(*initializer).is_empty();
                let has_cont = !module.block(*continuing).is_empty();
                let mut targets = Vec::new();
                if has_init {
                    targets.push(format!("i: {}", initializer));
                }
                targets.push(format!("b: {}", body));
                if has_cont {
                    targets.push(format!("c: {}", continuing));
                }
                targets.push(format!("m: {}", merge));
                self.line(&format!("loop [{}] {{  # {}", targets.join(", "), name));
                self.indent += 1;
                if has_init {
                    self.block(*initializer, Some(BlockRole::Initializer.to_string()));
                }
                self.block(*body, Some(BlockRole::Body.to_string()));
                if has_cont {
                    self.block(*continuing, Some(BlockRole::Continuing.to_string()));
                }
                self.indent -= 1;
                self.line("}");
                return;
            }
            InstructionKind::Switch { cases, merge } => {
                let name = self.region_name(id);
                let mut parts: Vec<String> = cases
                    .iter()
                    .map(|case| {
                        let selectors: Vec<String> = case
                            .selectors
                            .iter()
                            .map(|s| match s {
                                CaseSelector::Default => "default".to_string(),
                                CaseSelector::Value(c) => {
                                    module.constants().display(module.types(), *c)
                                }
                            })
                            .collect();
                        format!("c: ({}, {})", selectors.join(" "), case.block)
                    })
                    .collect();
                parts.push(format!("m: {}", merge));
                self.line(&format!(
                    "switch {} [{}] {{  # {}",
                    self.values(ops),
                    parts.join(", "),
                    name
                ));
                self.indent += 1;
                for case in cases {
                    self.block(case.block, Some(BlockRole::Case.to_string()));
                }
                self.indent -= 1;
                self.line("}");
                return;
            }
            kind => {
                if ops.is_empty() {
                    kind.name().to_string()
                } else {
                    format!("{} {}", kind.name(), self.values(ops))
                }
            }
        };
        self.line(&format!("{}{}", prefix, text));
    }
}
