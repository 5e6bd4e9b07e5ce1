#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConstIdx(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NameIdx(pub(crate) u32);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConstVal {
    Number(f64),
    Bool(bool),
    Str(String),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinId {
    Min,
    Max,
    Clamp,
    Abs,
    Sin,
    Cos,
    Lerp,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Pow,
    Len,
    Str,
    Num,
    Upper,
    Lower,
    Join,
}

impl BuiltinId {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "min" => Self::Min,
            "max" => Self::Max,
            "clamp" => Self::Clamp,
            "abs" => Self::Abs,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "lerp" => Self::Lerp,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "len" => Self::Len,
            "str" => Self::Str,
            "num" => Self::Num,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "join" => Self::Join,
            _ => return None,
        })
    }

    /// Accepted argument counts, inclusive. `None` for the upper bound means variadic.
    pub(crate) fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Min | Self::Max => (1, None),
            Self::Clamp | Self::Lerp => (3, Some(3)),
            Self::Pow => (2, Some(2)),
            Self::Join => (1, Some(2)),
            _ => (1, Some(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    PushConst(ConstIdx),
    LoadVar(NameIdx),
    GetMember(NameIdx),
    GetIndex,
    MakeArray(u32),
    /// Pops `n` key/value pairs pushed key first.
    MakeObject(u32),

    Neg,
    Not,
    ToNumber,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,

    Jump(u32),
    /// Pops the condition.
    JumpIfFalse(u32),
    // The *Keep jumps leave the operand on the stack when they branch and pop it otherwise.
    JumpIfFalseKeep(u32),
    JumpIfTrueKeep(u32),
    JumpIfNotNullishKeep(u32),

    CallBuiltin { id: BuiltinId, argc: u8 },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BytecodeProgram {
    pub(crate) ops: Vec<Op>,
    pub(crate) consts: Vec<ConstVal>,
    pub(crate) names: Vec<String>,
}

impl BytecodeProgram {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_const(&mut self, c: ConstVal) -> ConstIdx {
        let idx = ConstIdx(self.consts.len() as u32);
        self.consts.push(c);
        idx
    }

    pub(crate) fn intern(&mut self, name: &str) -> NameIdx {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            return NameIdx(i as u32);
        }
        self.names.push(name.to_owned());
        NameIdx((self.names.len() - 1) as u32)
    }

    pub(crate) fn name(&self, idx: NameIdx) -> Option<&str> {
        self.names.get(idx.0 as usize).map(String::as_str)
    }

    /// Variables read by the program, in first-use order.
    pub(crate) fn free_variables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for op in &self.ops {
            if let Op::LoadVar(idx) = op
                && let Some(n) = self.name(*idx)
                && !out.contains(&n)
            {
                out.push(n);
            }
        }
        out
    }
}
