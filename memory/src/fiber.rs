use crate::Value;

/// A single activation record on a fiber's call stack.
///
/// - `function`: handle of the Function object in the heap
/// - `ip`: index of the next instruction
/// - `base`: offset of register 0 in the fiber's value stack
/// - `ret_dest`: absolute stack slot receiving the return value, or `None`
///   when returning from this frame leaves the current run loop
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub function: u32,
    pub ip: usize,
    pub base: usize,
    pub ret_dest: Option<usize>,
}

impl Frame {
    pub fn new(function: u32, base: usize, ret_dest: Option<usize>) -> Self {
        Self {
            function,
            ip: 0,
            base,
            ret_dest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FiberStatus {
    #[default]
    New,
    Pending,
    Alive,
    Debug,
    Dead,
    Error,
}

impl FiberStatus {
    pub fn name(self) -> &'static str {
        match self {
            FiberStatus::New => ":new",
            FiberStatus::Pending => ":pending",
            FiberStatus::Alive => ":alive",
            FiberStatus::Debug => ":debug",
            FiberStatus::Dead => ":dead",
            FiberStatus::Error => ":error",
        }
    }

    /// Statuses from which `resume` may continue the fiber.
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            FiberStatus::New | FiberStatus::Pending | FiberStatus::Debug
        )
    }
}

/// A resumable continuation with its own register stack and call frames.
#[derive(Debug, Clone, Default)]
pub struct Fiber {
    pub stack: Vec<Value>,
    pub frames: Vec<Frame>,
    /// Arguments accumulated by PUSH / PUSH_ARRAY for the next call.
    pub pending: Vec<Value>,
    /// Slot that receives the value passed to the next `resume`.
    pub resume_dest: Option<usize>,
    pub status: FiberStatus,
    /// Entry function, called on first resume.
    pub function: Value,
}

impl Fiber {
    pub fn new(function: Value) -> Self {
        Self {
            function,
            ..Self::default()
        }
    }

    /// Stand-in left in the arena while the real fiber runs on the VM.
    pub fn placeholder() -> Self {
        Self {
            status: FiberStatus::Alive,
            ..Self::default()
        }
    }

    /// Every value this fiber keeps alive.
    pub fn children(&self) -> impl Iterator<Item = Value> + '_ {
        self.stack
            .iter()
            .copied()
            .chain(self.pending.iter().copied())
            .chain(self.frames.iter().map(|f| Value::Function(f.function)))
            .chain(std::iter::once(self.function))
    }

    pub fn byte_size(&self) -> usize {
        (self.stack.capacity() + self.pending.capacity()) * std::mem::size_of::<Value>()
            + self.frames.capacity() * std::mem::size_of::<Frame>()
    }
}
