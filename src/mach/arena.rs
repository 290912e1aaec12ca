use super::Pc;
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Bytes charged for the tag and link of every frame.
pub const FRAME_HEADER: usize = 3;
/// Bytes charged for a service record on the heap.
pub const SERVICE_LEN: usize = FRAME_HEADER + 4;
/// Scalar variables `A`..`Z` and their flags sit above the stack.
pub const VARIABLES_LEN: usize = 26 * 4 + 4;

/// A run of heap bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    start: usize,
    len: usize,
}

impl Block {
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A DIM'd variable shadowing the scalar of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableFrame {
    pub name: u8,
    pub block: Block,
    /// Whether the name was already shadowed when this frame was pushed.
    pub prior: bool,
    pub notifier: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Gosub {
        resume: Pc,
    },
    For {
        name: u8,
        step: i32,
        terminal: i32,
        resume: Pc,
    },
    Event,
    Variable(VariableFrame),
}

impl Frame {
    pub fn size(&self) -> usize {
        FRAME_HEADER
            + match self {
                Frame::Gosub { .. } => 2,
                Frame::For { .. } => 1 + 4 + 4 + 2,
                Frame::Event => 0,
                Frame::Variable(_) => 1 + 2 + 2,
            }
    }
}

/// ## One buffer shared by the control stack and the heap
///
/// The stack grows down from below the scalar variables, the heap grows
/// up from the floor reserved for the line index. Any allocation that
/// would make them cross fails with out of memory.
#[derive(Debug)]
pub struct Arena {
    mem: Vec<u8>,
    top: usize,
    floor: usize,
    heap_top: usize,
    heap: Vec<(Block, bool)>,
    services: Vec<(Block, u16)>,
    sp: usize,
    frames: Vec<Frame>,
}

impl Arena {
    pub fn new(size: usize) -> Arena {
        let top = size.saturating_sub(VARIABLES_LEN);
        Arena {
            mem: vec![0; size],
            top,
            floor: 0,
            heap_top: 0,
            heap: vec![],
            services: vec![],
            sp: top,
            frames: vec![],
        }
    }

    /// Bytes between the heap and the stack.
    pub fn free(&self) -> usize {
        self.sp - self.heap_top
    }

    /// Would a floor of `bytes` fit with the heap and stack empty.
    pub fn floor_fits(&self, bytes: usize) -> bool {
        bytes <= self.top
    }

    /// Reserves the bottom of the arena. Only valid with an empty heap.
    pub fn set_floor(&mut self, bytes: usize) {
        debug_assert!(self.heap.is_empty() && self.services.is_empty());
        self.floor = bytes.min(self.sp);
        self.heap_top = self.floor;
    }

    pub fn push(&mut self, frame: Frame) -> Result<()> {
        let size = frame.size();
        if self.sp < self.heap_top + size {
            return Err(error!(OutOfMemory));
        }
        self.sp -= size;
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the top frame. A variable frame gives back its heap block.
    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        self.sp += frame.size();
        if let Frame::Variable(var) = frame {
            self.release(var.block);
        }
        Some(frame)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames from the top of the stack down.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    pub fn alloc(&mut self, len: usize) -> Result<Block> {
        if self.heap_top + len > self.sp {
            return Err(error!(OutOfMemory));
        }
        let block = Block {
            start: self.heap_top,
            len,
        };
        for byte in &mut self.mem[block.start..block.start + len] {
            *byte = 0;
        }
        self.heap.push((block, true));
        self.heap_top += len;
        Ok(block)
    }

    /// Heap space is reclaimed once every block above it is released.
    pub fn release(&mut self, block: Block) {
        if let Some(entry) = self.heap.iter_mut().rev().find(|(b, _)| *b == block) {
            entry.1 = false;
        }
        while let Some(&(block, false)) = self.heap.last() {
            self.heap.pop();
            self.heap_top = block.start;
        }
    }

    pub fn bytes(&self, block: Block) -> &[u8] {
        &self.mem[block.start..block.start + block.len]
    }

    pub fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        &mut self.mem[block.start..block.start + block.len]
    }

    /// Records an external resource that must be torn down on reset.
    pub fn add_service(&mut self, service: u16) -> Result<()> {
        let block = self.alloc(SERVICE_LEN)?;
        self.services.push((block, service));
        Ok(())
    }

    /// Empties stack and heap. Returns the services to tear down.
    pub fn reset(&mut self) -> Vec<u16> {
        self.frames.clear();
        self.sp = self.top;
        self.heap.clear();
        self.heap_top = self.floor;
        self.services.drain(..).map(|(_, service)| service).collect()
    }

    /// Unused bytes between heap and stack, lent out as a work area.
    pub fn scratch(&mut self) -> &mut [u8] {
        &mut self.mem[self.heap_top..self.sp]
    }

    /// Innermost frame for variable `name`.
    pub fn variable(&self, name: u8) -> Option<&VariableFrame> {
        self.frames().find_map(|frame| match frame {
            Frame::Variable(var) if var.name == name => Some(var),
            _ => None,
        })
    }

    pub fn variable_mut(&mut self, name: u8) -> Option<&mut VariableFrame> {
        self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Variable(var) if var.name == name => Some(var),
            _ => None,
        })
    }
}
