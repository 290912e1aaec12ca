use super::arena::Arena;
use super::expr::Lookup;

/// ## Variable memory
///
/// Twenty-six integer variables `A`..`Z`. A DIM pushes a variable frame
/// that shadows the scalar until the frame is popped; `shadowed` keeps
/// one bit per name so lookups only search the stack when needed.

#[derive(Debug, Default)]
pub struct Var {
    ints: [i32; 26],
    shadowed: u32,
}

fn slot(name: u8) -> usize {
    debug_assert!(name.is_ascii_uppercase());
    (name - b'A') as usize
}

impl Var {
    pub fn new() -> Var {
        Var::default()
    }

    pub fn clear(&mut self) {
        *self = Var::default();
    }

    pub fn get(&self, name: u8) -> i32 {
        self.ints[slot(name)]
    }

    pub fn set(&mut self, name: u8, value: i32) {
        self.ints[slot(name)] = value;
    }

    pub fn is_shadowed(&self, name: u8) -> bool {
        self.shadowed & (1 << slot(name)) != 0
    }

    pub fn shadow(&mut self, name: u8) {
        self.shadowed |= 1 << slot(name);
    }

    /// Puts back the state saved in a popped variable frame.
    pub fn restore(&mut self, name: u8, prior: bool) {
        if prior {
            self.shadow(name);
        } else {
            self.shadowed &= !(1 << slot(name));
        }
    }

    pub fn lookup<'a>(&self, name: u8, arena: &'a Arena) -> Lookup<'a> {
        if self.is_shadowed(name) {
            if let Some(var) = arena.variable(name) {
                return Lookup::Array(arena.bytes(var.block));
            }
        }
        Lookup::Scalar(self.get(name))
    }
}
