/// Sizes of the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Flash pages given to the store.
    pub pages: usize,
    /// Bytes per flash page. A multiple of 4.
    pub page_size: usize,
    /// Bytes shared by the control stack, the heap and the variables.
    pub arena_size: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            pages: 4,
            page_size: 2048,
            arena_size: 4096,
        }
    }
}

impl Config {
    pub fn flash_len(&self) -> usize {
        self.pages * self.page_size
    }
}
