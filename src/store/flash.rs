/// Raw flash as the store sees it: readable as plain memory, erased a page
/// at a time, written a 32-bit word at a time.
pub trait Flash {
    fn bytes(&self) -> &[u8];
    fn erase(&mut self, page: usize, page_size: usize);
    /// `addr` and `words.len()` are multiples of 4.
    fn write_words(&mut self, addr: usize, words: &[u8]);
}

/// Flash simulated in RAM. Writes follow NOR rules: a write can only
/// clear bits until the page is erased again.
#[derive(Debug, Clone)]
pub struct RamFlash {
    mem: Vec<u8>,
}

impl RamFlash {
    pub fn new(len: usize) -> RamFlash {
        RamFlash {
            mem: vec![0xFF; len],
        }
    }

    pub fn from_image(mem: Vec<u8>) -> RamFlash {
        RamFlash { mem }
    }
}

impl Flash for RamFlash {
    fn bytes(&self) -> &[u8] {
        &self.mem
    }

    fn erase(&mut self, page: usize, page_size: usize) {
        let start = page * page_size;
        for byte in &mut self.mem[start..start + page_size] {
            *byte = 0xFF;
        }
    }

    fn write_words(&mut self, addr: usize, words: &[u8]) {
        debug_assert_eq!(addr % 4, 0);
        debug_assert_eq!(words.len() % 4, 0);
        for (dst, src) in self.mem[addr..addr + words.len()].iter_mut().zip(words) {
            *dst &= *src;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nor_write() {
        let mut f = RamFlash::new(16);
        f.write_words(4, &[0x0F, 0xF0, 0x00, 0xFF]);
        f.write_words(4, &[0xFF, 0x00, 0xFF, 0xFF]);
        assert_eq!(&f.bytes()[4..8], &[0x0F, 0x00, 0x00, 0xFF]);
        f.erase(0, 8);
        assert_eq!(&f.bytes()[4..8], &[0xFF; 4]);
    }
}
