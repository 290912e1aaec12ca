use super::item::{self, Header, Kind, HEADER_LEN, ID_SPECIAL, MAX_ITEM_LEN};
use super::Flash;
use std::cmp::Reverse;

/// Bytes of the age stamp at the start of every page.
pub const AGE_LEN: usize = 4;
pub const ERASED_AGE: u32 = 0xFFFF_FFFF;

/// Free and reclaimable bytes of one page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub free: usize,
    pub waste: usize,
}

/// ## Log-structured store of program lines and special records
///
/// Items are only ever appended. Replaced or deleted items become
/// tombstones until `compact` rewrites their page. The line index holds
/// the flash address of every live line sorted by line number.
pub struct FlashStore<F> {
    flash: F,
    page_size: usize,
    pages: Vec<PageMeta>,
    index: Vec<usize>,
    last_age: u32,
}

struct Scan {
    items: Vec<(usize, Header)>,
    end: usize,
    damaged: bool,
}

/// Walks the items of one page image. `end` is the offset just past the
/// last readable item; a damaged page has unreadable bytes after it.
fn scan(page: &[u8]) -> Scan {
    let mut items = vec![];
    let mut off = AGE_LEN;
    while off + HEADER_LEN <= page.len() {
        let header = Header::decode(&page[off..]);
        if header.kind() == Kind::Free {
            break;
        }
        let len = header.len as usize;
        if len < HEADER_LEN || len % 4 != 0 || off + len > page.len() {
            return Scan {
                items,
                end: off,
                damaged: true,
            };
        }
        items.push((off, header));
        off += len;
    }
    Scan {
        items,
        end: off,
        damaged: false,
    }
}

impl<F: Flash> FlashStore<F> {
    pub fn new(flash: F, page_size: usize) -> FlashStore<F> {
        debug_assert_eq!(page_size % 4, 0);
        let count = flash.bytes().len() / page_size;
        let mut store = FlashStore {
            flash,
            page_size,
            pages: vec![PageMeta::default(); count],
            index: vec![],
            last_age: 0,
        };
        store.init();
        store
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    pub fn age(&self, page: usize) -> u32 {
        let addr = page * self.page_size;
        let b = &self.flash.bytes()[addr..addr + AGE_LEN];
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn header(&self, addr: usize) -> Header {
        Header::decode(&self.flash.bytes()[addr..])
    }

    fn payload(&self, addr: usize) -> &[u8] {
        let header = self.header(addr);
        let start = addr + HEADER_LEN;
        &self.flash.bytes()[start..start + header.payload_len()]
    }

    fn page_bytes(&self, page: usize) -> &[u8] {
        let base = page * self.page_size;
        &self.flash.bytes()[base..base + self.page_size]
    }

    fn stamp(&mut self, page: usize) {
        self.last_age += 1;
        let age = self.last_age.to_le_bytes();
        self.flash.write_words(page * self.page_size, &age);
    }

    /// Rebuilds page bookkeeping and the line index from flash alone.
    /// Returns the number of indexed lines.
    pub fn init(&mut self) -> usize {
        let count = self.pages.len();
        self.last_age = (0..count)
            .map(|page| self.age(page))
            .filter(|&age| age != ERASED_AGE)
            .max()
            .unwrap_or(0);
        for page in 0..count {
            if self.age(page) == ERASED_AGE {
                self.stamp(page);
            }
        }
        self.index.clear();
        for page in 0..count {
            let base = page * self.page_size;
            let scan = scan(self.page_bytes(page));
            let tail = self.page_size - scan.end;
            let (free, mut waste) = if scan.damaged { (0, tail) } else { (tail, 0) };
            for (off, header) in scan.items {
                match header.kind() {
                    Kind::Tombstone => waste += header.len as usize,
                    Kind::Line(_) => self.index.push(base + off),
                    _ => {}
                }
            }
            self.pages[page] = PageMeta { free, waste };
        }
        self.heap_sort();
        self.drop_duplicates();
        self.index.len()
    }

    fn line_id(&self, addr: usize) -> u16 {
        self.header(addr).id
    }

    fn heap_sort(&mut self) {
        let len = self.index.len();
        for root in (0..len / 2).rev() {
            self.sift_down(root, len);
        }
        for end in (1..len).rev() {
            self.index.swap(0, end);
            self.sift_down(0, end);
        }
    }

    fn sift_down(&mut self, mut root: usize, end: usize) {
        loop {
            let mut child = 2 * root + 1;
            if child >= end {
                return;
            }
            if child + 1 < end
                && self.line_id(self.index[child]) < self.line_id(self.index[child + 1])
            {
                child += 1;
            }
            if self.line_id(self.index[root]) < self.line_id(self.index[child]) {
                self.index.swap(root, child);
                root = child;
            } else {
                return;
            }
        }
    }

    // Interrupted replacements can leave two live copies of a line.
    // The first in index order stays, the rest become waste.
    fn drop_duplicates(&mut self) {
        let mut pos = 1;
        while pos < self.index.len() {
            if self.line_id(self.index[pos]) == self.line_id(self.index[pos - 1]) {
                let addr = self.index.remove(pos);
                self.tombstone(addr);
            } else {
                pos += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Lowest index position whose line number is at least `id`.
    pub fn find_closest(&self, id: u16) -> usize {
        self.index.partition_point(|&addr| self.line_id(addr) < id)
    }

    /// Index position of line `id` if it is stored.
    pub fn find(&self, id: u16) -> Option<usize> {
        let pos = self.find_closest(id);
        match self.index.get(pos) {
            Some(&addr) if self.line_id(addr) == id => Some(pos),
            _ => None,
        }
    }

    pub fn line(&self, pos: usize) -> Option<(u16, &[u8])> {
        let &addr = self.index.get(pos)?;
        Some((self.line_id(addr), self.payload(addr)))
    }

    pub fn line_number(&self, pos: usize) -> Option<u16> {
        self.index.get(pos).map(|&addr| self.line_id(addr))
    }

    pub fn ids(&self) -> Vec<u16> {
        self.index.iter().map(|&addr| self.line_id(addr)).collect()
    }

    /// Page with room for `len` bytes, preferring the lowest age.
    pub fn find_space(&self, len: usize) -> Option<usize> {
        (0..self.pages.len())
            .filter(|&page| self.pages[page].free >= len)
            .min_by_key(|&page| self.age(page))
    }

    fn write(&mut self, page: usize, id: u16, payload: &[u8]) -> usize {
        let buf = item::encode(id, payload);
        let meta = &mut self.pages[page];
        let addr = page * self.page_size + self.page_size - meta.free;
        meta.free -= buf.len();
        self.flash.write_words(addr, &buf);
        addr
    }

    fn tombstone(&mut self, addr: usize) {
        let header = self.header(addr);
        self.flash.write_words(addr, &header.tombstone().encode());
        self.pages[addr / self.page_size].waste += header.len as usize;
    }

    /// Stores or replaces line `id`. `None` when no page has room; the
    /// caller may `compact` and try again.
    pub fn add_line(&mut self, id: u16, payload: &[u8]) -> Option<usize> {
        debug_assert!(id != 0 && id < ID_SPECIAL);
        let len = item::item_len(payload.len());
        if len > MAX_ITEM_LEN {
            return None;
        }
        let page = self.find_space(len)?;
        let addr = self.write(page, id, payload);
        let pos = self.find_closest(id);
        match self.index.get(pos) {
            Some(&old) if self.line_id(old) == id => {
                self.tombstone(old);
                self.index[pos] = addr;
            }
            _ => self.index.insert(pos, addr),
        }
        Some(self.index.len())
    }

    pub fn delete_line(&mut self, id: u16) {
        if let Some(pos) = self.find(id) {
            let addr = self.index.remove(pos);
            self.tombstone(addr);
        }
    }

    fn special_addr(&self, key: u32) -> Option<usize> {
        let key = key.to_le_bytes();
        (0..self.pages.len()).find_map(|page| {
            let base = page * self.page_size;
            scan(self.page_bytes(page))
                .items
                .into_iter()
                .filter(|(_, header)| header.kind() == Kind::Special)
                .map(|(off, _)| base + off)
                .find(|&addr| self.payload(addr).starts_with(&key))
        })
    }

    /// Writes a special record, replacing any with the same key.
    /// False when no page has room.
    pub fn add_special(&mut self, key: u32, data: &[u8]) -> bool {
        let mut payload = key.to_le_bytes().to_vec();
        payload.extend_from_slice(data);
        let len = item::item_len(payload.len());
        if len > MAX_ITEM_LEN {
            return false;
        }
        let old = self.special_addr(key);
        let page = match self.find_space(len) {
            Some(page) => page,
            None => return false,
        };
        self.write(page, ID_SPECIAL, &payload);
        if let Some(old) = old {
            self.tombstone(old);
        }
        true
    }

    pub fn find_special(&self, key: u32) -> Option<&[u8]> {
        let addr = self.special_addr(key)?;
        Some(&self.payload(addr)[4..])
    }

    pub fn delete_special(&mut self, key: u32) -> bool {
        match self.special_addr(key) {
            Some(addr) => {
                self.tombstone(addr);
                true
            }
            None => false,
        }
    }

    pub fn delete_all(&mut self) {
        for page in 0..self.pages.len() {
            if self.pages[page].free != self.page_size - AGE_LEN {
                self.flash.erase(page, self.page_size);
                self.stamp(page);
            }
            self.pages[page] = PageMeta {
                free: self.page_size - AGE_LEN,
                waste: 0,
            };
        }
        self.index.clear();
    }

    pub fn free_mem(&self) -> usize {
        self.pages.iter().map(|meta| meta.free).sum()
    }

    /// Rewrites one page without its tombstones so that at least
    /// `min_len` bytes become free there. `scratch` holds the page copy.
    /// Returns false when nothing was done.
    pub fn compact(&mut self, min_len: usize, scratch: &mut [u8]) -> bool {
        let page_size = self.page_size;
        if scratch.len() < page_size {
            return false;
        }
        let page = match (0..self.pages.len())
            .filter(|&p| {
                let meta = self.pages[p];
                meta.waste > 0 && meta.waste + meta.free >= min_len
            })
            .max_by_key(|&p| (self.pages[p].waste + self.pages[p].free, Reverse(p)))
        {
            Some(page) => page,
            None => return false,
        };
        let copy = &mut scratch[..page_size];
        copy.copy_from_slice(self.page_bytes(page));
        self.flash.erase(page, page_size);
        self.stamp(page);
        let base = page * page_size;
        let mut off = AGE_LEN;
        for (from, header) in scan(copy).items {
            if header.kind() == Kind::Tombstone {
                continue;
            }
            let len = header.len as usize;
            self.flash.write_words(base + off, &copy[from..from + len]);
            off += len;
        }
        self.init();
        true
    }
}
