use super::item::encode;
use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const PAGE: usize = 256;

fn store() -> FlashStore<RamFlash> {
    FlashStore::new(RamFlash::new(4 * PAGE), PAGE)
}

fn text(n: u16) -> Vec<u8> {
    format!("PRINT {}\n", n).into_bytes()
}

// 60 payload bytes make a 64 byte item, three to a page.
fn wide(n: u16) -> Vec<u8> {
    let mut v = text(n);
    v.resize(60, b' ');
    v
}

fn lines(s: &FlashStore<RamFlash>) -> Vec<(u16, Vec<u8>)> {
    (0..s.len())
        .filter_map(|pos| s.line(pos))
        .map(|(id, payload)| (id, payload.to_vec()))
        .collect()
}

#[test]
fn test_fresh_flash_is_stamped() {
    let s = store();
    assert_eq!((0..4).map(|p| s.age(p)).collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert_eq!(s.free_mem(), 4 * (PAGE - AGE_LEN));
    assert!(s.is_empty());
}

#[test]
fn test_sorted_index() {
    let mut s = store();
    for &id in &[30, 10, 20] {
        assert!(s.add_line(id, &text(id)).is_some());
    }
    assert_eq!(s.ids(), [10, 20, 30]);
    assert_eq!(s.find_closest(15), 1);
    assert_eq!(s.find_closest(40), 3);
    assert_eq!(s.find(20), Some(1));
    assert_eq!(s.find(25), None);
    assert_eq!(s.line(2), Some((30, &b"PRINT 30\n"[..])));
}

#[test]
fn test_replace_leaves_waste() {
    let mut s = store();
    s.add_line(10, b"A\n");
    s.add_line(10, b"BB\n");
    assert_eq!(s.ids(), [10]);
    assert_eq!(s.line(0), Some((10, &b"BB\n"[..])));
    assert_eq!(s.pages()[0].waste, 8);
}

#[test]
fn test_delete() {
    let mut s = store();
    s.add_line(10, &text(10));
    s.add_line(20, &text(20));
    s.delete_line(10);
    s.delete_line(99);
    assert_eq!(s.ids(), [20]);
}

#[test]
fn test_writes_prefer_lowest_age() {
    let mut s = store();
    for id in 1..=3 {
        s.add_line(id, &wide(id));
    }
    assert_eq!(s.pages()[0].free, PAGE - AGE_LEN - 3 * 64);
    assert_eq!(s.pages()[1].free, PAGE - AGE_LEN);
    s.add_line(4, &wide(4));
    assert_eq!(s.pages()[1].free, PAGE - AGE_LEN - 64);
    assert_eq!(s.find_space(64), Some(1));
}

#[test]
fn test_reboot_rebuilds_identical_index() {
    let mut s = store();
    for id in (1..=9).rev() {
        s.add_line(id * 10, &text(id));
    }
    s.delete_line(40);
    s.add_line(20, b"REM NEW\n");
    s.add_special(special::AUTORUN, &[]);
    s.delete_line(90);
    let before = lines(&s);
    let pages = s.pages().to_vec();
    let s = FlashStore::new(s.into_flash(), PAGE);
    assert_eq!(lines(&s), before);
    assert_eq!(s.pages(), &pages[..]);
    assert!(s.find_special(special::AUTORUN).is_some());
}

#[test]
fn test_full_without_waste_keeps_data() {
    let mut s = store();
    for id in 1..=12 {
        assert!(s.add_line(id, &wide(id)).is_some());
    }
    let before = lines(&s);
    assert!(s.add_line(13, &wide(13)).is_none());
    let mut scratch = vec![0u8; PAGE];
    assert!(!s.compact(64, &mut scratch));
    assert!(s.add_line(13, &wide(13)).is_none());
    assert_eq!(lines(&s), before);
}

#[test]
fn test_compact_reclaims_tombstones() {
    let mut s = store();
    for id in 1..=12 {
        s.add_line(id, &wide(id));
    }
    s.delete_line(1);
    assert!(s.add_line(13, &wide(13)).is_none());
    let mut small = vec![0u8; PAGE / 2];
    assert!(!s.compact(64, &mut small));
    let mut scratch = vec![0u8; PAGE];
    assert!(s.compact(64, &mut scratch));
    assert_eq!(s.age(0), 5);
    assert_eq!(s.pages()[0], PageMeta { free: 124, waste: 0 });
    assert!(s.add_line(13, &wide(13)).is_some());
    assert_eq!(s.ids(), (2..=13).collect::<Vec<u16>>());
    assert_eq!(s.line(0), Some((2, &wide(2)[..])));
}

#[test]
fn test_compact_keeps_specials() {
    let mut s = store();
    s.add_special(special::setting(1), &[1, 2, 3]);
    for id in 1..=5 {
        s.add_line(id, &text(id));
    }
    s.delete_line(2);
    s.delete_line(4);
    let mut scratch = vec![0u8; PAGE];
    assert!(s.compact(1, &mut scratch));
    assert_eq!(s.ids(), [1, 3, 5]);
    assert_eq!(s.find_special(special::setting(1)), Some(&[1, 2, 3][..]));
    assert_eq!(s.pages()[0].waste, 0);
}

#[test]
fn test_special_records() {
    let mut s = store();
    assert!(s.add_special(special::AUTORUN, &[]));
    assert_eq!(s.find_special(special::AUTORUN), Some(&[][..]));
    assert!(s.add_special(special::setting(5), &[1, 2, 3, 4]));
    assert!(s.add_special(special::setting(5), &[9]));
    assert_eq!(s.find_special(special::setting(5)), Some(&[9][..]));
    assert!(s.is_empty());
    assert!(s.delete_special(special::setting(5)));
    assert!(!s.delete_special(special::setting(5)));
    assert_eq!(s.find_special(special::setting(5)), None);
    assert!(s.find_special(special::AUTORUN).is_some());
}

#[test]
fn test_delete_all() {
    let mut s = store();
    for id in 1..=4 {
        s.add_line(id, &wide(id));
    }
    s.delete_all();
    assert!(s.is_empty());
    assert_eq!(s.free_mem(), 4 * (PAGE - AGE_LEN));
    assert_eq!(s.age(0), 5);
    assert_eq!(s.age(1), 6);
    assert_eq!(s.age(2), 3);
    let s = FlashStore::new(s.into_flash(), PAGE);
    assert!(s.is_empty());
}

#[test]
fn test_duplicate_ids_at_boot() {
    let mut flash = RamFlash::new(2 * PAGE);
    flash.write_words(0, &1u32.to_le_bytes());
    flash.write_words(4, &encode(10, b"A\n"));
    flash.write_words(12, &encode(10, b"B\n"));
    let s = FlashStore::new(flash, PAGE);
    assert_eq!(s.ids(), [10]);
    assert_eq!(s.pages()[0].waste, 8);
    assert_eq!(s.age(1), 2);
}

#[test]
fn test_damaged_page_is_not_writable() {
    let mut flash = RamFlash::new(2 * PAGE);
    flash.write_words(0, &1u32.to_le_bytes());
    flash.write_words(4, &encode(10, b"A\n"));
    flash.write_words(12, &[0x05, 0x00, 0x03, 0x00]);
    let s = FlashStore::new(flash, PAGE);
    assert_eq!(s.ids(), [10]);
    assert_eq!(s.pages()[0], PageMeta { free: 0, waste: PAGE - 12 });
}

fn check(s: &FlashStore<RamFlash>, model: &BTreeMap<u16, Vec<u8>>) {
    assert_eq!(s.ids(), model.keys().copied().collect::<Vec<u16>>());
    for (&id, payload) in model {
        let pos = s.find(id).expect("indexed");
        assert_eq!(s.line(pos), Some((id, &payload[..])));
    }
    for id in 1..=LAST_ID {
        assert_eq!(s.find(id).is_some(), model.contains_key(&id), "{}", id);
    }
}

const LAST_ID: u16 = 40;

#[test]
fn test_random_edits_match_model() {
    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut model: BTreeMap<u16, Vec<u8>> = BTreeMap::new();
        let mut s = store();
        let mut scratch = vec![0u8; PAGE];
        for step in 0..400 {
            let id = rng.gen_range(1..=LAST_ID);
            match rng.gen_range(0..10) {
                0..=5 => {
                    let mut payload = format!("PRINT {}", step).into_bytes();
                    payload.resize(rng.gen_range(8..60), b'X');
                    payload.push(b'\n');
                    let len = item_len(payload.len());
                    let stored = s.add_line(id, &payload).is_some()
                        || (s.compact(len, &mut scratch) && s.add_line(id, &payload).is_some());
                    if stored {
                        model.insert(id, payload);
                    }
                }
                6..=8 => {
                    s.delete_line(id);
                    model.remove(&id);
                }
                _ => {
                    s.compact(HEADER_LEN, &mut scratch);
                }
            }
            check(&s, &model);
            if step % 50 == 49 {
                let before = s.ids();
                s = FlashStore::new(s.into_flash(), PAGE);
                assert_eq!(s.ids(), before);
                check(&s, &model);
            }
        }
    }
}
