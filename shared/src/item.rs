use std::fmt;

use arrayvec::ArrayString;

use crate::{shm::ShmSafe, NAME_MAX_LENGTH};

/// Longest name that still leaves room for the trailing NUL.
pub type ItemName = ArrayString<{ NAME_MAX_LENGTH - 1 }>;

/// A product record as it is laid out inside the shared region.
///
/// The name is stored null padded so that every process mapping the region
/// reads the same bytes regardless of how the item was built.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Item {
    id: u32,
    name: [u8; NAME_MAX_LENGTH],
    price: u32,
}

impl Item {
    pub const EMPTY: Item = Item {
        id: 0,
        name: [0; NAME_MAX_LENGTH],
        price: 0,
    };

    /// Builds an item, cutting `name` at the last char boundary that fits.
    pub fn new(id: u32, name: &str, price: u32) -> Self {
        let mut short = ItemName::new();
        for c in name.chars() {
            if short.try_push(c).is_err() {
                break;
            }
        }

        let mut item = Item {
            id,
            price,
            ..Item::EMPTY
        };
        item.name[..short.len()].copy_from_slice(short.as_bytes());
        item
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_LENGTH);
        std::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    pub fn price(&self) -> u32 {
        self.price
    }
}

impl Default for Item {
    fn default() -> Self {
        Item::EMPTY
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}\nPrice: {}\nName: {}",
            self.id,
            self.price,
            self.name()
        )
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("price", &self.price)
            .finish()
    }
}

unsafe impl ShmSafe for Item {}

#[cfg(test)]
mod test {
    use std::mem::{offset_of, size_of};

    use super::*;

    #[test]
    fn layout() {
        assert_eq!(offset_of!(Item, id), 0);
        assert_eq!(offset_of!(Item, name), 4);
        assert_eq!(offset_of!(Item, price), 56);
        assert_eq!(size_of::<Item>(), 60);
    }

    #[test]
    fn basic() {
        let item = Item::new(7, "iPhone 14 Pro Max", 14000);
        assert_eq!(item.id(), 7);
        assert_eq!(item.name(), "iPhone 14 Pro Max");
        assert_eq!(item.price(), 14000);
        assert_eq!(item.to_string(), "ID: 7\nPrice: 14000\nName: iPhone 14 Pro Max");
    }

    #[test]
    fn name_is_null_padded() {
        let item = Item::new(1, "A", 100);
        assert_eq!(item.name[0], b'A');
        assert!(item.name[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn long_name_is_truncated() {
        let long = "x".repeat(80);
        let item = Item::new(1, &long, 1);
        assert_eq!(item.name().len(), NAME_MAX_LENGTH - 1);
        assert_eq!(item.name[NAME_MAX_LENGTH - 1], 0);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 48 ASCII bytes followed by a two byte char that would end at 50
        let name = format!("{}é", "a".repeat(48));
        let item = Item::new(1, &name, 1);
        assert_eq!(item.name(), "a".repeat(48));
    }

    #[test]
    fn empty_item() {
        assert_eq!(Item::default(), Item::EMPTY);
        assert_eq!(Item::EMPTY.name(), "");
    }
}
