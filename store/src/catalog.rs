use rand::Rng;

/// Products the producer picks from.
pub const CATALOG: [(&str, u32); 4] = [
    ("iPhone 14 Pro Max", 14000),
    ("Samsung Galaxy S23 5G", 12000),
    ("Apple Watch S9 45mm GPS+CEL", 7000),
    ("Samsung Galaxy Watch5 Pro 45mm LTE", 6000),
];

pub fn pick(rng: &mut impl Rng) -> (&'static str, u32) {
    CATALOG[rng.gen_range(0..CATALOG.len())]
}
