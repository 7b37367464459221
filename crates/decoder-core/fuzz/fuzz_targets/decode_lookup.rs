#![no_main]

use decoder_core::{DecodeTable, Matcher, PatternDescriptor};
use libfuzzer_sys::fuzz_target;

fn table() -> DecodeTable<u8> {
    let descriptors = vec![
        PatternDescriptor::new("B", "000101ii iiiiiiii iiiiiiii iiiiiiii", 0_u8),
        PatternDescriptor::new("BL", "100101ii iiiiiiii iiiiiiii iiiiiiii", 1_u8),
        PatternDescriptor::new("CBZ", "?0110100 iiiiiiii iiiiiiii iiittttt", 2_u8),
        PatternDescriptor::new("ADD (immediate)", "?0010001 ??iiiiii iiiiiinn nnnddddd", 3_u8),
        PatternDescriptor::new("MOVI (vector, immediate)", "01001111 0000???? ????01?? ???ddddd", 4_u8),
        PatternDescriptor::new("FMOV (vector, immediate)", "01001111 0000???? 111101?? ???ddddd", 5_u8),
        PatternDescriptor::new("UDF", "00000000 00000000 ???????? ????????", 6_u8),
    ];
    DecodeTable::build(32, descriptors, &["MOVI (vector, immediate)"]).expect("table builds")
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let word = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let table = table();

    let fast = table.decode(word).map(Matcher::name);
    let slow = table
        .matchers()
        .iter()
        .find(|matcher| matcher.matches(word))
        .map(Matcher::name);
    assert_eq!(fast, slow);

    if let Some(matcher) = table.decode(word) {
        assert!(matcher.matches(word));
        assert_eq!(matcher.value() & !matcher.mask(), 0);
    }
});
