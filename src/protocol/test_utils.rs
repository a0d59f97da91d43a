//! Test helpers shared by the primitive and codec test suites.

#![cfg(test)]

/// Generates a proptest round-trip test for a type that implements `ReadType`/`WriteType` and
/// `proptest_derive::Arbitrary`.
macro_rules! test_roundtrip {
    ($t:ty, $name:ident) => {
        proptest::proptest! {
            #[test]
            fn $name(orig: $t) {
                let mut buf = Vec::new();
                crate::protocol::traits::WriteType::write(&orig, &mut buf).unwrap();

                let mut cursor = std::io::Cursor::new(buf);
                let restored: $t = crate::protocol::traits::ReadType::read(&mut cursor).unwrap();
                assert_eq!(orig, restored);
            }
        }
    };
}

pub(crate) use test_roundtrip;
