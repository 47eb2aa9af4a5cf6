//! Drive the reference model and a ring of real peers with the same
//! operation stream; they must agree and keep exactly one owner.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenring_harness::{ModelRing, Operation, RealRing};

#[derive(Debug, Arbitrary)]
struct Input {
    size: u8,
    operations: Vec<Operation>,
}

fuzz_target!(|input: Input| {
    let size = usize::from(input.size % 7) + 2;
    let mut model = ModelRing::new(size);
    let Ok(mut real) = RealRing::new(size) else {
        return;
    };

    for operation in input.operations {
        let operation = operation.clamp(size);
        assert_eq!(model.apply(&operation), real.apply(&operation), "{operation:?}");
        assert_eq!(real.holder(), Some(model.holder()));
        assert_eq!(real.ring().owners().len(), 1);
    }
});
