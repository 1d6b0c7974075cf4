//! Segmented sequence checked against `Vec` as a reference model.
//!
//! Interleaved push/insert/erase/set programs of up to 1000 operations must
//! leave the sequence and the model identical after every step.

use pooled_ast::{Arena, ArenaConfig, Sequence};
use proptest::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone)]
enum Op {
    Push(u32),
    /// Insert at `position % (len + 1)`.
    Insert(usize, u32),
    /// Erase at `index % len`; ignored when empty.
    Erase(usize),
    /// Overwrite at `index % len`; ignored when empty.
    Set(usize, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u32>().prop_map(Op::Push),
        2 => (any::<usize>(), any::<u32>()).prop_map(|(at, v)| Op::Insert(at, v)),
        3 => any::<usize>().prop_map(Op::Erase),
        1 => (any::<usize>(), any::<u32>()).prop_map(|(at, v)| Op::Set(at, v)),
    ]
}

fn apply(sequence: &Sequence<'_, u32>, model: &mut Vec<u32>, op: &Op) {
    match *op {
        Op::Push(value) => {
            sequence.push_back(value);
            model.push(value);
        }
        Op::Insert(at, value) => {
            let position = at % (model.len() + 1);
            sequence.insert(position, value);
            model.insert(position, value);
        }
        Op::Erase(at) if !model.is_empty() => {
            let index = at % model.len();
            sequence.erase_at(index);
            model.remove(index);
        }
        Op::Set(at, value) if !model.is_empty() => {
            let index = at % model.len();
            sequence.set(index, value);
            model[index] = value;
        }
        Op::Erase(_) | Op::Set(..) => {}
    }
}

fn assert_matches(sequence: &Sequence<'_, u32>, model: &[u32]) -> Result<(), TestCaseError> {
    prop_assert_eq!(sequence.len(), model.len());
    prop_assert_eq!(sequence.is_empty(), model.is_empty());
    prop_assert_eq!(sequence.front(), model.first().copied());
    prop_assert_eq!(sequence.back(), model.last().copied());
    prop_assert_eq!(sequence.iter().collect::<Vec<_>>(), model.to_vec());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interleaved_operations_match_vec(ops in prop::collection::vec(op_strategy(), 0..1000)) {
        let arena = Arena::new();
        let sequence = Sequence::new(&arena);
        let mut model = Vec::new();

        for op in &ops {
            apply(&sequence, &mut model, op);
            assert_matches(&sequence, &model)?;
        }

        for (index, expected) in model.iter().enumerate() {
            prop_assert_eq!(sequence.at(index), *expected);
        }
        prop_assert_eq!(sequence.get(model.len()), None);
    }

    #[test]
    fn push_back_round_trips(values in prop::collection::vec(any::<u32>(), 0..500)) {
        let arena = Arena::new();
        let sequence = Sequence::new(&arena);
        sequence.extend_from(values.iter().copied());

        prop_assert_eq!(sequence.len(), values.len());
        prop_assert_eq!(sequence.iter().collect::<Vec<_>>(), values);
    }
}

#[test]
fn drain_then_refill_reuses_buffers() {
    init_logging();
    let arena = Arena::new();
    let sequence = Sequence::new(&arena);
    sequence.extend_from(0..100u32);
    let buffers = sequence.buffer_count();
    let capacity = sequence.capacity();

    // Drain from the front so every buffer empties while it is not the tail.
    while !sequence.is_empty() {
        sequence.erase_at(0);
    }
    assert_eq!(sequence.len(), 0);
    assert_eq!(sequence.front(), None);
    assert_eq!(sequence.back(), None);

    sequence.extend_from(1000..1050u32);
    assert_eq!(sequence.len(), 50);
    assert_eq!(sequence.iter().collect::<Vec<_>>(), (1000..1050).collect::<Vec<_>>());
    assert_eq!(sequence.front(), Some(1000));
    assert_eq!(sequence.back(), Some(1049));
    // 50 values fit in the recycled buffers; nothing new was linked.
    assert_eq!(sequence.buffer_count(), buffers);
    assert_eq!(sequence.capacity(), capacity);
}

#[test]
fn erase_from_the_middle_of_a_buffer_chain() {
    init_logging();
    let arena = Arena::with_config(ArenaConfig::with_page_size(128).unwrap());
    let sequence = Sequence::new(&arena);
    let mut model: Vec<u64> = (0..40).collect();
    sequence.extend_from(model.iter().copied());

    for index in [35, 20, 5, 0, 12, 12, 12, 30] {
        sequence.erase_at(index);
        model.remove(index);
        assert_eq!(sequence.iter().collect::<Vec<_>>(), model);
    }

    sequence.insert(0, 99);
    model.insert(0, 99);
    sequence.insert(model.len(), 100);
    model.push(100);
    assert_eq!(sequence.iter().collect::<Vec<_>>(), model);
}

#[test]
#[should_panic(expected = "out of range")]
fn insert_past_end_panics() {
    let arena = Arena::new();
    let sequence = Sequence::new(&arena);
    sequence.push_back(1u8);
    sequence.insert(2, 2);
}
