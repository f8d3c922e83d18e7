use super::helpers::{steps_to_finish, Countdown, Delayed};
use crate::combinator::{First, InstructionExt, OperationExt, Winner};
use crate::error::RuntimeError;
use crate::instruction::{Forever, Instruction, Operation, Step};

#[test]
fn test_or_tie_goes_to_first_operand() {
    // Both finish on tick 3
    let (a, tally_a) = Countdown::tallied(3);
    let (b, tally_b) = Countdown::tallied(3);
    let mut race = a.or(b);

    assert_eq!(steps_to_finish(&mut race), 3);
    assert_eq!(race.value().unwrap(), Winner::First);
    assert_eq!(tally_a.steps(), 3);
    // b is not stepped in the tick a wins
    assert_eq!(tally_b.steps(), 2);
}

#[test]
fn test_or_leaves_second_operand_untouched_when_first_wins_at_once() {
    let (a, tally_a) = Countdown::tallied(1);
    let (b, tally_b) = Countdown::tallied(5);
    let mut race = a.or(b);

    assert_eq!(race.step().unwrap(), Step::Done);
    assert_eq!(race.value().unwrap(), Winner::First);
    assert_eq!(tally_a.steps(), 1);
    assert_eq!(tally_b.steps(), 0);
}

#[test]
fn test_first_stops_at_the_winner_within_a_tick() {
    let (a, tally_a) = Countdown::tallied(3);
    let (b, tally_b) = Countdown::tallied(2);
    let (c, tally_c) = Countdown::tallied(2);
    let mut first = First::new(vec![a.boxed(), b.boxed(), c.boxed()]).unwrap();

    assert_eq!(steps_to_finish(&mut first), 2);
    assert_eq!(first.value().unwrap(), 1);
    assert_eq!((tally_a.steps(), tally_b.steps(), tally_c.steps()), (2, 2, 1));
}

#[test]
fn test_or_second_can_win() {
    let mut race = Countdown::new(5).or(Countdown::new(2));
    assert_eq!(steps_to_finish(&mut race), 2);
    assert_eq!(race.value().unwrap(), Winner::Second);

    let err = race.step().unwrap_err();
    assert!(matches!(
        err.runtime_error(),
        Some(RuntimeError::OperationAlreadyFinished { .. })
    ));
}

#[test]
fn test_race_value_reports_winner_value() {
    let mut race = Delayed::new(2, "slow").or_value(Delayed::new(1, "fast"));
    assert_eq!(steps_to_finish(&mut race), 1);
    assert_eq!(race.value().unwrap(), "fast");
    assert_eq!(race.winner().unwrap(), Winner::Second);
}

#[test]
fn test_first_picks_lowest_index_on_tie() {
    let mut first = First::new(vec![
        Countdown::new(4).boxed(),
        Countdown::new(2).boxed(),
        Countdown::new(2).boxed(),
        Forever.boxed(),
    ])
    .unwrap();
    assert_eq!(first.contenders(), 4);
    assert_eq!(steps_to_finish(&mut first), 2);
    assert_eq!(first.value().unwrap(), 1);
}

#[test]
fn test_first_edge_cases() {
    assert!(matches!(First::new(Vec::new()), Err(RuntimeError::EmptyCombinator)));

    let mut single = First::new(vec![Countdown::new(2).boxed()]).unwrap();
    assert_eq!(single.step().unwrap(), Step::Continue);
    assert_eq!(single.step().unwrap(), Step::Done);
    assert_eq!(single.value().unwrap(), 0);

    let mut last = First::new(vec![Forever.boxed(), Forever.boxed(), Countdown::new(1).boxed()]).unwrap();
    assert_eq!(steps_to_finish(&mut last), 1);
    assert_eq!(last.value().unwrap(), 2);
}
