use super::*;

#[test]
fn can_do_basic_arithmetic() {
    assert_eq!(Distance::new(3) + Distance::new(4), Distance::new(7));
    assert_eq!(Distance::new(3) - Distance::new(4), Distance::new(-1));
    assert_eq!(-Duration::new(5), Duration::new(-5));

    let mut load = Load::new(1);
    load += Load::new(2);
    load -= Load::new(4);
    assert_eq!(load, Load::new(-1));
}

#[test]
fn can_sum_and_compare() {
    let total: Cost = [1, 2, 3].into_iter().map(Cost::new).sum();
    assert_eq!(total, Cost::new(6));

    assert!(Duration::new(1) < Duration::new(2));
    assert_eq!(Duration::new(2).max(Duration::ZERO), Duration::new(2));
    assert_eq!(Duration::new(-2).max(Duration::ZERO), Duration::ZERO);
}

#[test]
fn can_convert_measures_into_cost() {
    assert_eq!(Cost::from(Distance::new(42)), Cost::new(42));
    assert_eq!(Cost::from(Duration::new(7)), Cost::new(7));
    assert_eq!(Cost::from(Load::new(-3)), Cost::new(-3));
    assert_eq!(Cost::from(Store::new(2)), Cost::new(2));
}

#[test]
fn store_sentinel_is_below_any_tag() {
    assert!(Store::NONE < Store::ZERO);
    assert_eq!(Store::NONE, Store::new(-1));
}
