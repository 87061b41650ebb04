use super::*;
use crate::models::common::Distance;

#[test]
fn can_create_and_index_square_matrix() {
    let mut matrix = Matrix::<Distance>::new(3);

    assert!(matrix.is_square_of(3));
    assert_eq!(matrix.at(1, 2), Distance::ZERO);

    matrix.set(1, 2, Distance::new(42));
    assert_eq!(matrix.at(1, 2), Distance::new(42));
    assert_eq!(matrix.at(2, 1), Distance::ZERO);
}

#[test]
fn can_create_matrix_from_data() {
    let matrix = Matrix::from_data(2, 2, vec![1, 2, 3, 4]).expect("consistent dimensions");

    assert_eq!(matrix.at(0, 1), 2);
    assert_eq!(matrix.at(1, 0), 3);
}

#[test]
fn cannot_create_matrix_from_mismatched_data() {
    assert!(Matrix::from_data(2, 2, vec![1, 2, 3]).is_err());
}
