use super::*;
use crate::helpers::{euclidean_matrices, TestClient, TestProblem};

#[test]
fn client_constructor_rejects_invalid_data() {
    assert!(TestClient { weight: -1, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { volume: -1, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { salvage: -1, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { order: -2, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { store: -2, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { service: -1, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { tw_early: 10, tw_late: 5, ..TestClient::default() }.try_build().is_err());
    assert!(TestClient { prize: -1, ..TestClient::default() }.try_build().is_err());
}

#[test]
fn client_constructor_accepts_untagged_clients() {
    let client = TestClient { order: -1, store: -1, ..TestClient::default() }.build();

    assert_eq!(client.client_order, -1);
    assert_eq!(client.client_store, Store::NONE);
}

#[test]
fn problem_data_rejects_mismatched_matrices() {
    let clients = vec![
        TestClient::default().build(),
        TestClient { x: 1, ..TestClient::default() }.build(),
    ];
    let (dist, _) = euclidean_matrices(&clients, 1);
    let (_, dur) = euclidean_matrices(&clients[..1], 1);

    let result = ProblemData::new(
        clients,
        1,
        Load::new(10),
        Load::new(10),
        Salvage::new(10),
        -1,
        Store::new(10),
        dist,
        dur,
    );

    assert!(result.is_err());
}

#[test]
fn problem_data_rejects_empty_client_list() {
    let result = ProblemData::new(
        Vec::new(),
        1,
        Load::new(10),
        Load::new(10),
        Salvage::new(10),
        -1,
        Store::new(10),
        Matrix::new(0),
        Matrix::new(0),
    );

    assert!(result.is_err());
}

#[test]
fn problem_data_computes_centroid_over_clients_only() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 2, y: 0, ..TestClient::default() },
            TestClient { x: 4, y: 6, ..TestClient::default() },
        ],
        ..TestProblem::default()
    }
    .build();

    assert_eq!(data.num_clients(), 2);
    assert_eq!(data.centroid(), (3., 3.));
}

#[test]
fn problem_data_exposes_distances_and_durations() {
    let data = TestProblem {
        clients: vec![TestClient { x: 3, y: 4, ..TestClient::default() }],
        ..TestProblem::default()
    }
    .build();

    assert_eq!(data.dist(0, 1), Distance::new(5));
    assert_eq!(data.duration(1, 0), Duration::new(5));
    assert_eq!(data.dist(0, 0), Distance::ZERO);
}
