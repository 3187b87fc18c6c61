//! Integration tests for the in-process group transport.

use std::time::Duration;

use ringswarm_net::prelude::*;
use ringswarm_net::{Error, LocalGroup};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ring_pass_reaches_every_rank() {
    let size = 5;
    let results = LocalGroup::run(size, |comm| async move {
        let rank = comm.rank();
        let n = comm.size();
        let next = (rank + 1) % n;
        let prev = (rank + n - 1) % n;
        comm.send(next, Tag::Probe, 0, &(rank as u64 * 10)).await?;
        let got: u64 = comm.recv(prev, Tag::Probe, 0).await?;
        comm.barrier().await?;
        Ok::<_, Error>(got)
    })
    .await
    .unwrap();

    assert_eq!(results, vec![40, 0, 10, 20, 30]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn receives_match_on_source_and_tag() {
    let results = LocalGroup::run(3, |comm| async move {
        match comm.rank() {
            0 => {
                comm.barrier().await?;
                // rank 2's frame is already queued; rank 1's is posted first
                let from_one: Vec<f64> = comm.recv(1, Tag::NeighborBest, 7).await?;
                let from_two: f64 = comm.recv(2, Tag::NeighborFitness, 7).await?;
                Ok::<_, Error>(Some((from_one, from_two)))
            }
            1 => {
                comm.barrier().await?;
                comm.send(0, Tag::NeighborBest, 7, &vec![1.0f64, 2.0]).await?;
                Ok(None)
            }
            _ => {
                comm.send(0, Tag::NeighborFitness, 7, &0.5f64).await?;
                comm.barrier().await?;
                Ok(None)
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(results[0], Some((vec![1.0, 2.0], 0.5)));
    assert!(results[1].is_none() && results[2].is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn same_pair_preserves_send_order() {
    let results = LocalGroup::run(2, |comm| async move {
        if comm.rank() == 1 {
            for i in 0..4u64 {
                comm.send(0, Tag::Probe, 3, &i).await?;
            }
            Ok::<_, Error>(vec![])
        } else {
            let mut got = Vec::new();
            for _ in 0..4 {
                got.push(comm.recv::<u64>(1, Tag::Probe, 3).await?);
            }
            Ok(got)
        }
    })
    .await
    .unwrap();

    assert_eq!(results[0], vec![0, 1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn round_mismatch_fails_fast() {
    let result = LocalGroup::run(2, |comm| async move {
        if comm.rank() == 1 {
            comm.send(0, Tag::GatherScore, 4, &1.0f64).await?;
            Ok::<_, Error>(())
        } else {
            comm.recv::<f64>(1, Tag::GatherScore, 5).await?;
            Ok(())
        }
    })
    .await;

    assert!(matches!(
        result,
        Err(Error::OutOfOrder {
            source: 1,
            expected: 5,
            got: 4
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payload_type_mismatch_is_a_serialization_error() {
    let result = LocalGroup::run(2, |comm| async move {
        if comm.rank() == 1 {
            comm.send(0, Tag::Probe, 0, &1u8).await?;
            Ok::<_, Error>(())
        } else {
            comm.recv::<Vec<f64>>(1, Tag::Probe, 0).await?;
            Ok(())
        }
    })
    .await;

    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_on_a_later_rank_releases_blocked_ranks() {
    let run = LocalGroup::run(3, |comm| async move {
        match comm.rank() {
            // waits on a frame rank 1 never sends
            0 => {
                comm.recv::<f64>(1, Tag::NeighborFitness, 0).await?;
                Ok::<_, Error>(())
            }
            1 => Err(Error::InvalidMessage { version: (9, 9) }),
            _ => {
                comm.barrier().await?;
                Ok(())
            }
        }
    });

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("group returns once a rank fails");
    assert!(matches!(result, Err(Error::InvalidMessage { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_rank_is_reported_by_rank() {
    let run = LocalGroup::run(2, |comm| async move {
        if comm.rank() == 1 {
            panic!("rank 1 gives up");
        }
        comm.barrier().await?;
        Ok::<_, Error>(())
    });

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("group returns once a rank panics");
    assert!(matches!(result, Err(Error::TaskFailed { rank: 1 })));
}
