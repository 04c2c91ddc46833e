use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::non_blank_or;
use crate::{
    is_deleted_status, BatchResult, DeleteFailure, DeleteManyResult, DeleteSuccess, DELETE_FAILED,
    NOT_FOUND_STATUS,
};

/// Run `op` over every input concurrently and partition the outcomes.
///
/// `key` extracts the identifier reported with a failure. A failure message
/// is the error's own text, or `fallback` when that text is blank. Inputs are
/// never dropped: each one ends up in exactly one bucket, in input order.
pub async fn fan_out<T, S, E, F, Op, Fut>(
    inputs: Vec<T>,
    key: impl Fn(&T) -> String,
    op: Op,
    failure: impl Fn(String, String) -> F,
    fallback: &str,
) -> BatchResult<S, F>
where
    Op: Fn(T) -> Fut,
    Fut: Future<Output = Result<S, E>>,
    E: Display,
{
    if inputs.is_empty() {
        return BatchResult::empty();
    }

    let total = inputs.len();
    let pending = inputs.into_iter().map(|input| {
        let id = key(&input);
        let call = op(input);
        async move { (id, call.await) }
    });

    let outcomes = join_all(pending).await;

    let mut result = BatchResult::with_capacity(total);
    for (id, outcome) in outcomes {
        match outcome {
            Ok(success) => result.successes.push(success),
            Err(err) => {
                let reason = non_blank_or(err.to_string(), fallback);
                warn!(item = %id, error = %reason, "Batch item failed");
                result.failures.push(failure(id, reason));
            }
        }
    }

    debug!(
        total,
        successes = result.successes.len(),
        failures = result.failures.len(),
        "Batch completed"
    );
    result
}

/// Classify a bulk-delete status map against the ids that were requested.
///
/// `ok` and `deleted` count as success; anything else is a failure carrying
/// the status, with absent or blank statuses reported as `not_found`.
pub fn classify_bulk_delete(requested: &[String], statuses: &HashMap<String, String>) -> DeleteManyResult {
    let mut result = BatchResult::with_capacity(requested.len());

    for public_id in requested {
        match statuses.get(public_id).map(|s| s.trim()) {
            Some(status) if is_deleted_status(status) => {
                result.successes.push(DeleteSuccess {
                    public_id: public_id.clone(),
                });
            }
            Some(status) if !status.is_empty() => {
                result.failures.push(DeleteFailure {
                    public_id: public_id.clone(),
                    error: status.to_string(),
                });
            }
            _ => {
                result.failures.push(DeleteFailure {
                    public_id: public_id.clone(),
                    error: NOT_FOUND_STATUS.to_string(),
                });
            }
        }
    }

    result
}

/// Drop repeated ids, keeping first occurrences in order
pub fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Report one entry per requested id from a result computed over its unique ids.
///
/// A repeated id gets the outcome of its single provider call every time it
/// appears, so it never lands in both buckets.
pub fn expand_delete_result(requested: &[String], unique: DeleteManyResult) -> DeleteManyResult {
    let deleted: HashSet<String> = unique.successes.into_iter().map(|s| s.public_id).collect();
    let errors: HashMap<String, String> = unique
        .failures
        .into_iter()
        .map(|f| (f.public_id, f.error))
        .collect();

    let mut result = BatchResult::with_capacity(requested.len());
    for public_id in requested {
        if deleted.contains(public_id) {
            result.successes.push(DeleteSuccess {
                public_id: public_id.clone(),
            });
        } else {
            let error = errors
                .get(public_id)
                .cloned()
                .unwrap_or_else(|| DELETE_FAILED.to_string());
            result.failures.push(DeleteFailure {
                public_id: public_id.clone(),
                error,
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Failed {
        id: String,
        error: String,
    }

    fn failed(id: String, error: String) -> Failed {
        Failed { id, error }
    }

    #[tokio::test]
    async fn empty_input_never_calls_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: BatchResult<u32, Failed> = fan_out(
            Vec::<u32>::new(),
            |n| n.to_string(),
            |n| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, MediaError>(n) }
            },
            failed,
            "fallback",
        )
        .await;

        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn partitions_successes_and_failures() {
        let result = fan_out(
            vec![1u32, 2, 3, 4, 5],
            |n| format!("item-{}", n),
            |n| async move {
                if n % 2 == 0 {
                    Err(MediaError::upload_failed(format!("{} is even", n)))
                } else {
                    Ok(n * 10)
                }
            },
            failed,
            "fallback",
        )
        .await;

        assert_eq!(result.successes, vec![10, 30, 50]);
        assert_eq!(
            result.failures,
            vec![
                Failed { id: "item-2".into(), error: "2 is even".into() },
                Failed { id: "item-4".into(), error: "4 is even".into() },
            ]
        );
        assert_eq!(result.len(), 5);
    }

    #[tokio::test]
    async fn blank_error_messages_use_fallback() {
        let result: BatchResult<(), Failed> = fan_out(
            vec!["a".to_string()],
            |s| s.clone(),
            |_| async { Err(MediaError::UploadFailed { reason: String::new() }) },
            failed,
            "fallback",
        )
        .await;

        assert_eq!(result.failures[0].error, "fallback");
    }

    #[tokio::test(start_paused = true)]
    async fn items_run_concurrently() {
        let started = tokio::time::Instant::now();

        let result: BatchResult<u64, Failed> = fan_out(
            vec![100u64, 100, 100, 100],
            |ms| ms.to_string(),
            |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, MediaError>(ms)
            },
            failed,
            "fallback",
        )
        .await;

        assert_eq!(result.successes.len(), 4);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn bulk_statuses_are_classified() {
        let requested: Vec<String> = ["gone", "ok", "missing", "blank", "absent", "denied"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let statuses: HashMap<String, String> = [
            ("gone", "deleted"),
            ("ok", "ok"),
            ("missing", "not_found"),
            ("blank", ""),
            ("denied", "rate_limited"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let result = classify_bulk_delete(&requested, &statuses);

        assert_eq!(
            result.successes,
            vec![
                DeleteSuccess { public_id: "gone".into() },
                DeleteSuccess { public_id: "ok".into() },
            ]
        );
        let errors: Vec<(&str, &str)> = result
            .failures
            .iter()
            .map(|f| (f.public_id.as_str(), f.error.as_str()))
            .collect();
        assert_eq!(
            errors,
            vec![
                ("missing", "not_found"),
                ("blank", "not_found"),
                ("absent", "not_found"),
                ("denied", "rate_limited"),
            ]
        );
    }

    #[test]
    fn repeated_ids_share_one_outcome() {
        let requested: Vec<String> = ["a", "b", "a", "c", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_ids(&requested), vec!["a", "b", "c"]);

        let unique = DeleteManyResult {
            successes: vec![DeleteSuccess { public_id: "a".into() }],
            failures: vec![
                DeleteFailure { public_id: "b".into(), error: NOT_FOUND_STATUS.into() },
                DeleteFailure { public_id: "c".into(), error: "denied".into() },
            ],
        };

        let result = expand_delete_result(&requested, unique);

        assert_eq!(result.len(), requested.len());
        let deleted: Vec<&str> = result.successes.iter().map(|s| s.public_id.as_str()).collect();
        assert_eq!(deleted, vec!["a", "a"]);
        let failed: Vec<(&str, &str)> = result
            .failures
            .iter()
            .map(|f| (f.public_id.as_str(), f.error.as_str()))
            .collect();
        assert_eq!(failed, vec![("b", "not_found"), ("c", "denied"), ("b", "not_found")]);
    }
}
