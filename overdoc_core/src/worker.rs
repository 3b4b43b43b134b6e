use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio_util::sync::CancellationToken;

use crate::OverdocError;
use crate::OverdocResult;

/// Run `task` over `items` on up to `parallelism` scoped threads.
///
/// `cancel` is only polled between items, so no async runtime is needed.
/// Results keep the order of `items`. Items not started before `cancel` was
/// signalled yield [`OverdocError::Cancelled`]; items already running finish.
pub fn run_in_parallel<T, R, F>(
	items: Vec<T>,
	parallelism: usize,
	cancel: &CancellationToken,
	task: F,
) -> Vec<OverdocResult<R>>
where
	T: Send,
	R: Send,
	F: Fn(T) -> OverdocResult<R> + Sync,
{
	let count = items.len();
	let workers = parallelism.clamp(1, count.max(1));

	if workers == 1 {
		return items
			.into_iter()
			.map(|item| {
				if cancel.is_cancelled() {
					Err(OverdocError::Cancelled)
				} else {
					task(item)
				}
			})
			.collect();
	}

	let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
	let results: Mutex<Vec<Option<OverdocResult<R>>>> =
		Mutex::new((0..count).map(|_| None).collect());

	std::thread::scope(|scope| {
		for _ in 0..workers {
			scope.spawn(|| {
				loop {
					if cancel.is_cancelled() {
						break;
					}

					let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
					let Some((index, item)) = next else {
						break;
					};

					let result = task(item);
					results.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
				}
			});
		}
	});

	results
		.into_inner()
		.unwrap_or_else(PoisonError::into_inner)
		.into_iter()
		.map(|result| result.unwrap_or(Err(OverdocError::Cancelled)))
		.collect()
}
