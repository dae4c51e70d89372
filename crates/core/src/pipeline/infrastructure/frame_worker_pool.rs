use std::num::NonZeroUsize;
use std::thread;

/// Data-parallel map over per-frame work.
///
/// Layout: `feeder → [workers] → collector`. Jobs are indices pushed through a
/// bounded channel, results come back tagged with their index and are
/// reassembled in input order, so callers see outputs in decode order.
pub struct FrameWorkerPool {
    threads: usize,
}

impl FrameWorkerPool {
    /// `threads == 0` uses the available parallelism.
    pub fn new(threads: usize) -> Self {
        let threads = if threads == 0 {
            thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            threads
        };
        Self { threads }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let workers = self.threads.min(items.len());
        if workers <= 1 {
            return items.iter().map(&f).collect();
        }

        let (job_tx, job_rx) = crossbeam_channel::bounded::<usize>(workers * 2);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, R)>();
        let f = &f;

        let mut slots: Vec<Option<R>> = thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for index in job_rx {
                        if result_tx.send((index, f(&items[index]))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            for index in 0..items.len() {
                if job_tx.send(index).is_err() {
                    break;
                }
            }
            drop(job_tx);

            let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
            for (index, result) in result_rx {
                slots[index] = Some(result);
            }
            slots
        });

        slots.iter_mut().filter_map(Option::take).collect()
    }
}

impl Default for FrameWorkerPool {
    fn default() -> Self {
        Self::new(0)
    }
}
