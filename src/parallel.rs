use std::thread;

use crate::{Alignment, RecordFilter, Result, SieveError};

/// Alignments a worker hands to its processor between `on_batch_complete` calls.
pub const BATCH_SIZE: usize = 16 * 1024;

/// Trait for types that consume surviving alignments in parallel.
///
/// Each worker thread gets its own clone of the processor.
pub trait ParallelProcessor: Send + Clone {
    /// Process a single alignment that passed the record filter
    fn process_alignment(&mut self, aln: Alignment) -> Result<()>;

    /// Called when a thread finishes processing its batch
    /// Default implementation does nothing
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread calls this method with its own unique ID.
    fn set_tid(&mut self, _tid: usize) {}

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// `0` means all available cores; anything else is capped at that.
pub fn resolve_threads(num_threads: usize) -> usize {
    if num_threads == 0 {
        num_cpus::get()
    } else {
        num_threads.min(num_cpus::get())
    }
}

/// Splits `alignments` into at most `parts` contiguous, ordered chunks.
fn into_chunks(mut alignments: Vec<Alignment>, parts: usize) -> Vec<Vec<Alignment>> {
    let chunk_len = alignments.len().div_ceil(parts.max(1)).max(1);
    let mut chunks = Vec::with_capacity(parts);
    while alignments.len() > chunk_len {
        let rest = alignments.split_off(chunk_len);
        chunks.push(alignments);
        alignments = rest;
    }
    chunks.push(alignments);
    chunks
}

impl RecordFilter {
    /// Runs the record phase on `num_threads` workers and returns the survivors
    /// in input order.
    pub fn filter_parallel(
        &self,
        alignments: Vec<Alignment>,
        num_threads: usize,
    ) -> Result<Vec<Alignment>> {
        let num_threads = resolve_threads(num_threads);
        let total = alignments.len();
        thread::scope(|scope| -> Result<Vec<Alignment>> {
            let handles: Vec<_> = into_chunks(alignments, num_threads)
                .into_iter()
                .map(|mut chunk| {
                    scope.spawn(move || {
                        chunk.retain_mut(|aln| self.keep(aln));
                        chunk
                    })
                })
                .collect();

            let mut kept = Vec::with_capacity(total);
            for handle in handles {
                kept.extend(handle.join().map_err(|_| SieveError::ThreadPanic)?);
            }
            Ok(kept)
        })
    }

    /// Runs the record phase on `num_threads` workers, passing each survivor to
    /// that worker's clone of `processor`.
    pub fn process_parallel<P: ParallelProcessor>(
        &self,
        alignments: Vec<Alignment>,
        processor: P,
        num_threads: usize,
    ) -> Result<()> {
        let num_threads = resolve_threads(num_threads);
        thread::scope(|scope| -> Result<()> {
            let handles: Vec<_> = into_chunks(alignments, num_threads)
                .into_iter()
                .enumerate()
                .map(|(tid, chunk)| {
                    let mut thread_processor = processor.clone();
                    thread_processor.set_tid(tid);
                    scope.spawn(move || -> Result<()> {
                        let mut in_batch = 0;
                        for mut aln in chunk {
                            if self.keep(&mut aln) {
                                thread_processor.process_alignment(aln)?;
                            }
                            in_batch += 1;
                            if in_batch == BATCH_SIZE {
                                thread_processor.on_batch_complete()?;
                                in_batch = 0;
                            }
                        }
                        if in_batch > 0 {
                            thread_processor.on_batch_complete()?;
                        }
                        Ok(())
                    })
                })
                .collect();

            for handle in handles {
                handle.join().map_err(|_| SieveError::ThreadPanic)??;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{flag, FilterUnmappedReads, Header, IntoSieveError, Pipeline, RenameChromosomes};
    use std::sync::{Arc, Mutex};

    fn alignments(n: usize) -> Vec<Alignment> {
        (0..n)
            .map(|i| Alignment {
                qname: format!("r{}", i),
                rname: "1".to_string(),
                flag: if i % 3 == 0 { flag::UNMAPPED } else { 0 },
                ..Default::default()
            })
            .collect()
    }

    fn record_filter() -> RecordFilter {
        Pipeline::new()
            .with(FilterUnmappedReads)
            .with(RenameChromosomes::default())
            .apply(&mut Header::new())
    }

    #[derive(Clone, Default)]
    struct Collector {
        tid: Option<usize>,
        local: Vec<String>,
        global: Arc<Mutex<Vec<String>>>,
        batches: Arc<Mutex<usize>>,
    }
    impl ParallelProcessor for Collector {
        fn process_alignment(&mut self, aln: Alignment) -> Result<()> {
            assert_eq!(aln.rname, "chr1");
            self.local.push(aln.qname);
            Ok(())
        }
        fn on_batch_complete(&mut self) -> Result<()> {
            self.global.lock().unwrap().append(&mut self.local);
            *self.batches.lock().unwrap() += 1;
            Ok(())
        }
        fn set_tid(&mut self, tid: usize) {
            self.tid = Some(tid);
        }
        fn get_tid(&self) -> Option<usize> {
            self.tid
        }
    }

    #[test]
    fn test_into_chunks_preserves_order() {
        let chunks = into_chunks(alignments(10), 3);
        assert_eq!(chunks.len(), 3);
        let names: Vec<_> = chunks.iter().flatten().map(|a| a.qname.clone()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("r{}", i)).collect();
        assert_eq!(names, expected);

        let chunks = into_chunks(Vec::new(), 4);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn test_filter_parallel_matches_sequential() {
        let filter = record_filter();
        let sequential: Vec<_> = alignments(1000)
            .into_iter()
            .filter_map(|mut a| filter.keep(&mut a).then_some(a))
            .collect();

        for threads in [0, 1, 2, 7] {
            let parallel = filter.filter_parallel(alignments(1000), threads).unwrap();
            assert_eq!(parallel, sequential);
        }
        assert_eq!(sequential.len(), 666);
    }

    #[test]
    fn test_process_parallel_sees_survivors() {
        let filter = record_filter();
        let collector = Collector::default();
        filter
            .process_parallel(alignments(3000), collector.clone(), 4)
            .unwrap();

        let mut seen = collector.global.lock().unwrap().clone();
        seen.sort();
        let mut expected: Vec<_> = (0..3000)
            .filter(|i| i % 3 != 0)
            .map(|i| format!("r{}", i))
            .collect();
        expected.sort();
        assert_eq!(seen, expected);
        assert!(*collector.batches.lock().unwrap() >= 1);
    }

    #[test]
    fn test_process_parallel_propagates_errors() {
        #[derive(Clone)]
        struct Failing;
        impl ParallelProcessor for Failing {
            fn process_alignment(&mut self, _aln: Alignment) -> Result<()> {
                Err(std::fmt::Error.into_sieve_error())
            }
        }

        let result = record_filter().process_parallel(alignments(10), Failing, 2);
        assert!(matches!(result, Err(SieveError::Process(_))));
    }
}
