//! Batch coordinator
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::pipeline::RenditionPipeline;
use rendition_config::{DEFAULT_MAX_WORKERS, DEFAULT_VIDEO_URL_BASE};
use rendition_types::{BatchEntry, BatchReport, VideoTask};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Runs many videos through the pipeline with bounded concurrency
pub struct BatchCoordinator {
    pipeline: Arc<RenditionPipeline>,
    max_workers: usize,
    default_url_base: String,
}

impl BatchCoordinator {
    pub fn new(pipeline: Arc<RenditionPipeline>) -> Self {
        Self {
            pipeline,
            max_workers: DEFAULT_MAX_WORKERS,
            default_url_base: DEFAULT_VIDEO_URL_BASE.to_string(),
        }
    }

    /// Number of videos processed at once (at least 1)
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// URL base for tasks that do not carry their own
    pub fn with_default_url_base(mut self, url_base: impl Into<String>) -> Self {
        self.default_url_base = url_base.into();
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Process every task. Entries are in completion order.
    ///
    /// A failing or panicking task becomes a failed entry and never affects
    /// the others.
    pub async fn run(&self, tasks: Vec<VideoTask>) -> BatchReport {
        let mut report = BatchReport::new(tasks.len());
        info!(
            total = tasks.len(),
            max_workers = self.max_workers,
            "Starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut set = JoinSet::new();
        // Tasks whose entry has not been recorded yet
        let mut outstanding: HashMap<usize, VideoTask> = tasks.iter().cloned().enumerate().collect();

        for (index, task) in tasks.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let pipeline = self.pipeline.clone();
            let url_base = task
                .video_url_base
                .clone()
                .unwrap_or_else(|| self.default_url_base.clone());

            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, BatchEntry::failed(&task, e.to_string())),
                };

                let video_id = task.video_id;
                let filename = task.filename.clone();
                let worker = tokio::spawn(async move {
                    pipeline
                        .process_pending_video(video_id, &filename, &url_base)
                        .await
                });

                let entry = match worker.await {
                    Ok(pipeline_report) => BatchEntry::from_report(&task, pipeline_report),
                    Err(e) => {
                        warn!(video_id = %task.video_id, error = %e, "Batch task panicked");
                        BatchEntry::failed(&task, format!("task failed: {}", e))
                    }
                };
                (index, entry)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, entry)) => {
                    outstanding.remove(&index);
                    report.record(entry);
                }
                Err(e) => error!(error = %e, "Batch worker failed"),
            }
        }

        record_unfinished(&mut report, outstanding);

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "Batch complete"
        );
        report
    }
}

/// A worker that died before producing its entry still counts as a failure,
/// so `total == succeeded + failed` holds for every report.
fn record_unfinished(report: &mut BatchReport, outstanding: HashMap<usize, VideoTask>) {
    let mut unfinished: Vec<_> = outstanding.into_iter().collect();
    unfinished.sort_by_key(|(index, _)| *index);
    for (_, task) in unfinished {
        report.record(BatchEntry::failed(&task, "batch worker failed"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task(filename: &str) -> VideoTask {
        VideoTask {
            video_id: Uuid::new_v4(),
            filename: filename.to_string(),
            video_url_base: None,
        }
    }

    #[test]
    fn test_unfinished_tasks_count_as_failed() {
        let done = task("done.mov");
        let lost = task("lost.mov");

        let mut report = BatchReport::new(2);
        report.record(BatchEntry::failed(&done, "encode failed"));

        let outstanding = HashMap::from([(1, lost.clone())]);
        record_unfinished(&mut report, outstanding);

        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded + report.failed, report.total);
        assert_eq!(report.results[1].video_id, lost.video_id);
        assert_eq!(report.results[1].error.as_deref(), Some("batch worker failed"));
    }

    #[test]
    fn test_nothing_unfinished() {
        let mut report = BatchReport::new(0);
        record_unfinished(&mut report, HashMap::new());
        assert!(report.results.is_empty());
    }
}
