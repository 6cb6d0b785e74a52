//! PostgreSQL record store
//!
//! Creates the `videos` and `video_qualities` tables on connect when they do
//! not exist yet. A partial unique index enforces a single default rendition
//! per video, and the default swap runs in one transaction.
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


use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rendition_types::{
    NewQualityRecord, QualityLabel, QualityPatch, QualityStatus, VideoQualityRecord, VideoRecord,
    VideoStatus,
};
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

const QUALITY_COLUMNS: &str = "id, video_id, quality, url, file_size, bitrate, \
    resolution_width, resolution_height, codec, container, duration, fps, pixel_format, \
    color_space, color_range, audio_codec, audio_bitrate, audio_sample_rate, audio_channels, \
    aspect_ratio, frame_count, encoding_time, is_default, status, processing_started_at, \
    processing_completed_at, created_at, updated_at";

/// Record store backed by PostgreSQL
pub struct PostgresRecordStore {
    client: Mutex<Client>,
}

impl PostgresRecordStore {
    /// Connect and run migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        info!("Connecting to record database");

        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Database connection error");
            }
        });

        Self::run_migrations(&client).await?;

        info!("Record database connected and initialized");

        Ok(Self {
            client: Mutex::new(client),
        })
    }

    async fn run_migrations(client: &Client) -> StoreResult<()> {
        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS videos (
                    id UUID PRIMARY KEY,
                    title TEXT,
                    status VARCHAR(32) NOT NULL DEFAULT 'draft',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE IF NOT EXISTS video_qualities (
                    id UUID PRIMARY KEY,
                    video_id UUID NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                    quality VARCHAR(16) NOT NULL,
                    url TEXT NOT NULL,
                    file_size BIGINT,
                    bitrate INTEGER,
                    resolution_width INTEGER,
                    resolution_height INTEGER,
                    codec VARCHAR(32),
                    container VARCHAR(16),
                    duration BIGINT,
                    fps DOUBLE PRECISION,
                    pixel_format VARCHAR(32),
                    color_space VARCHAR(32),
                    color_range VARCHAR(16),
                    audio_codec VARCHAR(32),
                    audio_bitrate INTEGER,
                    audio_sample_rate INTEGER,
                    audio_channels INTEGER,
                    aspect_ratio VARCHAR(32),
                    frame_count BIGINT,
                    encoding_time BIGINT,
                    is_default BOOLEAN NOT NULL DEFAULT FALSE,
                    status VARCHAR(16) NOT NULL
                        CHECK (status IN ('processing', 'ready', 'failed')),
                    processing_started_at TIMESTAMPTZ,
                    processing_completed_at TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX IF NOT EXISTS idx_video_qualities_video_id
                ON video_qualities(video_id);

                CREATE UNIQUE INDEX IF NOT EXISTS idx_video_qualities_single_default
                ON video_qualities(video_id) WHERE is_default;
                "#,
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn get_video(&self, video_id: Uuid) -> StoreResult<Option<VideoRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT id, title, status, created_at, updated_at FROM videos WHERE id = $1",
                &[&video_id],
            )
            .await?;

        Ok(row.map(|row| {
            let status: String = row.get(2);
            VideoRecord {
                id: row.get(0),
                title: row.get(1),
                status: VideoStatus::from(status),
                created_at: row.get(3),
                updated_at: row.get(4),
            }
        }))
    }

    async fn update_video_status(&self, video_id: Uuid, status: VideoStatus) -> StoreResult<bool> {
        let client = self.client.lock().await;
        let updated = client
            .execute(
                "UPDATE videos SET status = $1, updated_at = NOW() WHERE id = $2",
                &[&status.as_str(), &video_id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn create_quality_record(&self, record: NewQualityRecord) -> StoreResult<VideoQualityRecord> {
        let client = self.client.lock().await;
        let id = Uuid::new_v4();
        let started_at = record.processing_started_at.unwrap_or_else(Utc::now);

        let query = format!(
            r#"
            INSERT INTO video_qualities (
                id, video_id, quality, url, status, processing_started_at, file_size, bitrate,
                resolution_width, resolution_height, codec, container, duration
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            QUALITY_COLUMNS
        );

        let row = client
            .query_one(
                &query,
                &[
                    &id,
                    &record.video_id,
                    &record.quality.as_str(),
                    &record.url,
                    &record.status.as_str(),
                    &started_at,
                    &record.file_size.map(to_i64),
                    &record.bitrate.map(to_i32),
                    &record.resolution_width.map(to_i32),
                    &record.resolution_height.map(to_i32),
                    &record.codec,
                    &record.container,
                    &record.duration.map(to_i64),
                ],
            )
            .await?;

        quality_from_row(&row)
    }

    async fn update_quality_record(&self, quality_id: Uuid, patch: QualityPatch) -> StoreResult<bool> {
        let mut sets: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

        macro_rules! push {
            ($column:literal, $value:expr) => {
                if let Some(value) = $value {
                    params.push(Box::new(value));
                    sets.push(format!("{} = ${}", $column, params.len()));
                }
            };
        }

        push!("url", patch.url);
        push!("status", patch.status.map(|s| s.as_str().to_string()));
        push!("file_size", patch.file_size.map(to_i64));
        push!("bitrate", patch.bitrate.map(to_i32));
        push!("resolution_width", patch.resolution_width.map(to_i32));
        push!("resolution_height", patch.resolution_height.map(to_i32));
        push!("codec", patch.codec);
        push!("container", patch.container);
        push!("duration", patch.duration.map(to_i64));
        push!("fps", patch.fps);
        push!("pixel_format", patch.pixel_format);
        push!("color_space", patch.color_space);
        push!("color_range", patch.color_range);
        push!("audio_codec", patch.audio_codec);
        push!("audio_bitrate", patch.audio_bitrate.map(to_i32));
        push!("audio_sample_rate", patch.audio_sample_rate.map(to_i32));
        push!("audio_channels", patch.audio_channels.map(to_i32));
        push!("aspect_ratio", patch.aspect_ratio);
        push!("frame_count", patch.frame_count.map(to_i64));
        push!("encoding_time", patch.encoding_time.map(to_i64));
        push!("processing_completed_at", patch.processing_completed_at);

        if sets.is_empty() {
            return Ok(false);
        }

        params.push(Box::new(quality_id));
        let query = format!(
            "UPDATE video_qualities SET {}, updated_at = NOW() WHERE id = ${}",
            sets.join(", "),
            params.len()
        );
        debug!(quality_id = %quality_id, fields = sets.len(), "Updating quality record");

        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let client = self.client.lock().await;
        let updated = client.execute(&query, &refs).await?;
        Ok(updated > 0)
    }

    async fn update_quality_status(&self, quality_id: Uuid, status: QualityStatus) -> StoreResult<bool> {
        let client = self.client.lock().await;
        let updated = client
            .execute(
                "UPDATE video_qualities SET status = $1, updated_at = NOW() WHERE id = $2",
                &[&status.as_str(), &quality_id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn list_qualities(&self, video_id: Uuid) -> StoreResult<Vec<VideoQualityRecord>> {
        let client = self.client.lock().await;
        let query = format!(
            r#"
            SELECT {}
            FROM video_qualities
            WHERE video_id = $1
            ORDER BY
                CASE quality
                    WHEN '2160p' THEN 1
                    WHEN '1440p' THEN 2
                    WHEN '1080p' THEN 3
                    WHEN '720p' THEN 4
                    WHEN '480p' THEN 5
                    WHEN '360p' THEN 6
                    WHEN '240p' THEN 7
                    WHEN '144p' THEN 8
                    ELSE 9
                END,
                created_at
            "#,
            QUALITY_COLUMNS
        );

        let rows = client.query(&query, &[&video_id]).await?;
        rows.iter().map(quality_from_row).collect()
    }

    async fn set_default_quality(&self, video_id: Uuid, quality_id: Uuid) -> StoreResult<bool> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;

        tx.execute(
            "UPDATE video_qualities SET is_default = FALSE, updated_at = NOW() \
             WHERE video_id = $1 AND is_default",
            &[&video_id],
        )
        .await?;

        let updated = tx
            .execute(
                "UPDATE video_qualities SET is_default = TRUE, updated_at = NOW() \
                 WHERE id = $1 AND video_id = $2",
                &[&quality_id, &video_id],
            )
            .await?;

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}

fn quality_from_row(row: &Row) -> StoreResult<VideoQualityRecord> {
    let quality: String = row.try_get("quality")?;
    let status: String = row.try_get("status")?;

    Ok(VideoQualityRecord {
        id: row.try_get("id")?,
        video_id: row.try_get("video_id")?,
        quality: quality
            .parse::<QualityLabel>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        url: row.try_get("url")?,
        file_size: row.try_get::<_, Option<i64>>("file_size")?.map(from_i64),
        bitrate: row.try_get::<_, Option<i32>>("bitrate")?.map(from_i32),
        resolution_width: row.try_get::<_, Option<i32>>("resolution_width")?.map(from_i32),
        resolution_height: row.try_get::<_, Option<i32>>("resolution_height")?.map(from_i32),
        codec: row.try_get("codec")?,
        container: row.try_get("container")?,
        duration: row.try_get::<_, Option<i64>>("duration")?.map(from_i64),
        fps: row.try_get("fps")?,
        pixel_format: row.try_get("pixel_format")?,
        color_space: row.try_get("color_space")?,
        color_range: row.try_get("color_range")?,
        audio_codec: row.try_get("audio_codec")?,
        audio_bitrate: row.try_get::<_, Option<i32>>("audio_bitrate")?.map(from_i32),
        audio_sample_rate: row.try_get::<_, Option<i32>>("audio_sample_rate")?.map(from_i32),
        audio_channels: row.try_get::<_, Option<i32>>("audio_channels")?.map(from_i32),
        aspect_ratio: row.try_get("aspect_ratio")?,
        frame_count: row.try_get::<_, Option<i64>>("frame_count")?.map(from_i64),
        encoding_time: row.try_get::<_, Option<i64>>("encoding_time")?.map(from_i64),
        is_default: row.try_get("is_default")?,
        status: status
            .parse::<QualityStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        processing_started_at: row.try_get::<_, Option<DateTime<Utc>>>("processing_started_at")?,
        processing_completed_at: row.try_get::<_, Option<DateTime<Utc>>>("processing_completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Postgres has no unsigned integer columns; values saturate at the signed bound.
fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_i64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn from_i32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_conversions_saturate() {
        assert_eq!(to_i64(u64::MAX), i64::MAX);
        assert_eq!(to_i32(7), 7);
        assert_eq!(from_i64(-1), 0);
        assert_eq!(from_i32(1080), 1080);
    }

    #[test]
    fn test_quality_columns_cover_record() {
        let columns: Vec<&str> = QUALITY_COLUMNS.split(',').map(str::trim).collect();
        assert_eq!(columns.len(), 28);
        assert!(columns.contains(&"is_default"));
        assert!(columns.contains(&"processing_completed_at"));
    }
}
