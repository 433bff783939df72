//! Stored response operations.
//!
//! Entries are keyed by `(bucket, key_hash)`; `put_entry` overwrites any
//! previous entry for the same key.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::CacheKey;
use crate::Error;
use crate::http::Response;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

type EntryRow = (String, u16, String, String, Vec<u8>);

impl CacheDb {
    /// Store a response under `key`, creating the bucket if needed.
    pub async fn put_entry(&self, bucket: &str, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let key = key.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![&bucket, &now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                    bucket, key_hash, method, url, status, status_text, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(bucket, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &bucket,
                        &key.hash,
                        &key.method,
                        &key.url,
                        response.status,
                        &response.status_text,
                        &headers_json,
                        &response.body,
                        &now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for `key`.
    ///
    /// Returns None if the bucket or the entry doesn't exist.
    pub async fn match_entry(&self, bucket: &str, key: &CacheKey) -> Result<Option<Response>, Error> {
        let bucket = bucket.to_string();
        let hash = key.hash.clone();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, status_text, headers_json, body
                    FROM entries WHERE bucket = ?1 AND key_hash = ?2",
                    params![bucket, hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((url, status, status_text, headers_json, body)) = row else {
            return Ok(None);
        };
        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;

        Ok(Some(Response { url, status, status_text, headers, body }))
    }

    /// URLs of every entry in the bucket, in key order.
    pub async fn entry_urls(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE bucket = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![bucket], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Total byte length of all stored bodies in the bucket.
    pub async fn bucket_size(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let size: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries WHERE bucket = ?1",
                    params![bucket],
                    |row| row.get(0),
                )?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }
}
