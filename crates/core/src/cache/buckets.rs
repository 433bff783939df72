//! Bucket lifecycle operations.
//!
//! A bucket is a named set of stored responses; deleting it deletes its
//! entries through the foreign-key cascade.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create the bucket if it does not exist yet.
    pub async fn open_bucket(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All bucket names, oldest first.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and all of its entries.
    ///
    /// Returns false if the bucket did not exist.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
